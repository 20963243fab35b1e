//! Glaze core types
//!
//! Key material, image formats, payload metadata, and the transform
//! contracts shared by every pipeline stage. This crate is synchronous and
//! runtime-free; the async plumbing lives in `glaze-pipeline`.

pub mod decision;
pub mod errors;
pub mod format;
pub mod jpeg;
pub mod key;
pub mod payload;
pub mod transform;

pub use decision::Decision;
pub use errors::{GlazeError, Result as GlazeResult};
pub use format::ImageFormat;
pub use key::{generate_key, ChaosKey};
pub use payload::{Completeness, EncodedPayload};
pub use transform::{Transform, TransformFactory, TransformRegistry, TransformStatus};
