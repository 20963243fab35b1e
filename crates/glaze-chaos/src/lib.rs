//! Glaze chaos transforms
//!
//! Logistic-map scrambling and restoration of JPEG entropy-coded data.
//! The transforms here plug into the format registry from `glaze-core`
//! and never touch payload headers, so scrambled output still carries its
//! format and dimensions.

pub mod jpeg;
pub mod logistic;
pub mod registry;

pub use jpeg::{JpegChaosDecryptor, JpegChaosEncryptor, BLOCK_LEN};
pub use logistic::LogisticMap;
pub use registry::{decrypt_registry, encrypt_registry};
