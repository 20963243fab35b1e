//! Glaze pipeline
//!
//! Async producer/consumer plumbing for progressive image delivery, with
//! crypto transform stages that throttle work over bursts of intermediate
//! payloads. Stages are wired back to front: each producer wraps the next
//! one and rewrites or passes through what flows past.

pub mod consumer;
pub mod context;
pub mod listener;
pub mod request;
pub mod scheduler;
pub mod stage;

pub use consumer::{Consumer, Producer};
pub use context::{ContextCallbacks, RequestContext};
pub use listener::{DiagnosticsMap, NoopListener, StageListener};
pub use request::ImageRequest;
pub use scheduler::{SchedulerConfig, ThrottledJobScheduler, QUEUE_TIME_KEY};
pub use stage::{should_transform, Polarity, TransformStage};
