//! Transform contracts and the format registry
//!
//! A [`Transform`] rewrites one encoded payload into another. Stages never
//! name concrete implementations; they look one up through a
//! [`TransformFactory`] keyed by image format, so capability for a format
//! is decided by what was registered rather than by the stage itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::format::ImageFormat;
use crate::key::ChaosKey;
use crate::payload::EncodedPayload;

/// Outcome reported by a transform that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStatus {
    /// The output buffer holds a valid transformed payload
    Success,
    /// The input could not be transformed; the output buffer is unusable
    Failure,
}

impl TransformStatus {
    /// True when the transform produced a usable payload
    pub fn is_success(self) -> bool {
        matches!(self, TransformStatus::Success)
    }
}

impl fmt::Display for TransformStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformStatus::Success => write!(f, "Status: Success"),
            TransformStatus::Failure => write!(f, "Status: Failure"),
        }
    }
}

/// A payload rewriter for one or more image formats
///
/// Implementations are synchronous and CPU-bound; the pipeline moves them
/// off the async runtime before calling [`Transform::transform`].
pub trait Transform: Send + Sync {
    /// True when this transform can rewrite payloads of `format`
    fn can_handle(&self, format: ImageFormat) -> bool;

    /// Stable name used in diagnostics
    fn identifier(&self) -> &'static str;

    /// Rewrites `input` into `output`.
    ///
    /// Returns `Ok(Failure)` when the payload itself resists transforming,
    /// and `Err` only for faults outside the payload such as an unusable
    /// key.
    fn transform(
        &self,
        input: &EncodedPayload,
        output: &mut Vec<u8>,
        key: Option<&ChaosKey>,
    ) -> Result<TransformStatus>;
}

/// Looks up the transform responsible for a format, if any
pub trait TransformFactory: Send + Sync {
    /// The transform registered for `format`, or `None`
    fn for_format(&self, format: ImageFormat) -> Option<Arc<dyn Transform>>;
}

/// Format-keyed table of transforms
#[derive(Clone, Default)]
pub struct TransformRegistry {
    entries: HashMap<ImageFormat, Arc<dyn Transform>>,
}

impl TransformRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `transform` for `format`, replacing any previous entry.
    pub fn register(&mut self, format: ImageFormat, transform: Arc<dyn Transform>) {
        debug!(format = %format, id = transform.identifier(), "registering transform");
        self.entries.insert(format, transform);
    }
}

impl TransformFactory for TransformRegistry {
    fn for_format(&self, format: ImageFormat) -> Option<Arc<dyn Transform>> {
        self.entries.get(&format).cloned()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<_> = self
            .entries
            .iter()
            .map(|(format, transform)| (format.name(), transform.identifier()))
            .collect();
        f.debug_struct("TransformRegistry")
            .field("entries", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Passthrough;

    impl Transform for Passthrough {
        fn can_handle(&self, format: ImageFormat) -> bool {
            format == ImageFormat::Jpeg
        }

        fn identifier(&self) -> &'static str {
            "Passthrough"
        }

        fn transform(
            &self,
            input: &EncodedPayload,
            output: &mut Vec<u8>,
            _key: Option<&ChaosKey>,
        ) -> Result<TransformStatus> {
            output.extend_from_slice(input.data());
            Ok(TransformStatus::Success)
        }
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = TransformRegistry::new();
        registry.register(ImageFormat::Jpeg, Arc::new(Passthrough));

        let found = registry.for_format(ImageFormat::Jpeg).unwrap();
        assert_eq!(found.identifier(), "Passthrough");
        assert!(registry.for_format(ImageFormat::Png).is_none());
    }

    #[test]
    fn test_registry_replaces_entries() {
        let mut registry = TransformRegistry::new();
        registry.register(ImageFormat::Jpeg, Arc::new(Passthrough));
        registry.register(ImageFormat::Jpeg, Arc::new(Passthrough));

        assert!(registry.for_format(ImageFormat::Jpeg).is_some());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TransformStatus::Success.to_string(), "Status: Success");
        assert_eq!(TransformStatus::Failure.to_string(), "Status: Failure");
    }
}
