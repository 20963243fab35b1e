//! Unified error type for the Glaze pipeline
//!
//! One enum covers every way a request can fail, mapped to where in the
//! stage lifecycle the failure surfaces.

use serde::{Deserialize, Serialize};

/// Error type for all Glaze operations
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum GlazeError {
    /// A crypto key failed validation at construction or parse time
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Error message describing the invalid key
        message: String,
    },

    /// No transform capability is registered for a format the decision gate
    /// already approved
    #[error("Transform unavailable: {message}")]
    TransformUnavailable {
        /// Error message describing the missing capability
        message: String,
    },

    /// The transform ran and reported an error status
    #[error("Transform failed: {message}")]
    TransformFailed {
        /// Error message describing the transform failure
        message: String,
    },

    /// Failure passed through unmodified from the upstream producer chain
    #[error("Upstream failure: {message}")]
    UpstreamFailure {
        /// Error message describing the upstream failure
        message: String,
    },
}

impl GlazeError {
    /// Create an invalid key error
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Create a transform unavailable error
    pub fn transform_unavailable(message: impl Into<String>) -> Self {
        Self::TransformUnavailable {
            message: message.into(),
        }
    }

    /// Create a transform failed error
    pub fn transform_failed(message: impl Into<String>) -> Self {
        Self::TransformFailed {
            message: message.into(),
        }
    }

    /// Create an upstream failure error
    pub fn upstream_failure(message: impl Into<String>) -> Self {
        Self::UpstreamFailure {
            message: message.into(),
        }
    }
}

/// Standard Result type for Glaze operations
pub type Result<T> = std::result::Result<T, GlazeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = GlazeError::invalid_key("x0 is empty");
        assert!(matches!(err, GlazeError::InvalidKey { .. }));
        assert_eq!(err.to_string(), "Invalid key: x0 is empty");
    }

    #[test]
    fn test_error_display_per_kind() {
        assert_eq!(
            GlazeError::transform_unavailable("no JPEG capability").to_string(),
            "Transform unavailable: no JPEG capability"
        );
        assert_eq!(
            GlazeError::transform_failed("bad framing").to_string(),
            "Transform failed: bad framing"
        );
        assert_eq!(
            GlazeError::upstream_failure("fetch aborted").to_string(),
            "Upstream failure: fetch aborted"
        );
    }

    #[test]
    fn test_error_serde_round_trip() {
        let err = GlazeError::transform_failed("scan truncated");
        let json = serde_json::to_string(&err).unwrap();
        let back: GlazeError = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, GlazeError::TransformFailed { message } if message == "scan truncated"));
    }
}
