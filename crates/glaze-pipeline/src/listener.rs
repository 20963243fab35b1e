//! Stage lifecycle listeners
//!
//! Listeners observe stage starts and outcomes for logging and
//! instrumentation. Diagnostics maps are assembled only when the listener
//! asks for them, so the common case pays nothing for string formatting.

use std::collections::BTreeMap;

use glaze_core::errors::GlazeError;

/// Ordered key/value details attached to a stage outcome
pub type DiagnosticsMap = BTreeMap<&'static str, String>;

/// Observer for transform stage lifecycle events
///
/// Callbacks are invoked synchronously on the stage's task, so
/// implementations should hand off anything slow.
pub trait StageListener: Send + Sync {
    /// A stage began work on a payload of `request_id`.
    fn on_stage_start(&self, request_id: u64, stage: &str) {
        let _ = (request_id, stage);
    }

    /// A stage finished a payload successfully.
    fn on_stage_success(&self, request_id: u64, stage: &str, diagnostics: Option<DiagnosticsMap>) {
        let _ = (request_id, stage, diagnostics);
    }

    /// A stage failed a payload.
    fn on_stage_failure(
        &self,
        request_id: u64,
        stage: &str,
        error: &GlazeError,
        diagnostics: Option<DiagnosticsMap>,
    ) {
        let _ = (request_id, stage, error, diagnostics);
    }

    /// True when this listener wants a diagnostics map for `stage`
    fn requires_diagnostics(&self, request_id: u64, stage: &str) -> bool {
        let _ = (request_id, stage);
        false
    }
}

/// Listener that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl StageListener for NoopListener {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_listener_requires_no_diagnostics() {
        let listener = NoopListener;
        assert!(!listener.requires_diagnostics(7, "EncryptStage"));
        // default methods accept events without effect
        listener.on_stage_start(7, "EncryptStage");
        listener.on_stage_success(7, "EncryptStage", None);
        listener.on_stage_failure(
            7,
            "EncryptStage",
            &GlazeError::transform_failed("boom"),
            None,
        );
    }
}
