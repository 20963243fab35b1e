//! Producer and consumer contracts
//!
//! Payloads travel producer to producer, each wrapping its downstream
//! consumer. A consumer sees any number of intermediate results, then
//! exactly one terminal event: a final result, a failure, or a
//! cancellation.

use std::sync::Arc;

use async_trait::async_trait;

use glaze_core::errors::GlazeError;
use glaze_core::payload::{Completeness, EncodedPayload};

use crate::context::RequestContext;

/// Receives payloads and terminal events from the producer above it
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Delivers a payload, or `None` when the producer has nothing to
    /// offer for this step.
    async fn on_result(&self, payload: Option<EncodedPayload>, completeness: Completeness);

    /// Delivers the terminal failure of the request.
    async fn on_failure(&self, error: GlazeError);

    /// Confirms the request was cancelled before completing.
    async fn on_cancellation(&self);
}

/// A pipeline step that feeds payloads to a consumer
#[async_trait]
pub trait Producer: Send + Sync {
    /// Starts producing for `context`, delivering into `consumer`.
    async fn produce(&self, consumer: Arc<dyn Consumer>, context: Arc<RequestContext>);
}
