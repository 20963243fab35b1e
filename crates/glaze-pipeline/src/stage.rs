//! Crypto transform stages
//!
//! A stage wraps an upstream producer. For each delivered payload it
//! decides whether its transform applies, passes non-candidates through
//! untouched, and funnels candidates into a throttled scheduler so bursts
//! of progressive previews collapse to the latest one. Transforms run on
//! the blocking thread pool; the stage forwards the rewritten payload, or
//! the failure when the payload was final.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task;
use tracing::{debug, error};

use glaze_core::decision::Decision;
use glaze_core::errors::GlazeError;
use glaze_core::format::ImageFormat;
use glaze_core::payload::{Completeness, EncodedPayload};
use glaze_core::transform::{TransformFactory, TransformStatus};

use crate::consumer::{Consumer, Producer};
use crate::context::{ContextCallbacks, RequestContext};
use crate::listener::{DiagnosticsMap, StageListener};
use crate::request::ImageRequest;
use crate::scheduler::{JobFn, SchedulerConfig, ThrottledJobScheduler, QUEUE_TIME_KEY};

/// Diagnostics key for the sniffed input format
pub const IMAGE_FORMAT_KEY: &str = "Image format";
/// Diagnostics key for the input dimensions
pub const ORIGINAL_SIZE_KEY: &str = "Original size";

/// Direction of a crypto stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Scramble payloads on their way out
    Encrypt,
    /// Restore payloads on their way in
    Decrypt,
}

impl Polarity {
    /// Stage name used in listener events and logs
    pub fn stage_name(self) -> &'static str {
        match self {
            Polarity::Encrypt => "EncryptStage",
            Polarity::Decrypt => "DecryptStage",
        }
    }

    fn enabled(self, request: &ImageRequest) -> bool {
        match self {
            Polarity::Encrypt => request.should_encrypt,
            Polarity::Decrypt => request.should_decrypt,
        }
    }

    /// Decrypting nonsense produces nonsense, so a decrypt stage skips
    /// payloads with no key. Encrypting lets the transform itself reject
    /// the missing key as a hard failure.
    fn requires_key(self) -> bool {
        matches!(self, Polarity::Decrypt)
    }

    fn transform_id_key(self) -> &'static str {
        match self {
            Polarity::Encrypt => "Encryptor id",
            Polarity::Decrypt => "Decryptor id",
        }
    }

    fn result_key(self) -> &'static str {
        match self {
            Polarity::Encrypt => "Encrypting result",
            Polarity::Decrypt => "Decrypting result",
        }
    }
}

/// Decides whether a stage should rewrite `payload`.
///
/// Returns `Unset` while the payload format is still unknown, which makes
/// early progressive chunks defer the call to a later delivery. Once the
/// format is known the decision is final for the request.
pub fn should_transform(
    polarity: Polarity,
    request: &ImageRequest,
    payload: &EncodedPayload,
    factory: &dyn TransformFactory,
) -> Decision {
    let format = payload.format();
    if format == ImageFormat::Unknown {
        return Decision::Unset;
    }
    if !polarity.enabled(request) {
        return Decision::No;
    }
    let Some(transform) = factory.for_format(format) else {
        return Decision::No;
    };
    if !transform.can_handle(format) {
        return Decision::No;
    }
    if polarity.requires_key() && request.crypto_key.is_none() {
        return Decision::No;
    }
    Decision::Yes
}

/// A producer that transforms payloads delivered by its upstream
pub struct TransformStage {
    polarity: Polarity,
    factory: Arc<dyn TransformFactory>,
    upstream: Arc<dyn Producer>,
    config: SchedulerConfig,
}

impl TransformStage {
    /// Builds a stage of the given direction over `upstream`.
    pub fn new(
        polarity: Polarity,
        factory: Arc<dyn TransformFactory>,
        upstream: Arc<dyn Producer>,
    ) -> Self {
        Self {
            polarity,
            factory,
            upstream,
            config: SchedulerConfig::default(),
        }
    }

    /// Overrides the scheduler tuning.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl Producer for TransformStage {
    async fn produce(&self, consumer: Arc<dyn Consumer>, context: Arc<RequestContext>) {
        let (shared, scheduler) = StageShared::build(
            self.polarity,
            Arc::clone(&self.factory),
            consumer,
            context.as_ref(),
            self.config,
        );
        context.add_callbacks(Arc::new(StageCallbacks {
            scheduler: scheduler.clone(),
            shared: Arc::clone(&shared),
            context: Arc::downgrade(&context),
        }));
        let stage_consumer = Arc::new(StageConsumer {
            shared,
            scheduler,
            context: Arc::clone(&context),
        });
        self.upstream.produce(stage_consumer, context).await;
    }
}

/// State the consumer, the context callbacks, and the scheduled job all
/// share for one request passing through one stage
struct StageShared {
    polarity: Polarity,
    factory: Arc<dyn TransformFactory>,
    downstream: Arc<dyn Consumer>,
    request: ImageRequest,
    request_id: u64,
    listener: Arc<dyn StageListener>,
    cancelled: AtomicBool,
    terminal: AtomicBool,
}

impl StageShared {
    fn build(
        polarity: Polarity,
        factory: Arc<dyn TransformFactory>,
        downstream: Arc<dyn Consumer>,
        context: &RequestContext,
        config: SchedulerConfig,
    ) -> (Arc<Self>, ThrottledJobScheduler) {
        let shared = Arc::new(StageShared {
            polarity,
            factory,
            downstream,
            request: context.request().clone(),
            request_id: context.id(),
            listener: Arc::clone(context.listener()),
            cancelled: AtomicBool::new(false),
            terminal: AtomicBool::new(false),
        });
        // the job keeps the stage alive until a queued run has finished,
        // even after the upstream dropped its consumer
        let job: JobFn = {
            let shared = Arc::clone(&shared);
            Arc::new(move |payload, completeness, queued| {
                let shared = Arc::clone(&shared);
                async move {
                    shared.run_job(payload, completeness, queued).await;
                }
                .boxed()
            })
        };
        let scheduler = ThrottledJobScheduler::new(config, job);
        (shared, scheduler)
    }

    async fn run_job(&self, payload: EncodedPayload, completeness: Completeness, queued: Duration) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let stage = self.polarity.stage_name();
        self.listener.on_stage_start(self.request_id, stage);

        let input_format = payload.format();
        let input_dimensions = payload.dimensions();
        let Some(transform) = self.factory.for_format(input_format) else {
            let error = GlazeError::transform_unavailable(format!(
                "no transform registered for {input_format}"
            ));
            self.fail_job(error, completeness).await;
            return;
        };

        let worker = {
            let transform = Arc::clone(&transform);
            let payload = payload.clone();
            let key = self.request.crypto_key.clone();
            task::spawn_blocking(move || {
                let mut output = Vec::new();
                let status = transform.transform(&payload, &mut output, key.as_ref());
                (status, output)
            })
        };
        let (status, output) = match worker.await {
            Ok((Ok(status), output)) => (status, output),
            Ok((Err(error), _)) => {
                self.fail_job(error, completeness).await;
                return;
            }
            Err(join_error) => {
                error!(request_id = self.request_id, %join_error, "transform worker died");
                let error =
                    GlazeError::transform_failed(format!("transform worker died: {join_error}"));
                self.fail_job(error, completeness).await;
                return;
            }
        };
        if status == TransformStatus::Failure {
            self.fail_job(
                GlazeError::transform_failed("transform could not rewrite the payload"),
                completeness,
            )
            .await;
            return;
        }

        let mut transformed = EncodedPayload::new(output);
        transformed.set_format(ImageFormat::Jpeg);
        transformed.parse_dimensions();

        let diagnostics = if self.listener.requires_diagnostics(self.request_id, stage) {
            Some(self.diagnostics(
                input_format,
                input_dimensions,
                transform.identifier(),
                status,
                queued,
            ))
        } else {
            None
        };
        self.listener.on_stage_success(self.request_id, stage, diagnostics);
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        self.forward_result(Some(transformed), completeness).await;
    }

    /// Reports the failure to the listener and surfaces it downstream only
    /// for final payloads. A later payload supersedes a failed
    /// intermediate, so surfacing those would fail requests that still
    /// have every chance to finish.
    async fn fail_job(&self, error: GlazeError, completeness: Completeness) {
        let stage = self.polarity.stage_name();
        self.listener
            .on_stage_failure(self.request_id, stage, &error, None);
        if completeness.is_final() && !self.cancelled.load(Ordering::SeqCst) {
            self.forward_failure(error).await;
        } else {
            debug!(
                request_id = self.request_id,
                stage,
                %error,
                "intermediate transform failure dropped"
            );
        }
    }

    fn diagnostics(
        &self,
        format: ImageFormat,
        dimensions: Option<(u32, u32)>,
        transform_id: &str,
        status: TransformStatus,
        queued: Duration,
    ) -> DiagnosticsMap {
        let mut map = DiagnosticsMap::new();
        map.insert(IMAGE_FORMAT_KEY, format.name().to_string());
        let size = match dimensions {
            Some((width, height)) => format!("{width}x{height}"),
            None => "unknown".to_string(),
        };
        map.insert(ORIGINAL_SIZE_KEY, size);
        map.insert(QUEUE_TIME_KEY, queued.as_millis().to_string());
        map.insert(self.polarity.transform_id_key(), transform_id.to_string());
        map.insert(self.polarity.result_key(), status.to_string());
        map
    }

    async fn forward_result(&self, payload: Option<EncodedPayload>, completeness: Completeness) {
        if completeness.is_final() {
            if self.terminal.swap(true, Ordering::SeqCst) {
                return;
            }
        } else if self.terminal.load(Ordering::SeqCst) {
            return;
        }
        self.downstream.on_result(payload, completeness).await;
    }

    async fn forward_failure(&self, error: GlazeError) {
        if self.terminal.swap(true, Ordering::SeqCst) {
            return;
        }
        self.downstream.on_failure(error).await;
    }

    async fn forward_cancellation(&self) {
        if self.terminal.swap(true, Ordering::SeqCst) {
            return;
        }
        self.downstream.on_cancellation().await;
    }
}

/// Consumer the stage hands to its upstream
struct StageConsumer {
    shared: Arc<StageShared>,
    scheduler: ThrottledJobScheduler,
    context: Arc<RequestContext>,
}

#[async_trait]
impl Consumer for StageConsumer {
    async fn on_result(&self, payload: Option<EncodedPayload>, completeness: Completeness) {
        if self.shared.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let Some(payload) = payload else {
            if completeness.is_final() {
                self.shared.forward_result(None, completeness).await;
            }
            return;
        };
        let decision = should_transform(
            self.shared.polarity,
            &self.shared.request,
            &payload,
            self.shared.factory.as_ref(),
        );
        if !completeness.is_final() && !decision.is_set() {
            return;
        }
        if decision != Decision::Yes {
            self.shared.forward_result(Some(payload), completeness).await;
            return;
        }
        if !self.scheduler.update(payload, completeness) {
            return;
        }
        if completeness.is_final() || self.context.is_intermediate_result_expected() {
            self.scheduler.schedule();
        }
    }

    async fn on_failure(&self, error: GlazeError) {
        self.shared.forward_failure(error).await;
    }

    async fn on_cancellation(&self) {
        self.scheduler.clear();
        self.shared.forward_cancellation().await;
    }
}

/// Context hooks the stage registers for cancellation and expectation
/// changes
struct StageCallbacks {
    scheduler: ThrottledJobScheduler,
    shared: Arc<StageShared>,
    context: Weak<RequestContext>,
}

impl ContextCallbacks for StageCallbacks {
    fn on_cancellation_requested(&self) {
        self.scheduler.clear();
        self.shared.cancelled.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        task::spawn(async move {
            shared.forward_cancellation().await;
        });
    }

    fn on_is_intermediate_result_expected_changed(&self) {
        let Some(context) = self.context.upgrade() else {
            return;
        };
        if context.is_intermediate_result_expected() {
            self.scheduler.schedule();
        }
    }
}
