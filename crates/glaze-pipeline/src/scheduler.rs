//! Throttled, coalescing job scheduling
//!
//! Progressive sources can deliver payloads far faster than a transform
//! can chew through them. The scheduler keeps exactly one pending payload,
//! replacing it as newer ones arrive, and runs the job with at least a
//! minimum interval between starts. A job never runs concurrently with
//! itself: an update landing mid-run marks the run as pending and the
//! follow-up is queued when the current one finishes.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use glaze_core::payload::{Completeness, EncodedPayload};

/// Diagnostics key under which stages report time spent queued
pub const QUEUE_TIME_KEY: &str = "queueTime";

/// The work a scheduler runs: one payload at its recorded completeness,
/// plus the time it spent waiting in the queue
pub type JobFn =
    Arc<dyn Fn(EncodedPayload, Completeness, Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Scheduler tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Minimum time between two job starts
    pub min_job_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_job_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    /// Nothing queued, nothing running
    Idle,
    /// A run is waiting for its start time
    Queued,
    /// The job is executing
    Running,
    /// The job is executing and a newer payload already wants a run
    RunningAndPending,
}

struct JobSlot {
    payload: Option<EncodedPayload>,
    completeness: Completeness,
    state: JobState,
    terminated: bool,
    enqueued_at: Option<Instant>,
    last_started_at: Option<Instant>,
    queued_time: Duration,
}

struct SchedulerInner {
    job: JobFn,
    min_interval: Duration,
    slot: Mutex<JobSlot>,
}

/// Runs one job over the latest payload, never concurrently and never
/// more often than the configured interval
///
/// Cloning shares the scheduler; all clones feed the same job slot.
#[derive(Clone)]
pub struct ThrottledJobScheduler {
    inner: Arc<SchedulerInner>,
}

impl ThrottledJobScheduler {
    /// Creates a scheduler that will run `job` per [`SchedulerConfig`].
    pub fn new(config: SchedulerConfig, job: JobFn) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                job,
                min_interval: config.min_job_interval,
                slot: Mutex::new(JobSlot {
                    payload: None,
                    completeness: Completeness::Intermediate,
                    state: JobState::Idle,
                    terminated: false,
                    enqueued_at: None,
                    last_started_at: None,
                    queued_time: Duration::ZERO,
                }),
            }),
        }
    }

    /// Replaces the pending payload with a newer one.
    ///
    /// Returns false once the scheduler has been cleared; the payload is
    /// dropped in that case.
    pub fn update(&self, payload: EncodedPayload, completeness: Completeness) -> bool {
        let mut slot = self.inner.slot.lock();
        if slot.terminated {
            return false;
        }
        slot.payload = Some(payload);
        slot.completeness = completeness;
        true
    }

    /// Asks for a run of the pending payload.
    ///
    /// A no-op when nothing is pending, when a run is already queued, or
    /// after [`ThrottledJobScheduler::clear`].
    pub fn schedule(&self) {
        SchedulerInner::schedule(&self.inner);
    }

    /// Drops any pending payload and stops all future runs.
    pub fn clear(&self) {
        let mut slot = self.inner.slot.lock();
        slot.terminated = true;
        slot.payload = None;
        slot.state = JobState::Idle;
        slot.enqueued_at = None;
        debug!("job scheduler cleared");
    }

    /// Time the most recently started run spent waiting in the queue
    pub fn queued_time(&self) -> Duration {
        self.inner.slot.lock().queued_time
    }
}

impl SchedulerInner {
    fn schedule(inner: &Arc<Self>) {
        let start_at = {
            let mut slot = inner.slot.lock();
            if slot.terminated || slot.payload.is_none() {
                return;
            }
            match slot.state {
                JobState::Idle => {
                    let now = Instant::now();
                    slot.state = JobState::Queued;
                    slot.enqueued_at = Some(now);
                    match slot.last_started_at.map(|at| at + inner.min_interval) {
                        Some(earliest) if earliest > now => earliest,
                        _ => now,
                    }
                }
                JobState::Running => {
                    slot.state = JobState::RunningAndPending;
                    return;
                }
                JobState::Queued | JobState::RunningAndPending => return,
            }
        };
        trace!(?start_at, "job queued");
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            sleep_until(start_at).await;
            SchedulerInner::run_queued(&inner).await;
        });
    }

    async fn run_queued(inner: &Arc<Self>) {
        let (payload, completeness, queued) = {
            let mut slot = inner.slot.lock();
            if slot.terminated || slot.state != JobState::Queued {
                return;
            }
            let Some(payload) = slot.payload.take() else {
                slot.state = JobState::Idle;
                return;
            };
            let now = Instant::now();
            slot.queued_time = slot
                .enqueued_at
                .map(|at| now.duration_since(at))
                .unwrap_or_default();
            slot.enqueued_at = None;
            slot.last_started_at = Some(now);
            slot.state = JobState::Running;
            (payload, slot.completeness, slot.queued_time)
        };
        (inner.job)(payload, completeness, queued).await;
        Self::finish(inner);
    }

    fn finish(inner: &Arc<Self>) {
        let reschedule = {
            let mut slot = inner.slot.lock();
            let again = slot.state == JobState::RunningAndPending && !slot.terminated;
            slot.state = JobState::Idle;
            again
        };
        if reschedule {
            Self::schedule(inner);
        }
    }
}
