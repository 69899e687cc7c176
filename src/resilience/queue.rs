//! In-memory request queue with a concurrency cap and rate-limit retries.
//!
//! # Lifecycle of a job
//! ```text
//! enqueue ─▶ pending (FIFO) ─▶ dequeue ─┬─ older than timeout ─▶ reject(Timeout)
//!                 ▲                     └─ run ─┬─ Ok ─▶ resolve
//!                 │                             ├─ rate-limited, retries left
//!                 └── push_front ◀── backoff ◀──┘
//!                                               └─ other error ─▶ reject(Upstream)
//! ```
//!
//! The queue is process-local: no persistence, no priority, no cancellation.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::{QueueConfig, QueuesConfig};
use crate::observability::metrics;
use crate::providers::UpstreamError;
use crate::resilience::backoff::Backoff;

type JobOutput = Box<dyn Any + Send>;
type Job = Box<dyn FnMut() -> BoxFuture<'static, Result<JobOutput, UpstreamError>> + Send>;
type Responder = oneshot::Sender<Result<JobOutput, QueueError>>;

/// Why a queued request did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("request waited {waited_ms}ms in the {queue} queue and timed out")]
    Timeout { queue: &'static str, waited_ms: u64 },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("{queue} queue dropped the request")]
    Dropped { queue: &'static str },
}

/// A job waiting for, or holding, a concurrency slot.
struct QueuedRequest {
    id: Uuid,
    execute: Job,
    responder: Responder,
    enqueued_at: Instant,
    retries: u32,
    last_delay: Duration,
}

/// Counters exposed through the admin API.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub running: usize,
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
    pub timed_out: u64,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedRequest>,
    stats: QueueStats,
}

/// FIFO queue that runs at most `concurrent_limit` jobs at a time.
pub struct RequestQueue {
    name: &'static str,
    config: QueueConfig,
    backoff: Backoff,
    state: Mutex<QueueState>,
}

impl RequestQueue {
    pub fn new(name: &'static str, config: QueueConfig) -> Arc<Self> {
        Arc::new(Self {
            name,
            backoff: Backoff::from_config(&config),
            config,
            state: Mutex::new(QueueState::default()),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn stats(&self) -> QueueStats {
        self.lock().stats.clone()
    }

    /// Queue `f` and wait for its result.
    ///
    /// `f` may be invoked more than once: every retry calls it again to build
    /// a fresh request future.
    pub async fn enqueue<F, Fut, T>(self: &Arc<Self>, mut f: F) -> Result<T, QueueError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, UpstreamError>> + Send + 'static,
        T: Send + 'static,
    {
        let (responder, rx) = oneshot::channel();
        let execute: Job = Box::new(move || {
            f().map(|result| result.map(|value| Box::new(value) as JobOutput))
                .boxed()
        });

        let id = Uuid::new_v4();
        {
            let mut state = self.lock();
            state.pending.push_back(QueuedRequest {
                id,
                execute,
                responder,
                enqueued_at: Instant::now(),
                retries: 0,
                last_delay: Duration::ZERO,
            });
            state.stats.pending = state.pending.len();
            tracing::debug!(queue = self.name, request_id = %id, pending = state.pending.len(), "Request queued");
        }
        self.pump();

        let dropped = QueueError::Dropped { queue: self.name };
        let output = rx.await.map_err(|_| QueueError::Dropped { queue: self.name })??;
        output.downcast::<T>().map(|value| *value).map_err(|_| dropped)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().expect("request queue mutex poisoned")
    }

    /// Start as many pending jobs as free slots allow.
    fn pump(self: &Arc<Self>) {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let mut state = self.lock();

        while state.stats.running < self.config.concurrent_limit {
            let Some(job) = state.pending.pop_front() else {
                break;
            };

            let waited = job.enqueued_at.elapsed();
            if waited > timeout {
                state.stats.timed_out += 1;
                metrics::record_queue_timeout(self.name);
                tracing::warn!(
                    queue = self.name,
                    request_id = %job.id,
                    waited_ms = waited.as_millis() as u64,
                    "Queued request timed out before it could run"
                );
                let _ = job.responder.send(Err(QueueError::Timeout {
                    queue: self.name,
                    waited_ms: waited.as_millis() as u64,
                }));
                continue;
            }

            state.stats.running += 1;
            let queue = Arc::clone(self);
            tokio::spawn(async move { queue.run(job).await });
        }

        state.stats.pending = state.pending.len();
        metrics::record_queue_depth(self.name, state.stats.pending, state.stats.running);
    }

    async fn run(self: Arc<Self>, mut job: QueuedRequest) {
        let slot = Slot {
            queue: Arc::clone(&self),
        };
        let result = (job.execute)().await;

        match result {
            Ok(value) => {
                self.lock().stats.completed += 1;
                drop(slot);
                let _ = job.responder.send(Ok(value));
            }
            Err(err) if err.is_rate_limited() && job.retries < self.config.max_retries => {
                job.retries += 1;
                let delay = self.backoff.next_delay(job.retries, job.last_delay);
                job.last_delay = delay;
                self.lock().stats.retried += 1;
                metrics::record_queue_retry(self.name);
                tracing::warn!(
                    queue = self.name,
                    request_id = %job.id,
                    attempt = job.retries,
                    max_retries = self.config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Rate limited upstream, retrying"
                );

                // Slot is released for the duration of the backoff.
                drop(slot);
                tokio::time::sleep(delay).await;

                self.lock().pending.push_front(job);
                self.pump();
            }
            Err(err) => {
                self.lock().stats.failed += 1;
                drop(slot);
                tracing::error!(
                    queue = self.name,
                    request_id = %job.id,
                    retries = job.retries,
                    error = %err,
                    "Queued request failed"
                );
                let _ = job.responder.send(Err(QueueError::Upstream(err)));
            }
        }
    }
}

/// A held concurrency slot. Released on drop, including when a job panics.
struct Slot {
    queue: Arc<RequestQueue>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        {
            let mut state = self.queue.lock();
            state.stats.running = state.stats.running.saturating_sub(1);
        }
        self.queue.pump();
    }
}

/// One queue per upstream provider.
pub struct QueueRegistry {
    pub fal: Arc<RequestQueue>,
    pub openai: Arc<RequestQueue>,
    pub anthropic: Arc<RequestQueue>,
}

impl QueueRegistry {
    pub fn new(config: &QueuesConfig) -> Self {
        Self {
            fal: RequestQueue::new("fal", config.fal.clone()),
            openai: RequestQueue::new("openai", config.openai.clone()),
            anthropic: RequestQueue::new("anthropic", config.anthropic.clone()),
        }
    }

    pub fn all(&self) -> [&Arc<RequestQueue>; 3] {
        [&self.fal, &self.openai, &self.anthropic]
    }
}
