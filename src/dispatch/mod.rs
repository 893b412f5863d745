//! Asynchronous event delivery.
//!
//! # Data Flow
//! ```text
//! events API / system events
//!     → enqueue (bounded queue, drop + count when full)
//!     → worker pool (shared receiver)
//!     → RoutingTable::subscribers(space, path, event type)
//!     → Invoker per subscribed function, concurrently
//!     → retries with exponential backoff
//!     → gateway.function.* system events
//! ```
//!
//! # Design Decisions
//! - Enqueue never blocks the request path
//! - Deliveries of system events do not emit further failure events
//! - Draining stops the wait for new work but empties the queue first

pub mod invoker;

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::DispatchConfig;
use crate::event::{system, Event};
use crate::function::FunctionId;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

pub use invoker::Invoker;

/// Path async system events are published on.
pub const SYSTEM_EVENT_PATH: &str = "/";

/// One event waiting for delivery to its async subscribers.
#[derive(Debug, Clone)]
pub struct Job {
    pub space: String,
    pub path: String,
    pub event: Event,
}

pub struct Dispatcher {
    tx: mpsc::Sender<Job>,
    rx: Mutex<mpsc::Receiver<Job>>,
    invoker: Arc<Invoker>,
    retries: RetryPolicy,
    drain_tx: watch::Sender<bool>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Create the dispatcher and spawn its workers.
    pub fn start(invoker: Arc<Invoker>, config: &DispatchConfig, retries: RetryPolicy) -> Arc<Self> {
        let dispatcher = Arc::new(Self::new(invoker, config, retries));

        let handles: Vec<_> = (0..config.workers.max(1))
            .map(|id| {
                let worker = dispatcher.clone();
                tokio::spawn(async move { worker.run_worker(id).await })
            })
            .collect();
        dispatcher.handles().extend(handles);

        tracing::info!(
            workers = config.workers,
            queue_capacity = config.capacity(),
            "Dispatcher started"
        );
        dispatcher
    }

    fn new(invoker: Arc<Invoker>, config: &DispatchConfig, retries: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::channel(config.capacity());
        let (drain_tx, _) = watch::channel(false);

        Self {
            tx,
            rx: Mutex::new(rx),
            invoker,
            retries,
            drain_tx,
            workers: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn invoker(&self) -> &Arc<Invoker> {
        &self.invoker
    }

    /// Queue an event for its async subscribers. Returns false if it was dropped.
    pub fn enqueue(&self, space: &str, path: &str, event: Event) -> bool {
        let job = Job {
            space: space.to_string(),
            path: path.to_string(),
            event,
        };
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                metrics::record_event_dropped();
                tracing::warn!(
                    space = %job.space,
                    event_type = %job.event.event_type,
                    event_id = %job.event.event_id,
                    "Work queue full, event dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(event_id = %job.event.event_id, "Dispatcher stopped, event dropped");
                false
            }
        }
    }

    /// Publish a gateway system event in a space.
    pub fn publish_system(&self, space: &str, event: Event) {
        self.enqueue(space, SYSTEM_EVENT_PATH, event);
    }

    pub fn is_draining(&self) -> bool {
        *self.drain_tx.borrow()
    }

    /// Start draining: the events API answers 503 and workers exit once the queue is empty.
    pub fn close_intake(&self) {
        self.drain_tx.send_replace(true);
    }

    /// Stop the workers once the queue is empty and wait for in-flight deliveries.
    pub async fn drain(&self, timeout: Duration) {
        self.close_intake();
        let handles: Vec<_> = self.handles().drain(..).collect();
        if handles.is_empty() {
            return;
        }

        tracing::info!(workers = handles.len(), "Draining dispatcher");
        if tokio::time::timeout(timeout, join_all(handles)).await.is_err() {
            tracing::warn!(timeout = ?timeout, "Dispatcher drain timed out");
        } else {
            tracing::info!("Dispatcher drained");
        }
    }

    fn handles(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run_worker(&self, id: usize) {
        let mut drain_rx = self.drain_tx.subscribe();
        while let Some(job) = self.next_job(&mut drain_rx).await {
            self.deliver(job).await;
        }
        tracing::debug!(worker = id, "Worker stopped");
    }

    async fn next_job(&self, drain_rx: &mut watch::Receiver<bool>) -> Option<Job> {
        let mut rx = self.rx.lock().await;
        if *drain_rx.borrow() {
            return rx.try_recv().ok();
        }
        tokio::select! {
            biased;
            job = rx.recv() => job,
            _ = drain_rx.changed() => rx.try_recv().ok(),
        }
    }

    async fn deliver(&self, job: Job) {
        let routes = self.invoker.catalog().routes();
        let targets = routes
            .subscribers(&job.space, &job.path, &job.event.event_type)
            .to_vec();
        if targets.is_empty() {
            tracing::trace!(
                space = %job.space,
                path = %job.path,
                event_type = %job.event.event_type,
                "No subscribers"
            );
            return;
        }

        join_all(targets.iter().map(|function_id| self.deliver_to(&job, function_id))).await;
    }

    async fn deliver_to(&self, job: &Job, function_id: &FunctionId) {
        let announce = !job.event.is_system();
        if announce {
            self.publish_system(&job.space, system::function_invoking(&job.space, function_id, &job.event));
        }

        let mut attempt = 1;
        loop {
            let error = match self.invoker.invoke(&job.space, function_id, &job.event).await {
                Ok(body) => {
                    if announce {
                        self.publish_system(
                            &job.space,
                            system::function_invoked(&job.space, function_id, &job.event, &body),
                        );
                    }
                    return;
                }
                Err(e) => e,
            };

            match self.retries.next_delay(attempt, &error) {
                Some(delay) => {
                    tracing::info!(
                        function_id = %function_id,
                        event_id = %job.event.event_id,
                        attempt,
                        delay = ?delay,
                        error = %error,
                        "Retrying delivery"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    tracing::error!(
                        space = %job.space,
                        function_id = %function_id,
                        event_type = %job.event.event_type,
                        event_id = %job.event.event_id,
                        attempts = attempt,
                        error = %error,
                        "Delivery failed"
                    );
                    if announce {
                        self.publish_system(
                            &job.space,
                            system::function_invocation_failed(&job.space, function_id, &job.event, &error.to_string()),
                        );
                    }
                    return;
                }
            }
        }
    }
}
