//! Single-consumer worker draining the index queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use quire_core::{defaults, Error, Result};

use crate::handler::{JobContext, JobHandler, JobResult};
use crate::queue::{Delivery, IndexReceiver};

/// Configuration for the index worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Deliveries per message before it is dropped, including the first.
    pub max_deliveries: u32,
    /// Pause before a nacked message is delivered again.
    pub redelivery_delay: Duration,
    /// Upper bound on one job; a timed-out job is nacked.
    pub job_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_deliveries: defaults::INDEX_MAX_DELIVERIES,
            redelivery_delay: Duration::from_millis(defaults::INDEX_REDELIVERY_DELAY_MS),
            job_timeout: Duration::from_secs(defaults::INDEX_JOB_TIMEOUT_SECS),
        }
    }
}

impl WorkerConfig {
    pub fn with_max_deliveries(mut self, max: u32) -> Self {
        self.max_deliveries = max.max(1);
        self
    }

    pub fn with_redelivery_delay(mut self, delay: Duration) -> Self {
        self.redelivery_delay = delay;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }
}

/// Event emitted by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A delivery was handed to the handler.
    JobStarted { job_id: Uuid, attempt: u32 },
    /// The handler succeeded; the message is done.
    JobAcked { job_id: Uuid },
    /// The handler failed.
    JobNacked {
        job_id: Uuid,
        attempt: u32,
        error: String,
        /// Whether the message will be delivered again.
        redelivered: bool,
    },
    /// The worker drained its queue and exited.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop accepting new jobs, finish every queued one, then wait for exit.
    pub async fn shutdown(self) -> Result<()> {
        // A closed channel means the worker already stopped on its own.
        let _ = self.shutdown_tx.send(()).await;
        self.join
            .await
            .map_err(|e| Error::Internal(format!("Index worker task failed: {}", e)))
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that runs every queued delivery through one handler, one at a time.
pub struct IndexWorker {
    receiver: IndexReceiver,
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl IndexWorker {
    pub fn new(receiver: IndexReceiver, handler: Arc<dyn JobHandler>, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::WORKER_EVENT_CAPACITY);
        Self {
            receiver,
            handler,
            config,
            event_tx,
        }
    }

    /// Spawn the worker loop and return a handle for control.
    ///
    /// Dropping the handle also shuts the worker down.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();
        let join = tokio::spawn(self.run(shutdown_rx));
        WorkerHandle {
            shutdown_tx,
            event_rx,
            join,
        }
    }

    async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            subsystem = "jobs",
            component = "worker",
            handler = self.handler.name(),
            max_deliveries = self.config.max_deliveries,
            "Index worker started"
        );

        let mut redeliveries: VecDeque<Delivery> = VecDeque::new();
        let mut draining = false;

        loop {
            let delivery = match redeliveries.pop_front() {
                Some(delivery) => {
                    tokio::time::sleep(self.config.redelivery_delay).await;
                    delivery
                }
                None => {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.recv(), if !draining => {
                            info!(subsystem = "jobs", component = "worker", "Index worker draining queue");
                            draining = true;
                            self.receiver.close();
                            continue;
                        }
                        next = self.receiver.recv() => match next {
                            Some(delivery) => delivery,
                            None => break,
                        }
                    }
                }
            };

            if let Some(retry) = self.process(delivery).await {
                redeliveries.push_back(retry);
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!(subsystem = "jobs", component = "worker", "Index worker stopped");
    }

    /// Run one delivery. Returns the message again when it should be redelivered.
    async fn process(&self, delivery: Delivery) -> Option<Delivery> {
        let start = Instant::now();
        let job_id = delivery.job_id;
        let attempt = delivery.attempt;
        let _ = self.event_tx.send(WorkerEvent::JobStarted { job_id, attempt });
        debug!(subsystem = "jobs", component = "worker", job_id = %job_id, attempt, "Processing job");

        let ctx = JobContext::from(&delivery);
        let result = match tokio::time::timeout(self.config.job_timeout, self.handler.execute(&ctx)).await {
            Ok(result) => result,
            Err(_) => JobResult::Nack(Error::Job(format!(
                "Job exceeded timeout of {}s",
                self.config.job_timeout.as_secs()
            ))),
        };

        match result {
            JobResult::Ack => {
                info!(
                    subsystem = "jobs",
                    component = "worker",
                    job_id = %job_id,
                    attempt,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job acknowledged"
                );
                let _ = self.event_tx.send(WorkerEvent::JobAcked { job_id });
                None
            }
            JobResult::Nack(err) => {
                let redeliver = !err.is_permanent() && attempt < self.config.max_deliveries;
                if redeliver {
                    warn!(
                        subsystem = "jobs",
                        component = "worker",
                        job_id = %job_id,
                        attempt,
                        error = %err,
                        "Job failed, will be redelivered"
                    );
                } else {
                    error!(
                        subsystem = "jobs",
                        component = "worker",
                        job_id = %job_id,
                        attempt,
                        error = %err,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job failed permanently"
                    );
                }
                let _ = self.event_tx.send(WorkerEvent::JobNacked {
                    job_id,
                    attempt,
                    error: err.to_string(),
                    redelivered: redeliver,
                });
                redeliver.then(|| delivery.redelivered())
            }
        }
    }
}
