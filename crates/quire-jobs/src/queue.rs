//! Bounded in-process index queue.
//!
//! Producers hold an [`IndexPublisher`]; the single consumer is the
//! [`IndexWorker`](crate::IndexWorker), which owns the [`IndexReceiver`].
//! Messages carry the serialized job payload so the consumer parses it the
//! same way it would parse a message from an external broker.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

use quire_core::{Error, IndexJob, JobPublisher, Result};

/// One delivery of a queued message.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stable across redeliveries of the same message.
    pub job_id: Uuid,
    pub payload: Vec<u8>,
    /// 1 on first delivery.
    pub attempt: u32,
}

impl Delivery {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            job_id: Uuid::now_v7(),
            payload,
            attempt: 1,
        }
    }

    /// The same message, delivered once more.
    pub fn redelivered(self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self
        }
    }
}

/// Constructor for the queue halves.
pub struct IndexQueue;

impl IndexQueue {
    /// Create a queue holding at most `capacity` undelivered messages.
    pub fn bounded(capacity: usize) -> (IndexPublisher, IndexReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (IndexPublisher { tx }, IndexReceiver { rx })
    }
}

/// Producer half. Cheap to clone.
#[derive(Clone)]
pub struct IndexPublisher {
    tx: mpsc::Sender<Delivery>,
}

impl IndexPublisher {
    /// Enqueue a job, waiting for capacity. Returns the message id.
    pub async fn enqueue(&self, job: IndexJob) -> Result<Uuid> {
        let delivery = Delivery::new(job.to_payload()?);
        let job_id = delivery.job_id;
        self.tx
            .send(delivery)
            .await
            .map_err(|_| Error::Job("index queue is closed".to_string()))?;
        debug!(subsystem = "jobs", component = "queue", job_id = %job_id, note_id = %job.note_id, "Index job queued");
        Ok(job_id)
    }

    /// Enqueue a job without waiting; fails when the queue is full.
    pub fn try_publish(&self, job: IndexJob) -> Result<Uuid> {
        let delivery = Delivery::new(job.to_payload()?);
        let job_id = delivery.job_id;
        self.tx.try_send(delivery).map_err(|e| match e {
            TrySendError::Full(_) => Error::Job("index queue is full".to_string()),
            TrySendError::Closed(_) => Error::Job("index queue is closed".to_string()),
        })?;
        Ok(job_id)
    }

    /// Enqueue a raw payload as-is.
    pub async fn publish_raw(&self, payload: Vec<u8>) -> Result<Uuid> {
        let delivery = Delivery::new(payload);
        let job_id = delivery.job_id;
        self.tx
            .send(delivery)
            .await
            .map_err(|_| Error::Job("index queue is closed".to_string()))?;
        Ok(job_id)
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }
}

#[async_trait]
impl JobPublisher for IndexPublisher {
    async fn publish(&self, job: IndexJob) -> Result<()> {
        self.enqueue(job).await.map(|_| ())
    }
}

/// Consumer half.
pub struct IndexReceiver {
    rx: mpsc::Receiver<Delivery>,
}

impl IndexReceiver {
    /// Next message; `None` once closed and drained, or when every publisher is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    /// Stop accepting new messages. Already queued ones can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
