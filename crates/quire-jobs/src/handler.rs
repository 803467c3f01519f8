//! Job handler seam between the worker and the work it runs.

use async_trait::async_trait;
use uuid::Uuid;

use quire_core::{Error, IndexJob, Result};

use crate::queue::Delivery;

/// Context provided to job handlers.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: Uuid,
    /// 1 on first delivery.
    pub attempt: u32,
    payload: Vec<u8>,
}

impl JobContext {
    pub fn new(job_id: Uuid, attempt: u32, payload: Vec<u8>) -> Self {
        Self {
            job_id,
            attempt,
            payload,
        }
    }

    /// Raw message payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Parse the payload as an index job. Malformed payloads are `InvalidInput`.
    pub fn index_job(&self) -> Result<IndexJob> {
        IndexJob::from_payload(&self.payload)
    }
}

impl From<&Delivery> for JobContext {
    fn from(delivery: &Delivery) -> Self {
        Self::new(delivery.job_id, delivery.attempt, delivery.payload.clone())
    }
}

/// Result of job execution.
#[derive(Debug)]
pub enum JobResult {
    /// Done; the message is acknowledged and never seen again.
    Ack,
    /// Failed; the worker decides whether the message is delivered again.
    Nack(Error),
}

impl JobResult {
    pub fn is_ack(&self) -> bool {
        matches!(self, JobResult::Ack)
    }
}

impl<T> From<Result<T>> for JobResult {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(_) => JobResult::Ack,
            Err(e) => JobResult::Nack(e),
        }
    }
}

/// Trait for job handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Execute one delivery.
    async fn execute(&self, ctx: &JobContext) -> JobResult;
}
