//! Queue — priority-ordered, durable, deduplicated work distribution.
//!
//! `RedisJobQueue` backs the waiting set with a Redis sorted set (score
//! encodes priority then FIFO order) and job payloads in a hash, built to
//! survive Redis hiccups. `InMemoryJobQueue` mirrors the same test-fake
//! pattern used elsewhere in this crate.

mod in_memory;
mod redis_queue;

pub use in_memory::InMemoryJobQueue;
pub use redis_queue::RedisJobQueue;

use crate::config::RetryPolicy;
use crate::types::Job;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("job {0} not found")]
    JobNotFound(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueOutcome {
    pub job_id: Option<String>,
    pub duplicate: bool,
}

impl EnqueueOutcome {
    pub fn enqueued(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            duplicate: false,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            job_id: None,
            duplicate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job. A second enqueue with the same `jobKey` while one is
    /// waiting or active returns `{duplicate: true}` and does not spawn a
    /// second job.
    async fn enqueue(&self, job: Job) -> Result<EnqueueOutcome, QueueError>;

    /// Reserve the next-highest-priority waiting job, if any.
    async fn reserve(&self, consumer_id: &str) -> Result<Option<Job>, QueueError>;

    async fn ack(&self, job_id: &str) -> Result<(), QueueError>;

    /// Fail a job. Retries up to the policy's `max_retries` with
    /// exponential backoff from `backoff_base`; beyond that the job moves
    /// to the failed set.
    async fn fail(&self, job_id: &str, err: &str, policy: &RetryPolicy) -> Result<(), QueueError>;

    async fn stats(&self) -> Result<QueueStats, QueueError>;

    /// Return jobs reserved longer than their own kind's stall threshold
    /// (`config::get().kind_policy(job.kind).max_staleness * 2`) to the
    /// waiting set, up to `policy.stall_limit` times per job; beyond that
    /// they move to the failed set. Each active job is checked against its
    /// own kind's threshold, not one uniform duration.
    async fn recover_stalled(&self, policy: &RetryPolicy) -> Result<usize, QueueError>;
}
