use super::{EnqueueOutcome, JobQueue, QueueError, QueueStats};
use crate::config::RetryPolicy;
use crate::types::Job;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

struct ActiveEntry {
    job: Job,
    reserved_at: Instant,
    stall_count: u32,
}

#[derive(Default)]
struct Inner {
    waiting: Vec<Job>,
    active: HashMap<String, ActiveEntry>,
    key_index: HashMap<String, String>,
    completed: VecDeque<String>,
    failed: VecDeque<String>,
}

/// In-process test fake mirroring `RedisJobQueue`'s semantics:
/// same contract as [`super::RedisJobQueue`], no network, deterministic.
#[derive(Clone)]
pub struct InMemoryJobQueue {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn pop_highest_priority(waiting: &mut Vec<Job>) -> Option<Job> {
    let (idx, _) = waiting
        .iter()
        .enumerate()
        .max_by_key(|(_, job)| (job.priority, std::cmp::Reverse(job.enqueued_at)))?;
    Some(waiting.remove(idx))
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: Job) -> Result<EnqueueOutcome, QueueError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.key_index.contains_key(job.key.as_str()) {
            return Ok(EnqueueOutcome::duplicate());
        }
        let job_id = job.id.clone();
        inner.key_index.insert(job.key.as_str().to_string(), job_id.clone());
        inner.waiting.push(job);
        Ok(EnqueueOutcome::enqueued(job_id))
    }

    async fn reserve(&self, _consumer_id: &str) -> Result<Option<Job>, QueueError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(job) = pop_highest_priority(&mut inner.waiting) else {
            return Ok(None);
        };
        inner.active.insert(
            job.id.clone(),
            ActiveEntry {
                job: job.clone(),
                reserved_at: Instant::now(),
                stall_count: 0,
            },
        );
        Ok(Some(job))
    }

    async fn ack(&self, job_id: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner
            .active
            .remove(job_id)
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
        inner.key_index.remove(entry.job.key.as_str());
        inner.completed.push_back(job_id.to_string());
        while inner.completed.len() > crate::config::COMPLETED_RETENTION {
            inner.completed.pop_front();
        }
        Ok(())
    }

    async fn fail(&self, job_id: &str, err: &str, policy: &RetryPolicy) -> Result<(), QueueError> {
        let mut job = {
            let mut inner = self.inner.lock().unwrap();
            let entry = inner
                .active
                .remove(job_id)
                .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
            inner.key_index.remove(entry.job.key.as_str());
            entry.job
        };
        tracing::debug!(job_id, err, attempt = job.attempt, "job failed");

        if job.attempt < policy.max_retries {
            job.attempt += 1;
            let backoff = policy.backoff_for_attempt(job.attempt);
            let inner = Arc::clone(&self.inner);
            let requeued = job.clone();
            tokio::spawn(async move {
                tokio::time::sleep(backoff).await;
                let mut inner = inner.lock().unwrap();
                inner
                    .key_index
                    .insert(requeued.key.as_str().to_string(), requeued.id.clone());
                inner.waiting.push(requeued);
            });
            Ok(())
        } else {
            let mut inner = self.inner.lock().unwrap();
            inner.failed.push_back(job_id.to_string());
            while inner.failed.len() > crate::config::FAILED_RETENTION {
                inner.failed.pop_front();
            }
            Ok(())
        }
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        let inner = self.inner.lock().unwrap();
        Ok(QueueStats {
            waiting: inner.waiting.len(),
            active: inner.active.len(),
            completed: inner.completed.len(),
            failed: inner.failed.len(),
        })
    }

    async fn recover_stalled(&self, policy: &RetryPolicy) -> Result<usize, QueueError> {
        let mut inner = self.inner.lock().unwrap();
        let stalled_ids: Vec<String> = inner
            .active
            .iter()
            .filter(|(_, entry)| {
                let stall_threshold = crate::config::get().kind_policy(entry.job.kind).max_staleness * 2;
                entry.reserved_at.elapsed() > stall_threshold
            })
            .map(|(id, _)| id.clone())
            .collect();

        let mut recovered = 0;
        for id in stalled_ids {
            let Some(mut entry) = inner.active.remove(&id) else {
                continue;
            };
            entry.stall_count += 1;
            if entry.stall_count > policy.stall_limit {
                inner.key_index.remove(entry.job.key.as_str());
                inner.failed.push_back(id);
                continue;
            }
            inner.waiting.push(entry.job);
            recovered += 1;
        }
        Ok(recovered)
    }
}
