use super::{EnqueueOutcome, JobQueue, QueueError, QueueStats};
use crate::config::RetryPolicy;
use crate::types::Job;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::{SystemTime, UNIX_EPOCH};

/// Redis-backed durable priority queue.
///
/// Waiting jobs live in a sorted set keyed by priority (ties broken
/// oldest-first); job payloads are JSON blobs in plain string keys;
/// in-flight bookkeeping (active reservations, stall counts) lives in
/// hashes. Individual operations are not wrapped in a Lua script or
/// MULTI/EXEC transaction — a crash between steps can in the worst case
/// leave a job present in both `active` and `waiting` scoped to one
/// retry window, which the Gate's own in-flight dedup set and the stall
/// recovery sweep both tolerate.
pub struct RedisJobQueue {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisJobQueue {
    pub async fn connect(redis_url: &str, site_id: u32) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            prefix: format!("bms:{site_id}"),
        })
    }

    fn waiting_key(&self) -> String {
        format!("{}:waiting", self.prefix)
    }

    fn job_key(&self, job_id: &str) -> String {
        format!("{}:job:{job_id}", self.prefix)
    }

    fn key_index_key(&self, job_key: &str) -> String {
        format!("{}:keyindex:{job_key}", self.prefix)
    }

    fn active_key(&self) -> String {
        format!("{}:active", self.prefix)
    }

    fn stall_count_key(&self) -> String {
        format!("{}:stall", self.prefix)
    }

    fn completed_key(&self) -> String {
        format!("{}:completed", self.prefix)
    }

    fn failed_key(&self) -> String {
        format!("{}:failed", self.prefix)
    }

    fn score_for(priority: u8, enqueued_at: u64) -> f64 {
        (255 - priority) as f64 * 1e13 + enqueued_at as f64
    }

    async fn store_job(&self, conn: &mut ConnectionManager, job: &Job) -> Result<(), QueueError> {
        let json = serde_json::to_string(job)?;
        conn.set::<_, _, ()>(self.job_key(&job.id), json).await?;
        Ok(())
    }

    async fn load_job(&self, conn: &mut ConnectionManager, job_id: &str) -> Result<Job, QueueError> {
        let raw: String = conn
            .get(self.job_key(job_id))
            .await
            .map_err(QueueError::Redis)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: Job) -> Result<EnqueueOutcome, QueueError> {
        let mut conn = self.conn.clone();
        let index_key = self.key_index_key(job.key.as_str());
        let exists: bool = conn.exists(&index_key).await?;
        if exists {
            return Ok(EnqueueOutcome::duplicate());
        }

        self.store_job(&mut conn, &job).await?;
        conn.set::<_, _, ()>(&index_key, &job.id).await?;
        let score = Self::score_for(job.priority, job.enqueued_at);
        conn.zadd::<_, _, _, ()>(self.waiting_key(), &job.id, score)
            .await?;
        Ok(EnqueueOutcome::enqueued(job.id))
    }

    async fn reserve(&self, _consumer_id: &str) -> Result<Option<Job>, QueueError> {
        let mut conn = self.conn.clone();
        let popped: Vec<(String, f64)> = conn.zpopmin(self.waiting_key(), 1).await?;
        let Some((job_id, _score)) = popped.into_iter().next() else {
            return Ok(None);
        };
        let job = self.load_job(&mut conn, &job_id).await?;
        conn.hset::<_, _, _, ()>(self.active_key(), &job_id, now_millis())
            .await?;
        Ok(Some(job))
    }

    async fn ack(&self, job_id: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let job = self.load_job(&mut conn, job_id).await?;
        conn.hdel::<_, _, ()>(self.active_key(), job_id).await?;
        conn.hdel::<_, _, ()>(self.stall_count_key(), job_id).await?;
        conn.del::<_, ()>(self.key_index_key(job.key.as_str())).await?;
        conn.del::<_, ()>(self.job_key(job_id)).await?;
        conn.lpush::<_, _, ()>(self.completed_key(), job_id).await?;
        conn.ltrim::<_, ()>(
            self.completed_key(),
            0,
            crate::config::COMPLETED_RETENTION as isize - 1,
        )
        .await?;
        Ok(())
    }

    async fn fail(&self, job_id: &str, err: &str, policy: &RetryPolicy) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let mut job = self.load_job(&mut conn, job_id).await?;
        conn.hdel::<_, _, ()>(self.active_key(), job_id).await?;
        tracing::debug!(job_id, err, attempt = job.attempt, "job failed");

        if job.attempt < policy.max_retries {
            job.attempt += 1;
            self.store_job(&mut conn, &job).await?;
            let backoff = policy.backoff_for_attempt(job.attempt);
            let waiting_key = self.waiting_key();
            let score = Self::score_for(job.priority, job.enqueued_at);
            let mut conn_for_task = self.conn.clone();
            let job_id = job_id.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(backoff).await;
                let _: Result<(), _> = conn_for_task.zadd(waiting_key, job_id, score).await;
            });
            Ok(())
        } else {
            conn.hdel::<_, _, ()>(self.stall_count_key(), job_id).await?;
            conn.del::<_, ()>(self.key_index_key(job.key.as_str())).await?;
            conn.del::<_, ()>(self.job_key(job_id)).await?;
            conn.lpush::<_, _, ()>(self.failed_key(), job_id).await?;
            conn.ltrim::<_, ()>(
                self.failed_key(),
                0,
                crate::config::FAILED_RETENTION as isize - 1,
            )
            .await?;
            Ok(())
        }
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        let mut conn = self.conn.clone();
        let waiting: usize = conn.zcard(self.waiting_key()).await?;
        let active: usize = conn.hlen(self.active_key()).await?;
        let completed: usize = conn.llen(self.completed_key()).await?;
        let failed: usize = conn.llen(self.failed_key()).await?;
        Ok(QueueStats {
            waiting,
            active,
            completed,
            failed,
        })
    }

    async fn recover_stalled(&self, policy: &RetryPolicy) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let active: Vec<(String, u64)> = conn.hgetall(self.active_key()).await?;
        let now = now_millis();
        let mut recovered = 0;

        for (job_id, reserved_at_millis) in active {
            // The job itself carries its kind, so the threshold is looked up
            // per job rather than applying one uniform duration to all kinds.
            let job = self.load_job(&mut conn, &job_id).await?;
            let stall_threshold = crate::config::get().kind_policy(job.kind).max_staleness * 2;
            if now.saturating_sub(reserved_at_millis) < stall_threshold.as_millis() as u64 {
                continue;
            }
            let stall_count: u32 = conn.hincr(self.stall_count_key(), &job_id, 1).await?;
            conn.hdel::<_, _, ()>(self.active_key(), &job_id).await?;

            if stall_count > policy.stall_limit {
                conn.hdel::<_, _, ()>(self.stall_count_key(), &job_id).await?;
                conn.del::<_, ()>(self.key_index_key(job.key.as_str())).await?;
                conn.del::<_, ()>(self.job_key(&job_id)).await?;
                conn.lpush::<_, _, ()>(self.failed_key(), &job_id).await?;
                continue;
            }

            let score = Self::score_for(job.priority, job.enqueued_at);
            conn.zadd::<_, _, _, ()>(self.waiting_key(), &job_id, score)
                .await?;
            recovered += 1;
        }

        Ok(recovered)
    }
}
