//! Redis-backed delayed job queue.
//!
//! Per queue: a ZSET of job names scored by run-at time (`<queue>:sched`)
//! and one hash per job (`<queue>:job:<name>`) holding the args and the
//! attempt counter. Leasing atomically claims the first due member and
//! pushes its score forward by the visibility timeout, so a job whose
//! worker dies re-fires instead of vanishing (at-least-once, not
//! exactly-once). Failed jobs are rescheduled by the queue's own policy:
//! linear backoff of 10 s per recorded attempt.

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use pushgate_common::error::AppError;

use crate::{JobOptions, LeasedJob, Queue};

/// Seconds before an unconcluded lease re-fires.
const DEFAULT_VISIBILITY_TIMEOUT: i64 = 300;

/// Seconds of backoff per attempt applied on the Fail path.
const FAIL_BACKOFF_STEP: i64 = 10;

/// Atomically pop the first due member and push it past the visibility
/// deadline. KEYS[1] = sched zset, ARGV[1] = now, ARGV[2] = lease deadline.
const CLAIM_SCRIPT: &str = r#"
local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, 1)
if #due == 0 then
    return false
end
redis.call('ZADD', KEYS[1], ARGV[2], due[1])
return due[1]
"#;

pub struct RedisQueue {
    conn: ConnectionManager,
    visibility_timeout: i64,
    claim: redis::Script,
}

impl RedisQueue {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            claim: redis::Script::new(CLAIM_SCRIPT),
        }
    }

    pub fn with_visibility_timeout(mut self, seconds: i64) -> Self {
        self.visibility_timeout = seconds;
        self
    }

    fn sched_key(queue: &str) -> String {
        format!("{}:sched", queue)
    }

    fn job_key(queue: &str, name: &str) -> String {
        format!("{}:job:{}", queue, name)
    }
}

#[async_trait]
impl Queue for RedisQueue {
    async fn submit_job(
        &self,
        queue: &str,
        name: &str,
        opts: JobOptions,
    ) -> Result<(), AppError> {
        let now = Utc::now().timestamp();
        let run_at = match opts.sched_at {
            Some(at) if at > now => at,
            _ => now,
        };

        let mut conn = self.conn.clone();
        let job_key = Self::job_key(queue, name);
        let _: () = conn.hset(&job_key, "args", &opts.args).await?;
        // counter survives resubmission of a still-pending job
        let _: () = conn.hset_nx(&job_key, "counter", 0).await?;
        let _: () = conn.zadd(Self::sched_key(queue), name, run_at).await?;

        Ok(())
    }

    async fn remove_job(&self, queue: &str, name: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = conn.zrem(Self::sched_key(queue), name).await?;
        let _: () = conn.del(Self::job_key(queue, name)).await?;
        Ok(())
    }

    async fn lease(&self, queues: &[String]) -> Result<Option<LeasedJob>, AppError> {
        let now = Utc::now().timestamp();
        let mut conn = self.conn.clone();

        for queue in queues {
            let name: Option<String> = self
                .claim
                .key(Self::sched_key(queue))
                .arg(now)
                .arg(now + self.visibility_timeout)
                .invoke_async(&mut conn)
                .await?;
            let Some(name) = name else { continue };

            let job_key = Self::job_key(queue, &name);
            let args: Option<String> = conn.hget(&job_key, "args").await?;
            let Some(args) = args else {
                // hash vanished under a concurrent remove; drop the orphan
                tracing::debug!(queue = %queue, job = %name, "dropping orphaned job entry");
                let _: () = conn.zrem(Self::sched_key(queue), &name).await?;
                continue;
            };
            let counter: u32 = conn.hget(&job_key, "counter").await?;

            return Ok(Some(LeasedJob {
                queue_name: queue.clone(),
                name,
                args,
                counter,
            }));
        }

        Ok(None)
    }

    async fn done(&self, job: &LeasedJob) -> Result<(), AppError> {
        self.remove_job(&job.queue_name, &job.name).await
    }

    async fn fail(&self, job: &LeasedJob) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let job_key = Self::job_key(&job.queue_name, &job.name);
        let counter: i64 = conn.hincr(&job_key, "counter", 1).await?;
        let run_at = Utc::now().timestamp() + FAIL_BACKOFF_STEP * counter;
        let _: () = conn
            .zadd(Self::sched_key(&job.queue_name), &job.name, run_at)
            .await?;
        Ok(())
    }

    async fn sched_later(
        &self,
        job: &LeasedJob,
        delay_secs: u64,
        counter_incr: u32,
    ) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let job_key = Self::job_key(&job.queue_name, &job.name);
        let _: () = conn.hincr(&job_key, "counter", counter_incr as i64).await?;
        let run_at = Utc::now().timestamp() + delay_secs as i64;
        let _: () = conn
            .zadd(Self::sched_key(&job.queue_name), &job.name, run_at)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Requires a running Redis at `REDIS_URL` (default localhost:6379):
    //!
    //! ```bash
    //! cargo test -p pushgate-queue -- --ignored
    //! ```

    use super::*;

    async fn test_queue() -> RedisQueue {
        let url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = redis::Client::open(url).unwrap();
        let conn = ConnectionManager::new(client).await.unwrap();
        RedisQueue::new(conn)
    }

    #[tokio::test]
    #[ignore]
    async fn submit_lease_done_round_trip() {
        let queue = test_queue().await;
        let qname = "pushgate-test:q:roundtrip".to_string();
        queue.remove_job(&qname, "job1").await.unwrap();

        queue
            .submit_job(
                &qname,
                "job1",
                JobOptions {
                    args: "payload".to_string(),
                    sched_at: None,
                },
            )
            .await
            .unwrap();

        let job = queue.lease(&[qname.clone()]).await.unwrap().unwrap();
        assert_eq!(job.name, "job1");
        assert_eq!(job.args, "payload");
        assert_eq!(job.counter, 0);

        queue.done(&job).await.unwrap();
        assert!(queue.lease(&[qname.clone()]).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore]
    async fn scheduled_job_is_not_due_yet() {
        let queue = test_queue().await;
        let qname = "pushgate-test:q:sched".to_string();
        queue.remove_job(&qname, "later").await.unwrap();

        queue
            .submit_job(
                &qname,
                "later",
                JobOptions {
                    args: "x".to_string(),
                    sched_at: Some(Utc::now().timestamp() + 3600),
                },
            )
            .await
            .unwrap();

        assert!(queue.lease(&[qname.clone()]).await.unwrap().is_none());
        queue.remove_job(&qname, "later").await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn remove_missing_job_succeeds() {
        let queue = test_queue().await;
        queue
            .remove_job("pushgate-test:q:missing", "nope")
            .await
            .unwrap();
    }
}
