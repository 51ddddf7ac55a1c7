//! The durable job queue contract and its implementations.
//!
//! The queue is the transport between acceptance and delivery: at-least-once,
//! supports delayed scheduling, and is the system of record for delivery
//! attempts. The pipeline never mutates job state directly; it submits,
//! removes, leases, and concludes through this contract.

pub mod memory;
pub mod redis;

use async_trait::async_trait;

use pushgate_common::error::AppError;

pub use memory::MemoryQueue;
pub use redis::RedisQueue;

/// Options accompanying a job submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOptions {
    /// Opaque payload; JSON by convention, never parsed by the queue.
    pub args: String,
    /// Optional future run time (unix seconds).
    pub sched_at: Option<i64>,
}

/// A job claimed from a queue for processing. `counter` is the delivery
/// attempt count maintained by the queue, read-only to consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeasedJob {
    pub queue_name: String,
    pub name: String,
    pub args: String,
    pub counter: u32,
}

/// Queue collaborator consumed by the dispatcher (submit/remove) and the
/// worker (lease/conclude).
#[async_trait]
pub trait Queue: Send + Sync {
    /// Submit a job. Resubmitting an existing name overwrites its args and
    /// schedule, since names carry content-derived identity.
    async fn submit_job(&self, queue: &str, name: &str, opts: JobOptions)
    -> Result<(), AppError>;

    /// Remove a not-yet-delivered job. Removing a job that already completed
    /// or never existed succeeds.
    async fn remove_job(&self, queue: &str, name: &str) -> Result<(), AppError>;

    /// Claim one due job from the given queues. A leased job re-fires after
    /// a visibility timeout unless concluded.
    async fn lease(&self, queues: &[String]) -> Result<Option<LeasedJob>, AppError>;

    /// Conclude a job: delivered (or deliberately dropped).
    async fn done(&self, job: &LeasedJob) -> Result<(), AppError>;

    /// Conclude a job: delivery failed. The queue's own redelivery policy
    /// decides what happens next.
    async fn fail(&self, job: &LeasedJob) -> Result<(), AppError>;

    /// Conclude a job: reschedule after `delay_secs`, bumping the attempt
    /// counter by `counter_incr`.
    async fn sched_later(
        &self,
        job: &LeasedJob,
        delay_secs: u64,
        counter_incr: u32,
    ) -> Result<(), AppError>;
}
