//! In-memory queue double for dispatcher/worker/fan-out tests.
//!
//! Records every submission attempt and every conclusion so tests can make
//! exact assertions about pipeline behavior. Conclusions are recorded, not
//! replayed: nothing requeues, which keeps test drains finite. Submission
//! failures can be injected per job-name fragment.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use pushgate_common::error::AppError;

use crate::{JobOptions, LeasedJob, Queue};

/// One successfully recorded submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    pub queue_name: String,
    pub name: String,
    pub args: String,
    pub sched_at: Option<i64>,
}

/// How a leased job was concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conclusion {
    Done,
    Failed,
    SchedLater { delay_secs: u64, counter_incr: u32 },
}

#[derive(Default)]
struct Inner {
    pending: VecDeque<LeasedJob>,
    submissions: Vec<SubmittedJob>,
    submit_attempts: usize,
    removed: Vec<(String, String)>,
    concluded: Vec<(LeasedJob, Conclusion)>,
    fail_fragments: Vec<String>,
    fail_removals: bool,
}

#[derive(Default)]
pub struct MemoryQueue {
    inner: Mutex<Inner>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::Internal("queue lock poisoned".to_string()))
    }

    /// Make submissions whose job name contains `fragment` fail.
    pub fn fail_submissions_matching(&self, fragment: impl Into<String>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_fragments.push(fragment.into());
        }
    }

    /// Make every removal report a backend failure.
    pub fn fail_removals(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_removals = true;
        }
    }

    /// Seed a job directly into the pending set, bypassing the submission
    /// log. Used to drive the worker with hand-built jobs.
    pub fn seed(&self, job: LeasedJob) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.pending.push_back(job);
        }
    }

    /// All successfully recorded submissions, in order.
    pub fn submissions(&self) -> Vec<SubmittedJob> {
        self.inner
            .lock()
            .map(|inner| inner.submissions.clone())
            .unwrap_or_default()
    }

    /// Count of submission attempts, including injected failures.
    pub fn submit_attempts(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.submit_attempts)
            .unwrap_or_default()
    }

    /// All `(queue, name)` removal requests, in order.
    pub fn removals(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .map(|inner| inner.removed.clone())
            .unwrap_or_default()
    }

    /// All conclusions, in order.
    pub fn conclusions(&self) -> Vec<(LeasedJob, Conclusion)> {
        self.inner
            .lock()
            .map(|inner| inner.concluded.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn submit_job(
        &self,
        queue: &str,
        name: &str,
        opts: JobOptions,
    ) -> Result<(), AppError> {
        let mut inner = self.lock()?;
        inner.submit_attempts += 1;

        if inner.fail_fragments.iter().any(|f| name.contains(f.as_str())) {
            return Err(AppError::Queue(format!("injected failure for {}", name)));
        }

        // content-derived identity: resubmission replaces the pending entry
        inner
            .pending
            .retain(|j| !(j.queue_name == queue && j.name == name));
        inner.pending.push_back(LeasedJob {
            queue_name: queue.to_string(),
            name: name.to_string(),
            args: opts.args.clone(),
            counter: 0,
        });
        inner.submissions.push(SubmittedJob {
            queue_name: queue.to_string(),
            name: name.to_string(),
            args: opts.args,
            sched_at: opts.sched_at,
        });
        Ok(())
    }

    async fn remove_job(&self, queue: &str, name: &str) -> Result<(), AppError> {
        let mut inner = self.lock()?;
        if inner.fail_removals {
            return Err(AppError::Queue("injected removal failure".to_string()));
        }
        inner
            .pending
            .retain(|j| !(j.queue_name == queue && j.name == name));
        inner.removed.push((queue.to_string(), name.to_string()));
        Ok(())
    }

    async fn lease(&self, queues: &[String]) -> Result<Option<LeasedJob>, AppError> {
        let mut inner = self.lock()?;
        let pos = inner
            .pending
            .iter()
            .position(|j| queues.contains(&j.queue_name));
        Ok(pos.and_then(|p| inner.pending.remove(p)))
    }

    async fn done(&self, job: &LeasedJob) -> Result<(), AppError> {
        self.lock()?.concluded.push((job.clone(), Conclusion::Done));
        Ok(())
    }

    async fn fail(&self, job: &LeasedJob) -> Result<(), AppError> {
        self.lock()?
            .concluded
            .push((job.clone(), Conclusion::Failed));
        Ok(())
    }

    async fn sched_later(
        &self,
        job: &LeasedJob,
        delay_secs: u64,
        counter_incr: u32,
    ) -> Result<(), AppError> {
        self.lock()?.concluded.push((
            job.clone(),
            Conclusion::SchedLater {
                delay_secs,
                counter_incr,
            },
        ));
        Ok(())
    }
}
