//! The job-processing loop.
//!
//! Each pool task leases one job at a time and drives it to a conclusion:
//! verify the content-derived name, invoke the registered sender, and
//! translate the outcome into a queue directive. A job that fails name
//! verification is foreign or corrupted: it is acknowledged and dropped,
//! never retried and never handed to a sender.

use std::sync::Arc;
use std::time::Duration;

use pushgate_common::error::AppError;
use pushgate_common::identity;
use pushgate_queue::{LeasedJob, Queue};

use crate::sender::SenderRegistry;

/// How long an idle pool task sleeps before polling the queues again.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Backoff after a queue error before the task resumes leasing.
const LEASE_ERROR_BACKOFF: Duration = Duration::from_secs(2);

pub struct Worker {
    queue: Arc<dyn Queue>,
    registry: Arc<SenderRegistry>,
    prefix: String,
    max_retry: u32,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn Queue>,
        registry: Arc<SenderRegistry>,
        prefix: impl Into<String>,
        max_retry: u32,
    ) -> Self {
        Self {
            queue,
            registry,
            prefix: prefix.into(),
            max_retry,
        }
    }

    /// Queue names this worker subscribes to: one per registered sender.
    pub fn queue_names(&self) -> Vec<String> {
        self.registry
            .names()
            .into_iter()
            .map(|name| format!("{}{}", self.prefix, name))
            .collect()
    }

    /// Run `pool_size` concurrent processing tasks until aborted. Each task
    /// processes one job to full conclusion before leasing the next.
    pub async fn run(self: Arc<Self>, pool_size: usize) {
        let queues = self.queue_names();
        tracing::info!(
            pool_size,
            queues = ?queues,
            "worker pool starting"
        );

        let mut handles = Vec::with_capacity(pool_size);
        for task in 0..pool_size {
            let worker = Arc::clone(&self);
            let queues = queues.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    match worker.queue.lease(&queues).await {
                        Ok(Some(job)) => {
                            if let Err(e) = worker.process(&job).await {
                                tracing::error!(
                                    task,
                                    job = %job.name,
                                    error = %e,
                                    "failed to conclude job"
                                );
                            }
                        }
                        Ok(None) => tokio::time::sleep(IDLE_POLL_INTERVAL).await,
                        Err(e) => {
                            tracing::error!(task, error = %e, "queue lease failed");
                            tokio::time::sleep(LEASE_ERROR_BACKOFF).await;
                        }
                    }
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "worker task aborted");
            }
        }
    }

    /// Drive one leased job through verification, dispatch, and conclusion.
    pub async fn process(&self, job: &LeasedJob) -> Result<(), AppError> {
        let recipient = identity::extract_recipient(&job.name);
        if !identity::verify_data(&job.name, recipient, &job.args) {
            tracing::info!(job = %job.name, "name verification failed, dropping job");
            return self.queue.done(job).await;
        }

        let suffix = job
            .queue_name
            .strip_prefix(&self.prefix)
            .unwrap_or(&job.queue_name);
        let Some(sender) = self.registry.get(suffix) else {
            tracing::warn!(queue = %job.queue_name, "no sender registered, dropping job");
            return self.queue.done(job).await;
        };

        match sender.send(recipient, &job.args, job.counter).await {
            Err(e) => {
                tracing::error!(
                    job = %job.name,
                    sender = %suffix,
                    error = %e,
                    "delivery failed"
                );
                self.queue.fail(job).await
            }
            Ok(0) => self.queue.done(job).await,
            Ok(delay) => {
                if job.counter >= self.max_retry {
                    tracing::info!(
                        job = %job.name,
                        counter = job.counter,
                        "retry budget exhausted, giving up"
                    );
                    self.queue.done(job).await
                } else {
                    self.queue.sched_later(job, delay, 1).await
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use pushgate_common::identity::generate_name;
    use pushgate_queue::MemoryQueue;
    use pushgate_queue::memory::Conclusion;

    use crate::sender::Sender;

    /// Records every invocation and returns a scripted outcome.
    struct ScriptedSender {
        name: &'static str,
        outcome: Result<u64, String>,
        calls: Mutex<Vec<(String, String, u32)>>,
    }

    impl ScriptedSender {
        fn new(name: &'static str, outcome: Result<u64, String>) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, String, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sender for ScriptedSender {
        fn get_name(&self) -> &str {
            self.name
        }

        async fn send(&self, recipient_id: &str, payload: &str, counter: u32)
        -> anyhow::Result<u64> {
            self.calls
                .lock()
                .unwrap()
                .push((recipient_id.to_string(), payload.to_string(), counter));
            match &self.outcome {
                Ok(delay) => Ok(*delay),
                Err(msg) => Err(anyhow::anyhow!(msg.clone())),
            }
        }
    }

    fn worker_with(sender: Arc<ScriptedSender>) -> (Arc<MemoryQueue>, Worker) {
        let queue = Arc::new(MemoryQueue::new());
        let mut registry = SenderRegistry::new();
        registry.register(sender);
        let worker = Worker::new(queue.clone(), Arc::new(registry), "pusher:", 3);
        (queue, worker)
    }

    fn job_for(sender: &str, recipient: &str, payload: &str, counter: u32) -> LeasedJob {
        LeasedJob {
            queue_name: format!("pusher:{}", sender),
            name: generate_name(recipient, payload),
            args: payload.to_string(),
            counter,
        }
    }

    #[tokio::test]
    async fn unverifiable_job_is_dropped_without_sending() {
        let sender = ScriptedSender::new("sendmail", Ok(0));
        let (queue, worker) = worker_with(sender.clone());

        let job = LeasedJob {
            queue_name: "pusher:sendmail".to_string(),
            name: "lupino_0000000000000000000000000000dead".to_string(),
            args: "payload".to_string(),
            counter: 0,
        };
        worker.process(&job).await.unwrap();

        assert!(sender.calls().is_empty());
        let concluded = queue.conclusions();
        assert_eq!(concluded.len(), 1);
        assert_eq!(concluded[0].1, Conclusion::Done);
    }

    #[tokio::test]
    async fn successful_send_concludes_done() {
        let sender = ScriptedSender::new("sendmail", Ok(0));
        let (queue, worker) = worker_with(sender.clone());

        let job = job_for("sendmail", "lupino", "payload", 0);
        worker.process(&job).await.unwrap();

        assert_eq!(sender.calls(), vec![("lupino".to_string(), "payload".to_string(), 0)]);
        assert_eq!(queue.conclusions()[0].1, Conclusion::Done);
    }

    #[tokio::test]
    async fn send_error_concludes_fail() {
        let sender = ScriptedSender::new("sendmail", Err("gateway down".to_string()));
        let (queue, worker) = worker_with(sender);

        let job = job_for("sendmail", "lupino", "payload", 0);
        worker.process(&job).await.unwrap();

        assert_eq!(queue.conclusions()[0].1, Conclusion::Failed);
    }

    #[tokio::test]
    async fn requested_delay_reschedules_below_the_retry_budget() {
        let sender = ScriptedSender::new("sendmail", Ok(5));
        let (queue, worker) = worker_with(sender);

        let job = job_for("sendmail", "lupino", "payload", 1);
        worker.process(&job).await.unwrap();

        assert_eq!(
            queue.conclusions()[0].1,
            Conclusion::SchedLater {
                delay_secs: 5,
                counter_incr: 1
            }
        );
    }

    #[tokio::test]
    async fn requested_delay_at_the_retry_budget_gives_up() {
        let sender = ScriptedSender::new("sendmail", Ok(5));
        let (queue, worker) = worker_with(sender);

        let job = job_for("sendmail", "lupino", "payload", 3);
        worker.process(&job).await.unwrap();

        assert_eq!(queue.conclusions()[0].1, Conclusion::Done);
    }

    #[tokio::test]
    async fn underscored_recipient_ids_route_correctly() {
        let sender = ScriptedSender::new("sendmail", Ok(0));
        let (queue, worker) = worker_with(sender.clone());

        let job = job_for("sendmail", "a_b", "x", 0);
        worker.process(&job).await.unwrap();

        assert_eq!(sender.calls()[0].0, "a_b");
        assert_eq!(queue.conclusions()[0].1, Conclusion::Done);
    }

    #[tokio::test]
    async fn job_for_unregistered_queue_is_dropped() {
        let sender = ScriptedSender::new("sendmail", Ok(0));
        let (queue, worker) = worker_with(sender.clone());

        let job = job_for("sendsms", "lupino", "payload", 0);
        worker.process(&job).await.unwrap();

        assert!(sender.calls().is_empty());
        assert_eq!(queue.conclusions()[0].1, Conclusion::Done);
    }

    #[test]
    fn queue_names_carry_the_prefix() {
        let sender = ScriptedSender::new("sendmail", Ok(0));
        let (_queue, worker) = worker_with(sender);
        assert_eq!(worker.queue_names(), vec!["pusher:sendmail".to_string()]);
    }
}
