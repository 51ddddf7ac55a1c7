//! The dispatcher: push / broadcast / cancel intents become queue
//! submissions. Nothing here delivers anything; delivery happens in the
//! worker, behind the queue.

use std::sync::Arc;

use pushgate_common::error::AppError;
use pushgate_common::identity::generate_name;
use pushgate_common::types::BroadcastControl;
use pushgate_common::PUSHALL_QUEUE;
use pushgate_queue::{JobOptions, Queue};
use pushgate_store::Storer;

/// Result of a single-recipient push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Job submitted under this content-derived name.
    Submitted(String),
    /// Recipient exists but is not subscribed to the sender and `force`
    /// was not set; no job was submitted.
    NotSubscribed,
}

pub struct Dispatcher {
    store: Arc<dyn Storer>,
    queue: Arc<dyn Queue>,
    prefix: String,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Storer>, queue: Arc<dyn Queue>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            queue,
            prefix: prefix.into(),
        }
    }

    /// Queue name for a sender: the shared prefix plus the sender name.
    pub fn queue_name(&self, sender: &str) -> String {
        format!("{}{}", self.prefix, sender)
    }

    /// Submit one delivery job for `recipient_id` via `sender`.
    ///
    /// The same (recipient, payload) pair always yields the same job name,
    /// so repeated pushes share one identity at the queue.
    pub async fn push(
        &self,
        sender: &str,
        recipient_id: &str,
        payload: &str,
        sched_at: Option<i64>,
        force: bool,
    ) -> Result<PushOutcome, AppError> {
        let recipient = self.store.get(recipient_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("pusher {} not exists.", recipient_id))
        })?;

        if !force && !recipient.has_sender(sender) {
            tracing::info!(
                recipient = %recipient_id,
                sender = %sender,
                "push skipped: recipient not subscribed"
            );
            return Ok(PushOutcome::NotSubscribed);
        }

        let name = generate_name(recipient_id, payload);
        self.queue
            .submit_job(
                &self.queue_name(sender),
                &name,
                JobOptions {
                    args: payload.to_string(),
                    sched_at,
                },
            )
            .await?;

        Ok(PushOutcome::Submitted(name))
    }

    /// Submit a broadcast control job. Fan-out is deferred to the worker,
    /// never performed inline, so request latency stays bounded no matter
    /// how large the audience is. Canceling the returned control job does
    /// not retract per-recipient jobs already fanned out.
    pub async fn push_all(
        &self,
        sender: &str,
        payload: &str,
        tag: Option<&str>,
        sched_at: Option<i64>,
    ) -> Result<String, AppError> {
        let control = BroadcastControl {
            tag: tag.filter(|t| !t.is_empty()).map(|t| t.to_string()),
            data: payload.to_string(),
        };
        let args = serde_json::to_string(&control)
            .map_err(|e| AppError::Internal(format!("encode broadcast control: {}", e)))?;

        let name = generate_name(sender, &args);
        self.queue
            .submit_job(
                &self.queue_name(PUSHALL_QUEUE),
                &name,
                JobOptions { args, sched_at },
            )
            .await?;

        Ok(name)
    }

    /// Remove a not-yet-delivered job. A job that already completed or
    /// never existed counts as removed; only backend failures error.
    pub async fn cancel_push(&self, sender: &str, job_name: &str) -> Result<(), AppError> {
        self.queue
            .remove_job(&self.queue_name(sender), job_name)
            .await
    }
}
