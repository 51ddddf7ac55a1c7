//! Broadcast fan-out.
//!
//! Registered under the dedicated `pushall` queue, this sender resolves the
//! audience of a broadcast control job (every recipient subscribed to the
//! sender, optionally narrowed by tag) and resubmits one individual push
//! job per recipient through the dispatcher. Fan-out is best-effort: one
//! recipient's submission failure never aborts the rest of the scan.
//!
//! Known limitation: the match total is read from the first search page and
//! trusted for the remainder of the scan. Recipients added to or removed
//! from the matching set mid-scan may be missed or pushed twice.

use std::sync::Arc;

use pushgate_common::PUSHALL_QUEUE;
use pushgate_common::types::{BroadcastControl, Recipient};
use pushgate_dispatch::Dispatcher;
use pushgate_store::Storer;

use crate::sender::Sender;

/// Recipients fetched per search page.
const PAGE_SIZE: usize = 10;

pub struct BroadcastFanout {
    store: Arc<dyn Storer>,
    dispatcher: Arc<Dispatcher>,
}

impl BroadcastFanout {
    pub fn new(store: Arc<dyn Storer>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Submit one push job per recipient on a page. Failures are logged and
    /// skipped; the search predicate already proved membership, so the
    /// dispatcher's gate is bypassed with `force`.
    async fn push_page(&self, sender: &str, recipients: &[Recipient], data: &str) {
        for recipient in recipients {
            if let Err(e) = self
                .dispatcher
                .push(sender, &recipient.id, data, None, true)
                .await
            {
                tracing::error!(
                    sender = %sender,
                    recipient = %recipient.id,
                    error = %e,
                    "fan-out submission failed"
                );
            }
        }
    }
}

#[async_trait::async_trait]
impl Sender for BroadcastFanout {
    fn get_name(&self) -> &str {
        PUSHALL_QUEUE
    }

    /// For a broadcast control job the "recipient id" position in the job
    /// name carries the sender name being broadcast.
    async fn send(&self, sender_name: &str, payload: &str, counter: u32)
    -> anyhow::Result<u64> {
        let control: BroadcastControl = match serde_json::from_str(payload) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(sender = %sender_name, error = %e, "malformed broadcast control payload");
                return Ok(0);
            }
        };

        let mut query = format!("senders:{}", sender_name);
        if let Some(tag) = control.tag.as_deref().filter(|t| !t.is_empty()) {
            query.push_str(&format!(" tags:{}", tag));
        }

        // first page also establishes the total for the whole scan
        let (total, first_page) = match self.store.search(&query, PAGE_SIZE, 0).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(query = %query, error = %e, "broadcast search failed");
                return Ok(10 * u64::from(counter.max(1)));
            }
        };

        tracing::info!(
            sender = %sender_name,
            total,
            "broadcast fan-out started"
        );
        self.push_page(sender_name, &first_page, &control.data).await;

        let mut from = PAGE_SIZE;
        while from < total as usize {
            match self.store.search(&query, PAGE_SIZE, from).await {
                Ok((_, page)) => self.push_page(sender_name, &page, &control.data).await,
                Err(e) => {
                    tracing::error!(query = %query, from, error = %e, "broadcast page failed");
                }
            }
            from += PAGE_SIZE;
        }

        Ok(0)
    }
}
