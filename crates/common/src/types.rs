use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A push target: an addressable recipient with subscribed senders and tags.
///
/// `id` is caller-chosen, immutable and unique. Contact fields are opaque to
/// the pipeline; only the concrete senders interpret them. `created_at`
/// (unix seconds) is the sole recency-ordering key for listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub nickname: String,

    #[serde(default, rename = "phoneNumber")]
    pub phone_number: String,

    #[serde(default)]
    pub senders: BTreeSet<String>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default, rename = "createdAt")]
    pub created_at: i64,
}

impl Recipient {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Decode a recipient from its stored JSON document.
    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// Encode a recipient to its stored JSON document.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn has_sender(&self, sender: &str) -> bool {
        self.senders.contains(sender)
    }

    /// Subscribe to a sender. Returns false when already subscribed.
    pub fn add_sender(&mut self, sender: &str) -> bool {
        self.senders.insert(sender.to_string())
    }

    /// Unsubscribe from a sender. Returns false when not subscribed.
    pub fn del_sender(&mut self, sender: &str) -> bool {
        self.senders.remove(sender)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Attach a tag. Returns false when already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        self.tags.insert(tag.to_string())
    }

    /// Detach a tag. Returns false when absent.
    pub fn del_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }
}

/// The control payload carried by a broadcast job: the optional tag filter
/// plus the payload to deliver to every matching recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastControl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub data: String,
}
