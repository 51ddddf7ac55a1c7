//! The membership query grammar shared by the store backends.
//!
//! A query is whitespace-separated `field:value` terms over the indexed
//! fields `senders` and `tags`, combined with AND semantics. This is the
//! exact shape the broadcast fan-out issues: `senders:<name>` plus an
//! optional `tags:<label>`.

use pushgate_common::error::AppError;
use pushgate_common::types::Recipient;

/// A parsed membership query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub senders: Vec<String>,
    pub tags: Vec<String>,
}

impl SearchQuery {
    /// Parse a raw query string. Empty queries and terms over unindexed
    /// fields are validation errors.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let mut query = SearchQuery::default();
        for term in raw.split_whitespace() {
            let (field, value) = term
                .split_once(':')
                .ok_or_else(|| AppError::Validation(format!("invalid query term: {}", term)))?;
            if value.is_empty() {
                return Err(AppError::Validation(format!("invalid query term: {}", term)));
            }
            match field {
                "senders" => query.senders.push(value.to_string()),
                "tags" => query.tags.push(value.to_string()),
                _ => {
                    return Err(AppError::Validation(format!(
                        "unsupported query field: {}",
                        field
                    )));
                }
            }
        }
        if query.senders.is_empty() && query.tags.is_empty() {
            return Err(AppError::Validation("q is required.".to_string()));
        }
        Ok(query)
    }

    /// Whether a recipient satisfies every term.
    pub fn matches(&self, recipient: &Recipient) -> bool {
        self.senders.iter().all(|s| recipient.has_sender(s))
            && self.tags.iter().all(|t| recipient.has_tag(t))
    }
}
