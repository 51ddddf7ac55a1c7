//! Recipient storage: the `Storer` contract plus the Redis-backed and
//! in-memory implementations.
//!
//! The contract deliberately mirrors what the pipeline needs and nothing
//! more: document CRUD, a membership search over `senders`/`tags`, and a
//! recency-ordered listing computed in one bounded pass over an unordered
//! bucket (see [`topk`]).

pub mod memory;
pub mod query;
pub mod redis;
pub mod topk;

use async_trait::async_trait;

use pushgate_common::error::AppError;
use pushgate_common::types::Recipient;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// Storage collaborator consumed by the dispatcher, the broadcast fan-out
/// and the listing endpoints.
#[async_trait]
pub trait Storer: Send + Sync {
    /// Upsert a recipient and keep the search index in step.
    async fn set(&self, recipient: &Recipient) -> Result<(), AppError>;

    /// Fetch a recipient; `None` means not found.
    async fn get(&self, id: &str) -> Result<Option<Recipient>, AppError>;

    /// Delete a recipient and drop it from the search index. Idempotent.
    async fn del(&self, id: &str) -> Result<(), AppError>;

    /// Membership search (`senders:<name> tags:<label>`, AND semantics).
    /// Returns the full match count and the `[from, from+size)` page in a
    /// deterministic order.
    async fn search(
        &self,
        query: &str,
        size: usize,
        from: usize,
    ) -> Result<(u64, Vec<Recipient>), AppError>;

    /// Recency-ordered listing: the `[from, from+size)` most recent
    /// recipients, newest first, plus the total bucket count.
    async fn get_all(&self, from: usize, size: usize)
    -> Result<(u64, Vec<Recipient>), AppError>;
}
