//! In-memory recipient store for tests and single-process deployments.
//!
//! Honors the same contract as the Redis store; `get_all` iterates the map
//! in whatever order the hash table yields, exercising the top-K selector
//! exactly the way an unordered SCAN does.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use pushgate_common::error::AppError;
use pushgate_common::types::Recipient;

use crate::Storer;
use crate::query::SearchQuery;
use crate::topk::TopKSelector;

#[derive(Default)]
pub struct MemoryStore {
    recipients: RwLock<HashMap<String, Recipient>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> AppError {
        AppError::Internal("recipient map lock poisoned".to_string())
    }
}

#[async_trait]
impl Storer for MemoryStore {
    async fn set(&self, recipient: &Recipient) -> Result<(), AppError> {
        let mut map = self.recipients.write().map_err(|_| Self::lock_err())?;
        map.insert(recipient.id.clone(), recipient.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Recipient>, AppError> {
        let map = self.recipients.read().map_err(|_| Self::lock_err())?;
        Ok(map.get(id).cloned())
    }

    async fn del(&self, id: &str) -> Result<(), AppError> {
        let mut map = self.recipients.write().map_err(|_| Self::lock_err())?;
        map.remove(id);
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        size: usize,
        from: usize,
    ) -> Result<(u64, Vec<Recipient>), AppError> {
        let parsed = SearchQuery::parse(query)?;

        let map = self.recipients.read().map_err(|_| Self::lock_err())?;
        let mut ids: Vec<&String> = map
            .values()
            .filter(|r| parsed.matches(r))
            .map(|r| &r.id)
            .collect();
        ids.sort();

        let total = ids.len() as u64;
        let page = ids
            .into_iter()
            .skip(from)
            .take(size)
            .filter_map(|id| map.get(id).cloned())
            .collect();

        Ok((total, page))
    }

    async fn get_all(
        &self,
        from: usize,
        size: usize,
    ) -> Result<(u64, Vec<Recipient>), AppError> {
        let map = self.recipients.read().map_err(|_| Self::lock_err())?;

        let mut selector = TopKSelector::new(size, from);
        for r in map.values() {
            selector.collect(r.id.clone(), r.created_at);
        }

        let total = selector.total();
        let page = selector
            .into_page()
            .into_iter()
            .filter_map(|id| map.get(&id).cloned())
            .collect();

        Ok((total, page))
    }
}
