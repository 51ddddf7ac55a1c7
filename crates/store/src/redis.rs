//! Redis-backed recipient store.
//!
//! Recipients persist as JSON documents under `<prefix>recipient:<id>`.
//! Membership search is served by index sets (`<prefix>index:senders:<name>`,
//! `<prefix>index:tags:<label>`) kept in step on every write. The recency
//! listing drives a SCAN cursor (an unordered forward walk over the bucket)
//! into the [`TopKSelector`](crate::topk::TopKSelector), so no full sort
//! ever happens.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use pushgate_common::error::AppError;
use pushgate_common::types::Recipient;

use crate::Storer;
use crate::query::SearchQuery;
use crate::topk::TopKSelector;

pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    fn doc_key(&self, id: &str) -> String {
        format!("{}recipient:{}", self.prefix, id)
    }

    fn sender_index_key(&self, sender: &str) -> String {
        format!("{}index:senders:{}", self.prefix, sender)
    }

    fn tag_index_key(&self, tag: &str) -> String {
        format!("{}index:tags:{}", self.prefix, tag)
    }

    /// Load one document for a listing page; corrupt or vanished documents
    /// are skipped rather than failing the whole page.
    async fn load_for_page(&self, id: &str, out: &mut Vec<Recipient>) {
        match self.get(id).await {
            Ok(Some(recipient)) => out.push(recipient),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(recipient = %id, error = %e, "skipping unreadable recipient");
            }
        }
    }
}

#[async_trait]
impl Storer for RedisStore {
    async fn set(&self, recipient: &Recipient) -> Result<(), AppError> {
        let old = self.get(&recipient.id).await?.unwrap_or_default();

        let payload = recipient
            .to_json()
            .map_err(|e| AppError::Internal(format!("encode recipient: {}", e)))?;

        let mut conn = self.conn.clone();
        let _: () = conn.set(self.doc_key(&recipient.id), payload).await?;

        for sender in recipient.senders.difference(&old.senders) {
            let _: () = conn
                .sadd(self.sender_index_key(sender), &recipient.id)
                .await?;
        }
        for sender in old.senders.difference(&recipient.senders) {
            let _: () = conn
                .srem(self.sender_index_key(sender), &recipient.id)
                .await?;
        }
        for tag in recipient.tags.difference(&old.tags) {
            let _: () = conn.sadd(self.tag_index_key(tag), &recipient.id).await?;
        }
        for tag in old.tags.difference(&recipient.tags) {
            let _: () = conn.srem(self.tag_index_key(tag), &recipient.id).await?;
        }

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Recipient>, AppError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(self.doc_key(id)).await?;
        match payload {
            None => Ok(None),
            Some(doc) => Recipient::from_json(&doc).map(Some).map_err(|e| {
                AppError::Internal(format!("corrupt recipient document {}: {}", id, e))
            }),
        }
    }

    async fn del(&self, id: &str) -> Result<(), AppError> {
        let old = self.get(id).await?;

        let mut conn = self.conn.clone();
        let _: () = conn.del(self.doc_key(id)).await?;

        if let Some(old) = old {
            for sender in &old.senders {
                let _: () = conn.srem(self.sender_index_key(sender), id).await?;
            }
            for tag in &old.tags {
                let _: () = conn.srem(self.tag_index_key(tag), id).await?;
            }
        }

        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        size: usize,
        from: usize,
    ) -> Result<(u64, Vec<Recipient>), AppError> {
        let parsed = SearchQuery::parse(query)?;

        let keys: Vec<String> = parsed
            .senders
            .iter()
            .map(|s| self.sender_index_key(s))
            .chain(parsed.tags.iter().map(|t| self.tag_index_key(t)))
            .collect();

        let mut conn = self.conn.clone();
        let mut ids: Vec<String> = if keys.len() == 1 {
            conn.smembers(&keys[0]).await?
        } else {
            conn.sinter(&keys).await?
        };
        // set order is unspecified; sort for stable pagination
        ids.sort();

        let total = ids.len() as u64;
        let mut recipients = Vec::new();
        for id in ids.into_iter().skip(from).take(size) {
            self.load_for_page(&id, &mut recipients).await;
        }

        Ok((total, recipients))
    }

    async fn get_all(
        &self,
        from: usize,
        size: usize,
    ) -> Result<(u64, Vec<Recipient>), AppError> {
        let pattern = format!("{}recipient:*", self.prefix);
        let mut selector = TopKSelector::new(size, from);

        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            for key in keys {
                let payload: Option<String> = conn.get(&key).await?;
                let Some(doc) = payload else { continue };
                match Recipient::from_json(&doc) {
                    Ok(r) => selector.collect(r.id, r.created_at),
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "skipping corrupt recipient document");
                    }
                }
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        let total = selector.total();
        let mut recipients = Vec::new();
        for id in selector.into_page() {
            self.load_for_page(&id, &mut recipients).await;
        }

        Ok((total, recipients))
    }
}
