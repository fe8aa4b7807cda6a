//! Writes that keep at most one record per (user, video).
//!
//! Every lookup-then-write runs under a per-key async mutex, and a create that
//! the backend rejects with a uniqueness violation is retried as an update.
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::pocketbase::{api_error, Collection, Filter, ListQuery, PocketBaseApi};

const MAX_IDLE_LOCKS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Created,
    Updated,
}

#[derive(Debug, Default, Clone)]
pub struct KeyedLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().await;
        if map.len() > MAX_IDLE_LOCKS {
            // Only entries nobody else holds a handle to can go.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

pub fn pair_key(collection: Collection, user_id: &str, video_id: &str) -> String {
    format!("{}:{}:{}", collection.as_str(), user_id, video_id)
}

pub fn pair_filter(user_id: &str, video_id: &str) -> Filter {
    Filter::and([Filter::eq("video", video_id), Filter::eq("user", user_id)])
}

async fn lookup_id(
    api: &dyn PocketBaseApi,
    collection: Collection,
    filter: &Filter,
    token: Option<&str>,
) -> Result<Option<String>> {
    let query = ListQuery::new(1, 1).filter(filter.clone());
    let found = api.list(collection, &query, token).await?;
    Ok(found
        .items
        .first()
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .map(str::to_string))
}

/// One uniqueness-guarded write against a (user, video) pair.
#[derive(Debug, Clone)]
pub struct UniqueWrite {
    pub collection: Collection,
    pub key: String,
    pub lookup: Filter,
    pub create: Value,
    /// `None` leaves an existing record untouched.
    pub update: Option<Value>,
}

impl UniqueWrite {
    pub fn for_pair(collection: Collection, user_id: &str, video_id: &str, create: Value) -> Self {
        Self {
            collection,
            key: pair_key(collection, user_id, video_id),
            lookup: pair_filter(user_id, video_id),
            create,
            update: None,
        }
    }

    pub fn update_with(mut self, body: Value) -> Self {
        self.update = Some(body);
        self
    }
}

/// Creates the record, or updates the one already there.
pub async fn upsert_unique(
    api: &dyn PocketBaseApi,
    locks: &KeyedLocks,
    write: UniqueWrite,
    token: Option<&str>,
) -> Result<(UpsertKind, Value)> {
    let lock = locks.lock_for(&write.key).await;
    let _guard = lock.lock().await;
    upsert_while_locked(api, write, token).await
}

/// Same as [`upsert_unique`], for callers already holding the key's lock.
pub async fn upsert_while_locked(
    api: &dyn PocketBaseApi,
    write: UniqueWrite,
    token: Option<&str>,
) -> Result<(UpsertKind, Value)> {
    let UniqueWrite {
        collection,
        key,
        lookup,
        create,
        update,
    } = write;

    if let Some(id) = lookup_id(api, collection, &lookup, token).await? {
        return update_existing(api, collection, &id, update, token).await;
    }

    match api.create(collection, create, token).await {
        Ok(created) => {
            debug!(key = %key, "Created {} record", collection.as_str());
            Ok((UpsertKind::Created, created))
        }
        Err(err) if api_error(&err).is_some_and(|e| e.is_not_unique()) => {
            warn!(
                key = %key,
                "Create rejected as duplicate, falling back to update"
            );
            match lookup_id(api, collection, &lookup, token).await? {
                Some(id) => update_existing(api, collection, &id, update, token).await,
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}

async fn update_existing(
    api: &dyn PocketBaseApi,
    collection: Collection,
    id: &str,
    update_body: Option<Value>,
    token: Option<&str>,
) -> Result<(UpsertKind, Value)> {
    let value = match update_body {
        Some(body) => api.update(collection, id, body, token).await?,
        None => api.get_one(collection, id, None, token).await?,
    };
    Ok((UpsertKind::Updated, value))
}
