// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Used for local development and tests. Mirrors the Firestore semantics the
//! rest of the crate depends on (update requires an existing document, create
//! is conditional, array sentinels de-duplicate) and can be switched into
//! failure modes to exercise error paths.

use crate::db::field_path::FieldPath;
use crate::db::store::{Document, DocumentStore, FieldUpdate, QueryFilter, StoreError};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How the store answers calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FailureMode {
    Healthy = 0,
    /// Every call fails with `Unavailable`.
    Offline = 1,
    /// Reads succeed, writes fail with `Unavailable`.
    RejectWrites = 2,
}

impl FailureMode {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => FailureMode::Offline,
            2 => FailureMode::RejectWrites,
            _ => FailureMode::Healthy,
        }
    }
}

/// `DashMap`-backed document store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<DashMap<(String, String), Document>>,
    mode: Arc<AtomicU8>,
    latency_ms: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failure_mode(&self, mode: FailureMode) {
        self.mode.store(mode as u8, Ordering::SeqCst);
    }

    pub fn failure_mode(&self) -> FailureMode {
        FailureMode::from_u8(self.mode.load(Ordering::SeqCst))
    }

    /// Delay applied before every call completes.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .count()
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    async fn enter(&self, write: bool) -> Result<(), StoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        match self.failure_mode() {
            FailureMode::Healthy => Ok(()),
            FailureMode::Offline => Err(StoreError::Unavailable("store offline".to_string())),
            FailureMode::RejectWrites if write => {
                Err(StoreError::Unavailable("store rejected write".to_string()))
            }
            FailureMode::RejectWrites => Ok(()),
        }
    }

    fn key(collection: &str, id: &str) -> (String, String) {
        (collection.to_string(), id.to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.enter(false).await?;
        Ok(self
            .documents
            .get(&Self::key(collection, id))
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        self.enter(true).await?;
        self.documents.insert(Self::key(collection, id), document);
        Ok(())
    }

    async fn create(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.enter(true).await?;
        match self.documents.entry(Self::key(collection, id)) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(format!("{}/{}", collection, id))),
            Entry::Vacant(slot) => {
                slot.insert(document);
                Ok(())
            }
        }
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(FieldPath, FieldUpdate)>,
    ) -> Result<(), StoreError> {
        self.enter(true).await?;
        let mut entry = self
            .documents
            .get_mut(&Self::key(collection, id))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;

        for (path, update) in updates {
            apply_update(entry.value_mut(), &path, update);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.enter(true).await?;
        self.documents.remove(&Self::key(collection, id));
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filter: QueryFilter,
    ) -> Result<Vec<Document>, StoreError> {
        self.enter(false).await?;
        Ok(self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection && filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.enter(false).await?;
        Ok(self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// Apply one field change in place.
fn apply_update(document: &mut Document, path: &FieldPath, update: FieldUpdate) {
    let Some((last, parents)) = path.segments().split_last() else {
        return;
    };

    if matches!(update, FieldUpdate::Delete) {
        let mut current = document;
        for segment in parents {
            match current.get_mut(segment).and_then(Value::as_object_mut) {
                Some(next) => current = next,
                None => return,
            }
        }
        current.remove(last);
        return;
    }

    let mut current = document;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Document::new()));
        if !slot.is_object() {
            *slot = Value::Object(Document::new());
        }
        current = match slot.as_object_mut() {
            Some(next) => next,
            None => return,
        };
    }

    match update {
        FieldUpdate::Set(value) => {
            current.insert(last.clone(), value);
        }
        FieldUpdate::ArrayUnion(values) => {
            let mut items = take_array(current, last);
            for value in values {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
            current.insert(last.clone(), Value::Array(items));
        }
        FieldUpdate::ArrayRemove(values) => {
            let mut items = take_array(current, last);
            items.retain(|item| !values.contains(item));
            current.insert(last.clone(), Value::Array(items));
        }
        FieldUpdate::Delete => {}
    }
}

/// Remove and return the array stored at `key`. Any other value counts as
/// an empty array.
fn take_array(parent: &mut Document, key: &str) -> Vec<Value> {
    match parent.remove(key) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}
