// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The document store seam.
//!
//! Everything above this trait talks to "a keyed document store" and never to
//! a particular backend. Documents are JSON objects; partial writes name the
//! fields they touch with a [`FieldPath`].

use crate::db::field_path::FieldPath;
use async_trait::async_trait;
use serde_json::Value;

/// A stored document body.
pub type Document = serde_json::Map<String, Value>;

/// Errors reported by a document store backend.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Document serialization failed: {0}")]
    Serialization(String),
}

/// One change inside a partial update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Overwrite the field, creating intermediate maps as needed.
    Set(Value),
    /// Remove the field. Removing a missing field is not an error.
    Delete,
    /// Add each value to an array field unless already present.
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each value from an array field.
    ArrayRemove(Vec<Value>),
}

impl FieldUpdate {
    pub fn is_transform(&self) -> bool {
        matches!(self, FieldUpdate::ArrayUnion(_) | FieldUpdate::ArrayRemove(_))
    }
}

/// Single-field query filter.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Equals(FieldPath, Value),
    ArrayContains(FieldPath, Value),
}

impl QueryFilter {
    /// Evaluate against a document held in memory.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            QueryFilter::Equals(path, expected) => {
                lookup(document, path).is_some_and(|value| value == expected)
            }
            QueryFilter::ArrayContains(path, expected) => lookup(document, path)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(expected)),
        }
    }
}

/// Resolve a field path inside a document.
pub fn lookup<'a>(document: &'a Document, path: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = document.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Keyed document store. Every call is a suspension point and may fail
/// independently; no ordering is promised between separate calls.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. A missing document is `Ok(None)`.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Replace a document wholesale.
    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError>;

    /// Store a document only if none exists under `id`.
    async fn create(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<(), StoreError>;

    /// Apply field-level changes to an existing document.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(FieldPath, FieldUpdate)>,
    ) -> Result<(), StoreError>;

    /// Remove a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn query(
        &self,
        collection: &str,
        filter: QueryFilter,
    ) -> Result<Vec<Document>, StoreError>;

    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;
}
