// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User record repository.
//!
//! Owns every read and write on the `users` collection:
//! - idempotent create, get, list, delete
//! - targeted field updates (username, denormalized restaurant name)
//! - per-day selections, written one map entry at a time
//! - favorites, written with set sentinels
//!
//! No operation retries and nothing is serialized across callers; two writes
//! racing on the same field resolve last-write-wins in the store.

use crate::db::store::{Document, DocumentStore, FieldUpdate, QueryFilter};
use crate::db::{collections, FieldPath, StoreError};
use crate::error::{AppError, Result};
use crate::models::user::fields;
use crate::models::{DateKey, UserRecord};
use anyhow::Context;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Repository over the `users` collection.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_collection(store, collections::USERS)
    }

    pub fn with_collection(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    // ─── Record Operations ───────────────────────────────────────

    /// Store `record` unless a document already exists for its id.
    ///
    /// Returns whatever is stored afterwards: the new record, or the existing
    /// one untouched. If another writer creates the document between our
    /// existence check and our write, the conditional create fails and the
    /// winner's record is returned.
    pub async fn create_user(&self, record: &UserRecord) -> Result<UserRecord> {
        if let Some(existing) = self.get_user(&record.id).await? {
            tracing::debug!(user_id = %record.id, "User already exists, create is a no-op");
            return Ok(existing);
        }

        let document = encode(record)?;
        match self
            .store
            .create(&self.collection, &record.id, document)
            .await
        {
            Ok(()) => {
                tracing::info!(user_id = %record.id, "User created");
                Ok(record.clone())
            }
            Err(StoreError::AlreadyExists(_)) => {
                tracing::warn!(user_id = %record.id, "Lost create race, returning stored record");
                self.get_user(&record.id).await?.ok_or_else(|| {
                    AppError::UpdateFailed(format!(
                        "User {} vanished after concurrent create",
                        record.id
                    ))
                })
            }
            Err(e) => {
                tracing::warn!(user_id = %record.id, error = %e, "User create failed");
                Err(AppError::from_read(e))
            }
        }
    }

    /// Get a user. A missing document is `Ok(None)`.
    pub async fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        let document = self
            .store
            .get(&self.collection, id)
            .await
            .map_err(AppError::from_read)?;
        document.map(decode).transpose()
    }

    /// Every user in the collection, in no particular order.
    ///
    /// Documents that do not decode as a user are logged and skipped.
    pub async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let documents = self
            .store
            .list_all(&self.collection)
            .await
            .map_err(AppError::from_read)?;
        Ok(decode_all(documents))
    }

    pub async fn update_username(&self, id: &str, username: &str) -> Result<String> {
        self.write(
            id,
            vec![(
                FieldPath::field(fields::USERNAME),
                FieldUpdate::Set(Value::String(username.to_string())),
            )],
        )
        .await?;
        tracing::info!(user_id = id, "Username updated");
        Ok(username.to_string())
    }

    /// Set or clear the denormalized name of the current selection.
    pub async fn update_chosen_restaurant_name(&self, id: &str, name: Option<&str>) -> Result<()> {
        let update = match name {
            Some(name) => FieldUpdate::Set(Value::String(name.to_string())),
            None => FieldUpdate::Delete,
        };
        self.write(
            id,
            vec![(FieldPath::field(fields::CHOSEN_RESTAURANT_NAME), update)],
        )
        .await
    }

    /// Remove the user document. Derived state is left to the caller.
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.store
            .delete(&self.collection, id)
            .await
            .map_err(AppError::from_write)?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    // ─── Day Selections ──────────────────────────────────────────

    /// Record `place_id` as the user's choice for `date`.
    ///
    /// Reads first to confirm the user exists (no implicit create), then
    /// writes only `datesAndPlaceIds.<date>`.
    pub async fn set_selection(&self, user_id: &str, date: &DateKey, place_id: &str) -> Result<String> {
        if self.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        self.write(
            user_id,
            vec![(
                FieldPath::selection(date),
                FieldUpdate::Set(Value::String(place_id.to_string())),
            )],
        )
        .await?;

        tracing::info!(user_id, date = %date, place_id, "Selection recorded");
        Ok(place_id.to_string())
    }

    /// The place chosen for `date`, or `None` if nothing (or no user) is recorded.
    pub async fn get_selection(&self, user_id: &str, date: &DateKey) -> Result<Option<String>> {
        Ok(self
            .get_user(user_id)
            .await?
            .and_then(|user| user.selection_on(date).map(str::to_string)))
    }

    /// Remove the entry for `date`. Clearing a missing entry, or a missing
    /// user, succeeds.
    pub async fn clear_selection(&self, user_id: &str, date: &DateKey) -> Result<()> {
        let result = self
            .write(user_id, vec![(FieldPath::selection(date), FieldUpdate::Delete)])
            .await;
        match result {
            Ok(()) => {
                tracing::info!(user_id, date = %date, "Selection cleared");
                Ok(())
            }
            Err(AppError::NotFound(_)) => {
                tracing::debug!(user_id, date = %date, "No user to clear selection for");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// The full day→place map for a user (empty if the user is absent).
    pub async fn selections_of(&self, user_id: &str) -> Result<BTreeMap<DateKey, String>> {
        Ok(self
            .get_user(user_id)
            .await?
            .map(|user| user.dates_and_place_ids)
            .unwrap_or_default())
    }

    // ─── Favorites ───────────────────────────────────────────────

    /// Add a place to the user's favorites. Adding twice is a no-op.
    pub async fn add_favorite(&self, user_id: &str, place_id: &str) -> Result<()> {
        self.write(
            user_id,
            vec![(
                FieldPath::field(fields::FAVORITE_PLACE_IDS),
                FieldUpdate::ArrayUnion(vec![Value::String(place_id.to_string())]),
            )],
        )
        .await?;
        tracing::info!(user_id, place_id, "Favorite added");
        Ok(())
    }

    /// Remove a place from the user's favorites. Missing entries are ignored.
    pub async fn remove_favorite(&self, user_id: &str, place_id: &str) -> Result<()> {
        let result = self
            .write(
                user_id,
                vec![(
                    FieldPath::field(fields::FAVORITE_PLACE_IDS),
                    FieldUpdate::ArrayRemove(vec![Value::String(place_id.to_string())]),
                )],
            )
            .await;
        match result {
            Ok(()) | Err(AppError::NotFound(_)) => {
                tracing::info!(user_id, place_id, "Favorite removed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn favorites_of(&self, user_id: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .get_user(user_id)
            .await?
            .map(|user| user.favorite_place_ids)
            .unwrap_or_default())
    }

    // ─── Queries ─────────────────────────────────────────────────

    /// Users whose selection for `date` is `place_id`.
    pub async fn users_by_place_and_date(
        &self,
        place_id: &str,
        date: &DateKey,
    ) -> Result<Vec<UserRecord>> {
        self.query(QueryFilter::Equals(
            FieldPath::selection(date),
            Value::String(place_id.to_string()),
        ))
        .await
    }

    /// Users with `place_id` among their favorites.
    pub async fn users_with_favorite(&self, place_id: &str) -> Result<Vec<UserRecord>> {
        self.query(QueryFilter::ArrayContains(
            FieldPath::field(fields::FAVORITE_PLACE_IDS),
            Value::String(place_id.to_string()),
        ))
        .await
    }

    /// Users who chose `place_id` on any day.
    ///
    /// Map values cannot be queried directly, so this scans the collection.
    pub async fn users_by_place(&self, place_id: &str) -> Result<Vec<UserRecord>> {
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .filter(|user| {
                user.dates_and_place_ids
                    .values()
                    .any(|chosen| chosen == place_id)
            })
            .collect())
    }

    // ─── Helper Methods ──────────────────────────────────────────

    async fn write(&self, id: &str, updates: Vec<(FieldPath, FieldUpdate)>) -> Result<()> {
        self.store
            .update(&self.collection, id, updates)
            .await
            .map_err(|e| {
                tracing::warn!(user_id = id, error = %e, "User update failed");
                AppError::from_write(e)
            })
    }

    async fn query(&self, filter: QueryFilter) -> Result<Vec<UserRecord>> {
        let documents = self
            .store
            .query(&self.collection, filter)
            .await
            .map_err(AppError::from_read)?;
        Ok(decode_all(documents))
    }
}

fn encode(record: &UserRecord) -> Result<Document> {
    match serde_json::to_value(record).context("Failed to encode user")? {
        Value::Object(document) => Ok(document),
        _ => Err(anyhow::anyhow!("User record did not serialize to an object").into()),
    }
}

fn decode(document: Document) -> Result<UserRecord> {
    let record = serde_json::from_value(Value::Object(document))
        .context("Malformed user document")?;
    Ok(record)
}

/// Decode a scan result, dropping documents that are not users.
fn decode_all(documents: Vec<Document>) -> Vec<UserRecord> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get("id").cloned();
            match decode(document) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(document_id = ?id, error = %e, "Skipping malformed user document");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn repo() -> (UserRepository, MemoryStore) {
        let store = MemoryStore::new();
        (UserRepository::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_encode_decode_keeps_selections() {
        let mut user = UserRecord::new("u1");
        user.dates_and_place_ids
            .insert(DateKey::parse("2024-05-01").unwrap(), "placeA".to_string());

        let decoded = decode(encode(&user).unwrap()).unwrap();
        assert_eq!(decoded, user);
    }

    #[tokio::test]
    async fn test_malformed_document_is_internal_error() {
        let (repo, store) = repo();
        let mut document = Document::new();
        document.insert("id".to_string(), Value::from(42));
        store.set("users", "bad", document).await.unwrap();

        let result = repo.get_user("bad").await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_scans_skip_malformed_documents() {
        let (repo, store) = repo();
        repo.create_user(&UserRecord::new("u1")).await.unwrap();
        let date = DateKey::parse("2024-05-01").unwrap();
        repo.set_selection("u1", &date, "placeA").await.unwrap();

        let mut document = Document::new();
        document.insert("id".to_string(), Value::from(42));
        document.insert(
            "datesAndPlaceIds".to_string(),
            serde_json::json!({ "2024-05-01": "placeA" }),
        );
        store.set("users", "bad", document).await.unwrap();

        let users = repo.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "u1");

        let on_day = repo.users_by_place_and_date("placeA", &date).await.unwrap();
        assert_eq!(on_day.len(), 1);
        assert_eq!(repo.users_by_place("placeA").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_collection_is_isolated() {
        let store = MemoryStore::new();
        let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let staging = UserRepository::with_collection(shared.clone(), "users_staging");
        let prod = UserRepository::new(shared);

        staging.create_user(&UserRecord::new("u1")).await.unwrap();

        assert!(prod.get_user("u1").await.unwrap().is_none());
        assert_eq!(store.len("users_staging"), 1);
    }
}
