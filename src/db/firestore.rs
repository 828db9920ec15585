// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed document store.
//!
//! Maps the [`DocumentStore`] contract onto Firestore:
//! - field updates become an update mask with an `exists` precondition
//! - array sentinels become server-side transforms
//! - conditional create uses a Firestore insert (fails if the document exists)

use crate::db::field_path::FieldPath;
use crate::db::store::{Document, DocumentStore, FieldUpdate, QueryFilter, StoreError};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use serde_json::Value;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All store operations fail with `Unavailable`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("Database not connected (offline mode)".to_string()))
    }
}

/// Translate a Firestore error into the store taxonomy.
fn map_err(err: FirestoreError) -> StoreError {
    match err {
        FirestoreError::DataNotFoundError(e) => StoreError::NotFound(e.to_string()),
        FirestoreError::DataConflictError(e) => StoreError::AlreadyExists(e.to_string()),
        FirestoreError::SerializeError(e) => StoreError::Serialization(e.to_string()),
        FirestoreError::DeserializeError(e) => StoreError::Serialization(e.to_string()),
        other => StoreError::Unavailable(other.to_string()),
    }
}

/// Build the body and mask for the `Set`/`Delete` part of an update.
///
/// Deleted fields are named in the mask but left out of the body, which is
/// how Firestore expresses field removal.
fn masked_write(updates: &[(FieldPath, FieldUpdate)]) -> (Document, Vec<String>) {
    let mut body = Document::new();
    let mut mask = Vec::new();

    for (path, update) in updates {
        match update {
            FieldUpdate::Set(value) => {
                insert_nested(&mut body, path.segments(), value.clone());
                mask.push(path.to_firestore());
            }
            FieldUpdate::Delete => mask.push(path.to_firestore()),
            FieldUpdate::ArrayUnion(_) | FieldUpdate::ArrayRemove(_) => {}
        }
    }

    (body, mask)
}

fn insert_nested(body: &mut Document, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = body;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Document::new()));
        current = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }
    current.insert(last.clone(), value);
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj::<Document>()
            .one(id)
            .await
            .map_err(map_err)
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(&document)
            .execute()
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn create(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .object(&document)
            .execute()
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(FieldPath, FieldUpdate)>,
    ) -> Result<(), StoreError> {
        let client = self.get_client()?;
        let (body, mask) = masked_write(&updates);
        let transforms: Vec<&(FieldPath, FieldUpdate)> = updates
            .iter()
            .filter(|(_, update)| update.is_transform())
            .collect();

        // Mask write and transforms commit together or not at all.
        let mut transaction = client.begin_transaction().await.map_err(map_err)?;

        if !mask.is_empty() {
            client
                .fluent()
                .update()
                .fields(mask.iter())
                .in_col(collection)
                .precondition(firestore::FirestoreWritePrecondition::Exists(true))
                .document_id(id)
                .object(&body)
                .add_to_transaction(&mut transaction)
                .map_err(map_err)?;
        }

        if !transforms.is_empty() {
            client
                .fluent()
                .update()
                .in_col(collection)
                .precondition(firestore::FirestoreWritePrecondition::Exists(true))
                .document_id(id)
                .transforms(|t| {
                    t.fields(transforms.iter().map(|(path, update)| match update {
                        FieldUpdate::ArrayUnion(values) => t
                            .field(path.to_firestore())
                            .append_missing_elements(values.clone()),
                        FieldUpdate::ArrayRemove(values) => t
                            .field(path.to_firestore())
                            .remove_all_from_array(values.clone()),
                        FieldUpdate::Set(_) | FieldUpdate::Delete => None,
                    }))
                })
                .only_transform()
                .add_to_transaction(&mut transaction)
                .map_err(map_err)?;
        }

        transaction.commit().await.map_err(map_err)?;

        tracing::debug!(
            collection,
            id,
            fields = mask.len(),
            transforms = transforms.len(),
            "Applied field update"
        );
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filter: QueryFilter,
    ) -> Result<Vec<Document>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| match &filter {
                QueryFilter::Equals(path, value) => q.field(path.to_firestore()).eq(value.clone()),
                QueryFilter::ArrayContains(path, value) => {
                    q.field(path.to_firestore()).array_contains(value.clone())
                }
            })
            .obj::<Document>()
            .query()
            .await
            .map_err(map_err)
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collection)
            .obj::<Document>()
            .query()
            .await
            .map_err(map_err)
    }
}
