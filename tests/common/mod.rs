// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use lunch_sync::config::Config;
use lunch_sync::db::{
    Document, DocumentStore, FieldPath, FieldUpdate, FirestoreStore, MemoryStore, QueryFilter,
    StoreError,
};
use lunch_sync::models::DateKey;
use lunch_sync::routes::create_router;
use lunch_sync::services::{LunchService, UserRepository};
use lunch_sync::AppState;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a Firestore connection (emulator).
#[allow(dead_code)]
pub async fn test_firestore() -> FirestoreStore {
    FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[allow(dead_code)]
pub fn day(raw: &str) -> DateKey {
    DateKey::parse(raw).expect("valid date key")
}

/// Unique id for test isolation against a shared store.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

/// Service over a fresh in-memory store.
#[allow(dead_code)]
pub fn test_service() -> (LunchService, MemoryStore) {
    let store = MemoryStore::new();
    let service = service_over(Arc::new(store.clone()));
    (service, store)
}

#[allow(dead_code)]
pub fn service_over(store: Arc<dyn DocumentStore>) -> LunchService {
    LunchService::new(UserRepository::new(store), 8)
}

/// Create a test app over an in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryStore) {
    let store = MemoryStore::new();
    let state = Arc::new(AppState::new(
        Config::test_default(),
        Arc::new(store.clone()),
    ));
    (create_router(state.clone()), state, store)
}

/// Store wrapper that can hold or fail individual queries.
///
/// - queries whose filter value equals `failing_value` fail with `Unavailable`
/// - while a gate is armed, the next query reads its result and then waits
///   for the gate to open before returning it (a slow, late completion)
#[derive(Clone)]
#[allow(dead_code)]
pub struct ScriptedStore {
    pub inner: MemoryStore,
    failing_value: Arc<Mutex<Option<Value>>>,
    held_value: Arc<Mutex<Option<Value>>>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
    pub entered: Arc<Notify>,
}

#[allow(dead_code)]
impl ScriptedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing_value: Arc::new(Mutex::new(None)),
            held_value: Arc::new(Mutex::new(None)),
            gate: Arc::new(Mutex::new(None)),
            entered: Arc::new(Notify::new()),
        }
    }

    pub fn fail_queries_for(&self, value: &str) {
        *self.failing_value.lock().unwrap() = Some(Value::String(value.to_string()));
    }

    /// Hold every query for `value` until the returned gate is opened.
    pub fn hold_queries_for(&self, value: &str) -> Arc<Notify> {
        *self.held_value.lock().unwrap() = Some(Value::String(value.to_string()));
        self.arm_gate()
    }

    /// Hold the next query, whatever it filters on.
    pub fn hold_next_query(&self) -> Arc<Notify> {
        *self.held_value.lock().unwrap() = None;
        self.arm_gate()
    }

    fn arm_gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn filter_value(filter: &QueryFilter) -> &Value {
        match filter {
            QueryFilter::Equals(_, value) | QueryFilter::ArrayContains(_, value) => value,
        }
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        self.inner.set(collection, id, document).await
    }

    async fn create(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.inner.create(collection, id, document).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(FieldPath, FieldUpdate)>,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, updates).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        filter: QueryFilter,
    ) -> Result<Vec<Document>, StoreError> {
        let value = Self::filter_value(&filter).clone();
        if self.failing_value.lock().unwrap().as_ref() == Some(&value) {
            return Err(StoreError::Unavailable(format!("scripted failure for {}", value)));
        }

        let result = self.inner.query(collection, filter).await;

        let gate = {
            let held = self.held_value.lock().unwrap();
            let applies = held.as_ref().map_or(true, |held| *held == value);
            if applies {
                self.gate.lock().unwrap().take()
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            self.entered.notify_one();
            gate.notified().await;
        }

        result
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.inner.list_all(collection).await
    }
}
