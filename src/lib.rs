// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Lunch-Sync: keep track of where everybody is having lunch
//!
//! This crate provides the synchronization layer behind a lunch coordination
//! app: per-user, per-day restaurant selections and favorites stored in a
//! remote document store, aggregated per place, and pushed live to observers.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::{Config, StoreBackend};
use db::{DocumentStore, FirestoreStore, MemoryStore, StoreError};
use services::{LunchService, UserRepository};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub lunch: LunchService,
}

impl AppState {
    /// Wire the service stack on top of an already connected store.
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let users = UserRepository::with_collection(store, config.users_collection.clone());
        let lunch = LunchService::new(users, config.max_concurrent_place_queries);
        Self { config, lunch }
    }
}

/// Connect the store selected by `config`.
pub async fn connect_store(config: &Config) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.store_backend {
        StoreBackend::Firestore => {
            let store = FirestoreStore::new(&config.gcp_project_id).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
