// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lunch coordination service.
//!
//! Single entry point for callers. Writes go through the repository and,
//! once the store acknowledges them, every live query they may affect is
//! re-evaluated and pushed to its observers.

use crate::error::Result;
use crate::models::{DateKey, LikesCount, PlaceSelectionView, PlaceStatus, UserRecord};
use crate::services::places::PlaceClassification;
use crate::services::subscriptions::{Change, Query, Subscription};
use crate::services::{PlaceAggregationService, SubscriptionHub, UserRepository};
use futures_util::Stream;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Clone)]
pub struct LunchService {
    users: UserRepository,
    places: PlaceAggregationService,
    hub: SubscriptionHub,
}

impl LunchService {
    pub fn new(users: UserRepository, max_concurrent_place_queries: usize) -> Self {
        let places = PlaceAggregationService::new(users.clone(), max_concurrent_place_queries);
        let hub = SubscriptionHub::new(users.clone(), places.clone());
        Self { users, places, hub }
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn places(&self) -> &PlaceAggregationService {
        &self.places
    }

    pub fn hub(&self) -> &SubscriptionHub {
        &self.hub
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn create_user(&self, record: &UserRecord) -> Result<UserRecord> {
        let stored = self.users.create_user(record).await?;
        self.hub
            .publish(&Change::Membership {
                user_id: stored.id.clone(),
            })
            .await;
        Ok(stored)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        self.users.get_user(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserRecord>> {
        self.users.list_users().await
    }

    pub async fn update_username(&self, id: &str, username: &str) -> Result<String> {
        let updated = self.users.update_username(id, username).await?;
        self.publish_profile(id).await;
        Ok(updated)
    }

    pub async fn update_chosen_restaurant_name(&self, id: &str, name: Option<&str>) -> Result<()> {
        self.users.update_chosen_restaurant_name(id, name).await?;
        self.publish_profile(id).await;
        Ok(())
    }

    /// Delete the user document and refresh every view that may include it.
    ///
    /// Scheduled reminders or other state held outside the store are the
    /// caller's to clean up.
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.users.delete_user(id).await?;
        self.hub
            .publish(&Change::Membership {
                user_id: id.to_string(),
            })
            .await;
        Ok(())
    }

    // ─── Selections ──────────────────────────────────────────────

    /// Choose a place for a day.
    ///
    /// When `restaurant_name` is given the denormalized display name is also
    /// written. That second write is best-effort: if it fails the selection
    /// stands and the failure is only logged.
    pub async fn set_selection(
        &self,
        user_id: &str,
        date: &DateKey,
        place_id: &str,
        restaurant_name: Option<&str>,
    ) -> Result<String> {
        let written = self.users.set_selection(user_id, date, place_id).await?;

        if let Some(name) = restaurant_name {
            if let Err(e) = self
                .users
                .update_chosen_restaurant_name(user_id, Some(name))
                .await
            {
                tracing::warn!(
                    user_id,
                    place_id,
                    error = %e,
                    "Failed to store chosen restaurant name, selection kept"
                );
            }
        }

        self.hub
            .publish(&Change::Selection {
                user_id: user_id.to_string(),
                date: date.clone(),
            })
            .await;
        Ok(written)
    }

    pub async fn get_selection(&self, user_id: &str, date: &DateKey) -> Result<Option<String>> {
        self.users.get_selection(user_id, date).await
    }

    pub async fn selections_of(&self, user_id: &str) -> Result<BTreeMap<DateKey, String>> {
        self.users.selections_of(user_id).await
    }

    pub async fn clear_selection(&self, user_id: &str, date: &DateKey) -> Result<()> {
        self.users.clear_selection(user_id, date).await?;
        self.hub
            .publish(&Change::Selection {
                user_id: user_id.to_string(),
                date: date.clone(),
            })
            .await;
        Ok(())
    }

    // ─── Favorites ───────────────────────────────────────────────

    pub async fn add_favorite(&self, user_id: &str, place_id: &str) -> Result<()> {
        self.users.add_favorite(user_id, place_id).await?;
        self.publish_favorite(user_id, place_id).await;
        Ok(())
    }

    pub async fn remove_favorite(&self, user_id: &str, place_id: &str) -> Result<()> {
        self.users.remove_favorite(user_id, place_id).await?;
        self.publish_favorite(user_id, place_id).await;
        Ok(())
    }

    pub async fn favorites_of(&self, user_id: &str) -> Result<BTreeSet<String>> {
        self.users.favorites_of(user_id).await
    }

    // ─── Aggregation ─────────────────────────────────────────────

    pub async fn users_by_place_and_date(
        &self,
        place_id: &str,
        date: &DateKey,
    ) -> Result<PlaceSelectionView> {
        self.places.users_by_place_and_date(place_id, date).await
    }

    pub async fn users_by_place(&self, place_id: &str) -> Result<Vec<UserRecord>> {
        self.places.users_by_place(place_id).await
    }

    pub async fn likes_count_for_place(&self, place_id: &str) -> Result<LikesCount> {
        self.places.likes_count_for_place(place_id).await
    }

    pub fn classify_places(
        &self,
        place_ids: Vec<String>,
        date: DateKey,
    ) -> impl Stream<Item = PlaceClassification> + Send + 'static {
        self.places.classify_places(place_ids, date)
    }

    pub async fn classify_all(
        &self,
        place_ids: Vec<String>,
        date: DateKey,
    ) -> HashMap<String, Result<PlaceStatus>> {
        self.places.classify_all(place_ids, date).await
    }

    // ─── Observers ───────────────────────────────────────────────

    pub fn subscribe(&self, query: Query) -> Subscription {
        self.hub.subscribe(query)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.hub.unsubscribe(subscription);
    }

    async fn publish_profile(&self, user_id: &str) {
        self.hub
            .publish(&Change::Profile {
                user_id: user_id.to_string(),
            })
            .await;
    }

    async fn publish_favorite(&self, user_id: &str, place_id: &str) {
        self.hub
            .publish(&Change::Favorite {
                user_id: user_id.to_string(),
                place_id: place_id.to_string(),
            })
            .await;
    }
}
