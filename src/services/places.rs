// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Place aggregation: who is lunching where, and how liked a place is.
//!
//! All views are recomputed from the store on each call. Nothing here is a
//! maintained index; live views are kept fresh by the subscription hub.

use crate::error::Result;
use crate::models::{DateKey, LikesCount, PlaceSelectionView, PlaceStatus, UserRecord};
use crate::services::UserRepository;
use futures_util::{stream, Stream, StreamExt};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_MAX_CONCURRENT_PLACE_QUERIES: usize = 16;

/// Outcome of classifying one candidate place.
#[derive(Debug, Clone)]
pub struct PlaceClassification {
    pub place_id: String,
    pub outcome: Result<PlaceStatus>,
}

/// Derived views over user records, keyed by place.
#[derive(Clone)]
pub struct PlaceAggregationService {
    users: UserRepository,
    max_concurrent: usize,
}

impl PlaceAggregationService {
    pub fn new(users: UserRepository, max_concurrent: usize) -> Self {
        Self {
            users,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Point-in-time set of users whose selection for `date` is `place_id`.
    pub async fn users_by_place_and_date(
        &self,
        place_id: &str,
        date: &DateKey,
    ) -> Result<PlaceSelectionView> {
        let users = self.users.users_by_place_and_date(place_id, date).await?;
        tracing::debug!(place_id, date = %date, count = users.len(), "Resolved place selections");
        Ok(PlaceSelectionView {
            place_id: place_id.to_string(),
            date: date.clone(),
            users,
        })
    }

    /// Users who chose `place_id` on any day.
    pub async fn users_by_place(&self, place_id: &str) -> Result<Vec<UserRecord>> {
        self.users.users_by_place(place_id).await
    }

    /// Number of distinct users with `place_id` in their favorites.
    pub async fn likes_count_for_place(&self, place_id: &str) -> Result<LikesCount> {
        let likes = self
            .users
            .users_with_favorite(place_id)
            .await?
            .iter()
            .map(|user| user.id.as_str())
            .collect::<HashSet<_>>()
            .len();
        Ok(LikesCount {
            place_id: place_id.to_string(),
            likes,
        })
    }

    /// Classify candidate places as selected or unselected for `date`.
    ///
    /// One query per place, issued concurrently up to the configured limit.
    /// Results are yielded as each query completes, so a slow place never
    /// holds back the others. Duplicate ids are classified once. A failed
    /// query yields an error for that place only.
    pub fn classify_places(
        &self,
        place_ids: Vec<String>,
        date: DateKey,
    ) -> impl Stream<Item = PlaceClassification> + Send + 'static {
        let mut seen = HashSet::new();
        let place_ids: Vec<String> = place_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let users = self.users.clone();
        stream::iter(place_ids)
            .map(move |place_id| {
                let users = users.clone();
                let date = date.clone();
                async move {
                    let outcome = users
                        .users_by_place_and_date(&place_id, &date)
                        .await
                        .map(|matched| PlaceStatus::from_user_count(matched.len()));
                    if let Err(e) = &outcome {
                        tracing::warn!(place_id = %place_id, error = %e, "Place classification failed");
                    }
                    PlaceClassification { place_id, outcome }
                }
            })
            .buffer_unordered(self.max_concurrent)
    }

    /// Classify every place and wait for all of them.
    pub async fn classify_all(
        &self,
        place_ids: Vec<String>,
        date: DateKey,
    ) -> HashMap<String, Result<PlaceStatus>> {
        self.classify_places(place_ids, date)
            .map(|classification| (classification.place_id, classification.outcome))
            .collect()
            .await
    }
}
