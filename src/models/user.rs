// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use crate::models::DateKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Document field names as stored in the `users` collection.
pub mod fields {
    pub const ID: &str = "id";
    pub const USERNAME: &str = "username";
    pub const EMAIL: &str = "email";
    pub const PHOTO_URL: &str = "photoUrl";
    pub const DATES_AND_PLACE_IDS: &str = "datesAndPlaceIds";
    pub const FAVORITE_PLACE_IDS: &str = "favoritePlaceIds";
    pub const CHOSEN_RESTAURANT_NAME: &str = "chosenRestaurantName";
}

/// User profile stored in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Identifier from the sign-in provider (also used as document ID)
    pub id: String,
    /// Display name
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Profile picture URL
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Chosen place per calendar day
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "Record<string, string>"))]
    pub dates_and_place_ids: BTreeMap<DateKey, String>,
    #[serde(default)]
    pub favorite_place_ids: BTreeSet<String>,
    /// Denormalized name of the current selection, for display
    #[serde(default)]
    pub chosen_restaurant_name: Option<String>,
}

impl UserRecord {
    /// A bare record with no profile fields and no selections.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            email: None,
            photo_url: None,
            dates_and_place_ids: BTreeMap::new(),
            favorite_place_ids: BTreeSet::new(),
            chosen_restaurant_name: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Place chosen on `date`, if any.
    pub fn selection_on(&self, date: &DateKey) -> Option<&str> {
        self.dates_and_place_ids.get(date).map(String::as_str)
    }

    /// True if the user chose `place_id` on `date`.
    pub fn selected(&self, place_id: &str, date: &DateKey) -> bool {
        self.selection_on(date) == Some(place_id)
    }

    pub fn has_favorite(&self, place_id: &str) -> bool {
        self.favorite_place_ids.contains(place_id)
    }
}
