// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Day keys and the views derived from per-day place selections.

use crate::models::UserRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Calendar day used as the key of `datesAndPlaceIds`.
///
/// Always the canonical `YYYY-MM-DD` form. No timezone conversion happens
/// here: callers decide which day "today" is before building a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(String);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid date key {0:?}, expected YYYY-MM-DD")]
pub struct DateKeyError(pub String);

impl DateKey {
    /// Parse a canonical `YYYY-MM-DD` key.
    ///
    /// Non-padded or otherwise non-canonical spellings are rejected so that two
    /// keys for the same day are always byte-equal.
    pub fn parse(raw: &str) -> Result<Self, DateKeyError> {
        let date = NaiveDate::parse_from_str(raw, DATE_KEY_FORMAT)
            .map_err(|_| DateKeyError(raw.to_string()))?;
        let key = Self::from(date);
        if key.0 != raw {
            return Err(DateKeyError(raw.to_string()));
        }
        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date.format(DATE_KEY_FORMAT).to_string())
    }
}

impl TryFrom<String> for DateKey {
    type Error = DateKeyError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Users who chose a place on a given day. Recomputed on every query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSelectionView {
    pub place_id: String,
    pub date: DateKey,
    pub users: Vec<UserRecord>,
}

impl PlaceSelectionView {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Whether anybody is lunching at a place on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlaceStatus {
    Selected { users: usize },
    Unselected,
}

impl PlaceStatus {
    pub fn from_user_count(users: usize) -> Self {
        if users == 0 {
            PlaceStatus::Unselected
        } else {
            PlaceStatus::Selected { users }
        }
    }
}

/// Number of users with a place among their favorites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikesCount {
    pub place_id: String,
    pub likes: usize,
}
