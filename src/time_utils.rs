// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for turning timestamps into day keys.

use crate::models::DateKey;
use chrono::{DateTime, TimeZone, Utc};

/// Day key for a timestamp, in the timestamp's own timezone.
pub fn date_key_for<Tz: TimeZone>(at: &DateTime<Tz>) -> DateKey {
    DateKey::from(at.date_naive())
}

/// Today's key in UTC.
pub fn today_utc() -> DateKey {
    date_key_for(&Utc::now())
}
