// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Place-centric routes: who is lunching where, likes, and live streams.

use crate::error::{AppError, Result};
use crate::models::{LikesCount, PlaceSelectionView, PlaceStatus, UserRecord};
use crate::routes::{parse_date, validate_id};
use crate::services::places::PlaceClassification;
use crate::services::{Query, QueryState, QueryValue};
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

/// Most places accepted in one classification request.
const MAX_PLACES_PER_REQUEST: usize = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/places/{place_id}/selections/{date}",
            get(get_place_selections),
        )
        .route(
            "/api/places/{place_id}/selections/{date}/events",
            get(stream_place_selections),
        )
        .route("/api/places/{place_id}/users", get(get_place_users))
        .route("/api/places/{place_id}/likes", get(get_likes))
        .route("/api/places/status", post(classify_places))
}

async fn get_place_selections(
    State(state): State<Arc<AppState>>,
    Path((place_id, date)): Path<(String, String)>,
) -> Result<Json<PlaceSelectionView>> {
    validate_id("Place id", &place_id)?;
    let date = parse_date(&date)?;
    Ok(Json(
        state.lunch.users_by_place_and_date(&place_id, &date).await?,
    ))
}

async fn get_place_users(
    State(state): State<Arc<AppState>>,
    Path(place_id): Path<String>,
) -> Result<Json<Vec<UserRecord>>> {
    validate_id("Place id", &place_id)?;
    Ok(Json(state.lunch.users_by_place(&place_id).await?))
}

async fn get_likes(
    State(state): State<Arc<AppState>>,
    Path(place_id): Path<String>,
) -> Result<Json<LikesCount>> {
    validate_id("Place id", &place_id)?;
    Ok(Json(state.lunch.likes_count_for_place(&place_id).await?))
}

// ─── Live Streams ────────────────────────────────────────────

/// Live list of users lunching at a place on a day.
///
/// Sends the current state right away, then one event per change. The
/// subscription ends when the client disconnects.
async fn stream_place_selections(
    State(state): State<Arc<AppState>>,
    Path((place_id, date)): Path<(String, String)>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    validate_id("Place id", &place_id)?;
    let date = parse_date(&date)?;

    let subscription = state
        .lunch
        .subscribe(Query::UsersByPlaceAndDate { place_id, date });
    let events = subscription
        .into_stream()
        .map(|query_state| Ok(query_state_event(query_state)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyRequest {
    date: String,
    place_ids: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationEvent {
    place_id: String,
    #[serde(flatten)]
    status: PlaceStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationError {
    place_id: String,
    error: String,
}

/// Classify nearby places as selected or not for a day.
///
/// Each place is streamed back as soon as its own query finishes.
async fn classify_places(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClassifyRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let date = parse_date(&body.date)?;
    if body.place_ids.len() > MAX_PLACES_PER_REQUEST {
        return Err(AppError::BadRequest(format!(
            "At most {} places per request",
            MAX_PLACES_PER_REQUEST
        )));
    }
    for place_id in &body.place_ids {
        validate_id("Place id", place_id)?;
    }

    tracing::debug!(date = %date, places = body.place_ids.len(), "Classifying places");

    let events = state
        .lunch
        .classify_places(body.place_ids, date)
        .map(|classification| Ok(classification_event(classification)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn classification_event(classification: PlaceClassification) -> Event {
    let PlaceClassification { place_id, outcome } = classification;
    match outcome {
        Ok(status) => json_event("place", &ClassificationEvent { place_id, status }),
        Err(e) => json_event(
            "place_error",
            &ClassificationError {
                place_id,
                error: e.to_string(),
            },
        ),
    }
}

#[derive(Serialize)]
struct FailedState {
    error: String,
}

fn query_state_event(state: QueryState) -> Event {
    match state {
        QueryState::Pending => Event::default().event("pending").data("{}"),
        QueryState::Ready(QueryValue::Users(users)) => json_event("users", &users),
        QueryState::Ready(QueryValue::User(user)) => json_event("user", &user),
        QueryState::Ready(QueryValue::Selection(place_id)) => json_event("selection", &place_id),
        QueryState::Ready(QueryValue::Likes(likes)) => json_event("likes", &likes),
        QueryState::Failed(e) => json_event(
            "error",
            &FailedState {
                error: e.to_string(),
            },
        ),
    }
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(payload)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, event = name, "Failed to encode event");
            Event::default().event("error").data("{}")
        })
}
