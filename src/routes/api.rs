// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for user records, day selections and favorites.

use crate::error::Result;
use crate::models::{DateKey, UserRecord};
use crate::routes::{parse_date, validate_id};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_USERNAME_LEN: usize = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", get(get_user).delete(delete_user))
        .route("/api/users/{id}/username", put(update_username))
        .route(
            "/api/users/{id}/chosen-restaurant",
            put(update_chosen_restaurant),
        )
        .route("/api/users/{id}/selections", get(get_selections))
        .route(
            "/api/users/{id}/selections/{date}",
            get(get_selection)
                .put(set_selection)
                .delete(clear_selection),
        )
        .route("/api/users/{id}/favorites", get(get_favorites))
        .route(
            "/api/users/{id}/favorites/{place_id}",
            put(add_favorite).delete(remove_favorite),
        )
}

// ─── User Records ────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest {
    id: String,
    username: Option<String>,
    email: Option<String>,
    photo_url: Option<String>,
}

/// Create a user, or return the one already stored under that id.
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<UserRecord>> {
    validate_id("User id", &body.id)?;
    if let Some(username) = &body.username {
        validate_username(username)?;
    }

    let mut record = UserRecord::new(body.id);
    record.username = body.username;
    record.email = body.email;
    record.photo_url = body.photo_url;

    Ok(Json(state.lunch.create_user(&record).await?))
}

/// Get a user. Absent users are `null`, not 404.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Option<UserRecord>>> {
    validate_id("User id", &id)?;
    Ok(Json(state.lunch.get_user(&id).await?))
}

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserRecord>>> {
    Ok(Json(state.lunch.list_users().await?))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    validate_id("User id", &id)?;
    tracing::info!(user_id = %id, "User deletion requested");
    state.lunch.delete_user(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UsernameBody {
    pub username: String,
}

async fn update_username(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UsernameBody>,
) -> Result<Json<UsernameBody>> {
    validate_id("User id", &id)?;
    validate_username(&body.username)?;
    let username = state.lunch.update_username(&id, &body.username).await?;
    Ok(Json(UsernameBody { username }))
}

#[derive(Deserialize)]
struct ChosenRestaurantBody {
    name: Option<String>,
}

async fn update_chosen_restaurant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ChosenRestaurantBody>,
) -> Result<StatusCode> {
    validate_id("User id", &id)?;
    state
        .lunch
        .update_chosen_restaurant_name(&id, body.name.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Day Selections ──────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    pub date: String,
    pub place_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetSelectionBody {
    place_id: String,
    restaurant_name: Option<String>,
}

async fn get_selections(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BTreeMap<DateKey, String>>> {
    validate_id("User id", &id)?;
    Ok(Json(state.lunch.selections_of(&id).await?))
}

async fn get_selection(
    State(state): State<Arc<AppState>>,
    Path((id, date)): Path<(String, String)>,
) -> Result<Json<SelectionResponse>> {
    validate_id("User id", &id)?;
    let date = parse_date(&date)?;
    let place_id = state.lunch.get_selection(&id, &date).await?;
    Ok(Json(SelectionResponse {
        date: date.to_string(),
        place_id,
    }))
}

async fn set_selection(
    State(state): State<Arc<AppState>>,
    Path((id, date)): Path<(String, String)>,
    Json(body): Json<SetSelectionBody>,
) -> Result<Json<SelectionResponse>> {
    validate_id("User id", &id)?;
    validate_id("Place id", &body.place_id)?;
    let date = parse_date(&date)?;

    let place_id = state
        .lunch
        .set_selection(&id, &date, &body.place_id, body.restaurant_name.as_deref())
        .await?;

    Ok(Json(SelectionResponse {
        date: date.to_string(),
        place_id: Some(place_id),
    }))
}

async fn clear_selection(
    State(state): State<Arc<AppState>>,
    Path((id, date)): Path<(String, String)>,
) -> Result<StatusCode> {
    validate_id("User id", &id)?;
    let date = parse_date(&date)?;
    state.lunch.clear_selection(&id, &date).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Favorites ───────────────────────────────────────────────

async fn get_favorites(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BTreeSet<String>>> {
    validate_id("User id", &id)?;
    Ok(Json(state.lunch.favorites_of(&id).await?))
}

async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Path((id, place_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    validate_id("User id", &id)?;
    validate_id("Place id", &place_id)?;
    state.lunch.add_favorite(&id, &place_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Path((id, place_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    validate_id("User id", &id)?;
    validate_id("Place id", &place_id)?;
    state.lunch.remove_favorite(&id, &place_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_username(username: &str) -> Result<()> {
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(crate::error::AppError::BadRequest(format!(
            "Username longer than {} characters",
            MAX_USERNAME_LEN
        )));
    }
    Ok(())
}
