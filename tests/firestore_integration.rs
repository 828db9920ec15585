// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at it.
//!
//! Every test uses fresh ids, so runs never see each other's documents.

use lunch_sync::error::AppError;
use lunch_sync::models::UserRecord;
use lunch_sync::services::UserRepository;
use std::sync::Arc;

mod common;
use common::{day, service_over, test_firestore, unique_id};

#[tokio::test]
async fn test_user_create_and_get() {
    require_emulator!();

    let service = service_over(Arc::new(test_firestore().await));
    let id = unique_id("user");

    assert!(service.get_user(&id).await.unwrap().is_none());

    let record = UserRecord::new(&id)
        .with_username("Test User")
        .with_email("test@example.com");
    let stored = service.create_user(&record).await.unwrap();
    assert_eq!(stored, record);

    let fetched = service.get_user(&id).await.unwrap().unwrap();
    assert_eq!(fetched.username.as_deref(), Some("Test User"));

    // A second create with a different payload keeps the first.
    let again = service
        .create_user(&UserRecord::new(&id).with_username("Other"))
        .await
        .unwrap();
    assert_eq!(again.username.as_deref(), Some("Test User"));

    service.delete_user(&id).await.unwrap();
    assert!(service.get_user(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_selection_updates_touch_one_day() {
    require_emulator!();

    let service = service_over(Arc::new(test_firestore().await));
    let id = unique_id("user");
    service.create_user(&UserRecord::new(&id)).await.unwrap();
    let may_1 = day("2024-05-01");
    let may_2 = day("2024-05-02");

    service.set_selection(&id, &may_1, "placeA", None).await.unwrap();
    service.set_selection(&id, &may_2, "placeB", None).await.unwrap();
    service.clear_selection(&id, &may_1).await.unwrap();
    service.clear_selection(&id, &may_1).await.unwrap();

    let selections = service.selections_of(&id).await.unwrap();
    assert_eq!(selections.len(), 1);
    assert_eq!(selections.get(&may_2).map(String::as_str), Some("placeB"));

    service.delete_user(&id).await.unwrap();
}

#[tokio::test]
async fn test_update_missing_user_is_not_found() {
    require_emulator!();

    let service = service_over(Arc::new(test_firestore().await));
    let id = unique_id("ghost");

    let result = service.update_username(&id, "Nobody").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(service.get_user(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_users_by_place_and_date_query() {
    require_emulator!();

    let service = service_over(Arc::new(test_firestore().await));
    let place = unique_id("place");
    let date = day("2024-05-01");
    let ids = [unique_id("u0"), unique_id("u1"), unique_id("u2")];

    for id in &ids {
        service.create_user(&UserRecord::new(id)).await.unwrap();
    }
    service.set_selection(&ids[0], &date, &place, None).await.unwrap();
    service.set_selection(&ids[1], &date, &place, None).await.unwrap();
    service
        .set_selection(&ids[2], &day("2024-05-02"), &place, None)
        .await
        .unwrap();

    let view = service.users_by_place_and_date(&place, &date).await.unwrap();
    assert_eq!(view.users.len(), 2);

    for id in &ids {
        service.delete_user(id).await.unwrap();
    }
}

#[tokio::test]
async fn test_favorites_sentinels() {
    require_emulator!();

    let store = Arc::new(test_firestore().await);
    let repo = UserRepository::new(store.clone());
    let service = service_over(store);
    let place = unique_id("place");
    let id = unique_id("user");
    service.create_user(&UserRecord::new(&id)).await.unwrap();

    repo.add_favorite(&id, &place).await.unwrap();
    repo.add_favorite(&id, &place).await.unwrap();
    assert_eq!(service.likes_count_for_place(&place).await.unwrap().likes, 1);

    repo.remove_favorite(&id, &place).await.unwrap();
    assert_eq!(service.likes_count_for_place(&place).await.unwrap().likes, 0);

    service.delete_user(&id).await.unwrap();
}
