// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Day selection and favorites behavior.

use lunch_sync::db::{DocumentStore, FailureMode};
use lunch_sync::error::AppError;
use lunch_sync::models::UserRecord;
use serde_json::json;

mod common;
use common::{day, test_service};

#[tokio::test]
async fn test_set_selection_records_only_that_day() {
    let (service, _) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();

    let written = service
        .set_selection("u1", &day("2024-05-01"), "placeA", None)
        .await
        .unwrap();

    assert_eq!(written, "placeA");
    let selections = service.selections_of("u1").await.unwrap();
    assert_eq!(selections.len(), 1);
    assert_eq!(selections.get(&day("2024-05-01")).map(String::as_str), Some("placeA"));
}

#[tokio::test]
async fn test_selections_on_different_days_do_not_clobber() {
    let (service, _) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();

    service
        .set_selection("u1", &day("2024-05-01"), "placeA", None)
        .await
        .unwrap();
    service
        .set_selection("u1", &day("2024-05-02"), "placeB", None)
        .await
        .unwrap();

    assert_eq!(
        service.get_selection("u1", &day("2024-05-01")).await.unwrap().as_deref(),
        Some("placeA")
    );
    assert_eq!(
        service.get_selection("u1", &day("2024-05-02")).await.unwrap().as_deref(),
        Some("placeB")
    );
}

#[tokio::test]
async fn test_reselecting_same_day_replaces_place() {
    let (service, _) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();
    let date = day("2024-05-01");

    service.set_selection("u1", &date, "placeA", None).await.unwrap();
    service.set_selection("u1", &date, "placeB", None).await.unwrap();

    assert_eq!(
        service.get_selection("u1", &date).await.unwrap().as_deref(),
        Some("placeB")
    );
    let at_a = service.users_by_place_and_date("placeA", &date).await.unwrap();
    assert!(at_a.is_empty());
}

#[tokio::test]
async fn test_selection_leaves_other_fields_alone() {
    let (service, _) = test_service();
    service
        .create_user(&UserRecord::new("u1").with_username("Ada"))
        .await
        .unwrap();
    service.add_favorite("u1", "placeZ").await.unwrap();

    service
        .set_selection("u1", &day("2024-05-01"), "placeA", None)
        .await
        .unwrap();

    let user = service.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.username.as_deref(), Some("Ada"));
    assert!(user.has_favorite("placeZ"));
}

#[tokio::test]
async fn test_set_selection_for_missing_user_does_not_create() {
    let (service, store) = test_service();

    let result = service
        .set_selection("ghost", &day("2024-05-01"), "placeA", None)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(store.is_empty("users"));
}

#[tokio::test]
async fn test_set_selection_write_failure_keeps_previous_value() {
    let (service, store) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();
    let date = day("2024-05-01");
    service.set_selection("u1", &date, "placeA", None).await.unwrap();

    store.set_failure_mode(FailureMode::RejectWrites);
    let result = service.set_selection("u1", &date, "placeB", None).await;
    assert!(matches!(result, Err(AppError::UpdateFailed(_))));

    store.set_failure_mode(FailureMode::Healthy);
    assert_eq!(
        service.get_selection("u1", &date).await.unwrap().as_deref(),
        Some("placeA")
    );
}

#[tokio::test]
async fn test_set_selection_store_offline() {
    let (service, store) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();

    store.set_failure_mode(FailureMode::Offline);
    let result = service
        .set_selection("u1", &day("2024-05-01"), "placeA", None)
        .await;

    assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
}

#[tokio::test]
async fn test_set_selection_with_restaurant_name() {
    let (service, _) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();

    service
        .set_selection("u1", &day("2024-05-01"), "placeA", Some("Chez Paul"))
        .await
        .unwrap();

    let user = service.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.selection_on(&day("2024-05-01")), Some("placeA"));
    assert_eq!(user.chosen_restaurant_name.as_deref(), Some("Chez Paul"));
}

#[tokio::test]
async fn test_get_selection_absent_cases() {
    let (service, _) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();

    assert_eq!(service.get_selection("u1", &day("2024-05-01")).await.unwrap(), None);
    assert_eq!(service.get_selection("ghost", &day("2024-05-01")).await.unwrap(), None);
    assert!(service.selections_of("ghost").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_selection_store_offline() {
    let (service, store) = test_service();
    store.set_failure_mode(FailureMode::Offline);

    let result = service.get_selection("u1", &day("2024-05-01")).await;
    assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
}

#[tokio::test]
async fn test_clear_selection_is_idempotent() {
    let (service, _) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();
    let may_1 = day("2024-05-01");
    let may_2 = day("2024-05-02");
    service.set_selection("u1", &may_1, "placeA", None).await.unwrap();
    service.set_selection("u1", &may_2, "placeB", None).await.unwrap();

    service.clear_selection("u1", &may_1).await.unwrap();
    service.clear_selection("u1", &may_1).await.unwrap();

    assert_eq!(service.get_selection("u1", &may_1).await.unwrap(), None);
    assert_eq!(
        service.get_selection("u1", &may_2).await.unwrap().as_deref(),
        Some("placeB")
    );
}

#[tokio::test]
async fn test_clear_selection_for_missing_user_succeeds() {
    let (service, store) = test_service();

    service
        .clear_selection("ghost", &day("2024-05-01"))
        .await
        .unwrap();

    assert!(store.is_empty("users"));
}

#[tokio::test]
async fn test_clear_selection_failure_surfaces() {
    let (service, store) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();
    let date = day("2024-05-01");
    service.set_selection("u1", &date, "placeA", None).await.unwrap();

    store.set_failure_mode(FailureMode::RejectWrites);
    let result = service.clear_selection("u1", &date).await;
    assert!(matches!(result, Err(AppError::UpdateFailed(_))));

    store.set_failure_mode(FailureMode::Healthy);
    assert!(service.get_selection("u1", &date).await.unwrap().is_some());
}

#[tokio::test]
async fn test_stored_map_uses_canonical_keys() {
    let (service, store) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();

    service
        .set_selection("u1", &day("2024-05-01"), "placeA", None)
        .await
        .unwrap();

    let raw = store.get("users", "u1").await.unwrap().unwrap();
    assert_eq!(raw["datesAndPlaceIds"], json!({ "2024-05-01": "placeA" }));
}

#[tokio::test]
async fn test_concurrent_selections_on_different_days_all_land() {
    let (service, _) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();

    let mut handles = Vec::new();
    for d in 1..=9 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let date = day(&format!("2024-05-0{}", d));
            service
                .set_selection("u1", &date, &format!("place{}", d), None)
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("Task join failed").unwrap();
    }

    assert_eq!(service.selections_of("u1").await.unwrap().len(), 9);
}

// ─── Favorites ───────────────────────────────────────────────

#[tokio::test]
async fn test_add_favorite_twice_is_noop() {
    let (service, _) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();

    service.add_favorite("u1", "placeA").await.unwrap();
    service.add_favorite("u1", "placeA").await.unwrap();

    let favorites = service.favorites_of("u1").await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert!(favorites.contains("placeA"));
}

#[tokio::test]
async fn test_remove_favorite() {
    let (service, _) = test_service();
    service.create_user(&UserRecord::new("u1")).await.unwrap();
    service.add_favorite("u1", "placeA").await.unwrap();
    service.add_favorite("u1", "placeB").await.unwrap();

    service.remove_favorite("u1", "placeA").await.unwrap();
    service.remove_favorite("u1", "never-added").await.unwrap();

    let favorites = service.favorites_of("u1").await.unwrap();
    assert_eq!(favorites.into_iter().collect::<Vec<_>>(), ["placeB"]);
}

#[tokio::test]
async fn test_favorite_writes_for_missing_user() {
    let (service, store) = test_service();

    let added = service.add_favorite("ghost", "placeA").await;
    assert!(matches!(added, Err(AppError::NotFound(_))));

    service.remove_favorite("ghost", "placeA").await.unwrap();
    assert!(store.is_empty("users"));
    assert!(service.favorites_of("ghost").await.unwrap().is_empty());
}
