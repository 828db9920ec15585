// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod lunch;
pub mod places;
pub mod subscriptions;
pub mod users;

pub use lunch::LunchService;
pub use places::{PlaceAggregationService, PlaceClassification};
pub use subscriptions::{Change, Query, QueryState, QueryValue, Subscription, SubscriptionHub};
pub use users::UserRepository;
