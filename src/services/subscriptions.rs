// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Observer fan-out for live query results.
//!
//! Each distinct [`Query`] owns one `watch` channel. Every observer of that
//! query holds a receiver on the same channel, so a map view and a list view
//! watching the same place and day see the same value without issuing two
//! store queries.
//!
//! Refreshes are ticketed per query. A refresh that completes after a newer
//! one has already been delivered is discarded, so out-of-order store
//! completions never move an observer back to an older value.
//!
//! When the last observer of a query goes away the query is evicted. Refreshes
//! already in flight still run to completion; their result is just not
//! delivered anywhere.

use crate::error::{AppError, Result};
use crate::models::{DateKey, UserRecord};
use crate::services::{PlaceAggregationService, UserRepository};
use dashmap::DashMap;
use futures_util::{future, stream, Stream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A subscribable query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    User(String),
    Selection { user_id: String, date: DateKey },
    UsersByPlaceAndDate { place_id: String, date: DateKey },
    LikesCount(String),
    ListUsers,
}

/// A write that may invalidate live queries.
#[derive(Debug, Clone)]
pub enum Change {
    /// Profile fields of one user changed.
    Profile { user_id: String },
    /// One day of one user's selections changed.
    Selection { user_id: String, date: DateKey },
    /// One user's favorites changed for one place.
    Favorite { user_id: String, place_id: String },
    /// A user document appeared or disappeared.
    Membership { user_id: String },
}

impl Query {
    /// Whether this query's result may differ after `change`.
    pub fn affected_by(&self, change: &Change) -> bool {
        match (self, change) {
            (Query::ListUsers, _) => true,

            (Query::User(id), Change::Profile { user_id })
            | (Query::User(id), Change::Selection { user_id, .. })
            | (Query::User(id), Change::Favorite { user_id, .. })
            | (Query::User(id), Change::Membership { user_id }) => id == user_id,

            (Query::Selection { user_id: a, date: d }, Change::Selection { user_id: b, date: e }) => {
                a == b && d == e
            }
            (Query::Selection { user_id: a, .. }, Change::Membership { user_id: b }) => a == b,
            (Query::Selection { .. }, _) => false,

            (Query::UsersByPlaceAndDate { date: d, .. }, Change::Selection { date: e, .. }) => {
                d == e
            }
            // The view carries whole records, favorites included.
            (Query::UsersByPlaceAndDate { .. }, Change::Profile { .. })
            | (Query::UsersByPlaceAndDate { .. }, Change::Favorite { .. })
            | (Query::UsersByPlaceAndDate { .. }, Change::Membership { .. }) => true,

            (Query::LikesCount(a), Change::Favorite { place_id: b, .. }) => a == b,
            (Query::LikesCount(_), Change::Membership { .. }) => true,
            (Query::LikesCount(_), _) => false,
        }
    }
}

/// Latest result of a query.
#[derive(Debug, Clone)]
pub enum QueryValue {
    User(Option<UserRecord>),
    Selection(Option<String>),
    Users(Vec<UserRecord>),
    Likes(usize),
}

/// What an observer currently sees.
#[derive(Debug, Clone)]
pub enum QueryState {
    /// No refresh has completed yet.
    Pending,
    Ready(QueryValue),
    /// The most recent refresh failed.
    Failed(AppError),
}

impl QueryState {
    pub fn is_pending(&self) -> bool {
        matches!(self, QueryState::Pending)
    }

    pub fn value(&self) -> Option<&QueryValue> {
        match self {
            QueryState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    ticket: u64,
    state: QueryState,
}

struct Slot {
    tx: watch::Sender<Snapshot>,
    next_ticket: AtomicU64,
}

impl Slot {
    fn new() -> Self {
        let (tx, _) = watch::channel(Snapshot {
            ticket: 0,
            state: QueryState::Pending,
        });
        Self {
            tx,
            next_ticket: AtomicU64::new(0),
        }
    }
}

struct HubInner {
    slots: DashMap<Query, Arc<Slot>>,
    users: UserRepository,
    places: PlaceAggregationService,
}

impl HubInner {
    async fn evaluate(&self, query: &Query) -> Result<QueryValue> {
        match query {
            Query::User(id) => self.users.get_user(id).await.map(QueryValue::User),
            Query::Selection { user_id, date } => self
                .users
                .get_selection(user_id, date)
                .await
                .map(QueryValue::Selection),
            Query::UsersByPlaceAndDate { place_id, date } => self
                .places
                .users_by_place_and_date(place_id, date)
                .await
                .map(|view| QueryValue::Users(view.users)),
            Query::LikesCount(place_id) => self
                .places
                .likes_count_for_place(place_id)
                .await
                .map(|count| QueryValue::Likes(count.likes)),
            Query::ListUsers => self.users.list_users().await.map(QueryValue::Users),
        }
    }

    async fn refresh(&self, query: &Query) {
        let Some(slot) = self.slots.get(query).map(|entry| entry.value().clone()) else {
            return;
        };
        let ticket = slot.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        let state = match self.evaluate(query).await {
            Ok(value) => QueryState::Ready(value),
            Err(e) => {
                tracing::warn!(query = ?query, error = %e, "Query refresh failed");
                QueryState::Failed(e)
            }
        };

        let delivered = slot.tx.send_if_modified(|current| {
            if ticket <= current.ticket {
                return false;
            }
            *current = Snapshot { ticket, state };
            true
        });

        if !delivered {
            tracing::debug!(query = ?query, ticket, "Discarded stale refresh");
        }
    }
}

/// Registry of live queries and their observers.
#[derive(Clone)]
pub struct SubscriptionHub {
    inner: Arc<HubInner>,
}

impl SubscriptionHub {
    pub fn new(users: UserRepository, places: PlaceAggregationService) -> Self {
        Self {
            inner: Arc::new(HubInner {
                slots: DashMap::new(),
                users,
                places,
            }),
        }
    }

    /// Start observing `query`.
    ///
    /// The first observer of a query triggers a background refresh; later
    /// observers join the existing channel and immediately see its latest
    /// value. Must be called from within a Tokio runtime.
    pub fn subscribe(&self, query: Query) -> Subscription {
        let mut created = false;
        // Attach while the shard is still locked, so a concurrent last drop
        // either sees this receiver or has already evicted the slot.
        let rx = self
            .inner
            .slots
            .entry(query.clone())
            .or_insert_with(|| {
                created = true;
                Arc::new(Slot::new())
            })
            .tx
            .subscribe();

        if created {
            tracing::debug!(query = ?query, "New live query");
            let inner = self.inner.clone();
            let refresh_query = query.clone();
            tokio::spawn(async move { inner.refresh(&refresh_query).await });
        }

        Subscription {
            query,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Stop observing. Equivalent to dropping the subscription.
    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    /// Re-evaluate one query and publish the result to its observers.
    pub async fn refresh(&self, query: &Query) {
        self.inner.refresh(query).await;
    }

    /// Re-evaluate every live query affected by `change`.
    pub async fn publish(&self, change: &Change) {
        let affected: Vec<Query> = self
            .inner
            .slots
            .iter()
            .filter(|entry| entry.key().affected_by(change))
            .map(|entry| entry.key().clone())
            .collect();

        tracing::debug!(change = ?change, queries = affected.len(), "Republishing live queries");
        future::join_all(affected.iter().map(|query| self.inner.refresh(query))).await;
    }

    /// Re-evaluate every live query.
    pub async fn refresh_all(&self) {
        let queries: Vec<Query> = self
            .inner
            .slots
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        future::join_all(queries.iter().map(|query| self.inner.refresh(query))).await;
    }

    /// Number of queries with at least one observer.
    pub fn live_queries(&self) -> usize {
        self.inner.slots.len()
    }

    /// Number of observers of `query`.
    pub fn observer_count(&self, query: &Query) -> usize {
        self.inner
            .slots
            .get(query)
            .map(|slot| slot.tx.receiver_count())
            .unwrap_or(0)
    }

    /// Periodically refresh all live queries to pick up writes made by other
    /// clients of the store.
    pub fn spawn_poller(&self, interval: Duration) -> JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                hub.refresh_all().await;
            }
        })
    }
}

/// One observer's handle on a live query.
pub struct Subscription {
    query: Query,
    rx: watch::Receiver<Snapshot>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The latest state, without waiting.
    pub fn latest(&self) -> QueryState {
        self.rx.borrow().state.clone()
    }

    /// Wait for the next delivered state. `None` once the query has been
    /// evicted from the hub.
    pub async fn changed(&mut self) -> Option<QueryState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().state.clone())
    }

    /// Wait until the current state satisfies `predicate`.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<QueryState>
    where
        F: FnMut(&QueryState) -> bool,
    {
        self.rx
            .wait_for(|snapshot| predicate(&snapshot.state))
            .await
            .ok()
            .map(|snapshot| snapshot.state.clone())
    }

    /// The current state followed by every later one.
    pub fn into_stream(self) -> impl Stream<Item = QueryState> + Send + 'static {
        stream::unfold((self, true), |(mut subscription, first)| async move {
            if first {
                let state = subscription.latest();
                return Some((state, (subscription, false)));
            }
            let state = subscription.changed().await?;
            Some((state, (subscription, false)))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        // Detach before counting: the last observer out must see zero.
        let (_, detached) = watch::channel(Snapshot {
            ticket: 0,
            state: QueryState::Pending,
        });
        drop(std::mem::replace(&mut self.rx, detached));

        let evicted = hub
            .slots
            .remove_if(&self.query, |_, slot| slot.tx.receiver_count() == 0)
            .is_some();
        if evicted {
            tracing::debug!(query = ?self.query, "Evicted live query");
        }
    }
}
