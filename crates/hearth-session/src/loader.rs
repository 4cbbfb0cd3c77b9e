//! Single-flight profile loading.
//!
//! The same profile is often requested from several places at once: the
//! session-change listener, a sign-in that just finished, a manual
//! refresh. [`ProfileLoader`] makes sure those callers share one Profile
//! Store read per user id.
//!
//! # In-flight registry
//!
//! ```text
//! load(u) ──→ registry has u? ──yes──→ await the shared fetch
//!                  │
//!                  no
//!                  ▼
//!     insert (u, ticket, shared fetch) ──→ fetch ──→ remove (u, ticket)
//! ```
//!
//! Each entry carries a ticket. Settlement only removes the entry it
//! created, so a fetch purged by [`clear`](ProfileLoader::clear) and then
//! replaced by a newer one can't evict its successor when it finishes.
//!
//! The loader never writes [`AuthState`](crate::AuthState); it returns
//! values and leaves the currency check to the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use hearth_provider::ProfileStore;
use hearth_types::{Profile, UserId};

type SharedFetch = Shared<BoxFuture<'static, Option<Profile>>>;

struct InFlight {
    ticket: u64,
    fetch: SharedFetch,
}

type Registry = Arc<Mutex<HashMap<UserId, InFlight>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<UserId, InFlight>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fetches profiles, deduplicating concurrent fetches per user id.
pub struct ProfileLoader<S: ProfileStore> {
    store: Arc<S>,
    in_flight: Registry,
    next_ticket: AtomicU64,
}

impl<S: ProfileStore> ProfileLoader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// The underlying Profile Store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Reads the profile for `user_id` straight from the store.
    ///
    /// Never fails: a [`StoreError`](hearth_provider::StoreError) is
    /// logged and reported as "no profile".
    pub async fn fetch(&self, user_id: &UserId) -> Option<Profile> {
        fetch_profile(self.store.as_ref(), user_id).await
    }

    /// Loads the profile for `user_id`, joining an in-flight fetch for
    /// the same id if there is one.
    ///
    /// Every concurrent caller for one id observes the same value and
    /// the store is read once.
    pub async fn load(&self, user_id: &UserId) -> Option<Profile> {
        let fetch = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(fetch) = in_flight.get(user_id).map(|e| e.fetch.clone()) {
                tracing::debug!(%user_id, "joining in-flight profile fetch");
                fetch
            } else {
                let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                let fetch = self.shared_fetch(user_id.clone(), ticket);
                in_flight.insert(
                    user_id.clone(),
                    InFlight {
                        ticket,
                        fetch: fetch.clone(),
                    },
                );
                fetch
            }
        };
        fetch.await
    }

    /// Builds the shared fetch future. It deregisters itself on
    /// settlement, whichever caller happens to drive it.
    fn shared_fetch(&self, user_id: UserId, ticket: u64) -> SharedFetch {
        let store = Arc::clone(&self.store);
        let registry = Arc::clone(&self.in_flight);
        async move {
            let profile = fetch_profile(store.as_ref(), &user_id).await;
            let mut in_flight = lock(&registry);
            if in_flight.get(&user_id).is_some_and(|e| e.ticket == ticket) {
                in_flight.remove(&user_id);
            }
            profile
        }
        .boxed()
        .shared()
    }

    /// Forgets every in-flight fetch. Fetches already running still
    /// resolve for the callers awaiting them, but new `load` calls start
    /// fresh. Returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut in_flight = lock(&self.in_flight);
        let purged = in_flight.len();
        in_flight.clear();
        if purged > 0 {
            tracing::debug!(purged, "in-flight profile fetches purged");
        }
        purged
    }

    /// Number of registered in-flight fetches.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    pub fn is_loading(&self, user_id: &UserId) -> bool {
        lock(&self.in_flight).contains_key(user_id)
    }
}

async fn fetch_profile<S: ProfileStore>(store: &S, user_id: &UserId) -> Option<Profile> {
    match store.get(user_id).await {
        Ok(Some(profile)) if profile.id != *user_id => {
            tracing::warn!(
                %user_id,
                returned = %profile.id,
                "profile store returned a row for another user, ignoring it"
            );
            None
        }
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "profile fetch failed, treating as no profile");
            None
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
