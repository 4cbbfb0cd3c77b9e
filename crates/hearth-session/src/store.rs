//! The session store: owns the authenticated-session lifecycle.
//!
//! This is the central piece of the session layer. It is responsible for:
//! - Resolving the session the provider already has at startup
//! - Applying session-change notifications in delivery order
//! - Launching background profile loads for the current user
//! - Discarding profile results that arrive for a superseded session
//! - Publishing [`AuthState`] to everyone who renders from it
//!
//! # Task layout
//!
//! ```text
//!   provider ──(SessionChange)──→ listener task ──→ replace_session()
//!                                                         │
//!                                                         ▼ spawn
//!                                                 profile load task
//!                                                         │
//!                             apply_profile(id, epoch) ◀──┘
//!                                   │
//!                                   ▼
//!                        watch::Sender<AuthState> ──→ guards, UI
//! ```
//!
//! The listener is the only consumer of the subscription, so changes are
//! applied strictly in the order the provider sent them. Every state
//! write happens inside a single `watch` modification, which makes the
//! currency check and the write one step.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hearth_provider::{ProfileStore, SessionProvider, SessionSubscription};
use hearth_types::{Profile, ProfileFields, Session, SessionChange, UserId};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::{AuthState, ProfileLoader, SessionConfig};

pub(crate) struct StoreInner<P: SessionProvider, S: ProfileStore> {
    pub(crate) provider: Arc<P>,
    pub(crate) loader: ProfileLoader<S>,
    pub(crate) config: SessionConfig,
    state: watch::Sender<AuthState>,
    listener: Mutex<Option<JoinHandle<()>>>,
    torn_down: AtomicBool,
}

/// Holds the current session and publishes [`AuthState`].
///
/// Construct one with [`start`](Self::start) when the application boots
/// and hand clones to whatever needs it: the handle is an `Arc` inside,
/// so clones share one store.
///
/// ## Lifecycle
///
/// ```text
/// start() ──→ [listening] ──→ teardown() ──→ [stopped]
///    │             │
///    │             └── every SessionChange → replace session, reload profile
///    └── current_session() → replace session (unless a change got there first)
/// ```
pub struct SessionStore<P: SessionProvider, S: ProfileStore> {
    pub(crate) inner: Arc<StoreInner<P, S>>,
}

impl<P: SessionProvider, S: ProfileStore> Clone for SessionStore<P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: SessionProvider, S: ProfileStore> SessionStore<P, S> {
    /// Creates the store, subscribes to session changes, and resolves
    /// the provider's current session.
    ///
    /// Returns once the initial resolution has been applied; the profile
    /// for a restored user keeps loading in the background.
    pub async fn start(provider: Arc<P>, profiles: Arc<S>, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        let store = Self {
            inner: Arc::new(StoreInner {
                provider,
                loader: ProfileLoader::new(profiles),
                config,
                state,
                listener: Mutex::new(None),
                torn_down: AtomicBool::new(false),
            }),
        };

        // Subscribe before asking for the current session so a change
        // that lands in between is not lost.
        let subscription = store.inner.provider.on_session_change();
        let listener = tokio::spawn(store.clone().listen(subscription));
        *store.inner.listener.lock().await = Some(listener);

        store.resolve_initial_session().await;
        store
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// A receiver that sees every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn loader(&self) -> &ProfileLoader<S> {
        &self.inner.loader
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.inner.provider
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Returns `false` after [`teardown`](Self::teardown).
    pub fn is_running(&self) -> bool {
        !self.inner.torn_down.load(Ordering::Acquire)
    }

    /// Re-fetches the current user's profile and waits for it.
    ///
    /// Shares an in-flight fetch if one is running. Returns the profile
    /// that was applied, or `None` if nobody is signed in, the fetch came
    /// back empty, or the session changed while it was in flight.
    pub async fn refresh_profile(&self) -> Option<Profile> {
        let (user_id, epoch) = {
            let mut target = None;
            self.inner.state.send_if_modified(|state| {
                let Some(user_id) = state.user_id().cloned() else {
                    return false;
                };
                target = Some((user_id, state.epoch()));
                state.set_profile_loading(true);
                true
            });
            target?
        };

        // The load runs in its own task so that a caller giving up early
        // can't leave `profile_loading` raised or the fetch unpolled.
        match self.spawn_profile_load(user_id, epoch).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "profile refresh task failed");
                None
            }
        }
    }

    /// Unsubscribes from session changes and stops the listener.
    ///
    /// Idempotent. Background profile loads already running finish on
    /// their own; the state they write is still subject to the usual
    /// currency check.
    pub async fn teardown(&self) {
        if self.inner.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let listener = self.inner.listener.lock().await.take();
        if let Some(listener) = listener {
            listener.abort();
            // Awaiting the aborted task guarantees the subscription has
            // been dropped by the time we return.
            let _ = listener.await;
        }
        tracing::info!("session store torn down");
    }

    // -----------------------------------------------------------------------
    // Internals shared with AuthActions
    // -----------------------------------------------------------------------

    /// Applies notifications one by one until the subscription ends.
    async fn listen(self, mut subscription: SessionSubscription) {
        while let Some(change) = subscription.recv().await {
            self.apply_change(change);
        }
        tracing::debug!("session change subscription ended");
    }

    fn apply_change(&self, change: SessionChange) {
        tracing::info!(
            kind = %change.kind,
            user_id = ?change.user_id().map(UserId::as_str),
            "session change applied"
        );
        self.set_session(change.session);
    }

    async fn resolve_initial_session(&self) {
        // `AuthState::default()` already counts this call as pending.
        let started_at = self.inner.state.borrow().epoch();

        let session = match self.inner.provider.current_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "initial session lookup failed, starting signed out");
                None
            }
        };

        let admin_role = self.inner.config.admin_role.clone();
        let mut load = None;
        self.inner.state.send_modify(|state| {
            // A change notification that arrived while we were waiting is
            // newer than this snapshot; keep it.
            if state.epoch() == started_at {
                let epoch = state.replace_session(session, &admin_role);
                load = state.user_id().cloned().map(|id| (id, epoch));
            } else {
                tracing::debug!("initial session superseded by a session change");
            }
            state.end_auth_call();
        });

        if let Some((user_id, epoch)) = load {
            tracing::info!(%user_id, "restored existing session");
            self.spawn_profile_load(user_id, epoch);
        }
    }

    /// Replaces the session and, if there is a user, launches a
    /// background profile load tied to the new epoch.
    pub(crate) fn set_session(&self, session: Option<Session>) {
        let admin_role = &self.inner.config.admin_role;
        let mut load = None;
        self.inner.state.send_modify(|state| {
            let epoch = state.replace_session(session, admin_role);
            load = state.user_id().cloned().map(|id| (id, epoch));
        });
        if let Some((user_id, epoch)) = load {
            self.spawn_profile_load(user_id, epoch);
        }
    }

    /// Clears the session, the profile, and the in-flight registry.
    pub(crate) fn clear_session(&self) {
        self.inner.loader.clear();
        self.inner.state.send_modify(AuthState::clear_session);
    }

    pub(crate) fn begin_auth_call(&self) {
        self.inner.state.send_modify(AuthState::begin_auth_call);
    }

    pub(crate) fn end_auth_call(&self) {
        self.inner.state.send_modify(AuthState::end_auth_call);
    }

    /// Merges `fields` into the cached profile if it belongs to `user_id`.
    pub(crate) fn merge_profile(
        &self,
        user_id: &UserId,
        fields: &ProfileFields,
    ) -> Option<Profile> {
        let mut merged = None;
        self.inner.state.send_if_modified(|state| {
            if state.user_id() != Some(user_id) {
                return false;
            }
            match state.profile_mut() {
                Some(profile) => {
                    profile.merge(fields);
                    merged = Some(profile.clone());
                    true
                }
                None => false,
            }
        });
        merged
    }

    /// Background profile load; the result is re-validated on delivery by
    /// [`apply_profile`](Self::apply_profile). The task resolves to the
    /// profile if it was applied. Callers that don't need it drop the handle.
    fn spawn_profile_load(&self, user_id: UserId, epoch: u64) -> JoinHandle<Option<Profile>> {
        let store = self.clone();
        tokio::spawn(async move {
            let profile = store.inner.loader.load(&user_id).await;
            if store.apply_profile(&user_id, epoch, profile.clone()) {
                profile
            } else {
                None
            }
        })
    }

    /// Writes a fetched profile if the session it was fetched for is
    /// still the current one. Returns whether it was applied.
    ///
    /// A result for another user id, or for an epoch that has since been
    /// replaced (sign-out, a different user, a newer notification that
    /// started its own load), is dropped without touching the state.
    pub(crate) fn apply_profile(
        &self,
        user_id: &UserId,
        epoch: u64,
        profile: Option<Profile>,
    ) -> bool {
        let admin_role = &self.inner.config.admin_role;
        let applied = self.inner.state.send_if_modified(|state| {
            if state.user_id() != Some(user_id) || state.epoch() != epoch {
                return false;
            }
            state.set_profile(profile, admin_role);
            state.set_profile_loading(false);
            true
        });

        if applied {
            let state = self.inner.state.borrow();
            tracing::debug!(%user_id, is_admin = state.is_admin(), "profile applied");
        } else {
            tracing::debug!(%user_id, epoch, "discarding stale profile result");
        }
        applied
    }
}
