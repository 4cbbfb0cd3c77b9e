//! `Hearth` builder and handle.
//!
//! This is the entry point for embedding Hearth in an app. It ties the
//! layers together: provider → session store → actions → guards.

use std::sync::Arc;

use hearth_guard::{AdminGuard, GuardConfig, RouteGuard};
use hearth_provider::{ProfileStore, SessionProvider};
use hearth_session::{AuthActions, AuthState, SessionConfig, SessionStore};
use tokio::sync::watch;

use crate::HearthConfig;
use crate::guard_driver::{self, GuardDriver};

/// Builder for configuring and starting Hearth.
///
/// # Example
///
/// ```rust,ignore
/// let hearth = HearthBuilder::new()
///     .config(HearthConfig::from_json(&settings)?)
///     .start(Arc::new(provider), Arc::new(profiles))
///     .await;
/// ```
#[derive(Debug, Clone, Default)]
pub struct HearthBuilder {
    config: HearthConfig,
}

impl HearthBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: HearthConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn guard_config(mut self, config: GuardConfig) -> Self {
        self.config.guard = config;
        self
    }

    /// Starts the session store against the given collaborators.
    ///
    /// Returns once the provider's existing session (if any) has been
    /// resolved; the profile keeps loading in the background.
    pub async fn start<P, S>(self, provider: Arc<P>, profiles: Arc<S>) -> Hearth<P, S>
    where
        P: SessionProvider,
        S: ProfileStore,
    {
        let HearthConfig { session, guard } = self.config;
        let store = SessionStore::start(provider, profiles, session).await;
        tracing::info!(
            authenticated = store.state().is_authenticated(),
            "hearth started"
        );
        Hearth {
            actions: AuthActions::new(store),
            guard_config: guard,
        }
    }
}

/// A running Hearth instance.
///
/// Hand out [`actions`](Self::actions) to login and account pages, and
/// mount a guard per protected page with [`watch_route`](Self::watch_route)
/// or [`watch_admin`](Self::watch_admin).
pub struct Hearth<P: SessionProvider, S: ProfileStore> {
    actions: AuthActions<P, S>,
    guard_config: GuardConfig,
}

impl<P: SessionProvider, S: ProfileStore> Hearth<P, S> {
    pub fn store(&self) -> &SessionStore<P, S> {
        self.actions.store()
    }

    pub fn actions(&self) -> &AuthActions<P, S> {
        &self.actions
    }

    /// A snapshot of the current auth state.
    pub fn state(&self) -> AuthState {
        self.store().state()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.store().subscribe()
    }

    pub fn guard_config(&self) -> &GuardConfig {
        &self.guard_config
    }

    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(self.guard_config.clone())
    }

    /// A fresh admin guard, i.e. a new mount with its own denial latch.
    pub fn admin_guard(&self) -> AdminGuard {
        AdminGuard::new(self.guard_config.clone())
    }

    /// Mounts a [`RouteGuard`] for `path` and follows the auth state.
    pub fn watch_route(&self, path: impl Into<String>, require_admin: bool) -> GuardDriver {
        let guard = if require_admin {
            self.route_guard().require_admin()
        } else {
            self.route_guard()
        };
        guard_driver::drive_route_guard(self.store(), guard, path)
    }

    /// Mounts an [`AdminGuard`] for `path` and follows the auth state.
    pub fn watch_admin(&self, path: impl Into<String>) -> GuardDriver {
        guard_driver::drive_admin_guard(&self.actions, self.admin_guard(), path)
    }

    /// Stops listening for session changes.
    pub async fn shutdown(&self) {
        self.store().teardown().await;
        tracing::info!("hearth shut down");
    }
}
