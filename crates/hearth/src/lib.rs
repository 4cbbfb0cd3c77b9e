//! # Hearth
//!
//! Client-side session and authorization coordinator.
//!
//! Hearth keeps track of who is signed in, loads their profile in the
//! background, and decides which pages they may see. The app supplies two
//! collaborators (a [`SessionProvider`] and a [`ProfileStore`]); Hearth
//! wires them into a [`SessionStore`], the [`AuthActions`] that drive it,
//! and the route guards that read from it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hearth::prelude::*;
//!
//! # async fn run() -> Result<(), HearthError> {
//! hearth::init_tracing();
//!
//! let provider = Arc::new(InMemorySessionProvider::new());
//! let profiles = Arc::new(InMemoryProfileStore::new());
//! let hearth = HearthBuilder::new().start(provider, profiles).await;
//!
//! let mut admin_page = hearth.watch_admin("/admin");
//! hearth.actions().sign_in("ada@example.com", "hunter22").await?;
//! while let Some(view) = admin_page.next_view().await {
//!     println!("{view:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod app;
mod config;
mod error;
pub mod guard_driver;

pub use app::{Hearth, HearthBuilder};
pub use config::HearthConfig;
pub use error::HearthError;

pub use hearth_guard::{
    AdminDecision, AdminGuard, AdminGuardState, GuardConfig, GuardEffect, GuardInput, GuardView,
    MountToken, Redirect, RouteDecision, RouteGuard, RouteGuardState,
};
pub use hearth_provider::{
    AuthError, ProfileStore, SessionProvider, SessionSubscription, SignUpOutcome, StoreError,
};
pub use hearth_session::{
    AuthActions, AuthState, ProfileLoader, SessionConfig, SessionError, SessionStore,
};
pub use hearth_types::{
    Profile, ProfileFields, Session, SessionChange, SessionChangeKind, User, UserId,
};

/// Installs a `tracing` fmt subscriber filtered by `RUST_LOG`.
///
/// Falls back to `info` when `RUST_LOG` is unset or invalid. Returns
/// `false` if a global subscriber was already installed, so calling it
/// more than once is harmless.
pub fn init_tracing() -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok()
}

pub mod prelude {
    pub use crate::guard_driver::GuardDriver;
    pub use crate::{
        AdminGuard, AdminGuardState, AuthActions, AuthError, AuthState, GuardConfig, GuardInput,
        GuardView, Hearth, HearthBuilder, HearthConfig, HearthError, Profile, ProfileFields,
        ProfileStore, Redirect, RouteGuard, RouteGuardState, Session, SessionConfig,
        SessionProvider, SessionStore, StoreError, User, UserId,
    };
    pub use hearth_provider::{InMemoryProfileStore, InMemorySessionProvider};
}
