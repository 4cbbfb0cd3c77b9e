//! The guard for signed-in pages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GuardConfig, GuardInput, GuardView, Redirect};

/// Where a [`RouteGuard`] evaluation landed.
///
/// ```text
/// CheckingSession ──→ NotAuthenticated
///        │
///        └──→ (require_admin) CheckingProfile ──→ NotAuthorized
///        │                           │
///        └───────────────────────────┴──→ Authenticated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteGuardState {
    CheckingSession,
    NotAuthenticated,
    CheckingProfile,
    NotAuthorized,
    Authenticated,
}

impl RouteGuardState {
    /// Returns `true` while the guard can't decide yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::CheckingSession | Self::CheckingProfile)
    }
}

impl fmt::Display for RouteGuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckingSession => write!(f, "CheckingSession"),
            Self::NotAuthenticated => write!(f, "NotAuthenticated"),
            Self::CheckingProfile => write!(f, "CheckingProfile"),
            Self::NotAuthorized => write!(f, "NotAuthorized"),
            Self::Authenticated => write!(f, "Authenticated"),
        }
    }
}

/// The result of one [`RouteGuard::evaluate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub state: RouteGuardState,
    pub view: GuardView,
}

/// Protects pages that need a signed-in user.
///
/// Stateless: every evaluation depends only on its input, so re-running it
/// on each state change is always safe. With
/// [`require_admin`](Self::require_admin) non-admins are sent to the home
/// page rather than signed out; the back office uses
/// [`AdminGuard`](crate::AdminGuard) instead.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    config: GuardConfig,
    require_admin: bool,
}

impl RouteGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            require_admin: false,
        }
    }

    pub fn require_admin(mut self) -> Self {
        self.require_admin = true;
        self
    }

    pub fn requires_admin(&self) -> bool {
        self.require_admin
    }

    /// Decides what the page at `current_path` should show.
    ///
    /// While the session is loading the answer is always
    /// [`GuardView::Waiting`], even with no user: the session may still be
    /// restored, and redirecting now would bounce a signed-in user to the
    /// login page.
    pub fn evaluate(&self, input: &GuardInput, current_path: &str) -> RouteDecision {
        let (state, view) = if input.loading {
            (RouteGuardState::CheckingSession, GuardView::Waiting)
        } else if !input.authenticated {
            let redirect = Redirect::to(&self.config.login_path).with_return_to(current_path);
            (RouteGuardState::NotAuthenticated, GuardView::Redirect(redirect))
        } else if !self.require_admin {
            (RouteGuardState::Authenticated, GuardView::Render)
        } else if input.profile_loading {
            (RouteGuardState::CheckingProfile, GuardView::Waiting)
        } else if input.is_admin {
            (RouteGuardState::Authenticated, GuardView::Render)
        } else {
            let redirect = Redirect::to(&self.config.home_path);
            (RouteGuardState::NotAuthorized, GuardView::Redirect(redirect))
        };

        tracing::trace!(%state, path = current_path, "route guard evaluated");
        RouteDecision { state, view }
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}
