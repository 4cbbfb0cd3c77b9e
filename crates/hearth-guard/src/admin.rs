//! The back-office guard.
//!
//! Unlike [`RouteGuard`](crate::RouteGuard), a signed-in user who turns out
//! not to be an admin is not just sent elsewhere: their session is ended
//! and they land on the admin login page. Signing out is a side effect, and
//! side effects must not repeat just because the guard re-evaluates while
//! the sign-out is still in flight. [`AdminGuard`] therefore keeps a
//! one-shot denial latch for the lifetime of the mount.
//!
//! # States
//!
//! ```text
//! CheckingSession ──→ NotAuthenticated          (redirect to admin login)
//!        │
//!        ▼
//! CheckingProfile ──→ Authorized                (render)
//!        │
//!        ▼
//!     Denying                                   (sign out, then redirect)
//! ```
//!
//! `Denying` is terminal for the mount. Once the latch is set every later
//! evaluation reports `Denying` with a waiting view and no effect,
//! whatever the input says, so the page is never rendered on the way out.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::{GuardConfig, GuardInput, GuardView, Redirect};

// ---------------------------------------------------------------------------
// AdminGuardState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminGuardState {
    CheckingSession,
    NotAuthenticated,
    CheckingProfile,
    Denying,
    Authorized,
}

impl AdminGuardState {
    /// Returns `true` if the protected content may be shown.
    pub fn can_render(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

impl fmt::Display for AdminGuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckingSession => write!(f, "CheckingSession"),
            Self::NotAuthenticated => write!(f, "NotAuthenticated"),
            Self::CheckingProfile => write!(f, "CheckingProfile"),
            Self::Denying => write!(f, "Denying"),
            Self::Authorized => write!(f, "Authorized"),
        }
    }
}

// ---------------------------------------------------------------------------
// Effects and decisions
// ---------------------------------------------------------------------------

/// A side effect the caller must run on the guard's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardEffect {
    /// Sign the user out, then navigate to the redirect if the guard is
    /// still mounted.
    SignOutThenRedirect(Redirect),
}

/// The result of one [`AdminGuard::evaluate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminDecision {
    pub state: AdminGuardState,
    pub view: GuardView,
    /// Set on exactly one evaluation per mount: the one that latched the
    /// denial.
    pub effect: Option<GuardEffect>,
}

/// Tells a detached task whether the guard that spawned it is still mounted.
#[derive(Debug, Clone)]
pub struct MountToken(Arc<AtomicBool>);

impl MountToken {
    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// AdminGuard
// ---------------------------------------------------------------------------

/// Protects the back office.
///
/// One instance corresponds to one mount of the protected page. Dropping it
/// (or calling [`unmount`](Self::unmount)) flips every [`MountToken`] it
/// handed out, so a sign-out that completes afterwards knows not to
/// navigate.
///
/// # Example
///
/// ```
/// use hearth_guard::{AdminGuard, AdminGuardState, GuardConfig, GuardInput};
///
/// let mut guard = AdminGuard::new(GuardConfig::default());
/// let signed_in_user = GuardInput { authenticated: true, ..GuardInput::default() };
///
/// let first = guard.evaluate(&signed_in_user, "/admin");
/// assert_eq!(first.state, AdminGuardState::Denying);
/// assert!(first.effect.is_some());
///
/// // Still denying on the next pass, but the sign-out is not requested again.
/// let second = guard.evaluate(&signed_in_user, "/admin");
/// assert_eq!(second.state, AdminGuardState::Denying);
/// assert!(second.effect.is_none());
/// ```
#[derive(Debug)]
pub struct AdminGuard {
    config: GuardConfig,
    denial_latched: bool,
    mounted: Arc<AtomicBool>,
}

impl AdminGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            denial_latched: false,
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Evaluates the guard against the latest input.
    ///
    /// `current_path` is carried as the return target when a signed-out
    /// visitor is sent to the admin login page.
    pub fn evaluate(&mut self, input: &GuardInput, current_path: &str) -> AdminDecision {
        if self.denial_latched {
            return AdminDecision {
                state: AdminGuardState::Denying,
                view: GuardView::Waiting,
                effect: None,
            };
        }

        let state = Self::classify(input);
        let (view, effect) = match state {
            AdminGuardState::CheckingSession | AdminGuardState::CheckingProfile => {
                (GuardView::Waiting, None)
            }
            AdminGuardState::NotAuthenticated => {
                let redirect =
                    Redirect::to(&self.config.admin_login_path).with_return_to(current_path);
                (GuardView::Redirect(redirect), None)
            }
            AdminGuardState::Authorized => (GuardView::Render, None),
            AdminGuardState::Denying => {
                if !self.is_mounted() {
                    // Nothing left to protect; don't start a sign-out for a
                    // page that is already gone.
                    return AdminDecision {
                        state,
                        view: GuardView::Waiting,
                        effect: None,
                    };
                }
                // Latch before handing out the effect.
                self.denial_latched = true;
                tracing::info!(path = current_path, "non-admin on admin route, signing out");
                let redirect = Redirect::to(&self.config.admin_login_path);
                (GuardView::Waiting, Some(GuardEffect::SignOutThenRedirect(redirect)))
            }
        };

        tracing::trace!(%state, path = current_path, "admin guard evaluated");
        AdminDecision { state, view, effect }
    }

    fn classify(input: &GuardInput) -> AdminGuardState {
        if input.loading {
            AdminGuardState::CheckingSession
        } else if !input.authenticated {
            AdminGuardState::NotAuthenticated
        } else if input.profile_loading {
            AdminGuardState::CheckingProfile
        } else if input.is_admin {
            AdminGuardState::Authorized
        } else {
            AdminGuardState::Denying
        }
    }

    /// Whether this mount has already decided to deny.
    pub fn is_denying(&self) -> bool {
        self.denial_latched
    }

    pub fn mount_token(&self) -> MountToken {
        MountToken(Arc::clone(&self.mounted))
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Marks the guard as unmounted. Outstanding [`MountToken`]s observe it
    /// immediately.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

impl Drop for AdminGuard {
    fn drop(&mut self) {
        self.unmount();
    }
}
