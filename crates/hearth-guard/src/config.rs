//! Guard configuration and the views a guard can ask for.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GuardConfig
// ---------------------------------------------------------------------------

/// Where guards send people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Login page for signed-in routes.
    pub login_path: String,

    /// Login page for the back office.
    pub admin_login_path: String,

    /// Where non-admins land when a plain guard requires admin.
    pub home_path: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            admin_login_path: "/admin/login".to_string(),
            home_path: "/".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Redirect / GuardView
// ---------------------------------------------------------------------------

/// A navigation the guard wants performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    /// Destination path.
    pub to: String,

    /// The path the user was trying to reach, so the login page can send
    /// them back after signing in.
    pub return_to: Option<String>,
}

impl Redirect {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            to: path.into(),
            return_to: None,
        }
    }

    pub fn with_return_to(mut self, path: impl Into<String>) -> Self {
        self.return_to = Some(path.into());
        self
    }
}

/// What a guarded page should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum GuardView {
    /// A neutral loading indicator. Never the protected content.
    Waiting,
    Redirect(Redirect),
    /// The protected content.
    Render,
}

impl GuardView {
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render)
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            Self::Redirect(redirect) => Some(redirect),
            _ => None,
        }
    }
}
