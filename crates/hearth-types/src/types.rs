//! Core data types: identity, sessions, and profiles.
//!
//! These are the values the session coordinator mirrors from its
//! collaborators. The Session Provider owns [`Session`] and [`User`];
//! the Profile Store owns [`Profile`]. Hearth only ever holds read-only
//! copies of them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::role::is_admin_role;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A user's identifier as issued by the Session Provider.
///
/// Newtype over `String` so a user id can't be confused with an email or
/// an access token in a function signature. Serializes as the bare string
/// (`"u-42"`, not `{"0":"u-42"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a `UserId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The authenticated identity embedded in a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Providers may issue sessions for phone or anonymous sign-ins,
    /// so the email is optional.
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Proof of authentication issued by the Session Provider.
///
/// The access token is opaque to Hearth: it is never parsed or verified
/// here, only carried along so the rest of the app can attach it to
/// requests.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: User,
}

impl Session {
    pub fn new(access_token: impl Into<String>, user: User) -> Self {
        Self {
            access_token: access_token.into(),
            user,
        }
    }

    /// Shorthand for `&self.user.id`.
    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }
}

/// Manual `Debug` so access tokens never end up in log output.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Why the provider emitted a session change.
///
/// Hearth treats every kind the same way (the carried session replaces
/// the current one); the kind exists for logging and for consumers that
/// want to react to, say, a token refresh specifically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionChangeKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for SessionChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitialSession => write!(f, "InitialSession"),
            Self::SignedIn => write!(f, "SignedIn"),
            Self::SignedOut => write!(f, "SignedOut"),
            Self::TokenRefreshed => write!(f, "TokenRefreshed"),
            Self::UserUpdated => write!(f, "UserUpdated"),
        }
    }
}

/// A session-change notification from the provider.
///
/// `session` is the provider's view of the session *after* the change:
/// `None` means nobody is signed in any more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChange {
    pub kind: SessionChangeKind,
    pub session: Option<Session>,
}

impl SessionChange {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: SessionChangeKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: SessionChangeKind::SignedOut,
            session: None,
        }
    }

    /// The user id carried by the change, if any.
    pub fn user_id(&self) -> Option<&UserId> {
        self.session.as_ref().map(Session::user_id)
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// The application-level role record, keyed by user id.
///
/// `role` is nullable in the store: rows created by a bare sign-up have
/// no role until someone in the back office assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Profile {
    /// A profile with only an id set.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            role: None,
            full_name: None,
            phone: None,
        }
    }

    /// Builder-style role setter, mostly for tests and fixtures.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Returns `true` if this profile's role normalizes to `admin_role`.
    pub fn has_role(&self, admin_role: &str) -> bool {
        is_admin_role(self.role.as_deref(), admin_role)
    }

    /// Overwrites the contact fields that are set in `fields`.
    /// Unset fields leave the current value alone.
    pub fn merge(&mut self, fields: &ProfileFields) {
        if let Some(name) = &fields.full_name {
            self.full_name = Some(name.clone());
        }
        if let Some(phone) = &fields.phone {
            self.phone = Some(phone.clone());
        }
    }
}

/// Contact fields a user can set on their own profile.
///
/// Used both as sign-up metadata and for profile updates. The role is
/// deliberately absent: users never write their own role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ProfileFields {
    /// Returns `true` if neither field is set.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.phone.is_none()
    }
}

// =========================================================================
// Tests
// =========================================================================
