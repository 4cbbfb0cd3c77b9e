//! Shared data model for Hearth.
//!
//! This crate defines the values that flow between the session
//! coordinator and its two external collaborators:
//!
//! - **Identity** ([`UserId`], [`User`]): who is signed in.
//! - **Session** ([`Session`], [`SessionChange`]): proof of
//!   authentication issued by the Session Provider, and the notifications
//!   it emits when that proof changes.
//! - **Profile** ([`Profile`], [`ProfileFields`]): the application-level
//!   role record kept by the Profile Store.
//! - **Roles** ([`normalize_role`], [`is_admin_role`]): how a raw role
//!   column becomes an authorization decision.
//!
//! # Architecture
//!
//! ```text
//! Provider (sessions) ─┐
//!                      ├→ Types (this crate) → Session layer → Guards
//! Profile Store ───────┘
//! ```
//!
//! Nothing here performs I/O. Every type is plain data with `serde`
//! derives so embedding apps can persist or ship it as they see fit.

mod role;
mod types;

pub use role::{ADMIN_ROLE, is_admin_role, normalize_role};
pub use types::{
    Profile, ProfileFields, Session, SessionChange, SessionChangeKind,
    User, UserId,
};
