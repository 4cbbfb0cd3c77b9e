//! Session lifecycle and authorization state for Hearth.
//!
//! This crate is the client-side coordinator between the app and its
//! two remote collaborators:
//!
//! 1. **Profile loading** ([`ProfileLoader`]): single-flight fetches of
//!    the role record, one store read per user id at a time
//! 2. **Session tracking** ([`SessionStore`]): mirrors the provider's
//!    session, applies change notifications in order, publishes
//!    [`AuthState`]
//! 3. **Actions** ([`AuthActions`]): sign-in, sign-up, sign-out, and
//!    profile edits
//!
//! # How it fits in the stack
//!
//! ```text
//! Guard Layer (above)  ← reads AuthState, calls sign_out on denial
//!     ↕
//! Session Layer (this crate)  ← owns the session and profile lifecycle
//!     ↕
//! Provider Layer (below)  ← SessionProvider, ProfileStore
//! ```
//!
//! # Failure policy
//!
//! Authentication errors go back to whoever called the action. Profile
//! store errors during background loads are logged and become "no
//! profile", which makes `is_admin` false: an outage denies access, it
//! never grants it.

mod actions;
mod config;
mod error;
mod loader;
mod state;
mod store;

pub use actions::AuthActions;
pub use config::SessionConfig;
pub use error::SessionError;
pub use loader::ProfileLoader;
pub use state::AuthState;
pub use store::SessionStore;
