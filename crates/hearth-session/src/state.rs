//! The published authentication state.
//!
//! [`AuthState`] is the single record the rest of the app reads to
//! decide what to render. It is written only by the
//! [`SessionStore`](crate::SessionStore) and
//! [`AuthActions`](crate::AuthActions) (its setters are crate-private)
//! and published through a `tokio::sync::watch` channel.

use hearth_types::{Profile, Session, User, UserId};

/// Snapshot of who is signed in and what they are allowed to do.
///
/// ## Flags
///
/// - `loading` is true while the initial session resolution or an
///   explicit sign-in/sign-up is outstanding.
/// - `profile_loading` is true while a profile fetch for the *current*
///   user is outstanding.
/// - `is_admin` is derived from the profile's role; with no profile it
///   is always false, so a profile-store outage denies access rather
///   than granting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    user: Option<User>,
    session: Option<Session>,
    profile: Option<Profile>,
    is_admin: bool,
    profile_loading: bool,
    /// Outstanding initial-resolution and sign-in/sign-up calls.
    /// `loading()` is `pending_auth > 0`, so overlapping calls can't
    /// clear each other's flag.
    pending_auth: u32,
    /// Bumped every time the session is replaced. Background profile
    /// loads remember the epoch they were started under and are dropped
    /// if it moved on.
    epoch: u64,
}

impl Default for AuthState {
    /// The state before the initial session resolution has started:
    /// nobody signed in and `loading` already true, so guards wait
    /// instead of redirecting.
    fn default() -> Self {
        Self {
            user: None,
            session: None,
            profile: None,
            is_admin: false,
            profile_loading: false,
            pending_auth: 1,
            epoch: 0,
        }
    }
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|u| &u.id)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.pending_auth > 0
    }

    pub fn profile_loading(&self) -> bool {
        self.profile_loading
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Session epoch; changes whenever the session is replaced.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    // -- Crate-private writers ------------------------------------------

    pub(crate) fn begin_auth_call(&mut self) {
        self.pending_auth += 1;
    }

    pub(crate) fn end_auth_call(&mut self) {
        self.pending_auth = self.pending_auth.saturating_sub(1);
    }

    /// Replaces the session and returns the new epoch.
    ///
    /// A different (or no) user drops the cached profile immediately;
    /// the same user keeps it while a fresh copy loads. When a user is
    /// present `profile_loading` is raised here, before any load task
    /// runs, so there is no window where a signed-in user appears to
    /// have finished loading without a profile.
    pub(crate) fn replace_session(&mut self, session: Option<Session>, admin_role: &str) -> u64 {
        let next_user = session.as_ref().map(|s| s.user.clone());
        let same_user = self.user_id() == next_user.as_ref().map(|u| &u.id);

        if !same_user {
            self.set_profile(None, admin_role);
        }
        self.profile_loading = next_user.is_some();
        self.user = next_user;
        self.session = session;
        self.epoch += 1;
        self.epoch
    }

    /// Clears everything a signed-in user had. Pending auth calls are
    /// left alone: they still clear their own `loading` flag.
    pub(crate) fn clear_session(&mut self) {
        self.user = None;
        self.session = None;
        self.profile = None;
        self.is_admin = false;
        self.profile_loading = false;
        self.epoch += 1;
    }

    pub(crate) fn set_profile(&mut self, profile: Option<Profile>, admin_role: &str) {
        self.is_admin = profile.as_ref().is_some_and(|p| p.has_role(admin_role));
        self.profile = profile;
    }

    pub(crate) fn set_profile_loading(&mut self, loading: bool) {
        self.profile_loading = loading;
    }

    pub(crate) fn profile_mut(&mut self) -> Option<&mut Profile> {
        self.profile.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use hearth_types::ADMIN_ROLE;

    use super::*;

    fn session_for(id: &str) -> Session {
        Session::new(
            "token",
            User {
                id: UserId::new(id),
                email: None,
            },
        )
    }

    #[test]
    fn test_default_is_loading_and_signed_out() {
        let state = AuthState::default();
        assert!(state.loading());
        assert!(!state.is_authenticated());
        assert!(!state.profile_loading());
        assert!(!state.is_admin());
    }

    #[test]
    fn test_is_admin_follows_role_normalization() {
        let mut state = AuthState::default();
        for role in ["Admin", " admin ", "ADMIN"] {
            let profile = Profile::new(UserId::new("u-1")).with_role(role);
            state.set_profile(Some(profile), ADMIN_ROLE);
            assert!(state.is_admin(), "{role:?}");
        }

        state.set_profile(Some(Profile::new(UserId::new("u-1")).with_role("user")), ADMIN_ROLE);
        assert!(!state.is_admin());
        state.set_profile(Some(Profile::new(UserId::new("u-1"))), ADMIN_ROLE);
        assert!(!state.is_admin());
        state.set_profile(None, ADMIN_ROLE);
        assert!(!state.is_admin());
    }

    #[test]
    fn test_replace_session_with_other_user_drops_profile() {
        let mut state = AuthState::default();
        state.replace_session(Some(session_for("a")), ADMIN_ROLE);
        state.set_profile(Some(Profile::new(UserId::new("a")).with_role("admin")), ADMIN_ROLE);

        state.replace_session(Some(session_for("b")), ADMIN_ROLE);

        assert_eq!(state.user_id(), Some(&UserId::new("b")));
        assert!(state.profile().is_none());
        assert!(!state.is_admin());
        assert!(state.profile_loading());
    }

    #[test]
    fn test_replace_session_with_same_user_keeps_profile() {
        let mut state = AuthState::default();
        let first = state.replace_session(Some(session_for("a")), ADMIN_ROLE);
        state.set_profile(Some(Profile::new(UserId::new("a")).with_role("admin")), ADMIN_ROLE);

        let second = state.replace_session(Some(session_for("a")), ADMIN_ROLE);

        assert!(second > first);
        assert!(state.is_admin());
        assert!(state.profile_loading());
    }

    #[test]
    fn test_replace_session_with_none_is_not_profile_loading() {
        let mut state = AuthState::default();
        state.replace_session(Some(session_for("a")), ADMIN_ROLE);
        state.replace_session(None, ADMIN_ROLE);
        assert!(!state.profile_loading());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_auth_calls_nest() {
        let mut state = AuthState::default();
        state.begin_auth_call();
        state.end_auth_call();
        assert!(state.loading(), "initial resolution still pending");
        state.end_auth_call();
        assert!(!state.loading());
        state.end_auth_call();
        assert!(!state.loading());
    }
}
