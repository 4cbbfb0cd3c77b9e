//! The input tuple every guard evaluates.

use hearth_session::AuthState;

/// The slice of [`AuthState`] a guard depends on.
///
/// Guards never look at anything else, so any two states with the same
/// input produce the same decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardInput {
    pub loading: bool,
    pub profile_loading: bool,
    pub authenticated: bool,
    pub is_admin: bool,
}

impl From<&AuthState> for GuardInput {
    fn from(state: &AuthState) -> Self {
        Self {
            loading: state.loading(),
            profile_loading: state.profile_loading(),
            authenticated: state.is_authenticated(),
            is_admin: state.is_admin(),
        }
    }
}
