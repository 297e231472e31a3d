#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::identity::User;

/// Authentication state exposed read-only to the views.
///
/// Starts loading; a fetch settles it to a user, to nobody, or to an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    pub is_loading: bool,
    pub is_error: bool,
    pub user: Option<User>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self { is_loading: true, is_error: false, user: None }
    }
}

impl AuthState {
    /// Whether the signed-in view renders. Loading and failure both fall
    /// through to the sign-in view.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthAction {
    /// A user fetch started.
    FetchInit,
    FetchSuccess(User),
    /// The provider answered that nobody is signed in.
    FetchEmpty,
    FetchFailure,
    /// Sign-out completed. Any fetch in flight was superseded, so loading
    /// settles too.
    Reset,
}

/// Apply `action` to `state`.
#[must_use]
pub fn reduce(state: &AuthState, action: AuthAction) -> AuthState {
    match action {
        AuthAction::FetchInit => AuthState { is_loading: true, is_error: false, ..state.clone() },
        AuthAction::FetchSuccess(user) => AuthState { is_loading: false, is_error: false, user: Some(user) },
        AuthAction::FetchEmpty => AuthState { is_loading: false, is_error: false, user: None },
        AuthAction::FetchFailure => AuthState { is_loading: false, is_error: true, user: None },
        AuthAction::Reset => AuthState { is_loading: false, user: None, ..state.clone() },
    }
}
