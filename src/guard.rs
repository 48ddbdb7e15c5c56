use crate::{
    models::{AccessDecision, SessionSnapshot, normalize_path},
    registry::ResolvedRoute,
};

/// AccessGuard
///
/// The access decision function, parameterised by where unauthenticated attempts are sent.
/// Holds no state besides its configuration: `decide` is pure and idempotent.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    login_path: String,
}

impl AccessGuard {
    pub fn new(login_path: &str) -> Self {
        Self {
            login_path: normalize_path(login_path),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// decide
    ///
    /// - no required capabilities: `Admit`;
    /// - authenticated session: `Admit`;
    /// - otherwise `Redirect` to the login path, remembering `attempt_path`.
    ///
    /// The one exception is a gated login view itself: redirecting would only land
    /// on the same attempt again, so it is `Deny`. Only the path part of the
    /// attempt is compared; `/login?returnUrl=...` is still the login view.
    pub fn decide(
        &self,
        route: &ResolvedRoute,
        session: SessionSnapshot,
        attempt_path: &str,
    ) -> AccessDecision {
        if route.required_capabilities.is_empty() || session.authenticated {
            return AccessDecision::Admit;
        }

        let (attempted, _query) = attempt_path.split_once('?').unwrap_or((attempt_path, ""));
        if normalize_path(attempted) == self.login_path {
            return AccessDecision::Deny;
        }

        AccessDecision::Redirect {
            target: self.login_path.clone(),
            return_path: attempt_path.to_string(),
        }
    }
}

impl Default for AccessGuard {
    fn default() -> Self {
        Self::new("/login")
    }
}
