use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ConfigurationError
///
/// Startup-time (and, for a broken registry, fatal runtime) misconfiguration
/// of the navigation table. None of these are recoverable without changing
/// the registered entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("registry has no top-level wildcard ('**') entry")]
    MissingWildcard,

    #[error("duplicate sibling path '{path}' under '/{parent}'")]
    DuplicateSiblingPath { parent: String, path: String },

    #[error("invalid entry '/{path}': {reason}")]
    InvalidEntry { path: String, reason: String },

    #[error("no entry matches '{0}'")]
    Unresolvable(String),

    #[error("redirect chain starting at '{path}' exceeded {hops} hops")]
    RedirectLoop { path: String, hops: usize },
}

/// LoaderError
///
/// Failure reported by a deferred view loader (e.g. a chunk fetch that hit the network).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    #[error("view module unavailable: {0}")]
    Unavailable(String),

    #[error("view module rejected: {0}")]
    Rejected(String),
}

/// StoreError
///
/// Persistence failures of the session record. Callers treat these as best-effort.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// NavError
///
/// Errors surfaced to callers of the navigator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("failed to load view for '{path}': {source}")]
    Loader {
        path: String,
        #[source]
        source: LoaderError,
    },
}

impl NavError {
    /// Loader failures are transient; the caller may re-trigger the navigation.
    pub fn is_transient(&self) -> bool {
        matches!(self, NavError::Loader { .. })
    }
}

impl IntoResponse for NavError {
    fn into_response(self) -> Response {
        let status = match self {
            NavError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            NavError::Loader { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = json!({
            "error": self.to_string(),
            "transient": self.is_transient(),
        });
        (status, Json(body)).into_response()
    }
}
