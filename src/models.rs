use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Name of the query parameter carrying the originally attempted path to the login view.
pub const RETURN_URL_PARAM: &str = "returnUrl";

// --- Navigation Domain ---

/// Capability
///
/// A named permission a navigation entry can require. The session model only knows
/// "logged in", so any non-empty requirement set is satisfied by an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Capability(pub String);

impl Capability {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn logged_in() -> Self {
        Self::new("logged-in")
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ViewDescriptor
///
/// What a deferred loader hands back: enough for the shell to instantiate the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ViewDescriptor {
    /// Component identifier the shell mounts into its outlet.
    #[schema(example = "Dashboard")]
    pub component: String,
    /// Document title. Falls back to the route's title when the loader leaves it empty.
    pub title: Option<String>,
}

impl ViewDescriptor {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            title: None,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// NavigationAttempt
///
/// One navigation call. The token identifies the attempt for stale-response checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationAttempt {
    pub token: Uuid,
    /// Absolute path with a leading '/', without query string.
    pub target_path: String,
    pub query: BTreeMap<String, String>,
}

impl NavigationAttempt {
    /// Parses a raw location such as `admin/dashboard?tab=1` into a fresh attempt.
    pub fn parse(raw: &str) -> Self {
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, query),
            None => (raw, ""),
        };

        let query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        Self {
            token: Uuid::new_v4(),
            target_path: normalize_path(path),
            query,
        }
    }

    /// The full location including the query string, as shown in an address bar.
    pub fn location(&self) -> String {
        with_query(&self.target_path, &self.query)
    }
}

/// Canonical form of a path: leading '/', no trailing or doubled separators.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Appends an url-encoded query string to `path` (nothing when `query` is empty).
pub fn with_query(path: &str, query: &BTreeMap<String, String>) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query.iter())
        .finish();
    format!("{}?{}", path, encoded)
}

/// return_path
///
/// Post-login handoff: the path to resume at, read from the `returnUrl` query parameter
/// of the login location, or `default` when absent.
pub fn return_path(query: &BTreeMap<String, String>, default: &str) -> String {
    resume_path(query.get(RETURN_URL_PARAM).map(String::as_str), default)
}

/// Same as [`return_path`] for a `returnUrl` value already extracted by the caller.
/// The query string of the saved location is kept.
pub fn resume_path(return_url: Option<&str>, default: &str) -> String {
    match return_url.filter(|value| !value.is_empty()) {
        Some(value) => NavigationAttempt::parse(value).location(),
        None => default.to_string(),
    }
}

/// AccessDecision
///
/// Result of consulting the guard for one attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessDecision {
    Admit,
    Redirect { target: String, return_path: String },
    Deny,
}

/// NavPhase
///
/// Phases of the navigator's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NavPhase {
    Idle,
    Resolving,
    Deciding,
    Loading,
    Rendering,
    Redirecting,
}

/// RedirectReason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// The guard sent an unauthenticated attempt to the login view.
    Guard,
    /// A parent entry without its own view forwards to one of its children.
    Index,
    /// The catch-all entry matched.
    Wildcard,
}

/// ActiveView
///
/// The view currently mounted in the shell's outlet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ActiveView {
    pub attempt: Uuid,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub view: ViewDescriptor,
    #[ts(type = "string")]
    pub rendered_at: DateTime<Utc>,
}

/// NavigationOutcome
///
/// How a single navigation cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// The destination's loader completed and its view is now active.
    Rendered { view: ActiveView },
    /// A fresh navigation to `to` was issued instead.
    Redirected {
        from: String,
        to: String,
        reason: RedirectReason,
    },
    /// The guard refused the attempt outright.
    Denied { path: String },
    /// A newer attempt took over while this one was loading; its result was discarded.
    Superseded { path: String },
}

/// RedirectHop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RedirectHop {
    pub from: String,
    pub to: String,
    pub reason: RedirectReason,
}

/// NavigationReport
///
/// Result of `Navigator::navigate`: the final outcome plus every redirect followed on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationReport {
    pub outcome: NavigationOutcome,
    pub hops: Vec<RedirectHop>,
}

/// NavigationRecord
///
/// One entry of the navigator's bounded history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationRecord {
    pub attempt: Uuid,
    pub location: String,
    pub outcome: String,
    #[ts(type = "string")]
    pub at: DateTime<Utc>,
}

/// NavigationDirective
///
/// A navigation the caller is asked to perform (e.g. after logout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationDirective {
    #[schema(example = "/")]
    pub target: String,
}

impl NavigationDirective {
    pub fn root() -> Self {
        Self {
            target: "/".to_string(),
        }
    }
}

/// SessionSnapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionSnapshot {
    pub authenticated: bool,
}

// --- Request / Response Payloads ---

/// LoginRequest
///
/// Input payload for POST /session/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[schema(example = "admin")]
    pub username: String,
    pub password: String,
    /// The `returnUrl` the login view was opened with, if any.
    #[schema(example = "/admin/dashboard")]
    pub return_url: Option<String>,
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub authenticated: bool,
    /// Where the caller should navigate next.
    pub next_path: Option<String>,
    pub message: Option<String>,
}

/// NavigateRequest
///
/// Input payload for POST /navigate.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigateRequest {
    #[schema(example = "/admin/dashboard")]
    pub path: String,
}
