use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::SessionView,
    config::AppConfig,
    error::{ConfigurationError, NavError},
    guard::AccessGuard,
    models::{
        AccessDecision, ActiveView, NavPhase, NavigationAttempt, NavigationDirective,
        NavigationOutcome, NavigationRecord, NavigationReport, RETURN_URL_PARAM, RedirectHop,
        RedirectReason, with_query,
    },
    registry::{NavigationRegistry, Resolution, ResolvedRoute},
};

const DEFAULT_MAX_REDIRECTS: usize = 8;
const DEFAULT_HISTORY_LIMIT: usize = 50;

struct CycleState {
    /// Token of the attempt allowed to change phase and render.
    current: Option<Uuid>,
    phase: NavPhase,
    history: VecDeque<NavigationRecord>,
}

/// Navigator
///
/// Drives one navigation cycle at a time through
/// `Idle → Resolving → Deciding → (Loading → Rendering | Redirecting) → Idle`.
///
/// Every attempt gets a fresh token; starting a new attempt makes it the current one.
/// A loader that completes after its attempt stopped being current is discarded
/// (`NavigationOutcome::Superseded`), so only the latest request can render.
///
/// The internal lock is never held across the loader's await point.
pub struct Navigator {
    registry: Arc<NavigationRegistry>,
    guard: AccessGuard,
    session: SessionView,
    max_redirects: usize,
    history_limit: usize,
    state: Mutex<CycleState>,
    active: watch::Sender<Option<ActiveView>>,
}

impl Navigator {
    pub fn new(registry: Arc<NavigationRegistry>, session: SessionView, guard: AccessGuard) -> Self {
        let (active, _) = watch::channel(None);
        Self {
            registry,
            guard,
            session,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            state: Mutex::new(CycleState {
                current: None,
                phase: NavPhase::Idle,
                history: VecDeque::new(),
            }),
            active,
        }
    }

    pub fn from_config(
        registry: Arc<NavigationRegistry>,
        session: SessionView,
        config: &AppConfig,
    ) -> Self {
        Self::new(registry, session, AccessGuard::new(&config.login_path))
            .with_max_redirects(config.max_redirects)
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    /// navigate
    ///
    /// Runs attempts until one does not redirect, following each redirect as a fresh
    /// cycle. The report lists every hop taken. More than `max_redirects` hops is a
    /// configuration error (the table redirects in a circle).
    pub async fn navigate(&self, location: &str) -> Result<NavigationReport, NavError> {
        let mut hops = Vec::new();
        let mut next = location.to_string();

        loop {
            let outcome = self.attempt(&next).await?;

            let (from, to, reason) = match outcome {
                NavigationOutcome::Redirected { from, to, reason } => (from, to, reason),
                outcome => return Ok(NavigationReport { outcome, hops }),
            };

            hops.push(RedirectHop {
                from,
                to: to.clone(),
                reason,
            });
            if hops.len() > self.max_redirects {
                return Err(ConfigurationError::RedirectLoop {
                    path: location.to_string(),
                    hops: self.max_redirects,
                }
                .into());
            }
            next = to;
        }
    }

    /// Performs the navigation a directive asks for (e.g. the one `logout` returns).
    pub async fn follow(&self, directive: &NavigationDirective) -> Result<NavigationReport, NavError> {
        self.navigate(&directive.target).await
    }

    /// attempt
    ///
    /// One cycle for `location`. Redirects are reported, not followed: the redirect
    /// target is the next request the caller issues.
    pub async fn attempt(&self, location: &str) -> Result<NavigationOutcome, NavError> {
        let attempt = NavigationAttempt::parse(location);
        self.begin(&attempt);

        let span = tracing::info_span!(
            "navigation",
            attempt = %attempt.token,
            path = %attempt.target_path,
        );

        let result = self.run(&attempt).instrument(span).await;

        let summary = match &result {
            Ok(outcome) => outcome_label(outcome),
            Err(e) if e.is_transient() => "load_failed",
            Err(_) => "configuration_error",
        };
        self.finish(&attempt, summary);

        result
    }

    async fn run(&self, attempt: &NavigationAttempt) -> Result<NavigationOutcome, NavError> {
        let location = attempt.location();

        let route = match self.registry.resolve(&attempt.target_path)? {
            Resolution::Route(route) => route,
            Resolution::Redirect { to, reason } => {
                self.transition(attempt.token, NavPhase::Redirecting);
                tracing::debug!(to = %to, ?reason, "Route entry redirects");
                return Ok(NavigationOutcome::Redirected {
                    from: location,
                    to,
                    reason,
                });
            }
        };

        self.transition(attempt.token, NavPhase::Deciding);
        let decision = self.guard.decide(&route, self.session.snapshot(), &location);
        tracing::debug!(?decision, "Access decided");

        match decision {
            AccessDecision::Admit => self.load_and_render(attempt, route).await,
            AccessDecision::Redirect {
                target,
                return_path,
            } => {
                self.transition(attempt.token, NavPhase::Redirecting);
                let query = BTreeMap::from([(RETURN_URL_PARAM.to_string(), return_path)]);
                Ok(NavigationOutcome::Redirected {
                    from: location,
                    to: with_query(&target, &query),
                    reason: RedirectReason::Guard,
                })
            }
            AccessDecision::Deny => {
                tracing::info!("Navigation denied");
                Ok(NavigationOutcome::Denied {
                    path: attempt.target_path.clone(),
                })
            }
        }
    }

    async fn load_and_render(
        &self,
        attempt: &NavigationAttempt,
        route: ResolvedRoute,
    ) -> Result<NavigationOutcome, NavError> {
        self.transition(attempt.token, NavPhase::Loading);

        let loaded = route.loader.load().await;

        if !self.is_current(attempt.token) {
            tracing::debug!("Discarding view loaded for a superseded attempt");
            return Ok(NavigationOutcome::Superseded {
                path: attempt.target_path.clone(),
            });
        }

        let mut descriptor = loaded.map_err(|source| {
            tracing::warn!(error = %source, "View loader failed");
            NavError::Loader {
                path: attempt.target_path.clone(),
                source,
            }
        })?;

        self.transition(attempt.token, NavPhase::Rendering);

        if descriptor.title.is_none() {
            descriptor.title = route.title.clone();
        }

        let view = ActiveView {
            attempt: attempt.token,
            path: attempt.target_path.clone(),
            query: attempt.query.clone(),
            view: descriptor,
            rendered_at: Utc::now(),
        };
        self.active.send_replace(Some(view.clone()));

        tracing::info!(component = %view.view.component, "View rendered");
        Ok(NavigationOutcome::Rendered { view })
    }

    fn begin(&self, attempt: &NavigationAttempt) {
        self.with_state(|state| {
            if let Some(previous) = state.current.replace(attempt.token) {
                if state.phase != NavPhase::Idle {
                    tracing::debug!(superseded = %previous, "New navigation supersedes in-flight attempt");
                }
            }
            state.phase = NavPhase::Resolving;
        });
    }

    fn finish(&self, attempt: &NavigationAttempt, summary: &str) {
        let limit = self.history_limit;
        self.with_state(|state| {
            if state.current == Some(attempt.token) {
                state.phase = NavPhase::Idle;
            }
            state.history.push_back(NavigationRecord {
                attempt: attempt.token,
                location: attempt.location(),
                outcome: summary.to_string(),
                at: Utc::now(),
            });
            while state.history.len() > limit {
                state.history.pop_front();
            }
        });
    }

    fn transition(&self, token: Uuid, phase: NavPhase) {
        self.with_state(|state| {
            if state.current == Some(token) {
                tracing::debug!(from = ?state.phase, to = ?phase, "Phase transition");
                state.phase = phase;
            }
        });
    }

    fn is_current(&self, token: Uuid) -> bool {
        self.with_state(|state| state.current == Some(token))
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut CycleState) -> R) -> R {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    pub fn phase(&self) -> NavPhase {
        self.with_state(|state| state.phase)
    }

    pub fn active_view(&self) -> Option<ActiveView> {
        self.active.borrow().clone()
    }

    /// Push-notified handle on the active view, for the shell's outlet.
    pub fn subscribe(&self) -> watch::Receiver<Option<ActiveView>> {
        self.active.subscribe()
    }

    /// Recent attempts, oldest first.
    pub fn history(&self) -> Vec<NavigationRecord> {
        self.with_state(|state| state.history.iter().cloned().collect())
    }

    pub fn registry(&self) -> &NavigationRegistry {
        &self.registry
    }

    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }
}

fn outcome_label(outcome: &NavigationOutcome) -> &'static str {
    match outcome {
        NavigationOutcome::Rendered { .. } => "rendered",
        NavigationOutcome::Redirected { .. } => "redirected",
        NavigationOutcome::Denied { .. } => "denied",
        NavigationOutcome::Superseded { .. } => "superseded",
    }
}

/// NavigatorState
///
/// Shared handle type for the navigator inside the application state.
pub type NavigatorState = Arc<Navigator>;
