use async_trait::async_trait;
use guarded_nav::{
    ConfigurationError, LoaderError, MemorySessionStore, MockViewLoader, NavError,
    NavigationEntry, NavigationRegistry, Navigator, SessionService, StaticViewLoader, ViewLoader,
    guard::AccessGuard,
    models::{
        Capability, NavPhase, NavigationAttempt, NavigationOutcome, RedirectReason,
        ViewDescriptor, return_path,
    },
    storage::StoreState,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

struct Fixture {
    navigator: Navigator,
    session: SessionService,
    home: MockViewLoader,
    login: MockViewLoader,
    users: MockViewLoader,
    dashboard: MockViewLoader,
    profile: MockViewLoader,
}

impl Fixture {
    fn gated_calls(&self) -> usize {
        self.dashboard.calls() + self.profile.calls()
    }

    fn total_calls(&self) -> usize {
        self.home.calls() + self.login.calls() + self.users.calls() + self.gated_calls()
    }
}

fn fixture() -> Fixture {
    fixture_with_users(MockViewLoader::new("UsersList"))
}

fn fixture_with_users(users: MockViewLoader) -> Fixture {
    let home = MockViewLoader::new("PublicHome");
    let login = MockViewLoader::new("Login");
    let dashboard = MockViewLoader::new("Dashboard");
    let profile = MockViewLoader::new("Profile");

    let registry = NavigationRegistry::register(vec![
        NavigationEntry::view("", home.shared()).titled("Home"),
        NavigationEntry::view("login", login.shared()).titled("Login"),
        NavigationEntry::view("users", users.shared()),
        NavigationEntry::parent(
            "admin",
            vec![
                NavigationEntry::redirect("", "dashboard"),
                NavigationEntry::view("dashboard", dashboard.shared()).titled("Admin Dashboard"),
                NavigationEntry::view("profile", profile.shared()),
            ],
        )
        .require(Capability::logged_in()),
        NavigationEntry::wildcard(""),
    ])
    .unwrap();

    let session =
        SessionService::restore(Arc::new(MemorySessionStore::new()) as StoreState);
    let navigator = Navigator::new(Arc::new(registry), session.view(), AccessGuard::default());

    Fixture {
        navigator,
        session,
        home,
        login,
        users,
        dashboard,
        profile,
    }
}

fn rendered_component(outcome: &NavigationOutcome) -> &str {
    match outcome {
        NavigationOutcome::Rendered { view } => &view.view.component,
        other => panic!("expected a rendered view, got {other:?}"),
    }
}

/// Loader that parks until the test opens the gate.
struct GatedLoader {
    gate: Arc<Notify>,
    component: &'static str,
}

#[async_trait]
impl ViewLoader for GatedLoader {
    async fn load(&self) -> Result<ViewDescriptor, LoaderError> {
        self.gate.notified().await;
        Ok(ViewDescriptor::new(self.component))
    }
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_protected_child_redirects_then_loads_once_after_login() {
        let fx = fixture();

        let outcome = fx.navigator.attempt("/admin/dashboard").await.unwrap();
        assert_eq!(
            outcome,
            NavigationOutcome::Redirected {
                from: "/admin/dashboard".to_string(),
                to: "/login?returnUrl=%2Fadmin%2Fdashboard".to_string(),
                reason: RedirectReason::Guard,
            }
        );
        assert_eq!(fx.dashboard.calls(), 0);

        // The redirect is a fresh navigation; the login view receives the saved path.
        let NavigationOutcome::Redirected { to, .. } = outcome else {
            unreachable!()
        };
        let login_outcome = fx.navigator.attempt(&to).await.unwrap();
        let NavigationOutcome::Rendered { view } = login_outcome else {
            panic!("login view should render");
        };
        assert_eq!(view.view.component, "Login");
        let resume = return_path(&view.query, "/admin/dashboard");
        assert_eq!(resume, "/admin/dashboard");

        assert!(fx.session.login("a", "b"));

        let report = fx.navigator.navigate(&resume).await.unwrap();
        assert_eq!(rendered_component(&report.outcome), "Dashboard");
        assert!(report.hops.is_empty());
        assert_eq!(fx.dashboard.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_path_redirects_to_root_without_loading() {
        let fx = fixture();

        let outcome = fx.navigator.attempt("/xyz").await.unwrap();
        assert_eq!(
            outcome,
            NavigationOutcome::Redirected {
                from: "/xyz".to_string(),
                to: "/".to_string(),
                reason: RedirectReason::Wildcard,
            }
        );
        assert_eq!(fx.total_calls(), 0);
        assert!(fx.navigator.active_view().is_none());
    }

    #[tokio::test]
    async fn test_navigate_follows_wildcard_to_home() {
        let fx = fixture();

        let report = fx.navigator.navigate("/xyz").await.unwrap();

        assert_eq!(rendered_component(&report.outcome), "PublicHome");
        assert_eq!(report.hops.len(), 1);
        assert_eq!(report.hops[0].reason, RedirectReason::Wildcard);
        assert_eq!(fx.home.calls(), 1);
    }

    #[tokio::test]
    async fn test_navigate_unauthenticated_lands_on_login() {
        let fx = fixture();

        let report = fx.navigator.navigate("/admin").await.unwrap();

        // /admin → /admin/dashboard (index) → /login?returnUrl=... (guard)
        assert_eq!(report.hops.len(), 2);
        assert_eq!(report.hops[0].reason, RedirectReason::Index);
        assert_eq!(report.hops[0].to, "/admin/dashboard");
        assert_eq!(report.hops[1].reason, RedirectReason::Guard);
        assert_eq!(rendered_component(&report.outcome), "Login");
        assert_eq!(fx.gated_calls(), 0);
    }

    #[tokio::test]
    async fn test_logout_directive_returns_to_home() {
        let fx = fixture();
        fx.session.login("a", "b");
        fx.navigator.navigate("/admin/profile").await.unwrap();
        assert_eq!(fx.profile.calls(), 1);

        let directive = fx.session.logout();
        let report = fx.navigator.follow(&directive).await.unwrap();
        assert_eq!(rendered_component(&report.outcome), "PublicHome");

        // The protected area is closed again.
        let outcome = fx.navigator.attempt("/admin/profile").await.unwrap();
        assert!(matches!(outcome, NavigationOutcome::Redirected { reason: RedirectReason::Guard, .. }));
        assert_eq!(fx.profile.calls(), 1);
    }

    #[tokio::test]
    async fn test_query_is_kept_in_return_path() {
        let fx = fixture();

        let outcome = fx.navigator.attempt("/admin/profile?tab=security").await.unwrap();
        let NavigationOutcome::Redirected { to, .. } = outcome else {
            panic!("expected a guard redirect");
        };

        let login = NavigationAttempt::parse(&to);
        assert_eq!(return_path(&login.query, "/"), "/admin/profile?tab=security");
    }
}

#[cfg(test)]
mod guarantee_tests {
    use super::*;

    #[tokio::test]
    async fn test_gated_loaders_never_run_for_unauthenticated_attempts() {
        let fx = fixture();
        let mut rng = rand::thread_rng();
        let children = ["", "dashboard", "profile", "settings", "dashboard/extra"];

        for _ in 0..100 {
            let child = children[rng.gen_range(0..children.len())];
            let path = if rng.gen_bool(0.5) {
                format!("/admin/{}", child)
            } else {
                format!("/admin/{}?ref={}", child, rng.gen_range(0..1000))
            };
            fx.navigator.navigate(&path).await.unwrap();
        }

        assert_eq!(fx.gated_calls(), 0);
        assert!(!fx.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_rendered_title_falls_back_to_route_title() {
        let fx = fixture();
        fx.session.login("a", "b");

        let report = fx.navigator.navigate("/admin/dashboard").await.unwrap();
        let NavigationOutcome::Rendered { view } = report.outcome else {
            panic!("expected dashboard to render");
        };
        assert_eq!(view.view.title.as_deref(), Some("Admin Dashboard"));
    }

    #[tokio::test]
    async fn test_gated_login_view_is_denied() {
        let login = MockViewLoader::new("Login");
        let registry = NavigationRegistry::register(vec![
            NavigationEntry::view("", StaticViewLoader::component("Home")),
            NavigationEntry::view("login", login.shared()).require(Capability::logged_in()),
            NavigationEntry::wildcard(""),
        ])
        .unwrap();
        let session =
            SessionService::restore(Arc::new(MemorySessionStore::new()) as StoreState);
        let navigator = Navigator::new(Arc::new(registry), session.view(), AccessGuard::default());

        let outcome = navigator.attempt("/login").await.unwrap();

        assert_eq!(
            outcome,
            NavigationOutcome::Denied {
                path: "/login".to_string()
            }
        );
        assert_eq!(login.calls(), 0);
        assert_eq!(navigator.phase(), NavPhase::Idle);
    }

    #[tokio::test]
    async fn test_gated_login_reached_with_return_url_is_denied() {
        let login = MockViewLoader::new("Login");
        let dashboard = MockViewLoader::new("Dashboard");
        let registry = NavigationRegistry::register(vec![
            NavigationEntry::view("", StaticViewLoader::component("Home")),
            NavigationEntry::view("login", login.shared()).require(Capability::logged_in()),
            NavigationEntry::parent(
                "admin",
                vec![
                    NavigationEntry::redirect("", "dashboard"),
                    NavigationEntry::view("dashboard", dashboard.shared()),
                ],
            )
            .require(Capability::logged_in()),
            NavigationEntry::wildcard(""),
        ])
        .unwrap();
        let session =
            SessionService::restore(Arc::new(MemorySessionStore::new()) as StoreState);
        let navigator = Navigator::new(Arc::new(registry), session.view(), AccessGuard::default());

        let report = navigator.navigate("/admin").await.unwrap();

        assert_eq!(
            report.outcome,
            NavigationOutcome::Denied {
                path: "/login".to_string()
            }
        );
        assert_eq!(report.hops.len(), 2);
        assert_eq!(report.hops[0].reason, RedirectReason::Index);
        assert_eq!(report.hops[1].reason, RedirectReason::Guard);
        assert_eq!(report.hops[1].to, "/login?returnUrl=%2Fadmin%2Fdashboard");
        assert_eq!(login.calls(), 0);
        assert_eq!(dashboard.calls(), 0);
        assert!(navigator.active_view().is_none());
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_loader_failure_is_transient_and_renders_nothing() {
        let fx = fixture_with_users(MockViewLoader::new_failing("UsersList"));

        let result = fx.navigator.navigate("/users").await;

        let err = result.unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, NavError::Loader { ref path, .. } if path == "/users"));
        assert!(fx.navigator.active_view().is_none());
        assert_eq!(fx.navigator.phase(), NavPhase::Idle);

        // Retrying is the caller's decision; the loader is invoked again.
        let _ = fx.navigator.navigate("/users").await;
        assert_eq!(fx.users.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_view() {
        let fx = fixture_with_users(MockViewLoader::new_failing("UsersList"));
        fx.navigator.navigate("/").await.unwrap();

        assert!(fx.navigator.navigate("/users").await.is_err());

        let active = fx.navigator.active_view().unwrap();
        assert_eq!(active.view.component, "PublicHome");
    }

    #[tokio::test]
    async fn test_redirect_cycle_is_a_configuration_error() {
        let registry = NavigationRegistry::register(vec![
            NavigationEntry::redirect("a", "/b"),
            NavigationEntry::redirect("b", "/a"),
            NavigationEntry::wildcard(""),
        ])
        .unwrap();
        let session =
            SessionService::restore(Arc::new(MemorySessionStore::new()) as StoreState);
        let navigator = Navigator::new(Arc::new(registry), session.view(), AccessGuard::default())
            .with_max_redirects(4);

        let result = navigator.navigate("/a").await;

        assert_eq!(
            result.unwrap_err(),
            NavError::Configuration(ConfigurationError::RedirectLoop {
                path: "/a".to_string(),
                hops: 4,
            })
        );
    }
}

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let gate = Arc::new(Notify::new());
        let fast = MockViewLoader::new("Fast");
        let registry = NavigationRegistry::register(vec![
            NavigationEntry::view(
                "slow",
                Arc::new(GatedLoader {
                    gate: gate.clone(),
                    component: "Slow",
                }),
            ),
            NavigationEntry::view("fast", fast.shared()),
            NavigationEntry::wildcard("fast"),
        ])
        .unwrap();
        let session =
            SessionService::restore(Arc::new(MemorySessionStore::new()) as StoreState);
        let navigator = Navigator::new(Arc::new(registry), session.view(), AccessGuard::default());

        let slow = navigator.attempt("/slow");
        tokio::pin!(slow);

        // Drive the slow attempt until it parks inside its loader.
        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut slow)
                .await
                .is_err()
        );
        assert_eq!(navigator.phase(), NavPhase::Loading);

        let newer = navigator.attempt("/fast").await.unwrap();
        assert_eq!(rendered_component(&newer), "Fast");

        gate.notify_one();
        let stale = slow.await.unwrap();

        assert_eq!(
            stale,
            NavigationOutcome::Superseded {
                path: "/slow".to_string()
            }
        );
        assert_eq!(navigator.active_view().unwrap().view.component, "Fast");
        assert_eq!(navigator.phase(), NavPhase::Idle);
    }

    #[tokio::test]
    async fn test_active_view_is_pushed_to_subscribers() {
        let fx = fixture();
        let mut outlet = fx.navigator.subscribe();

        fx.navigator.navigate("/users").await.unwrap();

        outlet.changed().await.unwrap();
        let view = outlet.borrow_and_update().clone().unwrap();
        assert_eq!(view.view.component, "UsersList");
        assert_eq!(view.path, "/users");
    }

    #[tokio::test]
    async fn test_history_records_each_cycle() {
        let fx = fixture();

        fx.navigator.navigate("/admin/dashboard").await.unwrap();

        let history = fx.navigator.history();
        let outcomes: Vec<&str> = history.iter().map(|r| r.outcome.as_str()).collect();
        assert_eq!(outcomes, vec!["redirected", "rendered"]);
        assert_eq!(history[0].location, "/admin/dashboard");
        assert_eq!(history[1].location, "/login?returnUrl=%2Fadmin%2Fdashboard");
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let fx = fixture();
        let navigator = fx.navigator.with_history_limit(3);

        for _ in 0..5 {
            navigator.navigate("/users").await.unwrap();
        }

        assert_eq!(navigator.history().len(), 3);
    }
}
