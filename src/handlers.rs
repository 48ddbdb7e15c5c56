use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    AppState,
    auth::SessionState,
    error::NavError,
    models::{
        ActiveView, LoginRequest, LoginResponse, NavigateRequest, NavigationDirective,
        NavigationRecord, NavigationReport, SessionSnapshot, resume_path,
    },
    navigator::NavigatorState,
};

// --- Session Handlers ---

/// get_session
///
/// Current authentication flag, for the shell to toggle its navigation affordances.
#[utoipa::path(
    get,
    path = "/session",
    responses((status = 200, description = "Session state", body = SessionSnapshot))
)]
pub async fn get_session(State(session): State<SessionState>) -> Json<SessionSnapshot> {
    Json(session.snapshot())
}

/// login
///
/// Opens the session for any non-empty credentials. On success the response names the
/// path to resume at: the `return_url` the login view was opened with, or the configured
/// post-login default. Issuing that navigation is the caller's job.
#[utoipa::path(
    post,
    path = "/session/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = LoginResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> (StatusCode, Json<LoginResponse>) {
    if !state.session.login(&payload.username, &payload.password) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                authenticated: false,
                next_path: None,
                message: Some("Invalid username or password".to_string()),
            }),
        );
    }

    let next_path = resume_path(payload.return_url.as_deref(), &state.config.post_login_path);

    (
        StatusCode::OK,
        Json(LoginResponse {
            authenticated: true,
            next_path: Some(next_path),
            message: None,
        }),
    )
}

/// logout
///
/// Closes the session and returns the navigation the shell should perform next.
#[utoipa::path(
    post,
    path = "/session/logout",
    responses((status = 200, description = "Logged out", body = NavigationDirective))
)]
pub async fn logout(State(session): State<SessionState>) -> Json<NavigationDirective> {
    Json(session.logout())
}

// --- Navigation Handlers ---

/// navigate
///
/// Runs a full navigation, following redirects, and reports where it ended.
/// A loader failure answers 503 so the shell can show a transient notice and retry.
#[utoipa::path(
    post,
    path = "/navigate",
    request_body = NavigateRequest,
    responses(
        (status = 200, description = "Navigation finished", body = NavigationReport),
        (status = 500, description = "Route table misconfigured"),
        (status = 503, description = "View could not be loaded")
    )
)]
pub async fn navigate(
    State(navigator): State<NavigatorState>,
    Json(payload): Json<NavigateRequest>,
) -> Result<Json<NavigationReport>, NavError> {
    let report = navigator.navigate(&payload.path).await?;
    Ok(Json(report))
}

/// get_current_view
///
/// The view mounted in the outlet, or 204 before the first successful render.
#[utoipa::path(
    get,
    path = "/navigation/current",
    responses(
        (status = 200, description = "Active view", body = ActiveView),
        (status = 204, description = "Nothing rendered yet")
    )
)]
pub async fn get_current_view(
    State(navigator): State<NavigatorState>,
) -> Result<Json<ActiveView>, StatusCode> {
    navigator.active_view().map(Json).ok_or(StatusCode::NO_CONTENT)
}

/// get_history
#[utoipa::path(
    get,
    path = "/navigation/history",
    responses((status = 200, description = "Recent navigation attempts", body = [NavigationRecord]))
)]
pub async fn get_history(State(navigator): State<NavigatorState>) -> Json<Vec<NavigationRecord>> {
    Json(navigator.history())
}
