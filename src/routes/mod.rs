/// Router Module Index
///
/// Splits the shell's HTTP surface by concern. Neither module is gated: access
/// control for views happens inside the navigator, not at the HTTP layer.

/// Health probe and session management (login, logout, current flag).
pub mod session;

/// Navigation requests and the navigator's observable state.
pub mod navigation;
