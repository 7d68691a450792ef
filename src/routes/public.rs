use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// The auth pages: the only area open to anonymous clients (besides the
/// gate-exempt infrastructure paths). A signed-in session never reaches these
/// handlers; rule 1 of the gate's decision table has already redirected it to
/// its home.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancer checks. Gate-exempt,
        // so it answers even with a misconfigured auth provider.
        .route("/health", get(|| async { "ok" }))
        // GET /auth/signin
        // The canonical sign-in entry the gate redirects anonymous requests to.
        .route("/auth/signin", get(handlers::signin_info))
        // POST /auth/register
        // New account creation: credentials go to the external auth provider,
        // the mirrored profile row (with the requested role tag) is stored here.
        .route("/auth/register", post(handlers::register_user))
}
