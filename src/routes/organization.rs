use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Organization Router Module
///
/// The organization area. `/org-dashboard` is a legacy alias kept for
/// bookmarked links; both paths classify into the same area and serve the
/// same landing view.
pub fn organization_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::organization_dashboard))
        .route("/org-dashboard", get(handlers::organization_dashboard))
}
