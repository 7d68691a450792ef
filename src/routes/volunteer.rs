use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Volunteer Router Module
///
/// The volunteer area, mounted under `/volunteer-dashboard`. The gate has
/// already turned away anonymous sessions (to sign-in) and
/// organization-tagged sessions (to their own home); admin and not-yet-tagged
/// sessions pass through.
pub fn volunteer_routes() -> Router<AppState> {
    Router::new()
        // GET /volunteer-dashboard
        // The volunteer landing summary.
        .route("/", get(handlers::volunteer_dashboard))
        // GET /volunteer-dashboard/profile
        // Personal info and emergency contact for the profile page.
        .route("/profile", get(handlers::volunteer_profile))
}
