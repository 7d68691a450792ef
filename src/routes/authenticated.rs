use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Paths outside every role area that still require a session; the gate
/// classifies them as unclassified-protected and admits any signed-in
/// session, including one whose role tag is not set yet (mid-registration).
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /me: the caller's own profile.
        // PUT /me: profile self-service for display name, phone, emergency contact.
        .route("/me", get(handlers::get_me).put(handlers::update_me))
        // The volunteer directory: filtered listing plus enrollment, and
        // per-entry read/owner-only update.
        .route(
            "/api/volunteers",
            get(handlers::list_volunteers).post(handlers::create_volunteer),
        )
        .route(
            "/api/volunteers/{id}",
            get(handlers::get_volunteer_details).put(handlers::update_volunteer),
        )
}
