use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, put},
};

/// Admin Router Module
///
/// The user-management console, nested under `/admin`. Rule 3 of the gate's
/// decision table redirects every non-admin session to `/` before routing
/// dispatch; the handlers still verify the role themselves and answer 403,
/// so the endpoints do not depend on being mounted behind the gate.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        // Every profile, including mid-registration ones with no role tag.
        .route("/users", get(handlers::admin_list_users))
        // PUT /admin/users/{id}/role
        // Role reassignment; picked up on the user's next request.
        .route("/users/{id}/role", put(handlers::admin_set_role))
        // DELETE /admin/users/{id}
        // Removes the local profile mirror.
        .route("/users/{id}", delete(handlers::admin_delete_user))
        // GET /admin/stats
        // Role tallies for the admin dashboard.
        .route("/stats", get(handlers::get_admin_stats))
}
