use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod repository;

// Module for routing segregation (one router per gate area).
pub mod routes;
use routes::{admin, authenticated, organization, public, volunteer};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point
// and the integration tests.
pub use config::AppConfig;
pub use gate::{Decision, RouteArea, RouteTable};
pub use repository::{MockRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the portal,
/// aggregating all paths and schemas decorated with the `#[utoipa::path]` and
/// `#[derive(utoipa::ToSchema)]` macros. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::signin_info, handlers::register_user,
        handlers::get_me, handlers::update_me,
        handlers::list_volunteers, handlers::create_volunteer,
        handlers::get_volunteer_details, handlers::update_volunteer,
        handlers::volunteer_dashboard, handlers::volunteer_profile,
        handlers::organization_dashboard,
        handlers::admin_list_users, handlers::admin_set_role,
        handlers::admin_delete_user, handlers::get_admin_stats
    ),
    components(
        schemas(
            models::UserRole, models::Profile, models::RegisterRequest,
            models::UpdateProfileRequest, models::SetRoleRequest,
            models::DashboardView, models::AdminStats, models::SignInInfo,
            models::Volunteer, models::VolunteerStatus, models::Availability,
            models::Certification, models::BackgroundCheck,
            models::BackgroundCheckStatus, models::Preferences,
            models::NotificationPreferences, models::PrivacyPreferences,
            models::CreateVolunteerRequest, models::UpdateVolunteerRequest,
        )
    ),
    tags(
        (name = "volunteer-portal", description = "Volunteer Portal Gateway API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding the application's
/// shared services and configuration, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: the profiles mirror behind the trait object.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration,
    /// including the gate's RouteTable.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Allow the Session extractor and handlers to selectively pull components
// from the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, installs the
/// route-access gate, applies the observability layers, and registers the
/// application state.
///
/// Layer ordering matters: the gate is layered over the assembled router so
/// it runs once per request *before* routing dispatch, so no handler executes
/// until the gate has allowed the request. The request-id and trace layers
/// wrap the gate in turn, so gate decisions are logged inside the request
/// span.
pub fn create_router(state: AppState) -> Router {
    // CORS: the portal frontend is served from a separate origin.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Documentation: the auto-generated Swagger UI (gate-exempt).
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // One router per gate area. None of them carries access-control
        // logic; the gate has already decided by the time routing happens.
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(organization::organization_routes())
        .nest("/volunteer-dashboard", volunteer::volunteer_routes())
        .nest("/admin", admin::admin_routes())
        // The Route-Access Gate: classifier + evaluator + dispatcher, once
        // per request, ahead of every handler.
        .layer(middleware::from_fn_with_state(state.clone(), gate::route_gate))
        .with_state(state);

    // Observability and correlation layers (outermost).
    base_router
        .layer(
            ServiceBuilder::new()
                // Request ID generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Request tracing: the whole lifecycle (gate included) inside
                // one span keyed by the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes `TraceLayer` span creation: includes the `x-request-id` header
/// (if present) alongside the HTTP method and URI, so every log line for a
/// request (gate decision included) is correlated by one id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
