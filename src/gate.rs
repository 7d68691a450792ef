use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{AppState, auth::Session, models::UserRole};

/// RouteArea
///
/// The category a request path resolves to. Every inbound path maps to exactly
/// one area; the Access Policy Evaluator combines the area with the session to
/// reach its decision. `Protected` covers every path that is neither public
/// nor inside a role-specific area (e.g. `/me`, `/settings`): it requires a
/// session but no particular role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteArea {
    Public,
    VolunteerArea,
    OrganizationArea,
    AdminArea,
    Protected,
}

/// Decision
///
/// The evaluator's verdict for one request. This tagged variant is the single
/// representation of "gate outcome" in the codebase: the dispatcher either
/// forwards the request unchanged (`Allow`) or answers with an HTTP redirect
/// to the carried target path (`Redirect`). No area router contains redirect
/// logic of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
}

/// RouteTable
///
/// Deploy-time routing configuration: which path prefixes form the public
/// list and the three role areas, where the canonical sign-in entry lives,
/// and the per-role home paths. This is static configuration carried inside
/// `AppConfig`; changing it is a deployment edit, never a runtime feature.
///
/// Invariant: every role's home path lies inside that role's own area, so a
/// home redirect can never bounce a user into an area they would immediately
/// be redirected out of again.
#[derive(Debug, Clone)]
pub struct RouteTable {
    /// Prefixes open to anonymous clients (the auth pages).
    pub public_paths: Vec<String>,
    /// Infrastructure paths the gate skips entirely (probes, docs, assets).
    pub exempt_paths: Vec<String>,
    /// Where anonymous requests for protected paths are sent.
    pub signin_path: String,
    /// Area roots.
    pub volunteer_root: String,
    pub organization_roots: Vec<String>,
    pub admin_root: String,
    /// Per-role landing paths (see `home_for`).
    pub volunteer_home: String,
    pub organization_home: String,
    pub admin_home: String,
}

impl Default for RouteTable {
    /// The portal's canonical layout: `/auth/**` is public, volunteers land
    /// on `/volunteer-dashboard`, organizations on `/dashboard` (with the
    /// legacy `/org-dashboard` alias), admins under `/admin`.
    fn default() -> Self {
        Self {
            public_paths: vec!["/auth".to_string()],
            exempt_paths: vec![
                "/health".to_string(),
                "/favicon.ico".to_string(),
                "/assets".to_string(),
                "/api-docs".to_string(),
                "/swagger-ui".to_string(),
            ],
            signin_path: "/auth/signin".to_string(),
            volunteer_root: "/volunteer-dashboard".to_string(),
            organization_roots: vec!["/dashboard".to_string(), "/org-dashboard".to_string()],
            admin_root: "/admin".to_string(),
            volunteer_home: "/volunteer-dashboard".to_string(),
            organization_home: "/dashboard".to_string(),
            admin_home: "/admin".to_string(),
        }
    }
}

impl RouteTable {
    /// home_for
    ///
    /// The single, total role → home-path mapping. Every rule in the
    /// evaluator that redirects "home" resolves through this function, so the
    /// targets cannot drift apart between rules. A session with no role tag
    /// yet (mid-registration) homes to the root path.
    pub fn home_for(&self, role: Option<UserRole>) -> &str {
        match role {
            Some(UserRole::Volunteer) => &self.volunteer_home,
            Some(UserRole::Organization) => &self.organization_home,
            Some(UserRole::Admin) => &self.admin_home,
            None => "/",
        }
    }

    /// True for infrastructure paths that bypass the gate completely.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| has_prefix(path, p))
    }
}

/// has_prefix
///
/// Segment-boundary-aware prefix test: `/auth` matches `/auth` and
/// `/auth/signin` but never `/authxyz`.
fn has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// classify
///
/// The Path Classifier: a pure function from a normalized request path to its
/// `RouteArea`. Checked in precedence order, first match wins:
/// public list, then the admin root, then the volunteer root, then the
/// organization roots, and finally the `Protected` catch-all.
pub fn classify(path: &str, table: &RouteTable) -> RouteArea {
    if table.public_paths.iter().any(|p| has_prefix(path, p)) {
        return RouteArea::Public;
    }
    if has_prefix(path, &table.admin_root) {
        return RouteArea::AdminArea;
    }
    if has_prefix(path, &table.volunteer_root) {
        return RouteArea::VolunteerArea;
    }
    if table.organization_roots.iter().any(|p| has_prefix(path, p)) {
        return RouteArea::OrganizationArea;
    }
    RouteArea::Protected
}

/// evaluate
///
/// The Access Policy Evaluator: the ordered decision table combining session,
/// area and path into a `Decision`. First applicable rule wins:
///
/// 1. signed in on a public (auth) page        → redirect to the role's home
/// 2. anonymous on any non-public page         → redirect to sign-in
/// 3. non-admin inside the admin area          → redirect to `/`
/// 4. volunteer inside the organization area   → redirect to volunteer home
/// 5. organization inside the volunteer area   → redirect to organization home
/// 6. signed in at the root path               → redirect to the role's home
/// 7. otherwise                                → allow
///
/// Rule 2 precedes the role rules: an anonymous session has no role to
/// mismatch, it is simply sent to sign in. A signed-in session whose role is
/// not yet set (mid-registration) matches neither rule 4 nor rule 5 and falls
/// through to `Allow`; it is still caught by rule 3 on admin paths. Rules 1
/// and 6 never emit a redirect whose target equals the requested path, which
/// is what keeps the unset-role session at `/` (whose home *is* `/`) out of a
/// redirect loop.
pub fn evaluate(session: &Session, area: RouteArea, path: &str, table: &RouteTable) -> Decision {
    // Rule 1: already signed in, trying to reach an auth page.
    if area == RouteArea::Public && session.is_signed_in() {
        let home = table.home_for(session.role);
        if home != path {
            return Decision::Redirect(home.to_string());
        }
        return Decision::Allow;
    }

    // Rule 2: anonymous access to anything non-public. Fail-closed.
    if area != RouteArea::Public && !session.is_signed_in() {
        return Decision::Redirect(table.signin_path.clone());
    }

    // Rules 3-5: cross-area containment for signed-in sessions.
    match (area, session.role) {
        (RouteArea::AdminArea, role) if role != Some(UserRole::Admin) => {
            return Decision::Redirect("/".to_string());
        }
        (RouteArea::OrganizationArea, Some(UserRole::Volunteer)) => {
            return Decision::Redirect(table.volunteer_home.clone());
        }
        (RouteArea::VolunteerArea, Some(UserRole::Organization)) => {
            return Decision::Redirect(table.organization_home.clone());
        }
        _ => {}
    }

    // Rule 6: the bare root resolves to the role's landing page.
    if path == "/" {
        let home = table.home_for(session.role);
        if home != path {
            return Decision::Redirect(home.to_string());
        }
    }

    // Rule 7.
    Decision::Allow
}

/// route_gate
///
/// The Redirect Dispatcher, installed as a router-wide middleware layer so it
/// runs exactly once per request, before routing dispatch. The `Session`
/// extractor ahead of it is infallible: any failure resolving the session has
/// already degraded to the anonymous session by the time the gate sees it.
///
/// Exempt infrastructure paths pass straight through. Everything else is
/// classified and evaluated; `Allow` forwards the request unchanged, and a
/// redirect decision answers with a 307 so the method survives the hop, the
/// same contract the original reverse-proxy gate honored.
pub async fn route_gate(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let table = &state.config.routes;

    if table.is_exempt(&path) {
        return next.run(request).await;
    }

    let area = classify(&path, table);
    match evaluate(&session, area, &path, table) {
        Decision::Allow => {
            tracing::debug!(%path, ?area, "gate: allow");
            next.run(request).await
        }
        Decision::Redirect(target) => {
            tracing::debug!(%path, ?area, %target, "gate: redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}
