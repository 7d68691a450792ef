use crate::{
    AppState,
    auth::Session,
    config::Env,
    models::{
        AdminStats, CreateVolunteerRequest, DashboardView, Profile, RegisterRequest,
        SetRoleRequest, SignInInfo, UpdateProfileRequest, UpdateVolunteerRequest, UserRole,
        Volunteer, VolunteerFilter,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

/// AuthSignupResponse
///
/// Minimal struct to deserialize the response from the external auth
/// provider's signup endpoint, capturing the newly created user's UUID.
#[derive(Deserialize)]
struct AuthSignupResponse {
    id: Uuid,
}

// --- Public Area ---

/// signin_info
///
/// [Public Route] The canonical sign-in entry path. The gate sends anonymous
/// requests for protected paths here. Credential exchange itself happens
/// against the external auth provider; this endpoint tells the frontend
/// where to find it.
#[utoipa::path(
    get,
    path = "/auth/signin",
    responses((status = 200, description = "Sign-in entry", body = SignInInfo))
)]
pub async fn signin_info(State(state): State<AppState>) -> Json<SignInInfo> {
    Json(SignInInfo {
        auth_url: state.config.auth_url.clone(),
    })
}

/// register_user
///
/// [Public Route] Handles initial user registration via the external auth
/// provider.
///
/// *Flow*: Calls the provider's signup endpoint, retrieves the canonical user
/// UUID, and uses that id to create the corresponding record in the local
/// `public.profiles` table with the requested role tag. This keeps the
/// primary keys synchronized between the external auth system and the local
/// mirror.
///
/// In `Env::Local` the provider call is skipped and a fresh UUID is minted,
/// the same guard as the development auth bypass.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses((status = 200, description = "Registered", body = Profile))
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<Profile>, StatusCode> {
    let user_id = match state.config.env {
        Env::Local => Uuid::new_v4(),
        Env::Production => {
            // Step 1: Create the account at the external auth provider.
            let client = reqwest::Client::new();
            let signup_url = format!("{}/auth/v1/signup", state.config.auth_url);

            let response = client
                .post(signup_url)
                .header("apikey", &state.config.auth_api_key)
                .header("Content-Type", "application/json")
                .json(&serde_json::json!({
                    "email": payload.email,
                    "password": payload.password,
                }))
                .send()
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            if !response.status().is_success() {
                // The provider rejected the signup (e.g., email already
                // exists, weak password).
                return Err(StatusCode::BAD_REQUEST);
            }

            // Step 2: Extract the canonical user id from the response.
            response
                .json::<AuthSignupResponse>()
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                .id
        }
    };

    // Step 3: Mirror the profile locally with the requested role tag.
    let profile = Profile {
        id: user_id,
        email: payload.email,
        role: Some(payload.role),
        ..Profile::default()
    };

    let created = state.repo.create_user(profile).await;
    Ok(Json(created))
}

// --- Authenticated (unclassified-protected) Area ---

/// get_me
///
/// [Protected Route] Retrieves the caller's own profile. The gate guarantees
/// a signed-in session reaches this handler; the 401 covers the impossible
/// anonymous case rather than panicking on it.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Own profile", body = Profile))
)]
pub async fn get_me(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<Profile>, StatusCode> {
    let user_id = session.user_id.ok_or(StatusCode::UNAUTHORIZED)?;
    let profile = state.repo.get_user(user_id).await.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(profile))
}

/// update_me
///
/// [Protected Route] Partial update of the caller's own profile: display
/// name, phone, emergency contact. Absent fields keep their stored values.
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Updated profile", body = Profile))
)]
pub async fn update_me(
    session: Session,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, StatusCode> {
    let user_id = session.user_id.ok_or(StatusCode::UNAUTHORIZED)?;
    let profile = state
        .repo
        .update_profile(user_id, payload)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(profile))
}

// --- Volunteer Directory ---

/// list_volunteers
///
/// [Protected Route] The volunteer directory listing. Filters combine with
/// AND: free-text search over names and email, required skills (all must be
/// present), availability slots (any may match), and status. Newest entries
/// first.
#[utoipa::path(
    get,
    path = "/api/volunteers",
    params(VolunteerFilter),
    responses((status = 200, description = "Matching volunteers", body = [Volunteer]))
)]
pub async fn list_volunteers(
    State(state): State<AppState>,
    Query(filter): Query<VolunteerFilter>,
) -> Json<Vec<Volunteer>> {
    let volunteers = state.repo.list_volunteers(&filter).await;
    Json(volunteers)
}

/// create_volunteer
///
/// [Protected Route] Enrolls the caller in the volunteer directory. The
/// record is owned by the session user; skills, availability, certifications
/// and preferences default to empty when omitted.
#[utoipa::path(
    post,
    path = "/api/volunteers",
    request_body = CreateVolunteerRequest,
    responses((status = 201, description = "Created", body = Volunteer))
)]
pub async fn create_volunteer(
    session: Session,
    State(state): State<AppState>,
    Json(payload): Json<CreateVolunteerRequest>,
) -> Result<(StatusCode, Json<Volunteer>), StatusCode> {
    let user_id = session.user_id.ok_or(StatusCode::UNAUTHORIZED)?;
    let volunteer = state.repo.create_volunteer(user_id, payload).await;
    Ok((StatusCode::CREATED, Json(volunteer)))
}

/// get_volunteer_details
///
/// [Protected Route] A single directory entry by id.
#[utoipa::path(
    get,
    path = "/api/volunteers/{id}",
    responses(
        (status = 200, description = "Directory entry", body = Volunteer),
        (status = 404, description = "No such entry")
    )
)]
pub async fn get_volunteer_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Volunteer>, StatusCode> {
    let volunteer = state.repo.get_volunteer(id).await.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(volunteer))
}

/// update_volunteer
///
/// [Protected Route] Partial update of a directory entry. The repository
/// only touches rows owned by the session user, so an attempt on someone
/// else's entry reads as not-found, same as a bad id.
#[utoipa::path(
    put,
    path = "/api/volunteers/{id}",
    request_body = UpdateVolunteerRequest,
    responses(
        (status = 200, description = "Updated entry", body = Volunteer),
        (status = 404, description = "No such entry, or not the owner")
    )
)]
pub async fn update_volunteer(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVolunteerRequest>,
) -> Result<Json<Volunteer>, StatusCode> {
    let user_id = session.user_id.ok_or(StatusCode::UNAUTHORIZED)?;
    let volunteer = state
        .repo
        .update_volunteer(id, user_id, payload)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(volunteer))
}

// --- Volunteer Area ---

/// volunteer_dashboard
///
/// [Volunteer Area] Landing summary for the volunteer dashboard. The gate has
/// already kept organization-tagged sessions out of this area.
#[utoipa::path(
    get,
    path = "/volunteer-dashboard",
    responses((status = 200, description = "Volunteer landing", body = DashboardView))
)]
pub async fn volunteer_dashboard(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<DashboardView>, StatusCode> {
    area_view(&session, &state, "volunteer").await
}

/// volunteer_profile
///
/// [Volunteer Area] The volunteer's profile page data: personal info,
/// emergency contact.
#[utoipa::path(
    get,
    path = "/volunteer-dashboard/profile",
    responses((status = 200, description = "Volunteer profile", body = Profile))
)]
pub async fn volunteer_profile(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<Profile>, StatusCode> {
    let user_id = session.user_id.ok_or(StatusCode::UNAUTHORIZED)?;
    let profile = state.repo.get_user(user_id).await.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(profile))
}

// --- Organization Area ---

/// organization_dashboard
///
/// [Organization Area] Landing summary for the organization dashboard, served
/// at both `/dashboard` and the legacy `/org-dashboard` alias.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Organization landing", body = DashboardView))
)]
pub async fn organization_dashboard(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<DashboardView>, StatusCode> {
    area_view(&session, &state, "organization").await
}

/// Shared dashboard shape: the caller's profile wrapped with the area that
/// served it.
async fn area_view(
    session: &Session,
    state: &AppState,
    area: &str,
) -> Result<Json<DashboardView>, StatusCode> {
    let user_id = session.user_id.ok_or(StatusCode::UNAUTHORIZED)?;
    let profile = state.repo.get_user(user_id).await.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(DashboardView {
        area: area.to_string(),
        profile,
    }))
}

// --- Admin Area ---

// The gate already redirects non-admins away from /admin, but each handler
// re-checks the role so the endpoints stay safe if they are ever mounted
// outside the gated router.
fn require_admin(session: &Session) -> Result<(), StatusCode> {
    if session.role == Some(UserRole::Admin) {
        Ok(())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

/// admin_list_users
///
/// [Admin Route] The user-management console listing: every profile, newest
/// first, including those still mid-registration (role unset).
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All profiles", body = [Profile]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn admin_list_users(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<Vec<Profile>>, StatusCode> {
    require_admin(&session)?;
    let users = state.repo.list_users().await;
    Ok(Json(users))
}

/// admin_set_role
///
/// [Admin Route] Reassigns a user's role tag. The change takes effect on the
/// user's next request, when the session extractor re-reads the profile.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    request_body = SetRoleRequest,
    responses((status = 200, description = "Updated profile", body = Profile))
)]
pub async fn admin_set_role(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<Profile>, StatusCode> {
    require_admin(&session)?;
    let profile = state
        .repo
        .set_user_role(id, payload.role)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(profile))
}

/// admin_delete_user
///
/// [Admin Route] Removes a profile from the mirror. The provider account is
/// managed externally; a token for a deleted profile resolves to the
/// anonymous session from then on.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn admin_delete_user(
    session: Session,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if require_admin(&session).is_err() {
        return StatusCode::FORBIDDEN;
    }
    if state.repo.delete_user(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// get_admin_stats
///
/// [Admin Route] Role tallies for the admin dashboard.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_stats(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, StatusCode> {
    require_admin(&session)?;
    let stats = state.repo.get_stats().await;
    Ok(Json(stats))
}
