use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;
use volunteer_portal::{
    AppConfig, AppState, MockRepository, create_router,
    models::{Profile, UserRole},
    repository::RepositoryState,
};

/// A running portal instance backed by the in-memory repository, so the full
/// request path (session resolution, gate, routing, handlers) is exercised
/// without Postgres or the external auth provider.
struct TestApp {
    address: String,
    repo: Arc<MockRepository>,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(MockRepository::new());
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        // Env::Local, so the x-user-id bypass stands in for provider tokens.
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, repo }
}

impl TestApp {
    /// Seeds a profile and returns its id, for use with the bypass header.
    fn seed_user(&self, role: Option<UserRole>) -> Uuid {
        let id = Uuid::new_v4();
        self.repo.seed(Profile {
            id,
            email: format!("{id}@example.com"),
            role,
            ..Profile::default()
        });
        id
    }
}

/// Redirects must be observed, not followed.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .expect("redirect without a Location header")
        .to_str()
        .unwrap()
}

// --- Gate decisions end to end ---

#[tokio::test]
async fn health_is_reachable_without_a_session() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn anonymous_protected_path_redirects_to_signin() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/volunteer-dashboard", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 307);
    assert_eq!(location(&response), "/auth/signin");
}

#[tokio::test]
async fn the_signin_redirect_target_is_served_to_anonymous_clients() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/auth/signin", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn volunteer_is_redirected_out_of_the_organization_area() {
    let app = spawn_app().await;
    let volunteer = app.seed_user(Some(UserRole::Volunteer));

    let response = client()
        .get(format!("{}/dashboard", app.address))
        .header("x-user-id", volunteer.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 307);
    assert_eq!(location(&response), "/volunteer-dashboard");
}

#[tokio::test]
async fn organization_at_root_lands_on_its_dashboard() {
    let app = spawn_app().await;
    let organization = app.seed_user(Some(UserRole::Organization));

    let response = client()
        .get(format!("{}/", app.address))
        .header("x-user-id", organization.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 307);
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn admin_reaches_the_user_console() {
    let app = spawn_app().await;
    let admin = app.seed_user(Some(UserRole::Admin));
    app.seed_user(Some(UserRole::Volunteer));

    let response = client()
        .get(format!("{}/admin/users", app.address))
        .header("x-user-id", admin.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let users: Vec<Profile> = response.json().await.unwrap();
    assert_eq!(users.len(), 2);
}

#[tokio::test]
async fn non_admin_is_denied_the_admin_area() {
    let app = spawn_app().await;
    let volunteer = app.seed_user(Some(UserRole::Volunteer));

    let response = client()
        .get(format!("{}/admin/users", app.address))
        .header("x-user-id", volunteer.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 307);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn untagged_session_is_not_blocked_from_a_role_area() {
    // Mid-registration: signed in, no role tag yet. Neither containment rule
    // applies, so the profile page is served.
    let app = spawn_app().await;
    let untagged = app.seed_user(None);

    let response = client()
        .get(format!("{}/volunteer-dashboard/profile", app.address))
        .header("x-user-id", untagged.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let profile: Profile = response.json().await.unwrap();
    assert_eq!(profile.id, untagged);
    assert_eq!(profile.role, None);
}

#[tokio::test]
async fn signed_in_user_is_bounced_off_the_auth_pages() {
    let app = spawn_app().await;
    let volunteer = app.seed_user(Some(UserRole::Volunteer));

    let response = client()
        .get(format!("{}/auth/signin", app.address))
        .header("x-user-id", volunteer.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 307);
    assert_eq!(location(&response), "/volunteer-dashboard");
}

#[tokio::test]
async fn volunteer_home_serves_the_dashboard_view() {
    let app = spawn_app().await;
    let volunteer = app.seed_user(Some(UserRole::Volunteer));

    let response = client()
        .get(format!("{}/volunteer-dashboard", app.address))
        .header("x-user-id", volunteer.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["area"], "volunteer");
    assert_eq!(body["profile"]["id"], volunteer.to_string());
}

// --- Portal features behind the gate ---

#[tokio::test]
async fn registration_creates_a_tagged_profile() {
    let app = spawn_app().await;

    let response = client()
        .post(format!("{}/auth/register", app.address))
        .json(&serde_json::json!({
            "email": "new@example.com",
            "password": "correct-horse-battery",
            "role": "volunteer"
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let profile: Profile = response.json().await.unwrap();
    assert_eq!(profile.email, "new@example.com");
    assert_eq!(profile.role, Some(UserRole::Volunteer));

    // The freshly registered volunteer can enter their own area.
    let response = client()
        .get(format!("{}/volunteer-dashboard", app.address))
        .header("x-user-id", profile.id.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn profile_self_service_round_trip() {
    let app = spawn_app().await;
    let volunteer = app.seed_user(Some(UserRole::Volunteer));

    let response = client()
        .put(format!("{}/me", app.address))
        .header("x-user-id", volunteer.to_string())
        .json(&serde_json::json!({
            "display_name": "Sam",
            "emergency_contact": "Alex, +1 555 0100"
        }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);

    let response = client()
        .get(format!("{}/me", app.address))
        .header("x-user-id", volunteer.to_string())
        .send()
        .await
        .expect("req fail");
    let profile: Profile = response.json().await.unwrap();
    assert_eq!(profile.display_name.as_deref(), Some("Sam"));
    assert_eq!(profile.emergency_contact.as_deref(), Some("Alex, +1 555 0100"));
    // Untouched fields keep their values.
    assert_eq!(profile.phone, None);
}

#[tokio::test]
async fn admin_role_reassignment_moves_the_user_between_areas() {
    let app = spawn_app().await;
    let admin = app.seed_user(Some(UserRole::Admin));
    let user = app.seed_user(Some(UserRole::Volunteer));

    let response = client()
        .put(format!("{}/admin/users/{}/role", app.address, user))
        .header("x-user-id", admin.to_string())
        .json(&serde_json::json!({ "role": "organization" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);

    // Next request: the gate now treats the user as an organization.
    let response = client()
        .get(format!("{}/volunteer-dashboard", app.address))
        .header("x-user-id", user.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 307);
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn admin_deletion_leaves_the_user_anonymous() {
    let app = spawn_app().await;
    let admin = app.seed_user(Some(UserRole::Admin));
    let user = app.seed_user(Some(UserRole::Organization));

    let response = client()
        .delete(format!("{}/admin/users/{}", app.address, user))
        .header("x-user-id", admin.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 204);

    // The deleted user's credentials no longer resolve to a session.
    let response = client()
        .get(format!("{}/dashboard", app.address))
        .header("x-user-id", user.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 307);
    assert_eq!(location(&response), "/auth/signin");
}

#[tokio::test]
async fn admin_stats_tally_roles() {
    let app = spawn_app().await;
    let admin = app.seed_user(Some(UserRole::Admin));
    app.seed_user(Some(UserRole::Volunteer));
    app.seed_user(Some(UserRole::Volunteer));
    app.seed_user(Some(UserRole::Organization));
    app.seed_user(None);

    let response = client()
        .get(format!("{}/admin/stats", app.address))
        .header("x-user-id", admin.to_string())
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let stats: serde_json::Value = response.json().await.unwrap();
    assert_eq!(stats["total_users"], 5);
    assert_eq!(stats["volunteers"], 2);
    assert_eq!(stats["organizations"], 1);
    assert_eq!(stats["admins"], 1);
}
