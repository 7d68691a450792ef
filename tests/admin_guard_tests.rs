use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use volunteer_portal::{
    AppConfig, AppState, MockRepository,
    models::{Profile, UserRole},
    repository::{Repository, RepositoryState},
    routes::admin::admin_routes,
};

/// The admin router mounted on its own, without the route-access gate in
/// front. The admin handlers re-check the role themselves, so a non-admin
/// session must still be refused even on this bare mount.
fn bare_admin_router(repo: Arc<MockRepository>) -> axum::Router {
    let state = AppState {
        repo: repo as RepositoryState,
        // Env::Local, so the x-user-id bypass stands in for provider tokens.
        config: AppConfig::default(),
    };
    admin_routes().with_state(state)
}

fn seed_user(repo: &MockRepository, role: Option<UserRole>) -> Uuid {
    let id = Uuid::new_v4();
    repo.seed(Profile {
        id,
        email: format!("{id}@example.com"),
        role,
        ..Profile::default()
    });
    id
}

fn get(path: &str, user: Uuid) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-user-id", user.to_string())
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn admin_session_passes_the_handler_check() {
    let repo = Arc::new(MockRepository::new());
    let admin = seed_user(&repo, Some(UserRole::Admin));
    let router = bare_admin_router(repo);

    let response = router.oneshot(get("/users", admin)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn volunteer_session_is_refused_by_the_handlers() {
    let repo = Arc::new(MockRepository::new());
    let volunteer = seed_user(&repo, Some(UserRole::Volunteer));
    let router = bare_admin_router(repo);

    let response = router.clone().oneshot(get("/users", volunteer)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router.oneshot(get("/stats", volunteer)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn untagged_session_is_refused_by_the_handlers() {
    let repo = Arc::new(MockRepository::new());
    let untagged = seed_user(&repo, None);
    let router = bare_admin_router(repo);

    let response = router.oneshot(get("/stats", untagged)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_admin_writes_are_refused_before_touching_the_repo() {
    let repo = Arc::new(MockRepository::new());
    let organization = seed_user(&repo, Some(UserRole::Organization));
    let target = seed_user(&repo, Some(UserRole::Volunteer));
    let router = bare_admin_router(repo.clone());

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/users/{target}/role"))
        .header("x-user-id", organization.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{ "role": "admin" }"#))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/users/{target}"))
        .header("x-user-id", organization.to_string())
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Neither write landed.
    let profile = repo.get_user(target).await;
    assert_eq!(profile.map(|p| p.role), Some(Some(UserRole::Volunteer)));
}
