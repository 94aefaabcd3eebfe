//! Federated login: reconciliation and the Google redirect handshake.
//!
//! Reconciliation tests hand profiles to the auth service directly. Callback
//! tests run the full code exchange against [`GoogleStub`].

use axum::http::{Method, StatusCode, header};
use serde_json::json;

use bazaar_core::Email;
use bazaar_identity::db::AccountStore;
use bazaar_identity::models::AccountUpdate;
use bazaar_identity::services::auth::FederatedProfile;
use bazaar_integration_tests::{GoogleStub, TestApp, TestResponse, request};

fn google_profile() -> FederatedProfile {
    FederatedProfile {
        email: "Ann@Example.com".to_string(),
        name: "Ann Google".to_string(),
        federated_id: "google-sub-1".to_string(),
        profile_picture: Some("https://lh3.test/ann.jpg".to_string()),
    }
}

fn with_google() -> TestApp {
    TestApp::with_vars(&[
        ("GOOGLE_CLIENT_ID", "client-id.apps.test"),
        ("GOOGLE_CLIENT_SECRET", "client-secret"),
    ])
}

#[tokio::test]
async fn test_federated_login_links_existing_password_account() {
    let app = TestApp::new();
    app.signup("Ann Original", "ann@example.com", "secret123").await;

    let first = app
        .state
        .auth()
        .federated_login(google_profile())
        .await
        .expect("federated login");
    let second = app
        .state
        .auth()
        .federated_login(google_profile())
        .await
        .expect("repeat login");

    assert_eq!(first.id, second.id);
    assert_eq!(second.name, "Ann Original");
    assert_eq!(second.federated_id.as_deref(), Some("google-sub-1"));
    assert!(second.is_verified);

    // Password login still works after linking.
    let login = app.login("ann@example.com", "secret123").await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_federated_only_account_cannot_password_login() {
    let app = TestApp::new();
    let account = app
        .state
        .auth()
        .federated_login(google_profile())
        .await
        .expect("federated login");

    let token = app.state.tokens().issue(&account).expect("issue");
    let me = app.get("/auth/me", Some(&format!("token={token}"))).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["photo"], "https://lh3.test/ann.jpg");

    let password = app.login("ann@example.com", "secret123").await;
    let unknown = app.login("ghost@example.com", "secret123").await;
    assert_eq!(password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(password.body, unknown.body);
}

#[tokio::test]
async fn test_google_login_not_configured() {
    let app = TestApp::new();

    let resp = app.get("/auth/google", None).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_google_login_redirects_with_state_cookie() {
    let app = with_google();

    let resp = app.get("/auth/google", None).await;

    assert!(resp.status.is_redirection());
    let location = resp.header("location").expect("location");
    assert!(location.starts_with("https://accounts.google.com/"));
    assert!(location.contains("client_id=client-id.apps.test"));
    assert!(location.contains("redirect_uri=http%3A%2F%2Fid.test%2Fauth%2Fgoogle%2Fcallback"));

    let state_cookie = resp.cookie_pair("oauth_state").expect("state cookie");
    let state = state_cookie.trim_start_matches("oauth_state=");
    assert!(location.contains(&format!("state={state}")));
}

#[tokio::test]
async fn test_google_callback_rejects_state_mismatch() {
    let app = with_google();

    let mut req = request(
        Method::GET,
        "/auth/google/callback?code=abc&state=forged",
        None,
        None,
    );
    req.headers_mut().insert(
        header::COOKIE,
        "oauth_state=expected".parse().expect("header value"),
    );
    let resp = app.send(req).await;

    assert!(resp.status.is_redirection());
    assert_eq!(
        resp.header("location"),
        Some("http://shop.test/login?error=invalid_state")
    );
    assert!(resp.session_cookie().is_none());
}

#[tokio::test]
async fn test_google_callback_reports_provider_denial() {
    let app = with_google();

    let resp = app
        .get("/auth/google/callback?error=access_denied", None)
        .await;

    assert!(resp.status.is_redirection());
    assert_eq!(
        resp.header("location"),
        Some("http://shop.test/login?error=google_denied")
    );
}

async fn complete_callback(app: &TestApp) -> TestResponse {
    app.get(
        "/auth/google/callback?code=stub-code&state=s-123",
        Some("oauth_state=s-123"),
    )
    .await
}

fn assert_state_cleared(resp: &TestResponse) {
    let cookies = resp.set_cookies();
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("oauth_state=;") && c.contains("Max-Age=0")),
        "state cookie not cleared: {cookies:?}"
    );
}

#[tokio::test]
async fn test_google_callback_signs_in_and_redirects_home() {
    let stub = GoogleStub::start(json!({
        "sub": "google-sub-9",
        "email": "Ann@Example.com",
        "email_verified": true,
        "name": "Ann Google",
        "picture": "https://lh3.test/ann.jpg",
    }))
    .await;
    let app = stub.app();

    let resp = complete_callback(&app).await;

    assert!(resp.status.is_redirection());
    assert_eq!(resp.header("location"), Some("http://shop.test/"));
    assert_state_cleared(&resp);

    let session = resp.session_cookie().expect("session cookie");
    let me = app.get("/auth/me", Some(&session)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["email"], "ann@example.com");
    assert_eq!(me.body["user"]["photo"], "https://lh3.test/ann.jpg");

    let account = app
        .store
        .find_by_email(&Email::parse("ann@example.com").expect("valid email"))
        .await
        .expect("store")
        .expect("account created");
    assert_eq!(account.federated_id.as_deref(), Some("google-sub-9"));
    assert!(account.is_verified);
    assert!(account.last_login.is_some());
}

#[tokio::test]
async fn test_google_callback_conflict_redirects_without_session() {
    let stub = GoogleStub::start(json!({
        "sub": "google-sub-1",
        "email": "ann@example.com",
        "email_verified": true,
        "name": "Ann Google",
    }))
    .await;
    let app = stub.app();

    // Link the provider id, then move the account to another email so the
    // provider's email no longer finds it but the id is still taken.
    let linked = app
        .state
        .auth()
        .federated_login(google_profile())
        .await
        .expect("federated login");
    app.store
        .update(
            linked.id,
            AccountUpdate {
                email: Some(Email::parse("moved@example.com").expect("valid email")),
                ..AccountUpdate::default()
            },
        )
        .await
        .expect("store")
        .expect("account exists");

    let resp = complete_callback(&app).await;

    assert!(resp.status.is_redirection());
    assert_eq!(
        resp.header("location"),
        Some("http://shop.test/login?error=account_conflict")
    );
    assert_state_cleared(&resp);
    assert!(resp.session_cookie().is_none());
    assert!(resp.body.get("message").is_none());
}

#[tokio::test]
async fn test_google_callback_unverified_email_redirects_with_failure() {
    let stub = GoogleStub::start(json!({
        "sub": "google-sub-2",
        "email": "bo@example.com",
        "email_verified": false,
    }))
    .await;
    let app = stub.app();

    let resp = complete_callback(&app).await;

    assert_eq!(
        resp.header("location"),
        Some("http://shop.test/login?error=google_failed")
    );
    assert_state_cleared(&resp);
    assert!(resp.session_cookie().is_none());
}
