//! Authorization gate: which requests reach protected handlers.

use std::time::Duration;

use axum::http::{Method, StatusCode, header};
use secrecy::SecretString;

use bazaar_core::Email;
use bazaar_identity::services::TokenIssuer;
use bazaar_integration_tests::{TestApp, request};

async fn account_for(app: &TestApp, email: &str) -> bazaar_identity::models::Account {
    use bazaar_identity::db::AccountStore;

    app.store
        .find_by_email(&Email::parse(email).expect("valid email"))
        .await
        .expect("store")
        .expect("account exists")
}

#[tokio::test]
async fn test_missing_or_garbage_token_is_unauthenticated() {
    let app = TestApp::new();

    let missing = app.get("/auth/me", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.message(), "Not authenticated");

    let garbage = app.get("/auth/me", Some("token=not-a-jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body, missing.body);
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let app = TestApp::new();
    let cookie = app.signed_in("Ann", "ann@example.com", "secret123").await;
    let token = cookie.trim_start_matches("token=");

    let mut req = request(Method::GET, "/auth/profile", None, None);
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().expect("header value"),
    );
    let resp = app.send(req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["user"]["email"], "ann@example.com");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = TestApp::new();
    app.signup("Ann", "ann@example.com", "secret123").await;
    let account = account_for(&app, "ann@example.com").await;

    let foreign = TokenIssuer::new(
        &SecretString::from("Zq4!Lm8#Rt2$Wx6&Np0*Hv5^Jb9%Kc3@"),
        Duration::from_secs(3600),
    );
    let token = foreign.issue(&account).expect("issue");

    let resp = app.get("/auth/me", Some(&format!("token={token}"))).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new();
    app.signup("Ann", "ann@example.com", "secret123").await;
    let account = account_for(&app, "ann@example.com").await;

    let token = app
        .state
        .tokens()
        .issue_with_ttl(&account, Duration::ZERO)
        .expect("issue");
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let resp = app.get("/auth/me", Some(&format!("token={token}"))).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleted_account_token_fails_gate() {
    let app = TestApp::new();
    let cookie = app.signed_in("Ann", "ann@example.com", "secret123").await;

    let deleted = app.delete("/auth/account", Some(&cookie)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert!(deleted.set_cookies().join("\n").contains("Max-Age=0"));

    let resp = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let relogin = app.login("ann@example.com", "secret123").await;
    assert_eq!(relogin.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_gate_sees_current_role_not_token_role() {
    let app = TestApp::new();
    let cookie = app.signed_in("Ann", "ann@example.com", "secret123").await;

    app.state
        .auth()
        .assign_role("ann@example.com", bazaar_core::Role::Seller)
        .await
        .expect("assign role");

    let resp = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(resp.body["user"]["role"], "seller");
}
