//! Signup, login and logout over HTTP.

use axum::http::{Method, StatusCode};
use serde_json::json;

use bazaar_integration_tests::{TestApp, request, unique_ip};

#[tokio::test]
async fn test_signup_normalizes_email_and_returns_view() {
    let app = TestApp::new();

    let resp = app.signup("Ann", " ANN@Example.com ", "secret123").await;

    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.message(), "User created successfully");
    assert_eq!(resp.body["user"]["email"], "ann@example.com");
    assert_eq!(resp.body["user"]["role"], "buyer");
    assert_eq!(resp.body["user"]["isVerified"], false);
    assert!(resp.body["user"].get("passwordHash").is_none());
    assert!(resp.body["user"]["lastLogin"].is_null());

    let cookie = resp.session_cookie().expect("signup sets a session cookie");
    let me = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["email"], "ann@example.com");
}

#[tokio::test]
async fn test_duplicate_signup_conflicts_on_normalized_email() {
    let app = TestApp::new();
    app.signup("Ann", "ann@example.com", "secret123").await;

    let resp = app.signup("Other Ann", "Ann@EXAMPLE.com", "another-pass").await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.message(), "an account with this email already exists");
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let app = TestApp::new();

    for (name, email, password) in [
        ("", "a@example.com", "secret123"),
        ("Ann", "not-an-email", "secret123"),
        ("Ann", "a@example.com", "short"),
    ] {
        let resp = app.signup(name, email, password).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{name}/{email}/{password}");
        assert!(!resp.message().is_empty());
    }
}

#[tokio::test]
async fn test_login_sets_session_cookie_and_last_login() {
    let app = TestApp::new();
    app.signup("Ann", " ANN@Example.com ", "secret123").await;

    let resp = app.login("ann@example.com", "secret123").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.message(), "Logged in successfully");
    assert!(resp.body["user"]["lastLogin"].is_string());

    let set_cookie = resp.set_cookies().join("\n");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=3600"));

    let cookie = resp.session_cookie().expect("session cookie");
    let me = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["email"], "ann@example.com");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.signup("Ann", "ann@example.com", "secret123").await;

    let wrong_password = app.login("ann@example.com", "secret999").await;
    let unknown_email = app.login("ghost@example.com", "secret123").await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.message(), "Invalid credentials");
    assert!(wrong_password.session_cookie().is_none());
}

#[tokio::test]
async fn test_logout_clears_cookie_without_session() {
    let app = TestApp::new();

    let resp = app.post_json("/auth/logout", &json!({}), None).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.message(), "Logged out successfully");
    let cleared = resp.set_cookies();
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|c| c.starts_with("token=;")));
    assert!(cleared[0].contains("Max-Age=0"));
    assert!(cleared[1].contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    assert!(resp.session_cookie().is_none());
}

#[tokio::test]
async fn test_credential_endpoints_are_rate_limited_per_ip() {
    let app = TestApp::new();
    let ip = unique_ip();
    let body = json!({ "email": "ghost@example.com", "password": "secret123" });

    for _ in 0..5 {
        let resp = app
            .send_from(&ip, request(Method::POST, "/auth/login", None, Some(&body)))
            .await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }

    let limited = app
        .send_from(&ip, request(Method::POST, "/auth/login", None, Some(&body)))
        .await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);

    // Other clients are unaffected.
    assert_eq!(
        app.login("ghost@example.com", "secret123").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_health_endpoints_and_request_id() {
    let app = TestApp::new();

    let live = app.get("/health", None).await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.bytes, b"ok");
    assert!(live.header("x-request-id").is_some());

    let mut req = request(Method::GET, "/health/ready", None, None);
    req.headers_mut()
        .insert("x-request-id", "req-123".parse().expect("header value"));
    let ready = app.send(req).await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.header("x-request-id"), Some("req-123"));
}
