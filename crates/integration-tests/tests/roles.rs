//! Role changes through `PUT /auth/role`.

use axum::http::StatusCode;
use serde_json::json;

use bazaar_core::Role;
use bazaar_integration_tests::TestApp;

#[tokio::test]
async fn test_unknown_role_is_a_validation_error() {
    let app = TestApp::new();
    let cookie = app.signed_in("Ann", "ann@example.com", "secret123").await;

    let resp = app
        .put_json("/auth/role", &json!({ "role": "superadmin" }), Some(&cookie))
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let me = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(me.body["user"]["role"], "buyer");
}

#[tokio::test]
async fn test_buyer_can_become_seller_and_back() {
    let app = TestApp::new();
    let cookie = app.signed_in("Ann", "ann@example.com", "secret123").await;

    let seller = app
        .put_json("/auth/role", &json!({ "role": "seller" }), Some(&cookie))
        .await;
    assert_eq!(seller.status, StatusCode::OK);
    assert_eq!(seller.message(), "Role updated successfully");
    assert_eq!(seller.body["user"]["role"], "seller");

    let buyer = app
        .put_json("/auth/role", &json!({ "role": "buyer" }), Some(&cookie))
        .await;
    assert_eq!(buyer.body["user"]["role"], "buyer");
}

#[tokio::test]
async fn test_only_admin_can_hold_admin() {
    let app = TestApp::new();
    let cookie = app.signed_in("Ann", "ann@example.com", "secret123").await;

    let refused = app
        .put_json("/auth/role", &json!({ "role": "admin" }), Some(&cookie))
        .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);

    app.state
        .auth()
        .assign_role("ann@example.com", Role::Admin)
        .await
        .expect("bootstrap admin");

    let kept = app
        .put_json("/auth/role", &json!({ "role": "admin" }), Some(&cookie))
        .await;
    assert_eq!(kept.status, StatusCode::OK);
    assert_eq!(kept.body["user"]["role"], "admin");
}

#[tokio::test]
async fn test_role_change_requires_session() {
    let app = TestApp::new();

    let resp = app
        .put_json("/auth/role", &json!({ "role": "seller" }), None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}
