//! Integration tests for the Bazaar identity service.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process router tests (no database needed)
//! cargo test -p bazaar-integration-tests
//!
//! # Include the PostgreSQL store tests
//! IDENTITY_TEST_DATABASE_URL=postgres://localhost/bazaar_test \
//!     cargo test -p bazaar-integration-tests -- --include-ignored
//! ```
//!
//! [`TestApp`] builds the real router over [`MemoryAccountStore`] with a cheap
//! Argon2 cost and a temporary asset directory, and drives it with
//! `tower::ServiceExt::oneshot`.

#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::{get, post},
};
use serde_json::Value;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use bazaar_identity::config::IdentityConfig;
use bazaar_identity::db::MemoryAccountStore;
use bazaar_identity::services::LocalAssetStore;
use bazaar_identity::{AppState, router};

/// Signing secret used by every test app.
pub const TEST_JWT_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6e";

/// Public base URL used by every test app.
pub const TEST_BASE_URL: &str = "http://id.test";

/// Access token handed out by [`GoogleStub`].
pub const STUB_ACCESS_TOKEN: &str = "stub-access-token";

static NEXT_CLIENT: AtomicU32 = AtomicU32::new(1);

/// A fresh client IP, so the credential rate limiter never trips across tests.
pub fn unique_ip() -> String {
    let n = NEXT_CLIENT.fetch_add(1, Ordering::Relaxed);
    format!("10.{}.{}.{}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff)
}

/// Response with its body read and, when possible, parsed as JSON.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    /// `Value::Null` when the body is empty or not JSON.
    pub body: Value,
}

impl TestResponse {
    /// All `Set-Cookie` header values.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_owned)
            .collect()
    }

    /// `name=value` of a cookie set with a non-empty value, for replay in a
    /// `Cookie` header.
    pub fn cookie_pair(&self, name: &str) -> Option<String> {
        self.set_cookies().into_iter().find_map(|c| {
            let pair = c.split(';').next()?.trim().to_owned();
            let (n, v) = pair.split_once('=')?;
            (n == name && !v.is_empty()).then_some(pair)
        })
    }

    /// The session cookie pair (`token=...`).
    pub fn session_cookie(&self) -> Option<String> {
        self.cookie_pair("token")
    }

    /// Header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `body.message` as a string.
    pub fn message(&self) -> &str {
        self.body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// The identity router over an in-memory store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryAccountStore>,
    assets: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Build with extra environment variables layered over the defaults.
    pub fn with_vars(extra: &[(&str, &str)]) -> Self {
        let assets = tempfile::tempdir().expect("failed to create asset dir");
        let asset_dir = assets.path().to_string_lossy().into_owned();

        let mut vars: HashMap<String, String> = [
            ("IDENTITY_DATABASE_URL", "postgres://unused/bazaar"),
            ("IDENTITY_BASE_URL", TEST_BASE_URL),
            ("FRONTEND_URL", "http://shop.test"),
            ("JWT_SECRET", TEST_JWT_SECRET),
            ("PASSWORD_MEMORY_KIB", "1024"),
            ("PASSWORD_ITERATIONS", "1"),
            ("PASSWORD_PARALLELISM", "1"),
            ("ASSET_DIR", asset_dir.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        for (k, v) in extra {
            vars.insert((*k).to_owned(), (*v).to_owned());
        }

        let config = IdentityConfig::from_lookup(|key| vars.get(key).cloned())
            .expect("test config is valid");
        let store = Arc::new(MemoryAccountStore::new());
        let asset_store = Arc::new(LocalAssetStore::new(
            assets.path(),
            &format!("{TEST_BASE_URL}/assets"),
        ));
        let state =
            AppState::new(config, store.clone(), asset_store).expect("test state is valid");

        Self {
            router: router(state.clone()),
            state,
            store,
            assets,
        }
    }

    /// Temporary directory holding uploaded assets.
    pub fn asset_dir(&self) -> &std::path::Path {
        self.assets.path()
    }

    /// Send a request from a fresh client IP.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        self.send_from(&unique_ip(), request).await
    }

    /// Send a request as if forwarded for `ip`.
    pub async fn send_from(&self, ip: &str, mut request: Request<Body>) -> TestResponse {
        request.headers_mut().insert(
            "x-forwarded-for",
            ip.parse().expect("valid header value"),
        );

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body")
            .to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, path, cookie, None)).await
    }

    pub async fn delete(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        self.send(request(Method::DELETE, path, cookie, None)).await
    }

    pub async fn post_json(&self, path: &str, body: &Value, cookie: Option<&str>) -> TestResponse {
        self.send(request(Method::POST, path, cookie, Some(body)))
            .await
    }

    pub async fn put_json(&self, path: &str, body: &Value, cookie: Option<&str>) -> TestResponse {
        self.send(request(Method::PUT, path, cookie, Some(body))).await
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/auth/signup",
            &serde_json::json!({ "name": name, "email": email, "password": password }),
            None,
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/auth/login",
            &serde_json::json!({ "email": email, "password": password }),
            None,
        )
        .await
    }

    /// Sign up and log in, returning the session cookie pair.
    pub async fn signed_in(&self, name: &str, email: &str, password: &str) -> String {
        let created = self.signup(name, email, password).await;
        assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
        self.login(email, password)
            .await
            .session_cookie()
            .expect("login sets a session cookie")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a request with an optional `Cookie` header and JSON body.
pub fn request(
    method: Method,
    path: &str,
    cookie: Option<&str>,
    body: Option<&Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}

/// Build a `multipart/form-data` upload with a single file field.
pub fn multipart_upload(
    path: &str,
    cookie: &str,
    field: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    const BOUNDARY: &str = "bazaar-test-boundary";

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"upload\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("valid request")
}

/// Local stand-in for Google's token and userinfo endpoints.
///
/// Any code is exchanged for [`STUB_ACCESS_TOKEN`]; the userinfo endpoint
/// returns the given profile for that token and 401 otherwise.
pub struct GoogleStub {
    base_url: String,
    server: JoinHandle<()>,
}

impl GoogleStub {
    pub async fn start(userinfo: Value) -> Self {
        let userinfo = Arc::new(userinfo);
        let app = Router::new()
            .route(
                "/token",
                post(|| async {
                    Json(serde_json::json!({
                        "access_token": STUB_ACCESS_TOKEN,
                        "token_type": "Bearer",
                    }))
                }),
            )
            .route(
                "/userinfo",
                get(move |headers: HeaderMap| {
                    let userinfo = Arc::clone(&userinfo);
                    async move {
                        let expected = format!("Bearer {STUB_ACCESS_TOKEN}");
                        let authorized = headers
                            .get(header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            == Some(expected.as_str());
                        if authorized {
                            Ok(Json((*userinfo).clone()))
                        } else {
                            Err(StatusCode::UNAUTHORIZED)
                        }
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind Google stub");
        let addr = listener.local_addr().expect("stub address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Google stub failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            server,
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/token", self.base_url)
    }

    pub fn userinfo_url(&self) -> String {
        format!("{}/userinfo", self.base_url)
    }

    /// A test app with Google sign-in pointed at this stub.
    pub fn app(&self) -> TestApp {
        let token_url = self.token_url();
        let userinfo_url = self.userinfo_url();
        TestApp::with_vars(&[
            ("GOOGLE_CLIENT_ID", "client-id.apps.test"),
            ("GOOGLE_CLIENT_SECRET", "client-secret"),
            ("GOOGLE_TOKEN_URL", &token_url),
            ("GOOGLE_USERINFO_URL", &userinfo_url),
        ])
    }
}

impl Drop for GoogleStub {
    fn drop(&mut self) {
        self.server.abort();
    }
}
