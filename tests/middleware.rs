//! End-to-end request/response scenarios for the session middleware.
//!
//! All tests drive an axum router through `tower::ServiceExt::oneshot`
//! against the in-memory backend; no network required.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use tower::ServiceExt;

use sessionware::{
    session_middleware, BasicVerifier, CookieFrontend, CookieParameters, MemoryBackend, Session,
    SessionBackend, SessionManager, SessionRecord, UserSession,
};

const SECRET: &str = "integration-test-secret";
const SALT: &str = "integration-test-salt";

struct TestApp {
    router: Router,
    backend: Arc<MemoryBackend<UserSession>>,
    frontend: Arc<CookieFrontend>,
}

fn test_app(renewal_ttl: Option<u64>) -> TestApp {
    let backend: Arc<MemoryBackend<UserSession>> = Arc::new(MemoryBackend::new(3600));
    let frontend = Arc::new(CookieFrontend::new(
        "session",
        "cookie",
        SECRET,
        SALT,
        CookieParameters::default(),
    ));
    let verifier = Arc::new(BasicVerifier::<UserSession>::new("cookie", backend.clone()));

    let manager = SessionManager::<UserSession>::new(
        backend.clone(),
        frontend.clone(),
        verifier,
        true,
        renewal_ttl,
    );

    let router = Router::new()
        .route("/", get(handler))
        .layer(axum::middleware::from_fn_with_state(
            manager,
            session_middleware::<UserSession>,
        ));

    TestApp {
        router,
        backend,
        frontend,
    }
}

/// Echoes what the handler observed through the session slot.
async fn handler(Session(session): Session<UserSession>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "present": session.is_some(),
        "session_id": session.map(|s| s.session_id),
    }))
}

/// Mint a valid signed cookie for `key` using the app's own frontend.
fn mint_cookie(frontend: &CookieFrontend, key: &str) -> String {
    use sessionware::SessionFrontend;

    let mut headers = HeaderMap::new();
    frontend.open_session(key, &mut headers);
    let set_cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

/// Pull the session key back out of a Set-Cookie token. The payload part
/// is plain base64 of the key, so no secret is needed to read it.
fn key_from_set_cookie(response_headers: &HeaderMap) -> String {
    let set_cookie = response_headers
        .get(SET_COOKIE)
        .expect("response carries Set-Cookie")
        .to_str()
        .unwrap();
    let token = set_cookie
        .strip_prefix("session=")
        .expect("session cookie")
        .split(';')
        .next()
        .unwrap();
    let payload = token.split('.').next().unwrap();
    String::from_utf8(URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn fresh_request_creates_session_and_sets_cookie() {
    let app = test_app(None);

    let response = app
        .router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let key = key_from_set_cookie(response.headers());
    assert!(app.backend.exists(&key).await.unwrap());

    let body = body_json(response).await;
    assert_eq!(body["present"], true);
    // The handler saw exactly the session the cookie names
    assert_eq!(body["session_id"], key);
}

#[tokio::test]
async fn valid_cookie_exposes_stored_record() {
    let app = test_app(None);

    let key = app.backend.generate_session_key().await.unwrap();
    let record = UserSession::new(key.clone());
    app.backend.create(&key, &record, None).await.unwrap();

    let cookie = mint_cookie(&app.frontend, &key);
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // The response re-issues the same key with a fresh timestamp
    assert_eq!(key_from_set_cookie(response.headers()), key);

    let body = body_json(response).await;
    assert_eq!(body["present"], true);
    assert_eq!(body["session_id"], key);
}

#[tokio::test]
async fn renew_on_access_refreshes_ttl() {
    let app = test_app(Some(60));

    let key = app.backend.generate_session_key().await.unwrap();
    let record = UserSession::new(key.clone());
    // One second to live; only renewal keeps it alive past the sleep
    app.backend.create(&key, &record, Some(1)).await.unwrap();

    let cookie = mint_cookie(&app.frontend, &key);
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    assert!(
        app.backend.exists(&key).await.unwrap(),
        "session should have been renewed past its original expiry"
    );
}

#[tokio::test]
async fn stale_cookie_gets_replacement_session() {
    let app = test_app(None);

    // Valid signature over a key the backend has never seen
    let cookie = mint_cookie(&app.frontend, "ghost-key");

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let replacement = key_from_set_cookie(response.headers());
    assert_ne!(replacement, "ghost-key");
    assert!(app.backend.exists(&replacement).await.unwrap());

    // The handler observed an absent session for this request
    let body = body_json(response).await;
    assert_eq!(body["present"], false);
    assert_eq!(body["session_id"], serde_json::Value::Null);
}

#[tokio::test]
async fn tampered_cookie_is_treated_as_no_cookie() {
    let app = test_app(None);

    let key = app.backend.generate_session_key().await.unwrap();
    app.backend
        .create(&key, &UserSession::new(key.clone()), None)
        .await
        .unwrap();

    // Corrupt the signature part of a valid cookie
    let cookie = mint_cookie(&app.frontend, &key);
    let mut tampered = cookie.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/")
                .header(COOKIE, tampered)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Never a 500: the tampered token degrades to the new-session path
    assert_eq!(response.status(), StatusCode::OK);
    let fresh = key_from_set_cookie(response.headers());
    assert_ne!(fresh, key);

    let body = body_json(response).await;
    assert_eq!(body["present"], true);
    assert_eq!(body["session_id"], fresh);
}

#[tokio::test]
async fn invalidated_session_is_replaced() {
    let app = test_app(None);

    let key = app.backend.generate_session_key().await.unwrap();
    app.backend
        .create(&key, &UserSession::new(key.clone()), None)
        .await
        .unwrap();
    app.backend.invalidate(&key).await.unwrap();

    let cookie = mint_cookie(&app.frontend, &key);
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_ne!(key_from_set_cookie(response.headers()), key);

    let body = body_json(response).await;
    assert_eq!(body["present"], false);
}
