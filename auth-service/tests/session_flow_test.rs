mod common;

use auth_service::build_router;
use auth_service::models::Role;
use auth_service::services::{OpaqueSession, SessionStore};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use common::{identity_with_role, issue_expired_token, issue_tampered_token, issue_token, test_state};

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn session_query_without_credentials_is_200_with_null_user() {
    let (state, _) = test_state();
    let app = build_router(state).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn session_query_with_valid_token_resolves_identity() {
    let (state, _) = test_state();
    let app = build_router(state).await.unwrap();

    let identity = identity_with_role(Role::Doctor);
    let token = issue_token(&identity);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/session")
                .header(header::COOKIE, format!("auth-token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["id"], identity.id.to_string());
    assert_eq!(body["user"]["email"], "doc@x.com");
    assert_eq!(body["user"]["role"], "DOCTOR");
}

#[tokio::test]
async fn expired_token_resolves_as_unauthenticated() {
    let (state, _) = test_state();
    let app = build_router(state).await.unwrap();

    let token = issue_expired_token(&identity_with_role(Role::Doctor));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/session")
                .header(header::COOKIE, format!("auth-token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn tampered_token_resolves_as_unauthenticated() {
    let (state, _) = test_state();
    let app = build_router(state).await.unwrap();

    let token = issue_tampered_token(&identity_with_role(Role::Doctor));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/session")
                .header(header::COOKIE, format!("auth-token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn logout_without_session_succeeds() {
    let (state, _) = test_state();
    let app = build_router(state).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cache_control = response
        .headers()
        .get(header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cache_control.contains("no-store"));

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let (state, _) = test_state();
    let app = build_router(state).await.unwrap();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
    }
}

#[tokio::test]
async fn logout_clears_every_session_cookie_and_only_those() {
    let (state, sessions) = test_state();
    let app = build_router(state).await.unwrap();

    let identity = identity_with_role(Role::Doctor);
    let token = issue_token(&identity);
    let sid = "0123456789abcdef0123456789abcdef";
    sessions
        .put(
            sid,
            &OpaqueSession {
                identity_id: identity.id,
                issued_utc: chrono::Utc::now(),
            },
            3600,
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(
                    header::COOKIE,
                    format!("auth-token={}; session={}; theme=dark", token, sid),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();

    assert!(set_cookies
        .iter()
        .any(|c| c.starts_with("auth-token=") && c.contains("Max-Age=0")));
    assert!(set_cookies
        .iter()
        .any(|c| c.starts_with("session=") && c.contains("Max-Age=0")));
    assert!(!set_cookies.iter().any(|c| c.starts_with("theme=")));

    // The opaque record is gone from the store.
    assert!(sessions.get(sid).await.unwrap().is_none());
}
