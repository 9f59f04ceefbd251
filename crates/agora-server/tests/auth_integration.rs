//! End-to-end credential flows over a real listener.

mod common;

use anyhow::Result;
use common::{TestServer, cookie_pairs};
use reqwest::StatusCode;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_unsupported_provider_never_reaches_upstream() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .post("/auth/oauth/naver/callback")
        .json(&json!({"code": "c", "state": "s"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"success": false, "error": "unsupported provider"}));
    assert_eq!(server.upstream_calls().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_exchanged_credentials_authorize_relay() -> Result<()> {
    let server = TestServer::start().await?;
    Mock::given(method("POST"))
        .and(path("/auth/oauth/kakao/callback/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": 7},
            "tokens": {"access": "A", "refresh": "R"}
        })))
        .expect(1)
        .mount(&server.upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/"))
        .and(header("authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "hello"})))
        .expect(1)
        .mount(&server.upstream)
        .await;

    let response = server
        .post("/auth/oauth/kakao/callback")
        .json(&json!({"code": "good"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let mut cookies = cookie_pairs(&response);
    cookies.sort();
    assert_eq!(cookies, vec!["access_token=A", "refresh_token=R"]);

    let reply: Value = server
        .post("/relay/chat")
        .header(reqwest::header::COOKIE, cookies.join("; "))
        .json(&json!({"message": "hi"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(reply, json!({"reply": "hello"}));
    Ok(())
}

#[tokio::test]
async fn test_error_body_with_success_status() -> Result<()> {
    let server = TestServer::start().await?;
    Mock::given(method("POST"))
        .and(path("/auth/oauth/kakao/callback/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server.upstream)
        .await;

    let response = server
        .post("/auth/oauth/kakao/callback")
        .json(&json!({"code": "bad"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(cookie_pairs(&response).is_empty());
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"success": false, "error": "invalid_grant"}));
    Ok(())
}

#[tokio::test]
async fn test_provider_denial_redirects_to_login() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .get("/auth/oauth/kakao/callback?error=access_denied")
        .send()
        .await?;

    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers()[reqwest::header::LOCATION],
        "/login?error=access_denied"
    );
    assert_eq!(server.upstream_calls().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_logout_then_relay_requires_login() -> Result<()> {
    let server = TestServer::start().await?;
    Mock::given(method("POST"))
        .and(path("/auth/logout/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server.upstream)
        .await;

    let response = server
        .post("/auth/logout")
        .header(reqwest::header::COOKIE, "access_token=A; refresh_token=R")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let mut cleared = cookie_pairs(&response);
    cleared.sort();
    assert_eq!(cleared, vec!["access_token=", "refresh_token="]);

    let response = server
        .post("/relay/chat")
        .json(&json!({"message": "hi"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
