//! Credential endpoints: provider exchange, password login, refresh, logout.

use agora_auth::{
    CredentialStore, ExchangeOutcome, OAuthExchangeRequest, Provider, RedirectOutcome,
    RedirectQuery,
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AuthError;
use crate::state::AppState;

/// Body of a successful exchange or login.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    pub success: bool,
    pub user: Value,
    /// Echoed so the caller can act before the cookie lands.
    pub access_token: String,
    pub credentials_set: bool,
}

impl From<ExchangeOutcome> for ExchangeResponse {
    fn from(outcome: ExchangeOutcome) -> Self {
        Self {
            success: true,
            user: outcome.user,
            access_token: outcome.access_token,
            credentials_set: outcome.credentials_set,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
}

/// POST /auth/oauth/{provider}/callback
pub async fn oauth_exchange_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
    payload: Result<Json<OAuthExchangeRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<ExchangeResponse>), AuthError> {
    // Provider first: an unsupported provider is a 400 whatever the body.
    provider.parse::<Provider>()?;
    let Json(request) = payload?;

    let mut store = state.credentials(jar);
    let outcome = state.oauth.exchange(&provider, request, &mut store).await?;
    Ok((store.into_jar(), Json(outcome.into())))
}

/// GET /auth/oauth/{provider}/callback
pub async fn oauth_redirect_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<RedirectQuery>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let mut store = state.credentials(jar);
    let target = match state.oauth.exchange_redirect(&provider, query, &mut store).await {
        RedirectOutcome::Home => state.config.home_path.clone(),
        RedirectOutcome::Login { error } => state.config.login_redirect(&error),
    };
    (store.into_jar(), Redirect::to(&target))
}

/// POST /auth/login
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(CookieJar, Json<ExchangeResponse>), AuthError> {
    let Json(body) = payload?;
    let mut store = state.credentials(jar);
    let outcome = state.oauth.login(body, &mut store).await?;
    Ok((store.into_jar(), Json(outcome.into())))
}

/// POST /auth/refresh
///
/// A failed renewal clears both cookies.
pub async fn refresh_handler(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut store = state.credentials(jar);
    match state.tokens.refresh(&mut store).await {
        Ok(access_token) => {
            let body = RefreshResponse {
                success: true,
                access_token,
            };
            (store.into_jar(), Json(body)).into_response()
        }
        Err(e) => {
            store.clear();
            (store.into_jar(), AuthError::from(e)).into_response()
        }
    }
}

/// POST /auth/logout
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    let mut store = state.credentials(jar);
    state.tokens.logout(&mut store).await;
    (store.into_jar(), Json(serde_json::json!({ "success": true })))
}

/// GET /auth/session
pub async fn session_handler(State(state): State<AppState>, jar: CookieJar) -> Json<SessionResponse> {
    let store = state.credentials(jar);
    Json(SessionResponse {
        authenticated: store.session_token().is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{app, json_body, post_json, set_cookies};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{body_json, header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SIGNED_IN: &str = "access_token=A; refresh_token=R";

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_unsupported_provider_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for provider in ["naver", "google", "KAKAO"] {
            let response = app(&server.uri())
                .oneshot(post_json(
                    &format!("/auth/oauth/{}/callback", provider),
                    json!({"code": "c"}),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(response).await,
                json!({"success": false, "error": "unsupported provider"})
            );
        }
    }

    #[tokio::test]
    async fn test_exchange_sets_both_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/oauth/kakao/callback/"))
            .and(body_json(json!({"code": "good", "state": "s1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": 1, "nickname": "mina"},
                "tokens": {"access": "A", "refresh": "R"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(post_json(
                "/auth/oauth/kakao/callback",
                json!({"code": "good", "state": "s1"}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        assert!(cookies.iter().any(|c| c.starts_with("access_token=A;")));
        assert!(cookies.iter().any(|c| c.starts_with("refresh_token=R;")));
        assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["accessToken"], "A");
        assert_eq!(body["user"]["nickname"], "mina");
    }

    #[tokio::test]
    async fn test_error_in_success_body_sets_no_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/oauth/kakao/callback/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "invalid_grant"})))
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(post_json(
                "/auth/oauth/kakao/callback",
                json!({"code": "bad"}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(
            json_body(response).await,
            json!({"success": false, "error": "invalid_grant"})
        );
    }

    #[tokio::test]
    async fn test_redirect_with_provider_error_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(get("/auth/oauth/kakao/callback?error=access_denied"))
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/login?error=access_denied");
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_redirect_without_code() {
        let server = MockServer::start().await;
        let response = app(&server.uri())
            .oneshot(get("/auth/oauth/apple/callback?state=s1"))
            .await
            .unwrap();
        assert_eq!(location(&response), "/login?error=no_code");
    }

    #[tokio::test]
    async fn test_redirect_success_goes_home_with_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/oauth/apple/callback/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": 2},
                "tokens": {"access": "A", "refresh": "R"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(get("/auth/oauth/apple/callback?code=c&state=s"))
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/");
        assert_eq!(set_cookies(&response).len(), 2);
    }

    #[tokio::test]
    async fn test_redirect_failure_encodes_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "code already used"})),
            )
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(get("/auth/oauth/kakao/callback?code=c"))
            .await
            .unwrap();
        assert_eq!(location(&response), "/login?error=code%20already%20used");
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/token/refresh/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(post_json("/auth/refresh", json!({}), Some(SIGNED_IN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
        assert_eq!(json_body(response).await["error"], "login required");
    }

    #[tokio::test]
    async fn test_refresh_success_replaces_session_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/token/refresh/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(post_json("/auth/refresh", json!({}), Some(SIGNED_IN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            set_cookies(&response)
                .iter()
                .any(|c| c.starts_with("access_token=A2;"))
        );
        assert_eq!(json_body(response).await["accessToken"], "A2");
    }

    #[tokio::test]
    async fn test_refresh_with_only_renewal_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/token/refresh/"))
            .and(header_is("cookie", "refresh_token=R"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access": "A2", "refresh": "R2"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(post_json("/auth/refresh", json!({}), Some("refresh_token=R")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        assert!(cookies.iter().any(|c| c.starts_with("access_token=A2;")));
        assert!(cookies.iter().any(|c| c.starts_with("refresh_token=R2;")));
        assert!(cookies.iter().all(|c| !c.contains("Max-Age=0")));
        assert_eq!(json_body(response).await["accessToken"], "A2");
    }

    #[tokio::test]
    async fn test_logout_always_clears() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout/"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(post_json("/auth/logout", json!({}), Some(SIGNED_IN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(set_cookies(&response).len(), 2);
        assert_eq!(json_body(response).await, json!({"success": true}));
    }

    #[tokio::test]
    async fn test_session_probe() {
        let server = MockServer::start().await;
        let app = app(&server.uri());

        let response = app.clone().oneshot(get("/auth/session")).await.unwrap();
        assert_eq!(json_body(response).await, json!({"authenticated": false}));

        let request = Request::builder()
            .uri("/auth/session")
            .header(header::COOKIE, SIGNED_IN)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(json_body(response).await, json!({"authenticated": true}));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
