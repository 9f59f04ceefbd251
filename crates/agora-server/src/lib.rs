//! HTTP surface for the Agora credential and relay layer.
//!
//! Every endpoint is a thin adapter: it builds a cookie-backed credential
//! store from the request, calls into `agora-auth`, and renders the result
//! as JSON, a redirect, or a raw event stream.
//!
//! # Routes
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | GET | `/health` | liveness |
//! | POST | `/auth/oauth/{provider}/callback` | provider code exchange |
//! | GET | `/auth/oauth/{provider}/callback` | provider redirect landing |
//! | POST | `/auth/login` | password login |
//! | POST | `/auth/refresh` | session renewal |
//! | POST | `/auth/logout` | end session |
//! | GET | `/auth/session` | session probe |
//! | POST | `/auth/native` | native shell bridge |
//! | POST | `/relay/chat` | authenticated JSON relay |
//! | POST | `/relay/chat/stream` | server-sent event relay |
//!
//! # Example
//!
//! ```ignore
//! use agora_auth::{CookiePolicy, Upstream, UpstreamConfig};
//! use agora_server::{Server, ServerConfig};
//!
//! let upstream = Upstream::new(UpstreamConfig::new("https://api.example.com/api"))?;
//! let server = Server::new(upstream, CookiePolicy::production(), ServerConfig::new());
//! server.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{AuthError, Result, ServerError};
pub use logging::request_logging_middleware;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use agora_auth::{CookiePolicy, Upstream};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Agora relay server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server.
    pub fn new(upstream: Upstream, cookies: CookiePolicy, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(upstream, cookies, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(routes::health_routes())
            .nest("/auth", Self::auth_routes())
            .nest("/relay", Self::relay_routes())
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http());

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }

        router.with_state(self.state.clone())
    }

    fn auth_routes() -> Router<AppState> {
        use axum::routing::{get, post};

        Router::new()
            .route(
                "/oauth/{provider}/callback",
                post(routes::oauth_exchange_handler).get(routes::oauth_redirect_handler),
            )
            .route("/login", post(routes::login_handler))
            .route("/refresh", post(routes::refresh_handler))
            .route("/logout", post(routes::logout_handler))
            .route("/session", get(routes::session_handler))
            .route("/native", post(routes::native_login_handler))
    }

    fn relay_routes() -> Router<AppState> {
        use axum::routing::post;

        Router::new()
            .route("/chat", post(routes::chat_handler))
            .route("/chat/stream", post(routes::chat_stream_handler))
    }

    /// Credentialed CORS for the configured origins, if any.
    fn cors_layer(&self) -> Option<CorsLayer> {
        let origins: Vec<HeaderValue> = self
            .state
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        if origins.is_empty() {
            return None;
        }

        Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true),
        )
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        self.run_with_shutdown(addr, std::future::pending()).await
    }

    /// Run until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        info!("Starting server on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}
