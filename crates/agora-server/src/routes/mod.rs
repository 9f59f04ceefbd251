//! HTTP routes.

pub mod auth;
pub mod health;
pub mod native;
pub mod relay;

pub use auth::{
    ExchangeResponse, RefreshResponse, SessionResponse, login_handler, logout_handler,
    oauth_exchange_handler, oauth_redirect_handler, refresh_handler, session_handler,
};
pub use health::health_routes;
pub use native::{NativeLoginResponse, native_login_handler};
pub use relay::{chat_handler, chat_stream_handler};
