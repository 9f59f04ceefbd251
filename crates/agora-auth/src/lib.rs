//! Credential lifecycle and authenticated upstream relays for Agora.
//!
//! The community front end keeps no business logic of its own: chat, feed
//! and account state all live on the upstream API server. This crate owns
//! the part that does carry state: how the two bearer credentials are
//! obtained, stored, renewed and attached to outbound calls, and how the
//! chat event stream is piped back to the caller without buffering.
//!
//! # Components
//!
//! - [`credentials`]: cookie-backed credential store and its in-memory fake
//! - [`token_manager`]: session token renewal against the upstream server
//! - [`oauth`]: provider code exchange (programmatic and redirect modes) and password login
//! - [`bridge`]: native shell authentication messages
//! - [`relay`]: authenticated JSON relay
//! - [`stream`]: unbuffered server-sent event relay
//! - [`upstream`]: shared HTTP client and upstream error extraction

pub mod bridge;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod relay;
pub mod stream;
pub mod token_manager;
pub mod upstream;

pub use bridge::{AppleNativePayload, BridgeMessage, BridgeOutcome, KakaoNativePayload, NativeBridge};
pub use credentials::{
    CookieCredentialStore, CookiePolicy, CredentialPair, CredentialStore, MemoryCredentialStore,
};
pub use error::{RelayError, Result};
pub use oauth::{ExchangeOutcome, OAuthExchange, OAuthExchangeRequest, Provider, RedirectOutcome, RedirectQuery};
pub use relay::ChatRelay;
pub use stream::{RelayStream, StreamRelay};
pub use token_manager::TokenLifecycle;
pub use upstream::{ParsedUpstreamError, Upstream, UpstreamConfig};
