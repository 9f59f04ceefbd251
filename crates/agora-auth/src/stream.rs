//! Unbuffered server-sent event relay.
//!
//! Upstream bytes are handed to the caller chunk by chunk as they arrive.
//! Nothing is parsed or re-framed, so whatever `data: ...\n\n` framing the
//! upstream used reaches the caller intact. Backpressure comes from the
//! transport: the next chunk is only pulled once the caller's body has
//! accepted the previous one.
//!
//! Upstream must answer with headers within the request timeout. After
//! that the relay ends when upstream closes, when no chunk arrives within
//! the idle timeout, or when the caller goes away. Dropping the stream drops
//! the upstream response and closes that connection.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::credentials::CredentialStore;
use crate::error::{RelayError, Result};
use crate::upstream::{Upstream, rejection};

/// Content type of a relayed event stream.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Boxed byte stream handed to the HTTP layer.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// An open relay to an upstream event stream.
pub struct RelayStream {
    body: ByteStream,
}

impl RelayStream {
    /// Take the byte stream.
    pub fn into_body(self) -> ByteStream {
        self.body
    }
}

impl std::fmt::Debug for RelayStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayStream").finish_non_exhaustive()
    }
}

/// Relays chat requests to the upstream streaming endpoint.
#[derive(Debug, Clone)]
pub struct StreamRelay {
    upstream: Upstream,
}

impl StreamRelay {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// Open the upstream stream.
    ///
    /// Every failure before the first byte is returned as an error, so the
    /// caller never sees a half-open stream.
    pub async fn open<S>(&self, store: &S, body: &Value) -> Result<RelayStream>
    where
        S: CredentialStore + ?Sized,
    {
        let token = store.session_token().ok_or(RelayError::MissingCredential)?;
        let config = self.upstream.config();

        let request = self
            .upstream
            .post_streaming(&config.chat_stream_path)
            .bearer_auth(&token)
            .json(body);

        // Bounds the wait for headers only; the body is governed by the idle timeout.
        let response = match tokio::time::timeout(
            config.request_timeout,
            self.upstream.send(request, "Stream relay"),
        )
        .await
        {
            Ok(response) => response?,
            Err(_) => {
                tracing::error!(
                    timeout_ms = config.request_timeout.as_millis() as u64,
                    "Upstream stream did not answer in time"
                );
                return Err(RelayError::Transport(
                    "stream response headers timed out".to_string(),
                ));
            }
        };

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        if response.content_length() == Some(0) {
            tracing::error!(status = %response.status(), "Upstream stream response has no body");
            return Err(RelayError::StreamUnavailable);
        }

        tracing::info!("Stream relay opened");
        let upstream = response.bytes_stream().boxed();
        Ok(RelayStream {
            body: pipe(upstream, config.stream_idle_timeout),
        })
    }
}

/// Forward chunks until upstream ends, errors, or goes idle.
fn pipe<S>(mut upstream: S, idle_timeout: Duration) -> ByteStream
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + Unpin + 'static,
{
    let stream = async_stream::stream! {
        let mut relayed: usize = 0;
        loop {
            match tokio::time::timeout(idle_timeout, upstream.next()).await {
                Ok(Some(Ok(chunk))) => {
                    relayed += chunk.len();
                    yield Ok(chunk);
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!(error = %e, relayed, "Upstream stream failed mid-flight");
                    yield Err(std::io::Error::other(e));
                    break;
                }
                Ok(None) => {
                    tracing::info!(relayed, "Upstream stream closed");
                    break;
                }
                Err(_) => {
                    tracing::warn!(
                        relayed,
                        idle_secs = idle_timeout.as_secs(),
                        "Upstream stream idle, closing relay"
                    );
                    break;
                }
            }
        }
    };
    Box::pin(stream)
}
