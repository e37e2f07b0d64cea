//! WebSocket transport for the controller event stream.
//!
//! Opens the HTTP-upgrade connection to the events endpoint and exposes the
//! incoming messages as a [`FrameStream`]. Reconnection is not handled here:
//! the stream simply ends (or yields an error) when the connection drops, and
//! the watch session in `ferrywatch-core` decides what to do next.
//!
//! # Example
//!
//! ```rust,ignore
//! use ferrywatch_api::{Transport, WebSocketTransport};
//! use futures_util::StreamExt;
//! use url::Url;
//!
//! let url = Url::parse("ws://10.100.0.186:8080/v1/resources/events?action=3&kind=All")?;
//! let mut frames = WebSocketTransport::new().connect(&url).await?;
//!
//! while let Some(Ok(frame)) = frames.next().await {
//!     println!("{}", String::from_utf8_lossy(&frame));
//! }
//! ```

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use url::Url;

use crate::error::Error;
use crate::transport::{FrameStream, Transport};

// ── WebSocketTransport ───────────────────────────────────────────────

/// [`Transport`] backed by `tokio-tungstenite`.
///
/// Extra headers are attached to every upgrade request (e.g. a cookie or
/// a proxy token); the transport itself is stateless and cheap to share.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    headers: Vec<(String, String)>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header sent with the upgrade request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl Transport for WebSocketTransport {
    async fn connect(&self, url: &Url) -> Result<FrameStream, Error> {
        let ws_url = websocket_url(url)?;
        tracing::info!(url = %ws_url, "Connecting to WebSocket");

        let uri: tungstenite::http::Uri = ws_url
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::InvalidUrl(e.to_string()))?;

        let mut request = ClientRequestBuilder::new(uri);
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::info!("WebSocket connected");

        Ok(frame_stream(ws_stream))
    }
}

// ── URL normalization ────────────────────────────────────────────────

/// Map `http(s)` endpoints onto `ws(s)`; the console is often configured
/// with the plain HTTP address of the controller.
pub fn websocket_url(url: &Url) -> Result<Url, Error> {
    let scheme = match url.scheme() {
        "ws" | "wss" => return Ok(url.clone()),
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme '{other}' (expected ws, wss, http or https)"
            )));
        }
    };

    let mut out = url.clone();
    out.set_scheme(scheme)
        .map_err(|()| Error::InvalidUrl(format!("cannot switch {url} to {scheme}")))?;
    Ok(out)
}

// ── Frame pump ───────────────────────────────────────────────────────

/// Turn raw tungstenite messages into message payloads.
///
/// Text and binary frames are forwarded as-is. A normal close ends the
/// stream; an abnormal close or read error is yielded once, then the
/// stream ends.
fn frame_stream<S>(mut ws: S) -> FrameStream
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin + Send + 'static,
{
    Box::pin(async_stream::stream! {
        while let Some(frame) = ws.next().await {
            match frame {
                Ok(Message::Text(text)) => yield Ok(Bytes::copy_from_slice(text.as_bytes())),
                Ok(Message::Binary(data)) => yield Ok(Bytes::from(data)),
                Ok(Message::Ping(_)) => {
                    // tungstenite queues the pong reply itself
                    tracing::trace!("WebSocket ping");
                }
                Ok(Message::Close(frame)) => {
                    match frame {
                        Some(cf) if cf.code != CloseCode::Normal => {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "WebSocket closed abnormally");
                            yield Err(Error::WebSocketClosed {
                                code: u16::from(cf.code),
                                reason: cf.reason.to_string(),
                            });
                        }
                        Some(cf) => {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "WebSocket close frame received");
                        }
                        None => tracing::info!("WebSocket close frame received (no payload)"),
                    }
                    break;
                }
                Ok(_) => {
                    // Pong, raw Frame -- ignore
                }
                Err(e) => {
                    yield Err(Error::Transport(e.to_string()));
                    break;
                }
            }
        }
    })
}

// ── Tests ────────────────────────────────────────────────────────────
