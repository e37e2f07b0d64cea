// ── Transport abstraction ──
//
// The watch session only needs "open a stream of frames for this URL".
// Production uses the WebSocket transport; tests script their own.

use std::future::Future;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use url::Url;

use crate::error::Error;

/// Stream of raw message payloads from one established connection.
///
/// Each item is one complete message (one physical frame). The stream
/// ending means the connection is gone; an `Err` item reports why.
pub type FrameStream = BoxStream<'static, Result<Bytes, Error>>;

/// Something that can open a server-push stream to a URL.
pub trait Transport: Send + Sync + 'static {
    /// Establish a connection and return its frame stream.
    ///
    /// Resolves once the connection is open (handshake complete) or failed.
    fn connect(&self, url: &Url) -> impl Future<Output = Result<FrameStream, Error>> + Send;
}
