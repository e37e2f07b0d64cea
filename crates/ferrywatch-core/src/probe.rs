// ── Connectivity probe ──
//
// One-shot connect used by `ferrywatch check`: open the scoped stream,
// then drop it without reading.

use std::time::Duration;

use url::Url;

use ferrywatch_api::Transport;

use crate::error::CoreError;
use crate::scope::SubscriptionScope;

/// Open (and immediately release) a connection to the scoped endpoint.
///
/// Returns the URL that was dialed.
pub async fn probe<T: Transport>(
    transport: &T,
    endpoint: &Url,
    scope: &SubscriptionScope,
    timeout: Duration,
) -> Result<Url, CoreError> {
    let url = scope.to_url(endpoint);
    tracing::debug!(url = %url, timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX), "probing event stream");

    match tokio::time::timeout(timeout, transport.connect(&url)).await {
        Err(_) => Err(CoreError::Timeout {
            timeout_secs: timeout.as_secs(),
        }),
        Ok(Err(ferrywatch_api::Error::WebSocketConnect(reason))) => Err(CoreError::ConnectionFailed {
            url: url.to_string(),
            reason,
        }),
        Ok(Err(e)) => Err(e.into()),
        Ok(Ok(_frames)) => Ok(url),
    }
}
