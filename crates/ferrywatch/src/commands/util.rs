//! Shared helpers for command handlers.

use std::collections::BTreeSet;

use serde::Serialize;

use ferrywatch_api::WebSocketTransport;
use ferrywatch_config::Profile;
use ferrywatch_core::{CacheKey, CoreError, Notification, ResourceKind, WatchAction};
use url::Url;

use crate::error::CliError;
use crate::output::Palette;

/// One notification and the keys it invalidates, as printed by `watch`/`keys`.
#[derive(Debug, Serialize)]
pub struct EventRow {
    pub action: WatchAction,
    pub kind: ResourceKind,
    pub id: String,
    pub keys: Vec<String>,
}

impl EventRow {
    pub fn new(notification: &Notification, keys: &BTreeSet<CacheKey>) -> Self {
        Self {
            action: notification.action,
            kind: notification.resource.kind,
            id: notification.resource.id.clone(),
            keys: keys.iter().map(ToString::to_string).collect(),
        }
    }
}

/// `Updated Machine/vm-1  Machine, Machine/vm-1, Node/node-7`
pub fn event_line(notification: &Notification, keys: &BTreeSet<CacheKey>, palette: Palette) -> String {
    let keys = keys
        .iter()
        .map(|k| palette.key(k))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} {}/{}  {keys}",
        palette.action(notification.action),
        notification.resource.kind,
        notification.resource.id
    )
}

/// WebSocket transport carrying the profile's headers plus any extras.
pub fn transport(profile: &Profile, extra: &[(String, String)]) -> WebSocketTransport {
    let mut transport = WebSocketTransport::new();
    for (name, value) in &profile.headers {
        transport = transport.with_header(name, value);
    }
    for (name, value) in extra {
        transport = transport.with_header(name, value);
    }
    transport
}

/// The `ws://` / `wss://` form of a scoped URL.
pub fn websocket_url(url: &Url) -> Result<Url, CliError> {
    ferrywatch_api::websocket::websocket_url(url).map_err(|e| CliError::from(CoreError::from(e)))
}
