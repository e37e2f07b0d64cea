// ── Wire envelope ──
//
// The controller pushes one JSON object per frame:
// `{ "action": <code or name>, "resource": { "kind": .., "id": .., ... } }`.
// This module only captures the envelope shape; turning tags into typed
// domain values is the core crate's job.

use serde::{Deserialize, Serialize};

/// Action tag as it appears on the wire.
///
/// The controller API encodes actions as integers (`0..=3`), while some
/// producers send names. Both are accepted here and resolved later. Any
/// JSON number is kept, so out-of-range or fractional codes still reach
/// tag resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAction {
    Code(serde_json::Number),
    Name(String),
}

impl std::fmt::Display for RawAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(c) => write!(f, "{c}"),
            Self::Name(n) => f.write_str(n),
        }
    }
}

/// One decoded frame, before tag resolution.
///
/// `resource` is kept as raw JSON so no controller field is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub action: RawAction,
    pub resource: serde_json::Value,
}

impl RawEvent {
    /// Parse a frame payload into the envelope.
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}
