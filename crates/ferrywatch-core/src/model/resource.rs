// ── Resource kinds, actions, and notifications ──

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;

use ferrywatch_api::RawAction;

// ── ResourceKind ────────────────────────────────────────────────────

/// Entity types in the controller's resource taxonomy.
///
/// `All` only exists as a subscription wildcard; it never tags a real
/// resource. The wire form is the variant name, case-sensitive.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum ResourceKind {
    Instance,
    Cluster,
    Node,
    Machine,
    StoragePool,
    StorageVolume,
    Network,
    #[default]
    All,
}

impl ResourceKind {
    /// Every kind that can appear on a notification (everything but `All`).
    pub fn concrete() -> impl Iterator<Item = Self> {
        Self::iter().filter(|k| !k.is_wildcard())
    }

    pub fn is_wildcard(self) -> bool {
        matches!(self, Self::All)
    }
}

// ── WatchAction ─────────────────────────────────────────────────────

/// Change action carried by a notification, or the `All` filter wildcard.
///
/// Integer codes follow the controller API enum (`CREATE = 0` .. `ALL = 3`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAction")]
pub enum WatchAction {
    Created,
    Updated,
    Deleted,
    #[default]
    All,
}

impl WatchAction {
    pub fn code(self) -> i64 {
        match self {
            Self::Created => 0,
            Self::Updated => 1,
            Self::Deleted => 2,
            Self::All => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Created),
            1 => Some(Self::Updated),
            2 => Some(Self::Deleted),
            3 => Some(Self::All),
            _ => None,
        }
    }

    /// Resolve a wire tag (integer code or name).
    pub fn from_raw(raw: &RawAction) -> Option<Self> {
        match raw {
            RawAction::Code(code) => code.as_i64().and_then(Self::from_code),
            RawAction::Name(name) => name.parse().ok(),
        }
    }

    pub fn is_wildcard(self) -> bool {
        matches!(self, Self::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
            Self::All => "All",
        }
    }
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failed to parse an action or kind tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {what} '{tag}'")]
pub struct ParseTagError {
    pub what: &'static str,
    pub tag: String,
}

impl FromStr for WatchAction {
    type Err = ParseTagError;

    /// Accepts `Created`, `CREATE`, `create`, `created` (and the same for
    /// the other actions) as well as the numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if let Ok(code) = tag.parse::<i64>() {
            return Self::from_code(code).ok_or_else(|| ParseTagError {
                what: "action",
                tag: tag.to_owned(),
            });
        }

        match tag.to_ascii_lowercase().as_str() {
            "create" | "created" => Ok(Self::Created),
            "update" | "updated" => Ok(Self::Updated),
            "delete" | "deleted" => Ok(Self::Deleted),
            "all" => Ok(Self::All),
            _ => Err(ParseTagError {
                what: "action",
                tag: tag.to_owned(),
            }),
        }
    }
}

impl TryFrom<RawAction> for WatchAction {
    type Error = ParseTagError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        Self::from_raw(&raw).ok_or_else(|| ParseTagError {
            what: "action",
            tag: raw.to_string(),
        })
    }
}

// ── OwnerRef ────────────────────────────────────────────────────────

/// Owner reference the controller embeds in resources (`resource.owner`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: String,
    pub id: String,
}

impl OwnerRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

// ── Notification ────────────────────────────────────────────────────

/// The resource a notification is about.
///
/// `payload` is the complete resource object as received, including
/// `kind` and `id`, so relation templates can reach any field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
    pub payload: serde_json::Value,
}

impl ResourceRef {
    /// Owner reference embedded in the payload, if present and well-formed.
    pub fn owner(&self) -> Option<OwnerRef> {
        let owner = self.payload.get("owner")?;
        Some(OwnerRef {
            kind: owner.get("kind")?.as_str()?.to_owned(),
            id: owner.get("id")?.as_str()?.to_owned(),
        })
    }
}

/// One decoded resource-change event. Always carries a concrete action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub action: WatchAction,
    pub resource: ResourceRef,
}
