// ── Resource relation table ──
//
// Declares, per resource kind, which additional cache keys depend on a
// resource of that kind. The table is total: every concrete kind has an
// entry, possibly empty, so an undeclared kind invalidates only its own
// direct key. New relations are added here (or in config), never inside
// the mapper.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RelationError;
use crate::model::{CacheKey, ResourceKind, ResourceRef};

const OWNER_KIND: &str = "/owner/kind";
const OWNER_ID: &str = "/owner/id";

// ── KeyTemplate ─────────────────────────────────────────────────────

/// One related-key rule, expanded against a notification's payload.
///
/// Serialized with an internal `type` tag so tables can be declared in
/// TOML: `{ type = "related", kind = "Node", field = "/ownerId" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyTemplate {
    /// `[kind]`: a list view of `kind`.
    List { kind: ResourceKind },
    /// `[kind, payload[field]]`: an entity referenced by a payload field.
    /// `field` is a JSON pointer; a bare name is treated as top-level.
    Related { kind: ResourceKind, field: String },
    /// `[owner.kind, owner.id]` from the embedded owner reference.
    Owner,
}

impl KeyTemplate {
    pub fn list(kind: ResourceKind) -> Self {
        Self::List { kind }
    }

    pub fn related(kind: ResourceKind, field: impl Into<String>) -> Self {
        Self::Related {
            kind,
            field: field.into(),
        }
    }

    /// Payload fields this template needs to expand.
    pub fn required_fields(&self) -> Vec<&str> {
        match self {
            Self::List { .. } => Vec::new(),
            Self::Related { field, .. } => vec![field.as_str()],
            Self::Owner => vec![OWNER_KIND, OWNER_ID],
        }
    }

    /// Expand against a resource. `None` when a required field is absent.
    pub fn expand(&self, resource: &ResourceRef) -> Option<CacheKey> {
        match self {
            Self::List { kind } => Some(CacheKey::list(*kind)),
            Self::Related { kind, field } => {
                field_text(&resource.payload, field).map(|id| CacheKey::entity(kind, id))
            }
            Self::Owner => {
                let kind = field_text(&resource.payload, OWNER_KIND)?;
                let id = field_text(&resource.payload, OWNER_ID)?;
                Some(CacheKey::new([kind, id]))
            }
        }
    }

    fn validate(&self, source_kind: ResourceKind) -> Result<(), RelationError> {
        match self {
            Self::List { kind } | Self::Related { kind, .. } if kind.is_wildcard() => {
                Err(RelationError::WildcardTarget { source_kind })
            }
            Self::Related { field, .. } if field.trim_start_matches('/').is_empty() => {
                Err(RelationError::EmptyField { source_kind })
            }
            _ => Ok(()),
        }
    }
}

/// Resolve a payload field to text. Accepts non-empty strings and numbers.
pub(crate) fn field_text(payload: &serde_json::Value, field: &str) -> Option<String> {
    let value = if field.starts_with('/') {
        payload.pointer(field)
    } else {
        payload.get(field)
    }?;

    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ── RelationTable ───────────────────────────────────────────────────

/// Total mapping `ResourceKind -> [KeyTemplate]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTable {
    entries: HashMap<ResourceKind, Vec<KeyTemplate>>,
}

impl RelationTable {
    /// Every kind maps to no templates: only direct keys are invalidated.
    pub fn direct_only() -> Self {
        Self {
            entries: ResourceKind::concrete().map(|k| (k, Vec::new())).collect(),
        }
    }

    /// The controller's ownership graph.
    ///
    /// Every kind invalidates its list view. Machines point at their node
    /// through `ownerId`; the other owned kinds carry an `owner` reference.
    /// Storage pools name only the owner kind, so they get no owner key.
    pub fn standard() -> Self {
        use ResourceKind as K;

        let mut table = Self::direct_only();
        for kind in ResourceKind::concrete() {
            let mut templates = vec![KeyTemplate::list(kind)];
            match kind {
                K::Instance | K::StoragePool => {}
                K::Machine => templates.push(KeyTemplate::related(K::Node, "/ownerId")),
                K::Cluster | K::Node | K::StorageVolume | K::Network => {
                    templates.push(KeyTemplate::Owner);
                }
                K::All => continue,
            }
            table.entries.insert(kind, templates);
        }
        table
    }

    /// Replace the templates declared for `kind`.
    pub fn set(&mut self, kind: ResourceKind, templates: Vec<KeyTemplate>) -> Result<(), RelationError> {
        if kind.is_wildcard() {
            return Err(RelationError::WildcardSource);
        }
        for template in &templates {
            template.validate(kind)?;
        }
        self.entries.insert(kind, templates);
        Ok(())
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, kind: ResourceKind, templates: Vec<KeyTemplate>) -> Result<Self, RelationError> {
        self.set(kind, templates)?;
        Ok(self)
    }

    pub fn templates(&self, kind: ResourceKind) -> &[KeyTemplate] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Payload fields a notification of `kind` must carry.
    pub fn required_fields(&self, kind: ResourceKind) -> Vec<&str> {
        let mut fields: Vec<&str> = self
            .templates(kind)
            .iter()
            .flat_map(KeyTemplate::required_fields)
            .collect();
        fields.dedup();
        fields
    }

    /// Kinds with an entry (always every concrete kind).
    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.entries.keys().copied()
    }
}

impl Default for RelationTable {
    fn default() -> Self {
        Self::standard()
    }
}
