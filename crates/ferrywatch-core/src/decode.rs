// ── Event decoder ──
//
// Turns one frame payload into a typed `Notification`. Pure: no logging,
// no side effects. The session decides what to do with a `DecodeError`
// (log and drop the frame).

use std::sync::Arc;

use ferrywatch_api::RawEvent;

use crate::error::DecodeError;
use crate::model::{Notification, ResourceKind, ResourceRef, WatchAction};
use crate::relations::{RelationTable, field_text};

/// Frame decoder bound to a relation table.
///
/// The table defines the required-fields contract: a notification must
/// carry every payload field its kind's templates reference, otherwise it
/// is a `MalformedMessage` rather than a guess.
#[derive(Debug, Clone)]
pub struct Decoder {
    relations: Arc<RelationTable>,
}

impl Decoder {
    pub fn new(relations: Arc<RelationTable>) -> Self {
        Self { relations }
    }

    pub fn decode(&self, raw: &[u8]) -> Result<Notification, DecodeError> {
        let event = RawEvent::from_slice(raw).map_err(|e| DecodeError::malformed(e.to_string()))?;

        let action = WatchAction::from_raw(&event.action)
            .filter(|a| !a.is_wildcard())
            .ok_or_else(|| DecodeError::UnknownAction {
                tag: event.action.to_string(),
            })?;

        let Some(fields) = event.resource.as_object() else {
            return Err(DecodeError::malformed("resource is not an object"));
        };

        let kind_tag = fields
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| DecodeError::malformed("missing resource.kind"))?;
        let kind = kind_tag
            .parse::<ResourceKind>()
            .ok()
            .filter(|k| !k.is_wildcard())
            .ok_or_else(|| DecodeError::UnknownKind {
                tag: kind_tag.to_owned(),
            })?;

        let id = field_text(&event.resource, "id")
            .ok_or_else(|| DecodeError::malformed("missing resource.id"))?;

        if let Some(missing) = self
            .relations
            .required_fields(kind)
            .into_iter()
            .find(|field| field_text(&event.resource, field).is_none())
        {
            return Err(DecodeError::malformed(format!(
                "{kind} notification is missing required field {missing}"
            )));
        }

        Ok(Notification {
            action,
            resource: ResourceRef {
                kind,
                id,
                payload: event.resource,
            },
        })
    }
}
