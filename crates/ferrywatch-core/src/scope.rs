// ── Subscription scope ──
//
// The caller's filter for a watch session. Serialized into the event
// endpoint's query string so the controller only pushes what was asked
// for, and re-applied locally in case a backend ignores a dimension.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{Notification, OwnerRef, ResourceKind, WatchAction};

/// Query parameter names understood by the events endpoint.
const PARAM_ACTION: &str = "action";
const PARAM_KIND: &str = "kind";
const PARAM_ID: &str = "id";
const PARAM_OWNER_KIND: &str = "owner_kind";
const PARAM_OWNER_ID: &str = "owner_id";

/// Which notifications a session wants. Defaults to everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionScope {
    #[serde(default)]
    pub action: WatchAction,
    #[serde(default)]
    pub kind: ResourceKind,
    /// Only this resource id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Only resources owned by this reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerRef>,
}

impl SubscriptionScope {
    /// `{action: All, kind: All}`.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: WatchAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Ordered `(key, value)` pairs for the connection's query string.
    ///
    /// `action` is sent as its integer code, `kind` as its name; optional
    /// dimensions are appended only when set.
    pub fn serialize(&self) -> Vec<(String, String)> {
        let mut params = vec![
            (PARAM_ACTION.to_owned(), self.action.code().to_string()),
            (PARAM_KIND.to_owned(), self.kind.to_string()),
        ];
        if let Some(id) = &self.id {
            params.push((PARAM_ID.to_owned(), id.clone()));
        }
        if let Some(owner) = &self.owner {
            params.push((PARAM_OWNER_KIND.to_owned(), owner.kind.clone()));
            params.push((PARAM_OWNER_ID.to_owned(), owner.id.clone()));
        }
        params
    }

    /// `endpoint` with this scope's parameters in its query string.
    ///
    /// Unrelated query parameters already on the endpoint are kept; any
    /// existing scope parameters are replaced.
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let params = self.serialize();
        let kept: Vec<(String, String)> = endpoint
            .query_pairs()
            .filter(|(k, _)| !is_scope_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut url = endpoint.clone();
        url.set_query(None);
        url.query_pairs_mut()
            .extend_pairs(kept.iter().chain(params.iter()).map(|(k, v)| (k.as_str(), v.as_str())));
        url
    }

    /// Whether `notification` falls inside this scope.
    pub fn matches(&self, notification: &Notification) -> bool {
        let resource = &notification.resource;

        let action_ok = self.action.is_wildcard() || self.action == notification.action;
        let kind_ok = self.kind.is_wildcard() || self.kind == resource.kind;
        let id_ok = self.id.as_ref().is_none_or(|id| *id == resource.id);
        let owner_ok = self
            .owner
            .as_ref()
            .is_none_or(|owner| resource.owner().as_ref() == Some(owner));

        action_ok && kind_ok && id_ok && owner_ok
    }
}

fn is_scope_param(name: &str) -> bool {
    matches!(
        name,
        PARAM_ACTION | PARAM_KIND | PARAM_ID | PARAM_OWNER_KIND | PARAM_OWNER_ID
    )
}
