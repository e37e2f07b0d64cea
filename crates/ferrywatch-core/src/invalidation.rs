// ── Invalidation mapper ──
//
// Pure function from a notification to the set of cache keys that depend
// on it: the resource's own `[kind, id]` key plus every related key the
// relation table declares for its kind.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::model::{CacheKey, Notification};
use crate::relations::RelationTable;

#[derive(Debug, Clone)]
pub struct InvalidationMapper {
    relations: Arc<RelationTable>,
}

impl InvalidationMapper {
    pub fn new(relations: Arc<RelationTable>) -> Self {
        Self { relations }
    }

    pub fn relations(&self) -> &RelationTable {
        &self.relations
    }

    /// Keys to invalidate for `notification`. Always contains the direct key.
    ///
    /// Templates whose fields are absent are skipped; the decoder rejects
    /// such notifications before they get here.
    pub fn keys_for(&self, notification: &Notification) -> BTreeSet<CacheKey> {
        let resource = &notification.resource;

        let mut keys = BTreeSet::new();
        keys.insert(CacheKey::entity(resource.kind, resource.id.clone()));
        keys.extend(
            self.relations
                .templates(resource.kind)
                .iter()
                .filter_map(|template| template.expand(resource)),
        );
        keys
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{ResourceKind, ResourceRef, WatchAction};
    use crate::relations::KeyTemplate;
    use pretty_assertions::assert_eq;

    fn notification(kind: ResourceKind, id: &str, payload: serde_json::Value) -> Notification {
        Notification {
            action: WatchAction::Updated,
            resource: ResourceRef {
                kind,
                id: id.into(),
                payload,
            },
        }
    }

    fn standard() -> InvalidationMapper {
        InvalidationMapper::new(Arc::new(RelationTable::standard()))
    }

    #[test]
    fn machine_invalidates_owning_node() {
        let n = notification(
            ResourceKind::Machine,
            "vm-1",
            serde_json::json!({ "kind": "Machine", "id": "vm-1", "ownerId": "node-7" }),
        );
        let keys = standard().keys_for(&n);

        assert!(keys.contains(&CacheKey::from(["Machine", "vm-1"])));
        assert!(keys.contains(&CacheKey::from(["Node", "node-7"])));
        assert!(keys.contains(&CacheKey::from(["Machine"])));
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn owner_template_uses_embedded_reference() {
        let n = notification(
            ResourceKind::StorageVolume,
            "vol-3",
            serde_json::json!({ "owner": { "kind": "StoragePool", "id": "pool-1" } }),
        );
        let keys = standard().keys_for(&n);
        assert!(keys.contains(&CacheKey::from(["StoragePool", "pool-1"])));
        assert!(keys.contains(&CacheKey::from(["StorageVolume", "vol-3"])));
    }

    #[test]
    fn every_kind_yields_direct_key_and_is_idempotent() {
        for mapper in [
            standard(),
            InvalidationMapper::new(Arc::new(RelationTable::direct_only())),
        ] {
            for kind in ResourceKind::concrete() {
                let n = notification(kind, "id-1", serde_json::json!({}));
                let first = mapper.keys_for(&n);
                assert!(first.contains(&CacheKey::entity(kind, "id-1")), "{kind}");
                assert_eq!(first, mapper.keys_for(&n));
            }
        }
    }

    #[test]
    fn undeclared_kind_invalidates_only_direct_key() {
        let mapper = InvalidationMapper::new(Arc::new(RelationTable::direct_only()));
        let n = notification(ResourceKind::Network, "net-1", serde_json::json!({ "ownerId": "x" }));
        let keys: Vec<_> = mapper.keys_for(&n).into_iter().collect();
        assert_eq!(keys, vec![CacheKey::from(["Network", "net-1"])]);
    }

    #[test]
    fn injected_relations_are_used() {
        let table = RelationTable::direct_only()
            .with(
                ResourceKind::Node,
                vec![KeyTemplate::related(ResourceKind::Cluster, "/placement/cluster")],
            )
            .unwrap();
        let mapper = InvalidationMapper::new(Arc::new(table));
        let n = notification(
            ResourceKind::Node,
            "node-7",
            serde_json::json!({ "placement": { "cluster": "c1" } }),
        );
        assert!(mapper.keys_for(&n).contains(&CacheKey::from(["Cluster", "c1"])));
    }
}
