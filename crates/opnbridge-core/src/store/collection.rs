// ── Reactive entity collection ──
//
// Concurrent keyed storage with an identity index and a `watch` snapshot
// that subscribers receive after every mutation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use uuid::Uuid;

/// Keyed entities with a secondary index by identity.
///
/// Keys are natural names (gateway names); identities are derived uuids.
/// Every mutation rebuilds the snapshot, ordered by key.
pub(crate) struct EntityCollection<T: Clone + Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,

    /// Secondary index: identity -> key.
    id_to_key: DashMap<Uuid, String>,

    /// Reverse of `id_to_key` for removal.
    key_to_id: DashMap<String, Uuid>,

    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_key: DashMap::new(),
            id_to_key: DashMap::new(),
            key_to_id: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or replace an entity, returning the stored value.
    pub(crate) fn upsert(&self, key: String, id: Uuid, entity: T) -> Arc<T> {
        if let Some((_, old_id)) = self.key_to_id.remove(&key) {
            if old_id != id {
                self.id_to_key.remove(&old_id);
            }
        }

        let entity = Arc::new(entity);
        self.by_key.insert(key.clone(), Arc::clone(&entity));
        self.id_to_key.insert(id, key.clone());
        self.key_to_id.insert(key, id);

        self.rebuild_snapshot();
        entity
    }

    /// Remove an entity by key, returning it if present.
    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            if let Some((_, id)) = self.key_to_id.remove(key) {
                self.id_to_key.remove(&id);
            }
            self.rebuild_snapshot();
        }
        removed
    }

    pub(crate) fn get_by_key(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Look up by identity, returning the key it is stored under as well.
    pub(crate) fn get_by_id(&self, id: &Uuid) -> Option<(String, Arc<T>)> {
        let key = self.id_to_key.get(id)?.value().clone();
        let entity = self.get_by_key(&key)?;
        Some((key, entity))
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.by_key.iter().map(|r| r.key().clone()).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn rebuild_snapshot(&self) {
        let mut entries: Vec<(String, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let values = entries.into_iter().map(|(_, v)| v).collect();
        // `send_modify` updates even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(seed: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes())
    }

    #[test]
    fn lookup_by_key_and_id() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.upsert("WAN".into(), id("WAN"), "up".into());

        assert_eq!(*col.get_by_key("WAN").unwrap(), "up");
        let (key, value) = col.get_by_id(&id("WAN")).unwrap();
        assert_eq!(key, "WAN");
        assert_eq!(*value, "up");
    }

    #[test]
    fn remove_cleans_up_indexes() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.upsert("WAN".into(), id("WAN"), "up".into());

        assert_eq!(*col.remove("WAN").unwrap(), "up");
        assert!(col.get_by_key("WAN").is_none());
        assert!(col.get_by_id(&id("WAN")).is_none());
        assert_eq!(col.len(), 0);
        assert!(col.remove("WAN").is_none());
    }

    #[test]
    fn changed_id_drops_old_mapping() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.upsert("WAN".into(), id("old"), "v1".into());
        col.upsert("WAN".into(), id("new"), "v2".into());

        assert!(col.get_by_id(&id("old")).is_none());
        assert_eq!(*col.get_by_id(&id("new")).unwrap().1, "v2");
    }

    #[test]
    fn snapshot_is_sorted_and_pushed() {
        let col: EntityCollection<String> = EntityCollection::new();
        let mut rx = col.subscribe();

        col.upsert("b".into(), id("b"), "B".into());
        col.upsert("a".into(), id("a"), "A".into());

        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        let values: Vec<&str> = snap.iter().map(|v| v.as_str()).collect();
        assert_eq!(values, ["A", "B"]);
        assert_eq!(col.snapshot().len(), 2);
        assert_eq!(col.keys().len(), 2);
    }
}
