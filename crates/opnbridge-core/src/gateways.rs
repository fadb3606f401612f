// ── Gateway reconciliation ──
//
// Each cycle fetches the gateway list, normalizes every row, and diffs the
// result against the tracked set: new names are added, known names are
// updated in place, missing names are removed. A cycle that cannot list
// gateways at all marks every tracked gateway faulted instead.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use opnbridge_api::OpnClient;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::model::{GatewayEntity, StatusFault};
use crate::normalize::{self, gateway_name, optional_field};
use crate::store::EntityCollection;

const EVENT_CHANNEL_SIZE: usize = 256;

/// Change to the tracked gateway set.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Added(Arc<GatewayEntity>),
    Updated(Arc<GatewayEntity>),
    Removed(Arc<GatewayEntity>),
    /// Listing failed; the entity now carries a general fault.
    Faulted(Arc<GatewayEntity>),
}

impl GatewayEvent {
    pub fn entity(&self) -> &GatewayEntity {
        match self {
            Self::Added(e) | Self::Updated(e) | Self::Removed(e) | Self::Faulted(e) => e,
        }
    }
}

/// Result of one reconciliation cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Synced(Vec<GatewayEvent>),
    Degraded {
        error: CoreError,
        faulted: Vec<GatewayEvent>,
    },
}

impl CycleOutcome {
    pub fn events(&self) -> &[GatewayEvent] {
        match self {
            Self::Synced(events) | Self::Degraded { faulted: events, .. } => events,
        }
    }
}

/// Keeps the tracked gateway set in step with the firewall.
pub struct GatewayReconciler {
    client: Arc<OpnClient>,
    config: GatewayConfig,
    tracked: EntityCollection<GatewayEntity>,
    events: broadcast::Sender<GatewayEvent>,
}

impl GatewayReconciler {
    pub fn new(client: Arc<OpnClient>, config: GatewayConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            client,
            config,
            tracked: EntityCollection::new(),
            events,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Seed the tracked set with entities persisted by the host.
    ///
    /// Restored entities keep their stored identity. A later listing that
    /// reports the same identity under a different name re-keys the entity
    /// instead of adding a duplicate. No events are emitted.
    pub fn restore(&self, entities: impl IntoIterator<Item = GatewayEntity>) {
        for entity in entities {
            debug!(gateway = %entity.name, id = %entity.id, "restoring cached gateway");
            self.tracked.upsert(entity.name.clone(), entity.id, entity);
        }
    }

    /// Current tracked gateways, ordered by name.
    pub fn snapshot(&self) -> Arc<Vec<Arc<GatewayEntity>>> {
        self.tracked.snapshot()
    }

    pub fn watch(&self) -> watch::Receiver<Arc<Vec<Arc<GatewayEntity>>>> {
        self.tracked.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    pub fn get(&self, name: &str) -> Option<Arc<GatewayEntity>> {
        self.tracked.get_by_key(name)
    }

    /// Run one fetch-and-diff cycle. Never fails: a listing failure
    /// degrades to fault-marking every tracked gateway.
    pub async fn reconcile_once(&self) -> CycleOutcome {
        match self.fetch_rows().await {
            Ok(rows) => CycleOutcome::Synced(self.apply_rows(&rows)),
            Err(error) => {
                warn!(error = %error, tracked = self.tracked.len(), "gateway refresh failed");
                CycleOutcome::Degraded {
                    faulted: self.mark_faulted(),
                    error,
                }
            }
        }
    }

    /// Diff one listing against the tracked set and apply the changes.
    pub fn apply_rows(&self, rows: &[Value]) -> Vec<GatewayEvent> {
        let observed = self.observe(rows);
        let mut emitted = Vec::with_capacity(observed.len());

        for (name, entity) in &observed {
            let event = self.upsert(name, entity.clone());
            emitted.push(event);
        }

        let seen: HashSet<&str> = observed.keys().map(String::as_str).collect();
        for key in self.tracked.keys() {
            if !seen.contains(key.as_str()) {
                if let Some(removed) = self.tracked.remove(&key) {
                    info!(gateway = %key, "gateway no longer reported, removing");
                    emitted.push(GatewayEvent::Removed(removed));
                }
            }
        }

        self.publish(&emitted);
        emitted
    }

    /// Set a general fault on every tracked gateway.
    pub fn mark_faulted(&self) -> Vec<GatewayEvent> {
        let mut emitted = Vec::new();
        for key in self.tracked.keys() {
            if let Some(current) = self.tracked.get_by_key(&key) {
                let mut entity = GatewayEntity::clone(&current);
                entity.fault = StatusFault::GeneralFault;
                let stored = self.tracked.upsert(key, entity.id, entity);
                emitted.push(GatewayEvent::Faulted(stored));
            }
        }
        self.publish(&emitted);
        emitted
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Live status first; the settings search if that fails or is empty.
    async fn fetch_rows(&self) -> Result<Vec<Value>, CoreError> {
        let primary = match self.client.gateway_status().await {
            Ok(rows) if !rows.is_empty() => return Ok(rows),
            Ok(_) => "status listing was empty".to_owned(),
            Err(e) => {
                debug!(error = %e, "gateway status unavailable, trying settings search");
                e.to_string()
            }
        };

        self.client
            .search_gateways()
            .await
            .map_err(|e| CoreError::GatewayFetch {
                message: format!("{primary}; searchGateway: {e}"),
            })
    }

    /// Normalize rows into entities, one per name (last row wins),
    /// skipping unnamed rows and names outside the include filter.
    fn observe(&self, rows: &[Value]) -> IndexMap<String, GatewayEntity> {
        let now = Utc::now();
        let mut observed = IndexMap::new();

        for row in rows {
            let Some(name) = gateway_name(row) else {
                debug!("skipping gateway row without a name");
                continue;
            };
            if !self.config.includes(&name) {
                continue;
            }

            let verdict = normalize::normalize(row);
            debug!(
                gateway = %name,
                online = verdict.online,
                rule = verdict.rule,
                delay = ?row.get("delay"),
                rtt = ?row.get("rtt"),
                loss = ?row.get("loss"),
                "gateway status"
            );

            let entity = GatewayEntity {
                id: GatewayEntity::identity(&name),
                name: name.clone(),
                online: verdict.online,
                fault: if verdict.online {
                    StatusFault::NoFault
                } else {
                    StatusFault::GeneralFault
                },
                ip_address: optional_field(row, "address"),
                monitor_target: optional_field(row, "monitor"),
                sensor_kind: self.config.sensor_kind,
                last_seen: Some(now),
            };
            observed.insert(name, entity);
        }
        observed
    }

    fn upsert(&self, name: &str, entity: GatewayEntity) -> GatewayEvent {
        if self.tracked.get_by_key(name).is_some() {
            return GatewayEvent::Updated(self.tracked.upsert(name.to_owned(), entity.id, entity));
        }

        // Same identity stored under another key: move it.
        if let Some((old_key, _)) = self.tracked.get_by_id(&entity.id) {
            self.tracked.remove(&old_key);
            return GatewayEvent::Updated(self.tracked.upsert(name.to_owned(), entity.id, entity));
        }

        info!(gateway = %name, online = entity.online, "new gateway discovered");
        GatewayEvent::Added(self.tracked.upsert(name.to_owned(), entity.id, entity))
    }

    fn publish(&self, events: &[GatewayEvent]) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event.clone());
        }
    }
}
