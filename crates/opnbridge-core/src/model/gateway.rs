// ── Gateway sensor domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::derive_id;

/// How a gateway's online state is presented to the host.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SensorKind {
    /// Online reads as "contact detected" (closed).
    Contact,
    /// Online reads as "occupancy detected".
    #[default]
    Occupancy,
}

/// Sensor reading in the host's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorState {
    ContactDetected,
    ContactNotDetected,
    OccupancyDetected,
    OccupancyNotDetected,
}

impl SensorKind {
    pub fn encode(self, online: bool) -> SensorState {
        match (self, online) {
            (Self::Contact, true) => SensorState::ContactDetected,
            (Self::Contact, false) => SensorState::ContactNotDetected,
            (Self::Occupancy, true) => SensorState::OccupancyDetected,
            (Self::Occupancy, false) => SensorState::OccupancyNotDetected,
        }
    }
}

/// Secondary fault characteristic carried by every gateway sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusFault {
    #[default]
    NoFault,
    GeneralFault,
}

/// One gateway as exposed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEntity {
    pub id: Uuid,
    pub name: String,
    pub online: bool,
    pub fault: StatusFault,
    pub ip_address: Option<String>,
    pub monitor_target: Option<String>,
    pub sensor_kind: SensorKind,
    pub last_seen: Option<DateTime<Utc>>,
}

impl GatewayEntity {
    /// A gateway known only by name, as seeded from persisted host state.
    pub fn new(name: impl Into<String>, sensor_kind: SensorKind) -> Self {
        let name = name.into();
        Self {
            id: Self::identity(&name),
            name,
            online: true,
            fault: StatusFault::NoFault,
            ip_address: None,
            monitor_target: None,
            sensor_kind,
            last_seen: None,
        }
    }

    /// Identity derived from the gateway name alone.
    pub fn identity(name: &str) -> Uuid {
        derive_id(&format!("opnsense-gateway-{name}"))
    }

    pub fn sensor_state(&self) -> SensorState {
        self.sensor_kind.encode(self.online)
    }

    pub fn is_faulted(&self) -> bool {
        self.fault == StatusFault::GeneralFault
    }

    /// Model string shown by the host.
    pub fn model(&self) -> String {
        match &self.monitor_target {
            Some(monitor) => format!("Gateway Sensor (MON: {monitor})"),
            None => "Gateway Sensor".to_owned(),
        }
    }

    /// Serial number: address, then monitor target, then name.
    pub fn serial(&self) -> &str {
        self.ip_address
            .as_deref()
            .or(self.monitor_target.as_deref())
            .unwrap_or(&self.name)
    }
}
