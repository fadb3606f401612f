// opnbridge-api: Async Rust client for the OPNsense firewall REST API (filter rules + gateways)

pub mod client;
pub mod error;
pub mod firewall;
pub mod gateway;
pub mod models;
pub mod transport;

pub use client::{ApiCredentials, OpnClient};
pub use error::Error;
pub use models::{RuleLookup, RuleRow, SearchRuleRequest, SearchRuleResponse};
pub use transport::{TlsMode, TransportConfig};
