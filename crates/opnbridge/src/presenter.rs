//! In-memory presentation layer for the CLI.
//!
//! Stands in for a home-automation host: remembers the last value pushed
//! for each rule and logs every change.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use opnbridge_core::SwitchPresenter;
use tracing::info;

#[derive(Debug, Default)]
pub struct LoggingPresenter {
    states: Mutex<HashMap<String, bool>>,
}

impl LoggingPresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SwitchPresenter for LoggingPresenter {
    fn set_on(&self, rule_uuid: &str, on: bool) {
        let previous = self
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(rule_uuid.to_owned(), on);
        if previous != Some(on) {
            info!(rule = rule_uuid, on, ?previous, "switch state changed");
        }
    }

    fn last_observed(&self, rule_uuid: &str) -> Option<bool> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(rule_uuid)
            .copied()
    }
}
