//! Command dispatch: bridges CLI args -> bridge operations -> output formatting.

pub mod gateways;
pub mod rules;
pub mod run;

use opnbridge_core::Bridge;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a firewall-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Rules(args) => rules::handle(bridge, args, global).await,
        Command::Gateways => gateways::handle(bridge, global).await,
        Command::Run => run::handle(bridge, global).await,
        // Completions is handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}
