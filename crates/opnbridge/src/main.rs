mod cli;
mod commands;
mod error;
mod output;
mod presenter;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use opnbridge_core::Bridge;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;
use crate::presenter::LoggingPresenter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "opnbridge", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let bridge = build_bridge(&cli.global)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &bridge, &cli.global).await
        }
    }
}

/// Load settings, resolve credentials and wire up the engine.
fn build_bridge(global: &GlobalOpts) -> Result<Bridge, CliError> {
    let cfg = opnbridge_config::load_config(global.config.as_deref())?;
    let resolved = opnbridge_config::resolve(&cfg)?;
    let client = resolved.client()?;

    tracing::debug!(
        name = %resolved.name,
        host = %resolved.bridge.host,
        switches = resolved.bridge.switches.len(),
        gateways = resolved.bridge.gateways.enabled,
        "configuration loaded"
    );

    Ok(Bridge::new(
        resolved.bridge,
        client,
        Arc::new(LoggingPresenter::new()),
    ))
}
