//! backrooms - AI persona conversation relay
//!
//! Main entry point for the backrooms binary.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use backrooms::cli::{Cli, Commands, ConfigSubcommand};
use backrooms::config::{self, AppConfig};
use backrooms::error::{Error, Result};
use backrooms::ledger::UsageLedger;
use backrooms::logging;
use backrooms::orchestrator::Orchestrator;
use backrooms::provider;
use backrooms::transport::RelayServer;

fn main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    if let Commands::Config { subcommand } = &cli.command {
        logging::init_simple(tracing::Level::WARN)?;
        return handle_config_command(subcommand.clone());
    }

    let config_path = match &cli.command {
        Commands::Serve { config, .. }
        | Commands::Usage { config }
        | Commands::Personas { config } => config.clone(),
        Commands::Config { .. } => None,
    };

    let mut config = exit_on_error(AppConfig::load(config_path.as_deref()));

    if let Commands::Serve {
        port, daily_limit, ..
    } = &cli.command
    {
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(limit) = daily_limit {
            config.limits.daily_limit = *limit;
        }
        exit_on_error(config.validate());
        exit_on_error(config.check_credentials());
    }

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Serve { .. } => run_server(config),
        Commands::Usage { .. } => show_usage(&config),
        Commands::Personas { .. } => show_personas(&config),
        Commands::Config { .. } => Ok(()),
    }
}

/// Print a startup error the way a terminal user wants it, then exit.
fn exit_on_error<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    }
}

/// Build the runtime and serve until Ctrl+C
fn run_server(config: AppConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(if config.server.worker_threads == 0 {
            num_cpus::get().min(8)
        } else {
            config.server.worker_threads as usize
        })
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> Result<()> {
    let rotation = config.rotation()?;
    let ledger = Arc::new(UsageLedger::open(
        config.ledger_path(),
        config.limits.daily_limit,
    ));
    let provider = provider::from_settings(&config.provider)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = provider.name(),
        personas = rotation.len(),
        daily_limit = config.limits.daily_limit,
        "Starting backrooms relay"
    );

    match provider.health_check().await {
        Ok(health) if !health.operational => warn!(
            error = health.error.as_deref().unwrap_or("unknown"),
            "Provider did not answer its health check"
        ),
        Err(e) => warn!(error = %e, "Provider health check failed"),
        Ok(_) => {}
    }

    let orchestrator = Arc::new(Orchestrator::new(ledger, rotation, provider));
    let server = RelayServer::bind(&config.listen_addr(), orchestrator).await?;

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("Relay stopped");
    Ok(())
}

fn show_usage(config: &AppConfig) -> Result<()> {
    let ledger = UsageLedger::open(config.ledger_path(), config.limits.daily_limit);
    let record = ledger.read();

    println!(
        "API calls today ({}): {}/{}",
        record.date, record.count, config.limits.daily_limit
    );
    if ledger.is_over_limit(&record) {
        println!("Daily limit reached.");
    }
    Ok(())
}

fn show_personas(config: &AppConfig) -> Result<()> {
    let rotation = config.rotation()?;
    for (i, persona) in rotation.iter().enumerate() {
        println!("{}. {}", i + 1, persona);
    }
    Ok(())
}

fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let mut cfg = exit_on_error(AppConfig::load(config.as_deref()));
            if !cfg.provider.api_key.is_empty() {
                cfg.provider.api_key = "********".to_string();
            }
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = exit_on_error(config::init_config(path.as_deref(), force));
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            let cfg = exit_on_error(AppConfig::load(config.as_deref()));
            exit_on_error(cfg.rotation());
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
