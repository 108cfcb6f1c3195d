//! QRC CLI - Command-line interface for the QRC adapter
//!
//! Reads or writes one setting on a core and prints the resulting value.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use qrc_bridge::adapter::config::{load_config, validate, write_config};
use qrc_bridge::adapter::dispatch::SETTINGS;
use qrc_bridge::adapter::TcpConnection;
use qrc_bridge::{Adapter, AdapterConfig, Diagnostic, ErrorLog, Outcome};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "qrc")]
#[command(about = "Get and set control parameters on a Q-SYS core", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Core host, overriding the configuration
    #[arg(long)]
    host: Option<String>,

    /// QRC port, overriding the configuration
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a setting
    Get {
        /// Setting name (see `settings`)
        setting: String,

        /// Control, toggle or route target
        #[arg(default_value = "")]
        arg1: String,
    },

    /// Write a setting
    Set {
        /// Setting name (see `settings`)
        setting: String,

        /// Control or route target; the state for fixed toggles
        arg1: String,

        /// Value to write
        #[arg(default_value = "")]
        arg2: String,
    },

    /// List the settings the adapter understands
    Settings,

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Settings => {
            for (name, handler) in SETTINGS {
                println!("{name:<14} {handler}");
            }
            Ok(())
        }

        Commands::InitConfig { path } => {
            write_config(path, &AdapterConfig::default())?;
            println!("Wrote default configuration to {:?}", path);
            Ok(())
        }

        Commands::Get { setting, arg1 } => {
            let (mut adapter, log) = connect(&cli)?;
            let outcome = adapter.get(setting, arg1);
            report(outcome, &log.take(adapter.key()))
        }

        Commands::Set {
            setting,
            arg1,
            arg2,
        } => {
            let (mut adapter, log) = connect(&cli)?;
            let outcome = adapter.set(setting, arg1, arg2);
            report(outcome, &log.take(adapter.key()))
        }
    }
}

fn connect(cli: &Cli) -> Result<(Adapter<TcpConnection>, Arc<ErrorLog>)> {
    let config = resolve_config(cli)?;
    let address = config.address();
    let connection = TcpConnection::connect(address.as_str(), config.socket_timeouts())
        .with_context(|| format!("Failed to connect to {address}"))?;

    let log = Arc::new(ErrorLog::new());
    let adapter = Adapter::new(address, connection, &config).with_recorder(log.clone());
    Ok((adapter, log))
}

fn resolve_config(cli: &Cli) -> Result<AdapterConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AdapterConfig::default(),
    };

    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

fn report(outcome: Outcome, errors: &[Diagnostic]) -> Result<()> {
    for diagnostic in errors {
        eprintln!("{} {}", diagnostic.at.to_rfc3339(), diagnostic.message);
    }

    let attempts = outcome.attempts;
    match outcome.into_result() {
        Ok(value) => {
            println!("{value}");
            Ok(())
        }
        Err(err) => bail!("{err} ({attempts} attempts)"),
    }
}
