use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::mpsc;
use trapwatch::config::Properties;
use trapwatch::{Agent, Supervisor};

/// Command-line arguments for the device-monitoring agent
#[derive(Parser)]
#[command(
    name = "trapwatch",
    about = "Device monitoring agent - polls broadcast equipment and raises SNMP traps",
    long_about = "Periodically polls RF transmitters, UPS units, media streams and web-managed \
                  appliances, and sends an SNMPv1 trap whenever a monitored condition enters or \
                  leaves its normal state."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "trapwatch.toml",
        help = "Configuration file path (TOML format)"
    )]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    fn validate(&self) -> Result<(), String> {
        if self.config.exists() && !self.config.is_file() {
            return Err(format!(
                "Configuration path is not a file: {}",
                self.config.display()
            ));
        }

        if let Some(extension) = self.config.extension() {
            if extension != "toml" {
                warn!(
                    "Configuration file does not have .toml extension: {}",
                    self.config.display()
                );
            }
        }

        Ok(())
    }
}

fn run(cli: &Cli) -> Result<()> {
    info!("Loading configuration from: {}", cli.config.display());
    let properties = Properties::from_file(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;

    let agent = Agent::new(properties);
    let retry_delay = agent.settings().retry_delay;
    let mut supervisor = Supervisor::new(agent.into_factory(), retry_delay);

    let (shutdown_sender, shutdown_receiver) = mpsc::channel();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down gracefully...");
        if let Err(e) = shutdown_sender.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    })
    .context("failed to install interrupt handler")?;

    info!("trapwatch is running. Press Ctrl+C to stop.");
    supervisor.run(&shutdown_receiver);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting trapwatch");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("trapwatch shutdown complete");
}
