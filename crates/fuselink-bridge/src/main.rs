//! Fuselink bridge binary.
//!
//! # Usage
//!
//! ```bash
//! # Run with a configuration file
//! fuselink-bridge --config fuselink.toml
//!
//! # Check what a deployment actually parsed
//! fuselink-bridge --config fuselink.toml --dump-config
//! ```

use clap::Parser;
use fuselink_bridge::{Bridge, Config, IdLookup, dmr_endpoint, ysf_endpoint};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// YSF to DMR Homebrew voice bridge
#[derive(Parser, Debug)]
#[command(name = "fuselink-bridge")]
#[command(about = "Bridges YSF reflector voice to a DMR Homebrew master")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "fuselink.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the parsed configuration and exit
    #[arg(long)]
    dump_config: bool,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match run(args).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Fuselink bridge starting");

    let config = Config::load(&args.config)?;
    if args.dump_config {
        println!("{config:#?}");
        return Ok(());
    }

    let lookup = match &config.bridge.id_file {
        Some(path) => IdLookup::load(path, config.dmr.default_source_id)?,
        None => {
            tracing::warn!("no DMR ID file configured, callsign resolution degraded");
            IdLookup::empty(config.dmr.default_source_id)
        }
    };

    let cancel = CancellationToken::new();
    let ysf = ysf_endpoint::spawn(&config.ysf, cancel.clone()).await?;
    let dmr = dmr_endpoint::spawn(&config.dmr, config.session_config(), cancel.clone()).await?;

    let bridge = tokio::spawn(Bridge::new(&config, ysf, dmr, lookup).run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    cancel.cancel();

    // Give the endpoints a moment to unlink and close
    let _ = tokio::time::timeout(std::time::Duration::from_secs(2), bridge).await;

    Ok(())
}
