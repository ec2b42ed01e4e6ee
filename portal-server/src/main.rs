//! # Portal Server
//!
//! ```bash
//! # Run with the default configuration file
//! portal-server
//!
//! # Custom configuration, environment override
//! PORTAL_SERVER_PORT=9090 portal-server --config /etc/portal/portal.yaml
//!
//! # Check a configuration file and exit
//! portal-server --config portal.yaml --validate
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use portal_server::{PortalServer, ServerConfig};

/// Immigration portal tenancy server
#[derive(Parser, Debug)]
#[command(name = "portal-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "portal.yaml")]
    config: PathBuf,

    /// Override server host
    #[arg(long)]
    host: Option<String>,

    /// Override server port
    #[arg(long)]
    port: Option<u16>,

    /// Override log level (e.g. debug, info, portal_tenancy=trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    if args.validate {
        println!("Configuration is valid");
        return;
    }

    match run_server(config).await {
        Ok(()) => info!("Portal server exited"),
        Err(e) => {
            error!(error = %format!("{e:#}"), "Server error");
            eprintln!("Server error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<ServerConfig> {
    let mut config = if args.config.exists() {
        PortalServer::load_config(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?
    } else if args.validate {
        anyhow::bail!("configuration file not found: {}", args.config.display());
    } else {
        eprintln!(
            "Configuration file not found: {}, using defaults",
            args.config.display()
        );
        ServerConfig::default()
    };

    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = &args.log_level {
        config.portal.logging.level.clone_from(level);
    }
    Ok(config)
}

async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let mut server = PortalServer::new(config);
    server.initialize().await.context("initializing server")?;
    server.run().await.context("running server")?;
    Ok(())
}
