#![forbid(unsafe_code)]
//! HTTP API server for a single powchain node

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use powchain::api::{run_api_server, Node};
use powchain::blockchain::Blockchain;
use powchain::config::{load_config, load_config_from};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Port to listen on, overriding the configuration
    #[arg(long)]
    port: Option<u16>,
    /// Leading zero hex characters required of each proof
    #[arg(long)]
    difficulty: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Precedence: CLI flags, then PORT, then the file, then defaults.
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = load_config_from(path)?;
            config.apply_env_overrides();
            config
        }
        None => load_config()?,
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(difficulty) = cli.difficulty {
        config.mining.difficulty = difficulty;
    }
    config.validate()?;

    let host: IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(host, config.server.port);

    let node = Arc::new(Node::new(Blockchain::new(), &config.mining)?);
    run_api_server(node, addr).await
}
