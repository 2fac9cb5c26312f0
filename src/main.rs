//! The Nexus gateway binary.

use clap::Parser;
use tracing::info;

use nexus::AppState;
use nexus::NexusConfig;
use nexus::build_router;

/// Universal package-registry gateway and content-delivery front.
#[derive(Debug, Parser)]
#[command(name = "nexus", version, about)]
struct Args {
    /// Listen port (overrides NEXUS_HTTP_PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Bind address (overrides NEXUS_BIND_ADDR).
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = NexusConfig::load()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    let state = AppState::from_config(&config)?;
    let router = build_router(&state);

    let addr = format!("{}:{}", config.server.bind_addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "nexus listening");

    axum::serve(listener, router).await?;
    Ok(())
}
