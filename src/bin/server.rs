use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use flowerdb_lib::client::LocalStore;
use flowerdb_lib::config::Config;
use flowerdb_lib::logging;
use flowerdb_lib::server::FlowerServer;

/// Serve an in-memory document store over TCP.
#[derive(Debug, Parser)]
#[command(name = "flowerdb_server", version)]
struct Args {
    /// Address to listen on [env: FLOWERDB_BIND, default: 127.0.0.1:27017]
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let server = FlowerServer::new(Arc::new(LocalStore::new()));

    server
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    info!("server stopped");
    Ok(())
}
