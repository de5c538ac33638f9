//! sectorfee - storage-provider economics query service
//!
//! Serves termination-penalty, vesting, daily-fee and fault-fee reports
//! computed from live chain state over a small HTTP API.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sectorfee_server::api::{self, AppState};
use sectorfee_server::config::ServerConfig;
use sectorfee_core::version::VersionSchedule;
use sectorfee_state::LotusAdapter;

#[derive(Debug, Parser)]
#[command(name = "sectorfee", about = "Storage-provider economics query service")]
struct Cli {
    /// Listen address, overrides the config file
    #[arg(long)]
    listen: Option<String>,

    /// Full-node JSON-RPC endpoint, overrides the config file
    #[arg(long, env = "FULLNODE_RPC")]
    rpc: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut cfg = ServerConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        cfg.listen = listen;
    }
    if let Some(rpc) = cli.rpc {
        cfg.rpc.endpoint = rpc;
    }

    tracing::info!(listen = %cfg.listen, rpc = %cfg.rpc.endpoint, "starting sectorfee");

    let adapter = LotusAdapter::new(&cfg.rpc.endpoint, Duration::from_secs(cfg.rpc.timeout_secs))?;
    let state = AppState {
        adapter: Arc::new(adapter),
        mapper: cfg.date_mapper(),
        versions: VersionSchedule::mainnet(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/penalty", get(api::penalty))
        .route("/vested", get(api::vested))
        .route("/dailyfee", get(api::dailyfee))
        .route("/spdailyfee", get(api::spdailyfee))
        .route("/faultfee", get(api::faultfee))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.listen).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
