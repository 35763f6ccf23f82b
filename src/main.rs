use std::sync::Arc;

use anyhow::Context;
use hostgate::config::{Config, sites};
use hostgate::proxy::RoutingTable;
use hostgate::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load().context("invalid settings")?;

    let sites = sites::load_sites(&cfg.sites_dir).context("failed to load site configuration")?;
    let routes = Arc::new(RoutingTable::build(&sites));

    for route in routes.entries() {
        tracing::info!(
            server = %route.name,
            host = %route.virtual_host,
            upstream = %route.upstream,
            "Route"
        );
    }

    tokio::select! {
        res = server::listener::run(&cfg, routes) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
