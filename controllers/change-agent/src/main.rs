//! Change Agent
//!
//! Watches workload, networking, config and RBAC resources across the
//! cluster and reports field-level changes to the incident hub:
//! - Discovers the served resource kinds and keeps the allow-listed ones
//! - Runs one watch loop per kind against a shared snapshot cache
//! - Sends a change record for every update that touches more than
//!   metadata or status

mod backoff;
mod config;
mod controller;
mod discovery;
mod error;
mod source;
mod watcher;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use change_detector::{ChangeEngine, ObjectCache};
use clap::Parser;
use hub_client::HubClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AgentConfig;
use crate::controller::Controller;
use crate::error::ControllerError;
use crate::source::KubeSource;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let config = AgentConfig::parse();
    init_tracing(config.debug_enabled);

    // Both kube and tonic pull in rustls; pick the provider explicitly
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting Change Agent");
    config.validate()?;
    config.log_summary();

    let cache = Arc::new(ObjectCache::new(config.cache_capacity));
    let mut engine = ChangeEngine::new(cache, config.api_key.clone());
    if let Some(destination) = config.hub_destination() {
        let hub = HubClient::connect(destination, config.use_tls)?;
        engine = engine.with_hub(Arc::new(hub));
    }

    let source = Arc::new(KubeSource::try_default().await?);
    let controller = Controller::start(
        source,
        Arc::new(engine),
        &config.watched_resources(),
        config.restart_policy(),
    )
    .await?;
    info!("Watching {} resource kinds", controller.kinds().len());

    tokio::select! {
        result = controller.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    }
}

/// `RUST_LOG` wins; otherwise info, or debug for the agent crates.
fn init_tracing(debug_enabled: bool) {
    let level = if debug_enabled { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,change_agent={level},change_detector={level},hub_client={level}"
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
