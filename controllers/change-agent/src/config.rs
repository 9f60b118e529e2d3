//! Agent configuration.
//!
//! Every option can come from the command line or from the environment
//! variable named next to it. Booleans accept `true`/`false`, `yes`/`no`,
//! `on`/`off` and `1`/`0`, in any case. Anything else fails startup.

use std::num::NonZeroUsize;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use tracing::{info, warn};

use crate::controller::RestartPolicy;
use crate::discovery::DEFAULT_WATCHED_RESOURCES;
use crate::error::ControllerError;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "change-agent",
    version,
    about = "Reports field-level changes of cluster resources to the incident hub"
)]
pub struct AgentConfig {
    /// Credential attached to every change record
    #[arg(long, env = "API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Hub gRPC address, `host:port`
    #[arg(long, env = "DESTINATION_URL")]
    pub destination_url: Option<String>,

    /// Log at debug level, including every detected change
    #[arg(
        long,
        env = "DEBUG_ENABLED",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = false
    )]
    pub debug_enabled: bool,

    /// Dispatch change records to the hub
    #[arg(
        long,
        env = "EXTERNAL_SEND_ENABLED",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = true
    )]
    pub external_send_enabled: bool,

    /// Use TLS on the hub channel
    #[arg(
        long,
        env = "USE_TLS",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = false
    )]
    pub use_tls: bool,

    /// Maximum number of cached snapshots; unbounded when unset
    #[arg(long, env = "CACHE_CAPACITY")]
    pub cache_capacity: Option<NonZeroUsize>,

    /// Comma-separated resource names to watch
    #[arg(long, env = "WATCH_RESOURCES", value_delimiter = ',')]
    pub watch_resources: Option<Vec<String>>,

    /// Reopen watch streams that end instead of leaving the kind unwatched
    #[arg(
        long,
        env = "WATCH_RESUBSCRIBE",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = false
    )]
    pub resubscribe: bool,

    /// Consecutive failed watch opens tolerated when resubscribing
    #[arg(long, env = "WATCH_MAX_RESUBSCRIBE_ATTEMPTS", default_value_t = 5)]
    pub max_resubscribe_attempts: u32,
}

impl AgentConfig {
    /// Resource names to watch: the configured list, or the built-in one.
    pub fn watched_resources(&self) -> Vec<String> {
        match &self.watch_resources {
            Some(configured) => configured
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_WATCHED_RESOURCES.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Hub destination when external send is enabled.
    pub fn hub_destination(&self) -> Option<&str> {
        if !self.external_send_enabled {
            return None;
        }
        self.destination_url
            .as_deref()
            .map(str::trim)
            .filter(|destination| !destination.is_empty())
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        if self.resubscribe {
            RestartPolicy::Resubscribe {
                max_attempts: self.max_resubscribe_attempts,
            }
        } else {
            RestartPolicy::Crash
        }
    }

    /// Reject configurations the agent cannot run with.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.external_send_enabled && self.hub_destination().is_none() {
            return Err(ControllerError::InvalidConfig(
                "DESTINATION_URL is required when EXTERNAL_SEND_ENABLED is true".to_string(),
            ));
        }
        if self.watched_resources().is_empty() {
            return Err(ControllerError::InvalidConfig(
                "WATCH_RESOURCES must name at least one resource".to_string(),
            ));
        }
        if self.external_send_enabled && self.api_key.is_empty() {
            warn!("API_KEY is empty; the hub may reject change records");
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        info!("Configuration:");
        info!(
            "  Hub destination: {}",
            self.hub_destination().unwrap_or("disabled")
        );
        info!("  TLS: {}", self.use_tls);
        info!("  Debug: {}", self.debug_enabled);
        match self.cache_capacity {
            Some(capacity) => info!("  Cache capacity: {}", capacity),
            None => info!("  Cache capacity: unbounded"),
        }
        info!("  Watched resources: {}", self.watched_resources().join(","));
        match self.restart_policy() {
            RestartPolicy::Crash => info!("  Watch restart: exit when a stream cannot be opened"),
            RestartPolicy::Resubscribe { max_attempts } => {
                info!("  Watch restart: resubscribe (max {} failed attempts)", max_attempts)
            }
        }
    }
}
