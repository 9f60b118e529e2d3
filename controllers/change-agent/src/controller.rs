//! Change agent controller.
//!
//! Discovers the watchable resource kinds once at startup, then runs one
//! watch loop per kind as an independent task. Loops share the change
//! engine and its cache but never wait on each other.

use std::sync::Arc;

use change_detector::ChangeEngine;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::backoff::FibonacciBackoff;
use crate::discovery::{ResourceKind, filter_allowed};
use crate::error::ControllerError;
use crate::source::{ClusterSource, INITIAL_RESOURCE_VERSION};
use crate::watcher::WatchLoop;

/// What to do when a watch stream cannot be opened.
///
/// Streams that close after opening are reopened under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// A failed open terminates the process.
    Crash,
    /// Reopen after a Fibonacci backoff. More than `max_attempts`
    /// consecutive failed opens terminates the process.
    Resubscribe { max_attempts: u32 },
}

#[derive(Debug)]
pub struct Controller {
    kinds: Vec<ResourceKind>,
    watchers: JoinSet<Result<(), ControllerError>>,
}

impl Controller {
    /// Discover resource kinds and start a watch loop for each allowed one.
    pub async fn start<S>(
        source: Arc<S>,
        engine: Arc<ChangeEngine>,
        allowed: &[String],
        policy: RestartPolicy,
    ) -> Result<Self, ControllerError>
    where
        S: ClusterSource + 'static,
    {
        let lists = source
            .discover()
            .await
            .map_err(|e| ControllerError::Discovery(e.to_string()))?;
        let kinds = filter_allowed(&lists, allowed);
        if kinds.is_empty() {
            warn!("No allowed resource kinds are served by the cluster");
        }

        let mut watchers = JoinSet::new();
        for kind in &kinds {
            info!("Starting watch for {}", kind);
            let watch_loop = WatchLoop::new(source.clone(), kind.clone(), engine.clone());
            watchers.spawn(supervise(watch_loop, policy));
        }
        info!("Started {} watch loops", kinds.len());

        Ok(Self { kinds, watchers })
    }

    pub fn kinds(&self) -> &[ResourceKind] {
        &self.kinds
    }

    /// Wait for the watch loops.
    ///
    /// Loops only end on a fatal watch error, which is returned. `Ok` means
    /// there was nothing to watch.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Change agent running");
        while let Some(joined) = self.watchers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Watch loop failed: {}", e);
                    self.watchers.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    self.watchers.abort_all();
                    return Err(ControllerError::Watch(format!("watch task panicked: {}", e)));
                }
            }
        }
        warn!("All watch loops have ended");
        Ok(())
    }
}

/// Keep one kind watched for the life of the process.
///
/// Watch streams are closed by the API server (and by the client-side watch
/// timeout) as a matter of course, so a stream that ends is always reopened
/// from the last resource version it delivered. A stream that delivered
/// nothing is reopened after a backoff. Only failures to open are subject
/// to the restart policy.
async fn supervise<S>(
    watch_loop: WatchLoop<S>,
    policy: RestartPolicy,
) -> Result<(), ControllerError>
where
    S: ClusterSource + ?Sized,
{
    let mut backoff = FibonacciBackoff::default();
    let mut resource_version = INITIAL_RESOURCE_VERSION.to_string();
    let mut failed_opens = 0u32;

    loop {
        match watch_loop.run(&resource_version).await {
            Ok(summary) => {
                failed_opens = 0;
                if summary.ended_with_error {
                    // the stored version may have expired
                    resource_version = INITIAL_RESOURCE_VERSION.to_string();
                } else if let Some(version) = summary.last_resource_version {
                    resource_version = version;
                }
                if summary.notifications > 0 {
                    backoff.reset();
                    debug!(
                        "Reopening watch for {} from resource version {}",
                        watch_loop.kind(),
                        resource_version
                    );
                    continue;
                }
            }
            Err(e) => {
                let RestartPolicy::Resubscribe { max_attempts } = policy else {
                    return Err(e);
                };
                failed_opens += 1;
                if failed_opens > max_attempts {
                    error!(
                        "Giving up on {} after {} failed watch attempts",
                        watch_loop.kind(),
                        failed_opens
                    );
                    return Err(e);
                }
                warn!("{} (attempt {}/{})", e, failed_opens, max_attempts);
                resource_version = INITIAL_RESOURCE_VERSION.to_string();
            }
        }

        let delay = backoff.next_backoff();
        info!(
            "Resubscribing to {} from resource version {} in {:?}",
            watch_loop.kind(),
            resource_version,
            delay
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;
