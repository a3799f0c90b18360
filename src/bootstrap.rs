//! Startup exposure of the HTTP endpoint.
//!
//! Binding the listener can fail transiently (port still held by a previous
//! process, interface not up yet). [`expose_with_retry`] tries a bounded
//! number of times, waiting between attempts either for the retry interval or
//! for a host-ready notification, whichever comes first.

use crate::config::StartupConfig;
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use axum::Router;
use log::{error, info, warn};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Something that can make the HTTP surface reachable.
#[async_trait]
pub trait EndpointHost: Send + Sync {
    /// One exposure attempt.
    async fn expose(&self) -> Result<()>;

    /// Human readable target, for logs.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl From<&StartupConfig> for RetryPolicy {
    fn from(config: &StartupConfig) -> Self {
        Self {
            attempts: config.expose_attempts.max(1),
            interval: config.retry_interval(),
        }
    }
}

/// Expose `host`, retrying per `policy`.
///
/// Returns the attempt number that succeeded, or
/// [`BridgeError::StartupCapability`] once every attempt failed.
pub async fn expose_with_retry(
    host: &dyn EndpointHost,
    policy: &RetryPolicy,
    host_ready: &Notify,
) -> Result<u32> {
    let mut last_error = None;

    for attempt in 1..=policy.attempts {
        match host.expose().await {
            Ok(()) => {
                info!("[Bootstrap] Exposed {} (attempt {})", host.describe(), attempt);
                return Ok(attempt);
            }
            Err(e) => {
                warn!(
                    "[Bootstrap] Attempt {}/{} to expose {} failed: {}",
                    attempt,
                    policy.attempts,
                    host.describe(),
                    e
                );
                last_error = Some(e);
            }
        }

        if attempt < policy.attempts {
            tokio::select! {
                _ = tokio::time::sleep(policy.interval) => {}
                _ = host_ready.notified() => {
                    info!("[Bootstrap] Host ready, retrying now");
                }
            }
        }
    }

    let reason = last_error.map_or_else(|| "no attempts made".to_string(), |e| e.to_string());
    error!(
        "[Bootstrap] Giving up on {} after {} attempt(s): {}",
        host.describe(),
        policy.attempts,
        reason
    );
    Err(BridgeError::StartupCapability(reason))
}

/// Serves a router on a TCP address once exposed.
pub struct TcpEndpoint {
    addr: SocketAddr,
    router: Mutex<Option<Router>>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TcpEndpoint {
    pub fn new(addr: SocketAddr, router: Router, shutdown: CancellationToken) -> Self {
        Self {
            addr,
            router: Mutex::new(Some(router)),
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Wait for the server task to finish after shutdown. No-op if never exposed.
    pub async fn wait(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            error!("[HTTP] Server task failed: {}", e);
        }
    }
}

#[async_trait]
impl EndpointHost for TcpEndpoint {
    async fn expose(&self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        let Some(router) = self.router.lock().take() else {
            return Err(BridgeError::StartupCapability(
                "endpoint already exposed".to_string(),
            ));
        };

        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = serve.await {
                error!("[HTTP] Server error: {}", e);
            }
            info!("[HTTP] Server stopped");
        });
        *self.task.lock() = Some(task);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("http://{}", self.addr)
    }
}
