//! SDK client startup and shutdown
//!
//! The client is initialized before the listener is bound. A spawned task
//! waits for a termination signal, shuts the client down and exits the
//! process. In-flight requests are not drained.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::client::FabricClient;
use crate::error::Result;

/// Owns the init/shutdown boundary of the process-wide client.
pub struct Lifecycle {
    client: Arc<dyn FabricClient>,
    stopped: AtomicBool,
}

impl Lifecycle {
    /// Initialize `client` from `config_path`.
    ///
    /// A failure here is fatal: the caller is expected to exit before
    /// accepting traffic.
    pub async fn start(client: Arc<dyn FabricClient>, config_path: &Path) -> Result<Arc<Self>> {
        client.init(config_path).await?;
        info!(config = %config_path.display(), "SDK client initialized");

        Ok(Arc::new(Self {
            client,
            stopped: AtomicBool::new(false),
        }))
    }

    /// Handle to share with request handlers.
    pub fn client(&self) -> Arc<dyn FabricClient> {
        self.client.clone()
    }

    /// Shut the client down. Only the first call reaches the client; returns
    /// whether this call was the one that did.
    pub async fn shutdown(&self) -> bool {
        if self
            .stopped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        info!("shutting down SDK client");
        self.client.shutdown().await;
        true
    }

    /// Spawn the task that waits for `signal`, shuts the client down, then
    /// runs `exit`.
    pub fn spawn_signal_handler<S, X>(self: &Arc<Self>, signal: S, exit: X) -> JoinHandle<()>
    where
        S: Future<Output = ()> + Send + 'static,
        X: FnOnce() + Send + 'static,
    {
        let lifecycle = Arc::clone(self);
        tokio::spawn(async move {
            signal.await;
            info!("termination signal received");
            lifecycle.shutdown().await;
            exit();
        })
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
