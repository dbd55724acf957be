use {
    tokio::signal,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

/// Cancels its token on Ctrl+C or SIGTERM.
#[derive(Debug, Default)]
pub struct ShutdownGuard {
    token: CancellationToken,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The token every long-running task watches.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn spawn_signal_listener(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            token.cancel();
        });
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use signal::unix::{SignalKind, signal as unix_signal};

    let mut sigterm = match unix_signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to register SIGTERM handler, listening for Ctrl+C only");
            ctrl_c().await;
            return;
        },
    };
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
        () = ctrl_c() => {},
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, initiating shutdown"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        },
    }
}
