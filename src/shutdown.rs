// src/shutdown.rs
// =============================================================================
// Turns SIGINT (Ctrl-C) and, on Unix, SIGTERM into a cancelled token.
//
// Every role shares one CancellationToken: the listener, the actors and the
// fetch workers all watch it, so a single signal starts an orderly drain.
// =============================================================================

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Spawns a task that cancels `token` on the first shutdown signal.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                info!("shutdown signal received; draining");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
