// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling for graceful shutdown.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cancels `token` on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
///
/// Must be called from within a Tokio runtime.
pub fn install_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                        _ = token.cancelled() => return,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "cannot install SIGTERM handler, listening for Ctrl+C only");
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = token.cancelled() => return,
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                _ = token.cancelled() => return,
            }
        }

        token.cancel();
        debug!("shutdown signal handler completed");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handler_exits_when_token_cancelled_elsewhere() {
        let token = CancellationToken::new();
        install_signal_handler(token.clone());
        assert!(!token.is_cancelled());
        token.cancel();
        tokio::task::yield_now().await;
        assert!(token.is_cancelled());
    }
}
