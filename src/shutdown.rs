use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Cancel the returned token on SIGTERM or SIGINT so the web server can stop
/// accepting connections and finish in-flight requests.
///
/// If a handler cannot be installed the failure is logged and the server keeps
/// running; it can still be stopped by the other signal or by the token.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "Could not install SIGTERM handler");
                None
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "Could not install SIGINT handler");
                None
            }
        };

        tokio::select! {
            Some(_) = recv(&mut sigterm) => {
                tracing::info!("Received SIGTERM, shutting down");
            }
            Some(_) = recv(&mut sigint) => {
                tracing::info!("Received SIGINT, shutting down");
            }
            _ = trigger.cancelled() => return,
        }

        trigger.cancel();
    });

    token
}

async fn recv(sig: &mut Option<tokio::signal::unix::Signal>) -> Option<()> {
    match sig {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    }
}
