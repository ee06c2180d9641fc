//! HTTP server lifecycle.
//!
//! [`run`] binds the configured address and serves until Ctrl-C or
//! SIGTERM. After the signal, in-flight requests get a grace period to
//! finish; connections still open after it (typically SSE subscribers) are
//! dropped.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::http::{AppState, build_router};

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address is invalid or could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server hit a fatal I/O error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Bind according to `config` and serve until a shutdown signal.
///
/// # Errors
///
/// [`ServerError::Bind`] if the address is invalid or already in use,
/// [`ServerError::Serve`] if serving fails.
pub async fn run(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve(listener, state, shutdown_signal(), config.shutdown_grace()).await
}

/// Bind the configured listen address, resolving host names.
///
/// # Errors
///
/// [`ServerError::Bind`] if the address does not resolve or cannot be
/// bound.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.listen_addr();
    TcpListener::bind(addr.as_str())
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve on an already bound listener until `shutdown` resolves, then
/// allow `grace` for open connections to finish.
///
/// # Errors
///
/// [`ServerError::Serve`] if the listener fails.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
    grace: Duration,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    let local: SocketAddr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;
    info!(addr = %local, "CelestialTree listening on http://{local}");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, build_router(state)).with_graceful_shutdown(async move {
        // A dropped sender also means stop.
        let _ = stop_rx.await;
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => return flatten(joined),
        () = shutdown => info!("shutdown signal received"),
    }

    let _ = stop_tx.send(());
    if let Ok(joined) = tokio::time::timeout(grace, &mut server).await {
        flatten(joined)?;
    } else {
        warn!(grace_secs = grace.as_secs(), "connections still open after grace period, closing");
        server.abort();
    }
    info!("bye.");
    Ok(())
}

fn flatten(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ServerError::Serve(e.to_string())),
        Err(e) => Err(ServerError::Serve(format!("server task failed: {e}"))),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
