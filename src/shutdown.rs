use tokio_util::sync::CancellationToken;

/// Install a stop handler for long-running commands (journal tailing).
///
/// Returns a `CancellationToken` that is cancelled on SIGTERM or SIGINT.
/// Must be called from within a tokio runtime.
#[cfg(unix)]
pub fn install_stop_handler() -> std::io::Result<CancellationToken> {
    use tokio::signal::unix::{signal, SignalKind};

    let token = CancellationToken::new();
    let token_clone = token.clone();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, stopping");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, stopping");
            }
        }

        token_clone.cancel();
    });

    Ok(token)
}

/// Install a stop handler for long-running commands (journal tailing).
///
/// Returns a `CancellationToken` that is cancelled on Ctrl-C.
#[cfg(not(unix))]
pub fn install_stop_handler() -> std::io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, stopping");
            token_clone.cancel();
        }
    });

    Ok(token)
}
