use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Cancel `token` on the first SIGINT, SIGTERM or SIGQUIT.
///
/// The handlers are installed before this returns, so a signal delivered
/// afterwards is never missed.
pub fn shutdown_on_signals(token: CancellationToken) -> Result<()> {
    let install = |kind: SignalKind| {
        signal(kind).map_err(|err| Error::io(err, "install signal handler"))
    };

    let mut sigint = install(SignalKind::interrupt())?;
    let mut sigterm = install(SignalKind::terminate())?;
    let mut sigquit = install(SignalKind::quit())?;

    tokio::spawn(async move {
        let signal = tokio::select! {
            _ = token.cancelled() => return,
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
            _ = sigquit.recv() => "SIGQUIT",
        };

        info!(message = "Signal received", signal);

        token.cancel();
    });

    Ok(())
}
