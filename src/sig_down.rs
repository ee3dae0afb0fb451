//! Graceful shutdown on SIGTERM and SIGINT.
//!
//! A background task listens for either signal and fires a
//! [`CancellationToken`] that in-flight provider calls observe, so a Ctrl-C
//! during verification aborts the HTTP round-trip instead of leaving the
//! process hanging on a slow upstream.

use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;
use tokio_util::sync::CancellationToken;

pub struct SigDown {
    cancellation_token: CancellationToken,
}

impl SigDown {
    /// Registers the signal handlers.
    ///
    /// Returns an error if signal registration fails.
    pub fn try_new() -> Result<Self, std::io::Error> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let token = CancellationToken::new();
        let inner = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::debug!("SIGTERM received, cancelling");
                    inner.cancel();
                },
                _ = sigint.recv() => {
                    tracing::debug!("SIGINT received, cancelling");
                    inner.cancel();
                }
            }
        });
        Ok(Self {
            cancellation_token: token,
        })
    }

    /// Returns a clone of the cancellation token for distributing to
    /// subsystems.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}
