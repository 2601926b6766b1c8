//! Process lifecycle and coordinated shutdown.
//!
//! The process moves forward through [`Phase`]s only:
//!
//! ```text
//! Unconfigured -> StoreOpening -> Serving -> ShuttingDown
//! ```
//!
//! A single [`CancellationToken`] is shared by both listeners. Cancelling it
//! (on SIGINT/SIGTERM, or when the gRPC listener stops on its own) makes each
//! listener stop accepting, drain in-flight requests and return.

use tokio::signal;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Unconfigured,
    StoreOpening,
    Serving,
    ShuttingDown,
}

pub struct Lifecycle {
    phase: watch::Sender<Phase>,
    shutdown: CancellationToken,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::Unconfigured);
        Self {
            phase,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Moves to `next` if it lies ahead of the current phase. Returns whether
    /// the phase changed.
    pub fn advance(&self, next: Phase) -> bool {
        let changed = self.phase.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });

        if changed {
            tracing::info!(phase = ?next, "lifecycle transition");
        } else {
            tracing::debug!(phase = ?next, current = ?self.phase(), "ignored lifecycle transition");
        }
        changed
    }

    /// Token observed by both listener loops.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Enters [`Phase::ShuttingDown`] and cancels the shared token. Idempotent.
    pub fn begin_shutdown(&self) {
        self.advance(Phase::ShuttingDown);
        self.shutdown.cancel();
    }
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.phase(), Phase::Unconfigured);

        assert!(lifecycle.advance(Phase::StoreOpening));
        assert!(lifecycle.advance(Phase::Serving));
        assert!(!lifecycle.advance(Phase::StoreOpening));
        assert!(!lifecycle.advance(Phase::Serving));

        assert_eq!(lifecycle.phase(), Phase::Serving);
    }

    #[test]
    fn begin_shutdown_cancels_the_shared_token() {
        let lifecycle = Lifecycle::new();
        let http = lifecycle.shutdown_token();
        let rpc = lifecycle.shutdown_token();

        lifecycle.advance(Phase::Serving);
        lifecycle.begin_shutdown();
        lifecycle.begin_shutdown();

        assert!(http.is_cancelled());
        assert!(rpc.is_cancelled());
        assert_eq!(lifecycle.phase(), Phase::ShuttingDown);
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let lifecycle = Lifecycle::new();
        let mut rx = lifecycle.phase.subscribe();

        lifecycle.advance(Phase::StoreOpening);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Phase::StoreOpening);

        lifecycle.begin_shutdown();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Phase::ShuttingDown);
    }
}
