//! Cooperative cancellation for audit batches.
//!
//! The router races the strategy fan-out against [`CancellationToken::cancelled`],
//! and strategies race their network calls against it.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation token. All clones observe the same flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Create a new token (not cancelled).
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns once the flag is set.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
