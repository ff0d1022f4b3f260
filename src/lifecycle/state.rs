//! Server lifecycle state machine.
//!
//! ```text
//! Starting ──(listener bound)──▶ Serving ──(drain)──▶ Draining ──▶ Stopped
//!     │                             │
//!     └──(bind failed / drained     └──(listener failed)──▶ Stopped
//!         before serving)──▶ Stopped
//! ```
//!
//! Transitions are compare-and-set on a watch channel, so concurrent callers
//! agree on a single winner and observers can await a particular phase.

use std::fmt;
use tokio::sync::watch;

/// Phase of a server instance's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Created, listener not bound yet.
    Starting,
    /// Listener bound and accepting connections.
    Serving,
    /// No longer accepting; in-flight connections are finishing.
    Draining,
    /// Terminal. Listener released.
    Stopped,
}

impl LifecycleState {
    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Starting, Serving)
                | (Starting, Stopped)
                | (Serving, Draining)
                | (Serving, Stopped)
                | (Draining, Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Stopped
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Serving => "serving",
            LifecycleState::Draining => "draining",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared, atomically updated lifecycle state.
#[derive(Debug)]
pub struct StateCell {
    tx: watch::Sender<LifecycleState>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Starting);
        Self { tx }
    }

    /// Current state.
    pub fn get(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Move from `from` to `to` if the cell currently holds `from`.
    ///
    /// On failure the state is left untouched and the value actually observed
    /// is returned.
    pub fn transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), LifecycleState> {
        debug_assert!(from.can_transition_to(to), "illegal transition {from} -> {to}");

        let mut observed = from;
        let changed = self.tx.send_if_modified(|current| {
            observed = *current;
            if *current == from {
                *current = to;
                true
            } else {
                false
            }
        });

        if changed {
            tracing::debug!(from = %from, to = %to, "Lifecycle transition");
            Ok(())
        } else {
            Err(observed)
        }
    }

    /// Wait until the state equals `target` or has moved past it.
    pub async fn wait_for(&self, target: LifecycleState) -> LifecycleState {
        let mut rx = self.tx.subscribe();
        let reached = rx
            .wait_for(|state| *state == target || state.is_terminal())
            .await
            .map(|state| *state);
        // The sender lives as long as `self`, so the channel cannot close here.
        reached.unwrap_or(LifecycleState::Stopped)
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
