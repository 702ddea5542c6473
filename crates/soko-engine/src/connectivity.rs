//! # Connectivity Monitor
//!
//! A `tokio::sync::watch` channel carrying the online/offline flag.
//!
//! The presentation layer (or an OS network probe) feeds transitions in via
//! [`ConnectivityMonitor::set_online`]; the commit pipeline samples the
//! current value to pick its persistence branch, and the sync agent
//! subscribes and sweeps the outbox on every offline→online transition.

use tokio::sync::watch;
use tracing::info;

/// Shared online/offline state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        ConnectivityMonitor { tx }
    }

    /// Returns the current connectivity state.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Records a connectivity change. No-op (and no event) when the state
    /// hasn't actually changed, so subscribers only wake on transitions.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });

        if changed {
            info!(online, "Connectivity changed");
        }
    }

    /// Subscribes to connectivity transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        ConnectivityMonitor::new(true)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state_and_toggle() {
        let monitor = ConnectivityMonitor::new(false);
        assert!(!monitor.is_online());

        monitor.set_online(true);
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_subscribers_wake_only_on_transitions() {
        let monitor = ConnectivityMonitor::new(false);
        let mut rx = monitor.subscribe();

        // Setting the same state produces no event
        monitor.set_online(false);
        assert!(!rx.has_changed().unwrap());

        monitor.set_online(true);
        assert!(rx.has_changed().unwrap());
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }
}
