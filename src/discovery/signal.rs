//! "Index changed" notification.
//!
//! Each reconciliation pass that altered the index bumps a generation counter
//! on a `tokio::sync::watch` channel. Subscribers see at most one wake-up per
//! bump and re-read the index; no diff is carried.

use tokio::sync::watch;

/// Sending half, owned by the discovery engine.
#[derive(Debug)]
pub(crate) struct ChangeEmitter {
    tx: watch::Sender<u64>,
}

impl ChangeEmitter {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Signal one changed pass.
    pub(crate) fn emit(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }

    pub(crate) fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> IndexSubscription {
        IndexSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

/// Handle returned by `Discovery::subscribe`.
///
/// Dropping it unsubscribes.
#[derive(Debug, Clone)]
pub struct IndexSubscription {
    rx: watch::Receiver<u64>,
}

impl IndexSubscription {
    /// Wait for the next index change.
    ///
    /// Returns `false` once the discovery instance has been dropped.
    /// Several passes completing before this is polled collapse into one
    /// wake-up.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Generation last observed by this subscription.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.rx.borrow()
    }

    /// Whether a change happened that this subscription has not yet observed.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[test]
    fn test_emit_wakes_subscriber_once() {
        let emitter = ChangeEmitter::new();
        let mut sub = emitter.subscribe();

        {
            let mut changed = task::spawn(sub.changed());
            assert_pending!(changed.poll());

            emitter.emit();
            emitter.emit();
            assert!(changed.is_woken());
            assert_ready_eq!(changed.poll(), true);
        }

        assert_eq!(sub.generation(), 2);
        assert!(!sub.has_changed());
        assert_eq!(emitter.generation(), 2);
    }

    #[test]
    fn test_late_subscriber_starts_clean() {
        let emitter = ChangeEmitter::new();
        emitter.emit();

        let sub = emitter.subscribe();
        assert!(!sub.has_changed());
        assert_eq!(sub.generation(), 1);
    }

    #[tokio::test]
    async fn test_changed_false_after_emitter_dropped() {
        let emitter = ChangeEmitter::new();
        let mut sub = emitter.subscribe();
        drop(emitter);
        assert!(!sub.changed().await);
    }
}
