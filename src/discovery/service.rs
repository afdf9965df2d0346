//! Event loop and teardown.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::engine::Discovery;
use super::policy::PathPolicy;
use crate::watcher::ChangeEvent;

impl<P: PathPolicy> Discovery<P> {
    /// Consume change events until shutdown or until the sender is dropped.
    ///
    /// Events that are already queued when one arrives are folded into the
    /// same reconciliation pass.
    pub async fn run(&self, mut events: mpsc::Receiver<ChangeEvent>) {
        tracing::info!("Discovery event loop started");

        loop {
            let event = tokio::select! {
                () = self.inner.shutdown.cancelled() => break,
                event = events.recv() => event,
            };
            let Some(event) = event else {
                tracing::info!("Change channel closed, stopping event loop");
                break;
            };

            let mut rewatch = self.absorb(event);
            while let Ok(more) = events.try_recv() {
                rewatch |= self.absorb(more);
            }

            if rewatch {
                if let Err(e) = self.register_watches() {
                    tracing::error!(error = %e, "Failed to re-register watches");
                }
            }

            if let Err(e) = self.reconcile().await {
                tracing::error!(error = %e, "Reconciliation pass reported an error");
            }
        }

        tracing::info!("Discovery event loop stopped");
    }

    /// Spawn [`Discovery::run`] on the current runtime.
    pub fn spawn(&self, events: mpsc::Receiver<ChangeEvent>) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.run(events).await })
    }

    /// Stop the event loop, drop all watches and refuse further passes.
    ///
    /// A pass already in flight runs to completion.
    pub fn shutdown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();

        if let Err(e) = self.inner.watches.lock().clear_all() {
            tracing::warn!(error = %e, "Failed to clear watches on shutdown");
        }
        tracing::info!(tracked = self.tracked_len(), "Discovery shut down");
    }

    /// Whether [`Discovery::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Queue an event's paths. Returns `true` if watches must be rebuilt.
    fn absorb(&self, event: ChangeEvent) -> bool {
        match event {
            ChangeEvent::PathsChanged(paths) => {
                tracing::debug!(paths = paths.len(), "Paths changed");
                // A root that was deleted or recreated lost its recursive watch.
                let touches_root = {
                    let roots = self.inner.roots.read();
                    paths.iter().any(|p| roots.contains(p))
                };
                self.inner.pending.extend(paths);
                touches_root
            }
            ChangeEvent::RootsChanged { added, removed } => {
                self.apply_root_change(added, removed);
                true
            }
        }
    }
}
