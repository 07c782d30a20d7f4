//! Debounced layout writer
//!
//! Layout mutations arrive in bursts (a drag touches several groups). The
//! writer keeps only the newest layout and stores it once the burst has been
//! quiet for `delay`. Dropping the handle or calling `shutdown` flushes the
//! pending layout.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::LayoutError;
use crate::persistence::LayoutPersistence;
use crate::snapshot::PersistedLayout;
use crate::Result;

pub struct DebouncedPersistence<P> {
    inner: Arc<P>,
    pending: watch::Sender<Option<PersistedLayout>>,
    task: JoinHandle<()>,
}

impl<P: LayoutPersistence + 'static> DebouncedPersistence<P> {
    /// Start the writer task. Must be called from within a tokio runtime.
    pub fn spawn(inner: P, delay: Duration) -> Self {
        let inner = Arc::new(inner);
        let (pending, rx) = watch::channel(None);
        let task = tokio::spawn(run_writer(Arc::clone(&inner), rx, delay));

        Self {
            inner,
            pending,
            task,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Stop accepting layouts and wait for the last one to be written
    pub async fn shutdown(self) {
        let Self { pending, task, .. } = self;
        drop(pending);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Layout writer task failed");
        }
    }
}

impl<P: LayoutPersistence + 'static> LayoutPersistence for DebouncedPersistence<P> {
    fn load(&self) -> Result<Option<PersistedLayout>> {
        self.inner.load()
    }

    fn store(&self, layout: &PersistedLayout) -> Result<()> {
        self.pending
            .send(Some(layout.clone()))
            .map_err(|_| LayoutError::WriterClosed)
    }
}

async fn run_writer<P: LayoutPersistence + 'static>(
    inner: Arc<P>,
    mut rx: watch::Receiver<Option<PersistedLayout>>,
    delay: Duration,
) {
    // Exits once the sender is gone and nothing is pending
    while rx.changed().await.is_ok() {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let Some(layout) = rx.borrow_and_update().clone() else {
            continue;
        };

        let writer = Arc::clone(&inner);
        let groups = layout.groups.len();
        match tokio::task::spawn_blocking(move || writer.store(&layout)).await {
            Ok(Ok(())) => tracing::debug!(groups, "Layout written"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to write layout"),
            Err(e) => tracing::warn!(error = %e, "Layout write panicked"),
        }
    }

    tracing::debug!("Layout writer stopped");
}
