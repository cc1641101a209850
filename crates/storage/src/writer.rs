//! Fire-and-forget document writes applied in strict FIFO order.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::document_store::DocumentStore;
use crate::record::DocumentPatch;

enum WriterMessage {
    Save {
        patch: Box<DocumentPatch>,
        done: Option<oneshot::Sender<bool>>,
    },
    Clear(oneshot::Sender<()>),
    Flush(oneshot::Sender<()>),
}

/// Handle to a background task that saves snapshots one at a time.
///
/// Snapshots are applied in the order they were enqueued and never
/// concurrently, so the last enqueued snapshot is the one that ends up
/// stored. Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct DocumentWriter {
    tx: mpsc::UnboundedSender<WriterMessage>,
}

impl DocumentWriter {
    #[must_use]
    pub fn spawn(store: Arc<DocumentStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    WriterMessage::Save { patch, done } => {
                        let saved = store.save(*patch).await;
                        if let Some(done) = done {
                            let _ = done.send(saved);
                        }
                    }
                    WriterMessage::Clear(done) => {
                        store.clear().await;
                        let _ = done.send(());
                    }
                    WriterMessage::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("document writer stopped");
        });
        Self { tx }
    }

    /// Queue `patch` for saving without waiting for it.
    pub fn enqueue(&self, patch: DocumentPatch) {
        let message = WriterMessage::Save {
            patch: Box::new(patch),
            done: None,
        };
        if self.tx.send(message).is_err() {
            error!("document writer has stopped, dropping snapshot");
        }
    }

    /// Queue `patch` now; the returned future resolves to whether it was
    /// stored once the writer reaches it.
    pub fn enqueue_acked(
        &self,
        patch: DocumentPatch,
    ) -> impl Future<Output = bool> + Send + use<> {
        let (done, wait) = oneshot::channel();
        let message = WriterMessage::Save {
            patch: Box::new(patch),
            done: Some(done),
        };
        let queued = self.tx.send(message).is_ok();
        if !queued {
            error!("document writer has stopped, dropping snapshot");
        }
        async move { queued && wait.await.unwrap_or(false) }
    }

    /// Queue removal of the main document behind every earlier snapshot; the
    /// returned future resolves once it has run.
    pub fn enqueue_clear(&self) -> impl Future<Output = ()> + Send + use<> {
        let (done, wait) = oneshot::channel();
        let queued = self.tx.send(WriterMessage::Clear(done)).is_ok();
        if !queued {
            error!("document writer has stopped, not clearing storage");
        }
        async move {
            if queued {
                let _ = wait.await;
            }
        }
    }

    /// Wait until every snapshot queued before this call has been saved.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(WriterMessage::Flush(done)).is_err() {
            return;
        }
        let _ = wait.await;
    }
}
