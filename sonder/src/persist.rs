//! Fire-and-forget storage writer
//!
//! Writes are queued on an unbounded channel and drained by one task, which
//! runs each `KeyValueStore::set` on the blocking pool. Submission order is
//! write order. Failures are logged and dropped.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::interface::KeyValueStore;

enum Command {
    Write { key: String, value: String },
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task. Cloning shares the same queue.
#[derive(Clone)]
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<Command>,
}

impl PersistQueue {
    /// Spawn the writer on `handle`. The task exits once every clone is dropped
    /// and the queue is drained.
    pub fn spawn(store: Arc<dyn KeyValueStore>, handle: &Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(drain(store, rx));
        Self { tx }
    }

    pub fn submit(&self, key: String, value: String) {
        if self.tx.send(Command::Write { key, value }).is_err() {
            warn!("Storage writer has stopped; dropping write");
        }
    }

    /// Resolves once every write submitted before this call has completed
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

async fn drain(store: Arc<dyn KeyValueStore>, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Write { key, value } => {
                let store = Arc::clone(&store);
                let log_key = key.clone();
                match tokio::task::spawn_blocking(move || store.set(key, value)).await {
                    Ok(Ok(())) => debug!(key = %log_key, "persisted"),
                    Ok(Err(e)) => warn!("Failed to persist {}: {}", log_key, e),
                    Err(e) => warn!("Storage write task for {} aborted: {}", log_key, e),
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("storage writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryKeyValueStore;
    use crate::interface::SonderError;
    use parking_lot::Mutex;

    struct RecordingStore {
        fail_on: Option<String>,
        writes: Mutex<Vec<(String, String)>>,
    }

    impl KeyValueStore for RecordingStore {
        fn get(&self, _key: String) -> Result<Option<String>, SonderError> {
            Ok(None)
        }

        fn set(&self, key: String, value: String) -> Result<(), SonderError> {
            if self.fail_on.as_deref() == Some(value.as_str()) {
                return Err(SonderError::Storage("disk full".to_string()));
            }
            self.writes.lock().push((key, value));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let queue = PersistQueue::spawn(store.clone(), &Handle::current());
        for i in 0..50 {
            queue.submit("k".to_string(), i.to_string());
        }
        queue.flush().await;
        assert_eq!(store.get("k".to_string()).unwrap().as_deref(), Some("49"));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_queue() {
        let store = Arc::new(RecordingStore {
            fail_on: Some("bad".to_string()),
            writes: Mutex::new(Vec::new()),
        });
        let queue = PersistQueue::spawn(store.clone(), &Handle::current());
        queue.submit("k".to_string(), "one".to_string());
        queue.submit("k".to_string(), "bad".to_string());
        queue.submit("k".to_string(), "two".to_string());
        queue.flush().await;

        let values: Vec<String> = store.writes.lock().iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(values, vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn test_clones_share_one_queue() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let queue = PersistQueue::spawn(store.clone(), &Handle::current());
        let other = queue.clone();
        queue.submit("k".to_string(), "first".to_string());
        other.submit("k".to_string(), "second".to_string());
        queue.flush().await;
        assert_eq!(store.get("k".to_string()).unwrap().as_deref(), Some("second"));
    }
}
