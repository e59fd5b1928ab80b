//! Unbounded FIFO of decoded events shared between the watcher and consumers.

use tokio::sync::{mpsc, Mutex};

use crate::stream::EventRecord;

/// Thread-safe, unbounded, insertion-ordered event buffer.
///
/// The watcher is the single producer; any number of tasks or threads may
/// consume. Share it behind an `Arc`.
#[derive(Debug)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<EventRecord>,
    rx: Mutex<mpsc::UnboundedReceiver<EventRecord>>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Append a record. Never blocks.
    pub fn push(&self, record: EventRecord) {
        // The receiver lives in `self`, so the channel cannot be closed here.
        let _ = self.tx.send(record);
    }

    /// Remove and return the oldest record, waiting until one is available.
    ///
    /// Concurrent callers are served one record each, in FIFO order.
    pub async fn pop(&self) -> EventRecord {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(record) => record,
            None => unreachable!("event queue owns its sender"),
        }
    }

    /// Blocking variant of [`pop`](Self::pop) for threads outside the runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    #[must_use]
    pub fn blocking_pop(&self) -> EventRecord {
        let mut rx = self.rx.blocking_lock();
        match rx.blocking_recv() {
            Some(record) => record,
            None => unreachable!("event queue owns its sender"),
        }
    }

    /// Remove and return the oldest record if one is ready.
    ///
    /// Returns `None` when the queue is empty or another consumer is
    /// currently waiting on it.
    #[must_use]
    pub fn try_pop(&self) -> Option<EventRecord> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }
}
