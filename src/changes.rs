//! Change notification.
//!
//! Subscribers receive one [`LogChange`] per effective write, over a bounded
//! channel. The store never blocks on a subscriber: one that falls behind
//! far enough to fill its channel is dropped from the fan-out.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use serde::{Deserialize, Serialize};

use crate::error::{FactGraphError, FactGraphResult};
use crate::fact::RecordId;

/// One effective write, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogChange {
    /// Log version after the write.
    pub version: u64,
    /// Mutation kind (`add`, `replace`, `retract`, `retract_by_id`, `batch`).
    pub kind: String,
    pub added: Vec<RecordId>,
    pub removed: Vec<RecordId>,
}

/// A subscription stream of log changes.
///
/// Dropping the stream disconnects it; the store notices on its next write.
#[derive(Debug)]
pub struct ChangeStream {
    rx: Receiver<LogChange>,
}

impl ChangeStream {
    /// Receive the next change (blocking).
    pub fn recv(&self) -> FactGraphResult<LogChange> {
        self.rx.recv().map_err(|_| FactGraphError::Disconnected {
            path: "change_stream".to_string(),
        })
    }

    /// Receive the next change with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> FactGraphResult<LogChange> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => FactGraphError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            RecvTimeoutError::Disconnected => FactGraphError::Disconnected {
                path: "change_stream".to_string(),
            },
        })
    }

    /// Receive a pending change without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<LogChange> {
        match self.rx.try_recv() {
            Ok(change) => Some(change),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Drain every pending change.
    #[must_use]
    pub fn drain(&self) -> Vec<LogChange> {
        self.rx.try_iter().collect()
    }
}

/// Fan-out side owned by the store.
#[derive(Debug, Default)]
pub(crate) struct ChangeHub {
    subscribers: Mutex<Vec<Sender<LogChange>>>,
}

impl ChangeHub {
    pub(crate) fn subscribe(&self, capacity: usize) -> ChangeStream {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        ChangeStream { rx }
    }

    pub(crate) fn publish(&self, change: &LogChange) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| match tx.try_send(change.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    version = change.version,
                    "change subscriber fell behind; dropping it"
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
