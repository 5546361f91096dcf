//! Per-session outbound queue
//!
//! Messages for a session are pushed onto a bounded channel while the
//! registry lock is held and written to the socket by that session's writer
//! task, so delivery never blocks the game and per-recipient order is kept.
//! A client that stops reading fills its queue; the next push fails and the
//! registry disconnects it like any other dead connection.

use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

use crate::game::constants::net::OUTBOX_CAPACITY;

/// Receiving half of an outbox, drained by the session's writer task
pub type Inbox = Receiver<String>;

/// Outbound delivery failed; the session should be dropped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("Connection closed")]
    Closed,
    #[error("Outbound queue full")]
    Full,
}

/// Sending half of a session's outbound queue
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: Sender<String>,
}

impl Outbox {
    /// Create an outbox and the inbox its writer task drains
    pub fn channel() -> (Self, Inbox) {
        Self::with_capacity(OUTBOX_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, Inbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue one line of text without waiting
    pub fn send(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.tx.try_send(text.into()).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
