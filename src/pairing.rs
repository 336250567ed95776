//! The current pairing code, held in a single-slot cell for the lifetime of
//! the process.
//!
//! The transport loop writes a new code each time the chat session issues
//! one; the `/qr` endpoint reads whatever is current. There is no further
//! lifecycle: the slot starts empty and is only ever overwritten.

use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct PairingSlot {
    code: Arc<RwLock<Option<String>>>,
}

impl PairingSlot {
    /// Replaces the current pairing code.
    pub async fn set(&self, code: impl Into<String>) {
        *self.code.write().await = Some(code.into());
    }

    /// The most recently issued pairing code, if any.
    pub async fn current(&self) -> Option<String> {
        self.code.read().await.clone()
    }
}
