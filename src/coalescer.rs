//! Per-key debounce for bursty continuous controllers
//!
//! A motorized fader or a fast knob turn sends dozens of messages per second.
//! Instead of running the bound command for each one, the first message of a
//! burst opens a window; messages arriving inside it only replace the pending
//! value, and when the window closes the command runs once with the latest
//! value. The window is anchored to the first message and is never extended,
//! so a continuous stream still fires once per window.
//!
//! Each key has its own timer task. Pending values live in a [`DashMap`], so
//! the read loop can update one key while the timer of another fires.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::binding::MessageKey;

/// Called with the key and the last value seen when a window closes
pub type FlushCallback = Arc<dyn Fn(MessageKey, i32) + Send + Sync>;

/// Debounce coalescer. Cheap to clone; clones share pending state.
#[derive(Clone)]
pub struct Coalescer {
    window: Duration,
    pending: Arc<DashMap<MessageKey, i32>>,
    on_flush: FlushCallback,
}

impl Coalescer {
    /// Create a coalescer. Must be used from within a Tokio runtime.
    pub fn new(window: Duration, on_flush: FlushCallback) -> Self {
        Self {
            window,
            pending: Arc::new(DashMap::new()),
            on_flush,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a value for `key`.
    ///
    /// Returns `true` when this value opened a new window, `false` when it
    /// replaced the value of a window that is already running.
    pub fn submit(&self, key: MessageKey, value: i32) -> bool {
        match self.pending.entry(key) {
            Entry::Occupied(mut entry) => {
                trace!("{} coalesced (value {})", key, value);
                entry.insert(value);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
                self.start_timer(key);
                true
            }
        }
    }

    /// Number of keys with a window currently open
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn start_timer(&self, key: MessageKey) {
        let window = self.window;
        let pending = Arc::clone(&self.pending);
        let on_flush = Arc::clone(&self.on_flush);

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // Removing the entry closes the window; a later message opens a new one
            if let Some((key, value)) = pending.remove(&key) {
                on_flush(key, value);
            }
        });
    }
}

impl std::fmt::Debug for Coalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coalescer")
            .field("window", &self.window)
            .field("pending", &self.pending.len())
            .finish()
    }
}
