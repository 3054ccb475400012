//! Message dispatch
//!
//! Turns incoming MIDI messages into command executions:
//! normalize → look up binding → (coalesce) → execute with `MIDI_VALUE` set.
//! Per-message conditions (unsupported type, unbound key, failing command)
//! are logged and never stop the read loop.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::binding::{message_value, normalize, BindingTable, MessageKey};
use crate::coalescer::{Coalescer, FlushCallback};
use crate::config::Config;
use crate::executor::{CommandExecutor, VALUE_VAR};
use crate::midi::MidiMessage;


/// What happened to a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Message type is not routed (note on, clock, ...)
    Unsupported,
    /// No binding for this key
    Unbound,
    /// Command launched immediately
    Executed,
    /// First message of a burst, command runs when the window closes
    Scheduled,
    /// Folded into an already open window
    Coalesced,
}

struct Bindings {
    table: BindingTable,
    executor: Arc<dyn CommandExecutor>,
}

impl Bindings {
    fn fire(&self, key: MessageKey, value: i32) {
        let Some(command) = self.table.get(&key) else {
            return;
        };
        debug!("{} → {} ({}={})", key, command, VALUE_VAR, value);
        let env = HashMap::from([(VALUE_VAR.to_string(), value.to_string())]);
        self.executor.execute(command, &env);
    }
}

/// Routes messages to their bound commands. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    bindings: Arc<Bindings>,
    coalescer: Option<Coalescer>,
}

impl Dispatcher {
    /// Dispatcher that executes every bound message immediately
    pub fn new(table: BindingTable, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            bindings: Arc::new(Bindings { table, executor }),
            coalescer: None,
        }
    }

    /// Coalesce bursts per key over `window`. A zero window disables coalescing.
    ///
    /// With a window set, [`handle`](Self::handle) must run inside a Tokio runtime.
    pub fn with_accumulate_window(mut self, window: Duration) -> Self {
        if window.is_zero() {
            self.coalescer = None;
            return self;
        }
        let bindings = Arc::clone(&self.bindings);
        let on_flush: FlushCallback = Arc::new(move |key, value| bindings.fire(key, value));
        self.coalescer = Some(Coalescer::new(window, on_flush));
        self
    }

    /// Dispatcher for a loaded configuration, coalescing over its window
    pub fn from_config(config: &Config, executor: Arc<dyn CommandExecutor>) -> Self {
        Self::new(config.bindings.clone(), executor)
            .with_accumulate_window(config.accumulate_window())
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings.table
    }

    /// Handle one incoming message
    pub fn handle(&self, message: &MidiMessage) -> Dispatch {
        let key = match normalize(message) {
            Ok(key) => key,
            Err(unsupported) => {
                trace!("Ignoring message: {}", unsupported);
                return Dispatch::Unsupported;
            }
        };

        if self.bindings.table.get(&key).is_none() {
            trace!("No binding for {}", key);
            return Dispatch::Unbound;
        }

        let Some(value) = message_value(message) else {
            return Dispatch::Unsupported;
        };

        match &self.coalescer {
            Some(coalescer) => {
                if coalescer.submit(key, value) {
                    Dispatch::Scheduled
                } else {
                    Dispatch::Coalesced
                }
            }
            None => {
                self.bindings.fire(key, value);
                Dispatch::Executed
            }
        }
    }

    /// Consume messages until the stream closes or `shutdown` resolves.
    ///
    /// Returns the number of messages handled. Windows still open at
    /// shutdown are dropped with the runtime.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<MidiMessage>,
        shutdown: impl Future<Output = ()>,
    ) -> u64 {
        tokio::pin!(shutdown);
        let mut handled = 0u64;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(message) => {
                        self.handle(&message);
                        handled += 1;
                    }
                    None => {
                        info!("Input stream closed");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping dispatch");
                    break;
                }
            }
        }

        handled
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bindings", &self.bindings.table.len())
            .field("coalescer", &self.coalescer)
            .finish()
    }
}
