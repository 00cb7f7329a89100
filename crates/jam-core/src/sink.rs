//! Outbound event sinks.
//!
//! A jam host has two outlets: the musical channel (notes, control changes)
//! and the diagnostic channel (lifecycle notices, captured prints, errors).
//! [`EventSink`] abstracts both so the script host never knows where its
//! output ends up.

use crate::events::{format_atoms, Diagnostic, MusicalEvent, NoteFormat};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

/// Destination for everything a script emits.
///
/// Sinks are shared between the host and every clone of the script's `io`
/// object, hence `&self` and the `Send + Sync` bound.
pub trait EventSink: Send + Sync {
    /// Emit an event on the musical channel.
    fn emit(&self, event: MusicalEvent);

    /// Emit a message on the diagnostic channel.
    fn diagnostic(&self, diagnostic: Diagnostic);
}

/// Sink that forwards both channels over crossbeam channels.
#[derive(Clone)]
pub struct ChannelSink {
    events_tx: Sender<MusicalEvent>,
    diagnostics_tx: Sender<Diagnostic>,
}

impl ChannelSink {
    /// Create a sink plus the receiving ends of its two channels.
    pub fn new() -> (Self, Receiver<MusicalEvent>, Receiver<Diagnostic>) {
        let (events_tx, events_rx) = unbounded();
        let (diagnostics_tx, diagnostics_rx) = unbounded();
        (
            Self {
                events_tx,
                diagnostics_tx,
            },
            events_rx,
            diagnostics_rx,
        )
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: MusicalEvent) {
        if self.events_tx.send(event).is_err() {
            log::debug!("Musical channel closed, dropping event");
        }
    }

    fn diagnostic(&self, diagnostic: Diagnostic) {
        if self.diagnostics_tx.send(diagnostic).is_err() {
            log::debug!("Diagnostic channel closed, dropping message");
        }
    }
}

/// Sink that records everything in memory.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<MusicalEvent>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the musical events emitted so far.
    pub fn events(&self) -> Vec<MusicalEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Snapshot of the diagnostics emitted so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the error diagnostics, as messages.
    pub fn errors(&self) -> Vec<String> {
        self.diagnostics()
            .into_iter()
            .filter_map(|d| match d {
                Diagnostic::Error { message } => Some(message),
                Diagnostic::Info(_) => None,
            })
            .collect()
    }

    /// Drain recorded events and diagnostics.
    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: MusicalEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn diagnostic(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

/// Sink that writes both channels to the `log` facade.
pub struct LogSink {
    format: NoteFormat,
}

impl LogSink {
    pub fn new(format: NoteFormat) -> Self {
        Self { format }
    }
}

impl EventSink for LogSink {
    fn emit(&self, event: MusicalEvent) {
        log::info!("[msg] {}", format_atoms(&event.to_atoms(self.format)));
    }

    fn diagnostic(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::Info(text) => log::info!("[info] {}", text),
            Diagnostic::Error { message } => log::error!("[info] error {}", message),
        }
    }
}
