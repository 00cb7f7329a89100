//! Jam Core - a tick-driven script scheduler.
//!
//! A host (a patcher object, a sequencer, a test) delivers ticks to a
//! [`ScriptHost`]. The host runs one user program written in Rhai, calls its
//! `tick` callback once per tick, and forwards whatever the program plays to
//! an [`EventSink`]:
//!
//! - **Timing** - [`ClockState`] and the beat quantization helpers `on`/`dur`
//! - **API** - the `io` capability object handed to every callback
//! - **Host** - program loading and the tick/message/reset lifecycle
//! - **Runtime** - [`Scheduler`], the host moved onto its own thread
//! - **Sinks** - where notes, control changes and diagnostics go
//! - **Validation** - offline checks for programs
//!
//! # Architecture
//!
//! All inbound calls can be expressed as [`HostMessage`]s. Hosts that tick
//! from one thread call [`ScriptHost`] directly; hosts with several threads
//! go through a [`SchedulerHandle`], which serializes calls on the
//! scheduler thread.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod loader;
pub mod messages;
pub mod runtime;
pub mod sink;
pub mod timing;
pub mod validation;

pub use api::Io;
pub use config::{Features, JamConfig};
pub use error::{Error, Result};
pub use events::{format_atoms, Atom, Diagnostic, MusicalEvent, NoteFormat};
pub use host::ScriptHost;
pub use loader::{FileLoader, MemoryLoader, ScriptLoader, ScriptSource};
pub use messages::HostMessage;
pub use runtime::{Scheduler, SchedulerHandle};
pub use sink::{ChannelSink, EventSink, LogSink, MemorySink};
pub use timing::ClockState;
pub use validation::{validate_script, ValidationError, ValidationResult};

/// Crate version, reported by `jam version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
