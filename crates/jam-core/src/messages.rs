//! Inbound host messages.
//!
//! Every entry point of the scheduler is represented as a [`HostMessage`]
//! variant, so a host that runs the scheduler on its own thread can funnel
//! all calls through one queue.

use crate::events::Atom;

/// Messages a host delivers to the scheduler.
#[derive(Clone, Debug, PartialEq)]
pub enum HostMessage {
    /// Process one tick.
    Tick,

    /// Forward values to the program's `onMessage`. Empty lists are ignored.
    Message(Vec<Atom>),

    /// Load (or replace) the program.
    Load(String),

    /// Rewind the tick counter to zero.
    Reset,

    /// Set ticks per beat. Non-positive values are ignored.
    SetTicksPerBeat(f64),

    /// Set the tempo. Non-positive values are ignored.
    SetBeatsPerMinute(f64),

    /// Stop the scheduler thread.
    Shutdown,
}
