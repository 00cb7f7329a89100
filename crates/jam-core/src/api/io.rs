//! The `io` capability object.
//!
//! Every callback receives `io` as its argument. It is a live view of the
//! scheduler clock plus the primitives a script may use:
//!
//! ```rhai
//! jam.tick = |io| {
//!     if io.on(0.5) {
//!         io.playNote(60, 100, io.dur(1, 4));
//!     }
//!     if io.on(4.0, 0.5) {
//!         io.sendCC(7, 64);
//!     }
//! };
//! ```
//!
//! All clones of an `Io` share one view, so a script that stores `io` in its
//! program map still sees the current tick on later calls.

use crate::config::Features;
use crate::error::Error;
use crate::events::MusicalEvent;
use crate::sink::EventSink;
use crate::timing::ClockState;
use rhai::{Dynamic, Engine, EvalAltResult, FLOAT, INT};
use std::sync::{Arc, Mutex, PoisonError};

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Script-visible view of the clock plus bound emission primitives.
#[derive(Clone)]
pub struct Io {
    view: Arc<Mutex<ClockState>>,
    sink: Arc<dyn EventSink>,
}

impl Io {
    /// Build a fresh capability object from the current clock.
    pub fn new(clock: &ClockState, sink: Arc<dyn EventSink>) -> Self {
        Self {
            view: Arc::new(Mutex::new(clock.clone())),
            sink,
        }
    }

    fn with_view<R>(&self, f: impl FnOnce(&mut ClockState) -> R) -> R {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut view)
    }

    /// Copy the clock into the view before a callback runs.
    pub fn refresh(&self, clock: &ClockState) {
        self.with_view(|view| *view = clock.clone());
    }

    /// Push a new ticks-per-beat value into the live view.
    pub fn set_ticks_per_beat(&self, value: f64) {
        self.with_view(|view| view.set_ticks_per_beat(value));
    }

    /// Push a new tempo into the live view.
    pub fn set_beats_per_minute(&self, value: f64) {
        self.with_view(|view| view.set_beats_per_minute(value));
    }

    /// Copy of the clock as the script currently sees it.
    pub fn snapshot(&self) -> ClockState {
        self.with_view(|view| view.clone())
    }

    pub fn play_note(&self, note: i64, velocity: i64, duration: i64, channel: Option<i64>) {
        let channel = channel.unwrap_or_else(|| self.with_view(|view| view.channel_default()));
        self.sink.emit(MusicalEvent::Note {
            note,
            velocity,
            duration,
            channel,
        });
    }

    pub fn send_cc(&self, controller: i64, value: i64, channel: Option<i64>) {
        let channel = channel.unwrap_or_else(|| self.with_view(|view| view.channel_default()));
        self.sink.emit(MusicalEvent::ControlChange {
            controller,
            value,
            channel,
        });
    }

    // Script-facing wrappers

    fn on(&self, interval: &Dynamic, offset: &Dynamic) -> RhaiResult<bool> {
        let interval = number_arg("on", 1, interval, 1.0)?;
        let offset = number_arg("on", 2, offset, 0.0)?;
        Ok(self.with_view(|view| view.on(interval, offset))?)
    }

    fn dur(&self, a: &Dynamic, b: &Dynamic) -> RhaiResult<INT> {
        let a = number_arg("dur", 1, a, 1.0)?;
        let b = number_arg("dur", 2, b, 1.0)?;
        Ok(self.with_view(|view| view.dur(a, b))?)
    }

    fn play_note_args(&self, args: [&Dynamic; 4]) -> RhaiResult<()> {
        let [note, velocity, duration, channel] = args;
        let note = integer_arg("playNote", 1, note)?;
        let velocity = integer_arg("playNote", 2, velocity)?;
        let duration = integer_arg("playNote", 3, duration)?;
        let channel = optional_integer_arg("playNote", 4, channel)?;
        self.play_note(note, velocity, duration, channel);
        Ok(())
    }

    fn send_cc_args(&self, args: [&Dynamic; 3]) -> RhaiResult<()> {
        let [controller, value, channel] = args;
        let controller = integer_arg("sendCC", 1, controller)?;
        let value = integer_arg("sendCC", 2, value)?;
        let channel = optional_integer_arg("sendCC", 3, channel)?;
        self.send_cc(controller, value, channel);
        Ok(())
    }
}

/// Optional numeric argument: `()` means "use the default".
fn number_arg(
    function: &'static str,
    position: usize,
    value: &Dynamic,
    default: f64,
) -> Result<f64, Error> {
    if value.is_unit() {
        Ok(default)
    } else if let Ok(v) = value.as_int() {
        Ok(v as f64)
    } else if let Ok(v) = value.as_float() {
        Ok(v)
    } else {
        Err(Error::Argument {
            function,
            position,
            message: format!("number expected, got {}", value.type_name()),
        })
    }
}

/// Mandatory integer argument. Floats with an exact integer value are accepted.
fn integer_arg(function: &'static str, position: usize, value: &Dynamic) -> Result<i64, Error> {
    if value.is_unit() {
        return Err(Error::Argument {
            function,
            position,
            message: "integer expected, got no value".to_string(),
        });
    }
    if let Ok(v) = value.as_int() {
        return Ok(v);
    }
    if let Ok(v) = value.as_float() {
        if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
            return Ok(v as i64);
        }
        return Err(Error::Argument {
            function,
            position,
            message: format!("number has no integer representation: {}", v),
        });
    }
    Err(Error::Argument {
        function,
        position,
        message: format!("integer expected, got {}", value.type_name()),
    })
}

fn optional_integer_arg(
    function: &'static str,
    position: usize,
    value: &Dynamic,
) -> Result<Option<i64>, Error> {
    if value.is_unit() {
        Ok(None)
    } else {
        integer_arg(function, position, value).map(Some)
    }
}

/// Register the `Io` type, its properties and its methods.
pub fn register(engine: &mut Engine, features: Features) {
    engine.register_type_with_name::<Io>("Io");

    // Properties
    engine.register_get("tpb", |io: &mut Io| -> FLOAT { io.with_view(|v| v.ticks_per_beat()) });
    engine.register_get("bpm", |io: &mut Io| -> FLOAT { io.with_view(|v| v.beats_per_minute()) });
    engine.register_get("tc", |io: &mut Io| io.with_view(|v| v.tick_count()) as INT);
    engine.register_get("ch", |io: &mut Io| io.with_view(|v| v.channel_default()) as INT);
    if features.expose_beat_counters {
        engine.register_get("beat_count", |io: &mut Io| io.with_view(|v| v.beat_index()) as INT);
        engine.register_get("tick_count", |io: &mut Io| io.with_view(|v| v.tick_in_beat()) as INT);
    }

    // Timing queries: io.on(), io.on(interval), io.on(interval, offset)
    engine.register_fn("on", |io: &mut Io| io.on(&Dynamic::UNIT, &Dynamic::UNIT));
    engine.register_fn("on", |io: &mut Io, interval: Dynamic| io.on(&interval, &Dynamic::UNIT));
    engine.register_fn("on", |io: &mut Io, interval: Dynamic, offset: Dynamic| {
        io.on(&interval, &offset)
    });

    engine.register_fn("dur", |io: &mut Io| io.dur(&Dynamic::UNIT, &Dynamic::UNIT));
    engine.register_fn("dur", |io: &mut Io, a: Dynamic| io.dur(&a, &Dynamic::UNIT));
    engine.register_fn("dur", |io: &mut Io, a: Dynamic, b: Dynamic| io.dur(&a, &b));

    // Emission. Short arities are registered so a missing argument reports
    // which one is missing instead of "function not found".
    engine.register_fn("playNote", |io: &mut Io| {
        io.play_note_args([&Dynamic::UNIT, &Dynamic::UNIT, &Dynamic::UNIT, &Dynamic::UNIT])
    });
    engine.register_fn("playNote", |io: &mut Io, note: Dynamic| {
        io.play_note_args([&note, &Dynamic::UNIT, &Dynamic::UNIT, &Dynamic::UNIT])
    });
    engine.register_fn("playNote", |io: &mut Io, note: Dynamic, velocity: Dynamic| {
        io.play_note_args([&note, &velocity, &Dynamic::UNIT, &Dynamic::UNIT])
    });
    engine.register_fn(
        "playNote",
        |io: &mut Io, note: Dynamic, velocity: Dynamic, duration: Dynamic| {
            io.play_note_args([&note, &velocity, &duration, &Dynamic::UNIT])
        },
    );
    engine.register_fn(
        "playNote",
        |io: &mut Io, note: Dynamic, velocity: Dynamic, duration: Dynamic, channel: Dynamic| {
            io.play_note_args([&note, &velocity, &duration, &channel])
        },
    );

    if features.enable_cc {
        engine.register_fn("sendCC", |io: &mut Io| {
            io.send_cc_args([&Dynamic::UNIT, &Dynamic::UNIT, &Dynamic::UNIT])
        });
        engine.register_fn("sendCC", |io: &mut Io, controller: Dynamic| {
            io.send_cc_args([&controller, &Dynamic::UNIT, &Dynamic::UNIT])
        });
        engine.register_fn("sendCC", |io: &mut Io, controller: Dynamic, value: Dynamic| {
            io.send_cc_args([&controller, &value, &Dynamic::UNIT])
        });
        engine.register_fn(
            "sendCC",
            |io: &mut Io, controller: Dynamic, value: Dynamic, channel: Dynamic| {
                io.send_cc_args([&controller, &value, &channel])
            },
        );
    }
}
