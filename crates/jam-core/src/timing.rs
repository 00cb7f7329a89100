//! Timing primitives for tick-driven scheduling.
//!
//! This module provides the clock model that every jam script observes:
//!
//! - [`ClockState`] - tick counter plus ticks-per-beat / beats-per-minute
//! - [`ClockState::on`] - interval quantization ("does this tick land on a boundary?")
//! - [`ClockState::dur`] - beat-fraction to tick-count conversion
//!
//! The clock never advances by itself. The host delivers ticks and the
//! [`ScriptHost`](crate::host::ScriptHost) calls [`ClockState::advance`] once
//! per processed tick.

use crate::error::{Error, Result};

/// Default number of ticks in one beat.
pub const DEFAULT_TICKS_PER_BEAT: f64 = 180.0;

/// Default tempo. Informational only; no algorithm in this crate reads it.
pub const DEFAULT_BEATS_PER_MINUTE: f64 = 100.0;

/// Default MIDI channel for emission calls that omit one.
pub const DEFAULT_CHANNEL: i64 = 1;

/// Tick counter and musical-time parameters.
///
/// `ticks_per_beat` and `beats_per_minute` are always positive: the setters
/// ignore anything else and report whether the value was applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ClockState {
    ticks_per_beat: f64,
    beats_per_minute: f64,
    tick_count: u64,
    channel_default: i64,
}

impl Default for ClockState {
    fn default() -> Self {
        Self {
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            beats_per_minute: DEFAULT_BEATS_PER_MINUTE,
            tick_count: 0,
            channel_default: DEFAULT_CHANNEL,
        }
    }
}

impl ClockState {
    /// Create a clock at tick 0.
    ///
    /// Non-positive values fall back to the defaults.
    pub fn new(ticks_per_beat: f64, beats_per_minute: f64) -> Self {
        let mut clock = Self::default();
        clock.set_ticks_per_beat(ticks_per_beat);
        clock.set_beats_per_minute(beats_per_minute);
        clock
    }

    /// Builder-style default channel override.
    pub fn with_channel_default(mut self, channel: i64) -> Self {
        self.channel_default = channel;
        self
    }

    pub fn ticks_per_beat(&self) -> f64 {
        self.ticks_per_beat
    }

    pub fn beats_per_minute(&self) -> f64 {
        self.beats_per_minute
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn channel_default(&self) -> i64 {
        self.channel_default
    }

    /// Set ticks per beat. Returns false (and leaves the clock untouched)
    /// for non-positive or non-finite values.
    pub fn set_ticks_per_beat(&mut self, value: f64) -> bool {
        if is_positive(value) {
            self.ticks_per_beat = value;
            true
        } else {
            false
        }
    }

    /// Set beats per minute. Same acceptance rule as [`Self::set_ticks_per_beat`].
    pub fn set_beats_per_minute(&mut self, value: f64) -> bool {
        if is_positive(value) {
            self.beats_per_minute = value;
            true
        } else {
            false
        }
    }

    /// Count one processed tick.
    pub fn advance(&mut self) {
        self.tick_count = self.tick_count.saturating_add(1);
    }

    /// Rewind to tick 0. Tempo parameters are kept.
    pub fn reset(&mut self) {
        self.tick_count = 0;
    }

    /// Integer divisor used for the derived beat counters.
    ///
    /// Floors `ticks_per_beat`, clamped to 1 so fractional rates below one
    /// tick per beat still count.
    fn whole_ticks_per_beat(&self) -> u64 {
        (self.ticks_per_beat.floor() as u64).max(1)
    }

    /// Index of the current beat (`tick_count div ticks_per_beat`).
    pub fn beat_index(&self) -> u64 {
        self.tick_count / self.whole_ticks_per_beat()
    }

    /// Position inside the current beat (`tick_count mod ticks_per_beat`).
    pub fn tick_in_beat(&self) -> u64 {
        self.tick_count % self.whole_ticks_per_beat()
    }

    /// Does the current tick land on an `interval`-beat boundary, shifted by
    /// `offset` beats?
    ///
    /// Mirrors the quantizer scripts were written against, including its
    /// mixed rounding: the offset and the interval count truncate toward
    /// zero while the interval start rounds half up. With fractional
    /// interval lengths some boundaries are therefore never reported
    /// (e.g. 100 tpb, 1/3 beat: hits at 0, 67, 100, but not 33).
    pub fn on(&self, interval: f64, offset: f64) -> Result<bool> {
        if !is_positive(interval) {
            return Err(Error::InvalidArgument {
                function: "on",
                message: format!("interval must be a positive number of beats, got {}", interval),
            });
        }
        if !offset.is_finite() {
            return Err(Error::InvalidArgument {
                function: "on",
                message: format!("offset must be finite, got {}", offset),
            });
        }

        let tc = (self.tick_count as i64).saturating_sub((offset * self.ticks_per_beat) as i64);
        if tc < 0 {
            return Ok(false);
        }

        let ticks_per_interval = self.ticks_per_beat * interval;
        let expected_intervals = (tc as f64 / ticks_per_interval) as i64;
        let interval_start_tick = (expected_intervals as f64 * ticks_per_interval + 0.5) as i64;

        Ok(tc == interval_start_tick)
    }

    /// Convert the beat fraction `a / b` into whole ticks (truncating).
    pub fn dur(&self, a: f64, b: f64) -> Result<i64> {
        if b == 0.0 {
            return Err(Error::DivisionByZero("dur"));
        }
        if !a.is_finite() || !b.is_finite() {
            return Err(Error::InvalidArgument {
                function: "dur",
                message: format!("arguments must be finite, got {} / {}", a, b),
            });
        }
        Ok(((self.ticks_per_beat * a) / b) as i64)
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
