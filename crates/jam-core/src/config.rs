//! Construction-time configuration.
//!
//! Configuration is TOML; every field is optional:
//!
//! ```toml
//! ticks_per_beat = 180
//! beats_per_minute = 100
//! channel_default = 1
//! note_format = "tagged"
//! search_paths = [".", "./lib"]
//!
//! [features]
//! enable_messages = true
//! enable_cc = true
//! enable_print_capture = true
//! expose_beat_counters = true
//! ```

use crate::error::{Error, Result};
use crate::events::NoteFormat;
use crate::timing::{DEFAULT_BEATS_PER_MINUTE, DEFAULT_CHANNEL, DEFAULT_TICKS_PER_BEAT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Script file extension tried when an identifier has none.
pub const DEFAULT_SCRIPT_EXTENSION: &str = "rhai";

/// Optional host capabilities.
///
/// The minimal variant only has `playNote`, `on` and `dur`; the full variant
/// adds message dispatch, control changes, print capture and beat counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// Forward inbound messages to `onMessage`.
    pub enable_messages: bool,
    /// Register `io.sendCC`.
    pub enable_cc: bool,
    /// Route script `print` to the diagnostic channel.
    pub enable_print_capture: bool,
    /// Expose `io.beat_count` and `io.tick_count`.
    pub expose_beat_counters: bool,
}

impl Features {
    pub fn full() -> Self {
        Self {
            enable_messages: true,
            enable_cc: true,
            enable_print_capture: true,
            expose_beat_counters: true,
        }
    }

    pub fn minimal() -> Self {
        Self {
            enable_messages: false,
            enable_cc: false,
            enable_print_capture: false,
            expose_beat_counters: false,
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::full()
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JamConfig {
    /// Initial ticks per beat
    pub ticks_per_beat: f64,
    /// Initial tempo (exposed to scripts as `io.bpm`)
    pub beats_per_minute: f64,
    /// Channel used when `playNote`/`sendCC` omit one
    pub channel_default: i64,
    /// Layout of note messages on the musical channel
    pub note_format: NoteFormat,
    /// Directories searched for scripts and `import`ed modules
    pub search_paths: Vec<PathBuf>,
    /// Extension appended to identifiers without one
    pub script_extension: String,
    /// Rhai call stack limit
    pub max_call_levels: usize,
    /// Rhai expression nesting limit
    pub max_expr_depth: usize,
    /// Optional capabilities
    pub features: Features,
}

impl Default for JamConfig {
    fn default() -> Self {
        Self {
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            beats_per_minute: DEFAULT_BEATS_PER_MINUTE,
            channel_default: DEFAULT_CHANNEL,
            note_format: NoteFormat::default(),
            search_paths: vec![PathBuf::from("."), PathBuf::from("./lib")],
            script_extension: DEFAULT_SCRIPT_EXTENSION.to_string(),
            max_call_levels: 256,
            max_expr_depth: 256,
            features: Features::default(),
        }
    }
}

impl JamConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: JamConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Config(format!("Config file not found at {:?}", path)));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration as pretty TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Check the clock invariants.
    pub fn validate(&self) -> Result<()> {
        if !(self.ticks_per_beat.is_finite() && self.ticks_per_beat > 0.0) {
            return Err(Error::Config(format!(
                "ticks_per_beat must be positive, got {}",
                self.ticks_per_beat
            )));
        }
        if !(self.beats_per_minute.is_finite() && self.beats_per_minute > 0.0) {
            return Err(Error::Config(format!(
                "beats_per_minute must be positive, got {}",
                self.beats_per_minute
            )));
        }
        if self.script_extension.starts_with('.') {
            return Err(Error::Config(format!(
                "script_extension must not start with a dot, got {:?}",
                self.script_extension
            )));
        }
        Ok(())
    }

    /// Duration of one tick at the configured tempo, for hosts that pace
    /// ticks against a wall clock.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(60.0 / (self.beats_per_minute * self.ticks_per_beat))
    }
}
