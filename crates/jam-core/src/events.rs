//! Outbound and inbound message types.
//!
//! Everything that crosses the host boundary is a list of [`Atom`]s, the way
//! patch-based hosts exchange messages: a float or a symbol. Scripts never see
//! these types directly; they emit through the `io` capability object and the
//! sink renders events as atom lists on request.

use rhai::{Dynamic, FLOAT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single message element: number or text.
#[derive(Clone, Debug, PartialEq)]
pub enum Atom {
    Float(f64),
    Symbol(String),
}

impl Atom {
    pub fn symbol(text: impl Into<String>) -> Self {
        Atom::Symbol(text.into())
    }

    /// Parse one whitespace-free token: numbers become floats, anything else a symbol.
    pub fn parse(token: &str) -> Self {
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Atom::Float(value),
            _ => Atom::Symbol(token.to_string()),
        }
    }

    /// Split a message line into atoms.
    pub fn parse_list(line: &str) -> Vec<Atom> {
        line.split_whitespace().map(Atom::parse).collect()
    }

    /// Convert to the value a script receives: floats stay floats, symbols become strings.
    pub fn to_dynamic(&self) -> Dynamic {
        match self {
            Atom::Float(value) => Dynamic::from_float(*value as FLOAT),
            Atom::Symbol(text) => Dynamic::from(text.clone()),
        }
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Atom::Float(value as f64)
    }
}

impl From<f64> for Atom {
    fn from(value: f64) -> Self {
        Atom::Float(value)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::Symbol(value.to_string())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Float(value) => write!(f, "{}", value),
            Atom::Symbol(text) => write!(f, "{}", text),
        }
    }
}

/// Render an atom list as a single space-separated line.
pub fn format_atoms(atoms: &[Atom]) -> String {
    atoms
        .iter()
        .map(|atom| atom.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Layout of note messages on the musical channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteFormat {
    /// `note <note> <velocity> <duration> <channel>`
    #[default]
    Tagged,
    /// `<note> <velocity> <duration> <channel>`
    Untagged,
}

/// An event emitted on the musical channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MusicalEvent {
    /// Note with a duration in ticks.
    Note {
        note: i64,
        velocity: i64,
        duration: i64,
        channel: i64,
    },
    /// Control change.
    ControlChange {
        controller: i64,
        value: i64,
        channel: i64,
    },
}

impl MusicalEvent {
    /// Render as an atom list. Control changes are always tagged.
    pub fn to_atoms(&self, format: NoteFormat) -> Vec<Atom> {
        match *self {
            MusicalEvent::Note {
                note,
                velocity,
                duration,
                channel,
            } => {
                let mut atoms = Vec::with_capacity(5);
                if format == NoteFormat::Tagged {
                    atoms.push(Atom::symbol("note"));
                }
                atoms.extend([note, velocity, duration, channel].map(Atom::from));
                atoms
            }
            MusicalEvent::ControlChange {
                controller,
                value,
                channel,
            } => vec![
                Atom::symbol("cc"),
                Atom::from(controller),
                Atom::from(value),
                Atom::from(channel),
            ],
        }
    }
}

/// An event emitted on the diagnostic channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// Free-form text: lifecycle notices and captured `print` output.
    Info(String),
    /// A caught failure.
    Error { message: String },
}

impl Diagnostic {
    pub fn info(text: impl Into<String>) -> Self {
        Diagnostic::Info(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic::Error {
            message: message.into(),
        }
    }

    pub fn to_atoms(&self) -> Vec<Atom> {
        match self {
            Diagnostic::Info(text) => vec![Atom::symbol(text.clone())],
            Diagnostic::Error { message } => {
                vec![Atom::symbol("error"), Atom::symbol(message.clone())]
            }
        }
    }
}
