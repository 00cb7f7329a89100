//! Error types for jam-core.

use rhai::EvalAltResult;
use thiserror::Error;

/// Result type alias for jam-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading and driving a jam script.
#[derive(Debug, Error)]
pub enum Error {
    /// Script source could not be retrieved, compiled or evaluated.
    #[error("error loading {identifier}: {message}")]
    Load { identifier: String, message: String },

    /// Script evaluated to something other than an object map.
    #[error("{identifier} did not return an object map (got {found})")]
    ContractViolation { identifier: String, found: String },

    /// The program's `init` callback raised.
    #[error("error in init(): {0}")]
    Init(String),

    /// A `tick` or `onMessage` callback raised.
    #[error("error in {callback}(): {message}")]
    Callback {
        callback: &'static str,
        message: String,
    },

    /// An emission primitive was called with a missing or non-integer argument.
    #[error("bad argument #{position} to '{function}' ({message})")]
    Argument {
        function: &'static str,
        position: usize,
        message: String,
    },

    /// A timing primitive received a value it cannot quantize against.
    #[error("invalid argument to '{function}': {message}")]
    InvalidArgument {
        function: &'static str,
        message: String,
    },

    /// `dur` was asked to divide by zero.
    #[error("division by zero in '{0}'")]
    DivisionByZero(&'static str),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Short name of the failing operation, used as a log prefix.
    pub fn operation(&self) -> &'static str {
        match self {
            Error::Load { .. } | Error::ContractViolation { .. } => "load",
            Error::Init(_) => "init",
            Error::Callback { callback, .. } => *callback,
            Error::Argument { function, .. } | Error::InvalidArgument { function, .. } => *function,
            Error::DivisionByZero(function) => *function,
            Error::Config(_) | Error::TomlParse(_) | Error::TomlSerialize(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

// Registered Rhai functions surface our errors as catchable runtime errors.
impl From<Error> for Box<EvalAltResult> {
    fn from(err: Error) -> Self {
        Box::new(EvalAltResult::from(err.to_string()))
    }
}
