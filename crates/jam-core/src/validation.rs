//! Offline validation of jam programs.
//!
//! Compiles and evaluates a script against an in-memory sink, checks that it
//! evaluates to a program map, and optionally dry-runs `init` plus a number
//! of ticks so callback failures show up before the script reaches a host.

use crate::api::create_engine;
use crate::config::JamConfig;
use crate::host::{ScriptHost, INIT_CALLBACK, MESSAGE_CALLBACK, TICK_CALLBACK};
use crate::loader::{MemoryLoader, ScriptSource};
use crate::sink::MemorySink;
use rhai::{Dynamic, FnPtr, Map};
use std::sync::Arc;

/// Result of script validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Parse errors (Rhai compilation failures).
    pub parse_errors: Vec<ValidationError>,
    /// Runtime errors: evaluation failures, contract violations and
    /// callback failures during the dry run.
    pub runtime_errors: Vec<ValidationError>,
    /// Lifecycle callbacks the program defines.
    pub callbacks: Vec<&'static str>,
    /// Events emitted during the dry run.
    pub events_emitted: usize,
}

impl ValidationResult {
    /// Check if the validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.parse_errors.is_empty() && self.runtime_errors.is_empty()
    }

    /// Get all errors combined.
    pub fn all_errors(&self) -> Vec<&ValidationError> {
        self.parse_errors
            .iter()
            .chain(self.runtime_errors.iter())
            .collect()
    }
}

/// An error found during validation.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
    /// Line number (1-based).
    pub line: Option<u32>,
    /// Column number (1-based).
    pub column: Option<u32>,
}

impl ValidationError {
    fn at(message: String, pos: rhai::Position) -> Self {
        if pos.is_none() {
            return Self::message(message);
        }
        Self {
            message,
            line: pos.line().map(|l| l as u32),
            column: pos.position().map(|c| c as u32),
        }
    }

    fn message(message: String) -> Self {
        Self {
            message,
            line: None,
            column: None,
        }
    }

    /// Create a validation error from a Rhai parse error.
    pub fn from_rhai_parse(err: rhai::ParseError) -> Self {
        let pos = err.position();
        Self::at(err.to_string(), pos)
    }

    /// Create a validation error from a Rhai runtime error.
    pub fn from_rhai_runtime(err: Box<rhai::EvalAltResult>) -> Self {
        let pos = err.position();
        Self::at(err.to_string(), pos)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{}:{}: {}", line, column, self.message),
            (Some(line), None) => write!(f, "{}: {}", line, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Validate a jam program.
///
/// `dry_run_ticks` ticks are run after `init` when the script passes the
/// static checks. Output goes to a throwaway sink.
pub fn validate_script(
    name: &str,
    content: &str,
    config: &JamConfig,
    dry_run_ticks: u64,
) -> ValidationResult {
    let mut result = ValidationResult::default();
    let sink = Arc::new(MemorySink::new());
    let engine = create_engine(config, sink.clone());

    let ast = match engine.compile(content) {
        Ok(ast) => ast,
        Err(err) => {
            result.parse_errors.push(ValidationError::from_rhai_parse(err));
            return result;
        }
    };

    let table = match engine.eval_ast::<Dynamic>(&ast) {
        Ok(table) => table,
        Err(err) => {
            result.runtime_errors.push(ValidationError::from_rhai_runtime(err));
            return result;
        }
    };

    let Some(map) = table.read_lock::<Map>().map(|map| (*map).clone()) else {
        result.runtime_errors.push(ValidationError::message(format!(
            "script must evaluate to a program map, got {}",
            table.type_name()
        )));
        return result;
    };

    result.callbacks = [INIT_CALLBACK, TICK_CALLBACK, MESSAGE_CALLBACK]
        .into_iter()
        .filter(|name| map.get(*name).is_some_and(|value| value.is::<FnPtr>()))
        .collect();

    let mut host = match ScriptHost::new(config, Box::new(MemoryLoader::new()), sink.clone()) {
        Ok(host) => host,
        Err(err) => {
            result.runtime_errors.push(ValidationError::message(err.to_string()));
            return result;
        }
    };
    sink.clear();

    let source = ScriptSource {
        name: name.to_string(),
        text: content.to_string(),
    };
    // Init failures are already on the sink.
    let _ = host.load_source(source);
    for _ in 0..dry_run_ticks {
        host.tick();
    }

    result.runtime_errors.extend(
        sink.errors()
            .into_iter()
            .map(ValidationError::message),
    );
    result.events_emitted = sink.events().len();

    result
}
