//! Script source loading.
//!
//! The host only hands the scheduler an identifier. A [`ScriptLoader`] turns
//! it into source text: [`FileLoader`] searches the configured directories,
//! [`MemoryLoader`] serves scripts registered in-process.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Source text plus where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptSource {
    /// Name used in error messages and as the Rhai AST source.
    pub name: String,
    /// The script text.
    pub text: String,
}

/// Resolves identifiers to script source.
pub trait ScriptLoader: Send {
    fn load(&self, identifier: &str) -> Result<ScriptSource>;
}

/// Loads scripts from disk.
///
/// An identifier is tried as given, then relative to each search path in
/// order. Identifiers without an extension also try `<identifier>.<ext>`.
#[derive(Clone, Debug)]
pub struct FileLoader {
    search_paths: Vec<PathBuf>,
    extension: String,
}

impl FileLoader {
    pub fn new(search_paths: Vec<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            search_paths,
            extension: extension.into(),
        }
    }

    /// Find the file an identifier refers to.
    pub fn resolve(&self, identifier: &str) -> Option<PathBuf> {
        let given = Path::new(identifier);
        let mut names = vec![given.to_path_buf()];
        if given.extension().is_none() && !self.extension.is_empty() {
            names.push(given.with_extension(&self.extension));
        }

        for name in &names {
            if name.is_file() {
                return Some(name.clone());
            }
        }

        if given.is_absolute() {
            return None;
        }

        self.search_paths
            .iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
    }
}

impl ScriptLoader for FileLoader {
    fn load(&self, identifier: &str) -> Result<ScriptSource> {
        let path = self.resolve(identifier).ok_or_else(|| Error::Load {
            identifier: identifier.to_string(),
            message: format!("cannot open {} (searched {:?})", identifier, self.search_paths),
        })?;

        let text = fs::read_to_string(&path).map_err(|e| Error::Load {
            identifier: identifier.to_string(),
            message: format!("cannot read {}: {}", path.display(), e),
        })?;

        Ok(ScriptSource {
            name: path.display().to_string(),
            text,
        })
    }
}

/// Serves scripts registered by name.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    scripts: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with_script(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.scripts.insert(name.into(), text.into());
    }
}

impl ScriptLoader for MemoryLoader {
    fn load(&self, identifier: &str) -> Result<ScriptSource> {
        self.scripts
            .get(identifier)
            .map(|text| ScriptSource {
                name: identifier.to_string(),
                text: text.clone(),
            })
            .ok_or_else(|| Error::Load {
                identifier: identifier.to_string(),
                message: "no such script".to_string(),
            })
    }
}
