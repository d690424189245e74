//! Host runtime collaborator
//!
//! The resolver never loads code itself. It asks a [`Host`] whether a symbol
//! is already available and, when the map points at a file, asks the host to
//! load that file.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::extractor::declarations;
use crate::models::normalize_symbol;

/// The runtime that resolved files are loaded into
pub trait Host {
    /// Whether `symbol` (already normalized) is defined in the running process
    fn is_defined(&self, symbol: &str) -> bool;

    /// Make the declarations in `path` available to the running process
    fn load_file(&mut self, path: &Path) -> Result<()>;
}

impl<H: Host + ?Sized> Host for &mut H {
    fn is_defined(&self, symbol: &str) -> bool {
        (**self).is_defined(symbol)
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        (**self).load_file(path)
    }
}

/// Host that includes files by reading them and registering what they declare
///
/// Mirrors `include_once`: a file that was already included is not read
/// again, and every class, interface, trait and enum it declares becomes
/// defined.
#[derive(Debug, Default, Clone)]
pub struct IncludeHost {
    defined: HashSet<String>,
    included: Vec<PathBuf>,
}

impl IncludeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a symbol as defined without loading anything (built-ins)
    pub fn define(&mut self, symbol: &str) -> &mut Self {
        self.defined.insert(normalize_symbol(symbol));
        self
    }

    /// Files included so far, in include order
    pub fn included_files(&self) -> &[PathBuf] {
        &self.included
    }

    /// Normalized names of every defined symbol
    pub fn defined_symbols(&self) -> impl Iterator<Item = &str> {
        self.defined.iter().map(String::as_str)
    }
}

impl Host for IncludeHost {
    fn is_defined(&self, symbol: &str) -> bool {
        self.defined.contains(&normalize_symbol(symbol))
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        if self.included.iter().any(|p| p == path) {
            log::debug!("{} already included", path.display());
            return Ok(());
        }

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to include {}", path.display()))?;
        let source = String::from_utf8_lossy(&bytes);

        for decl in declarations(&source) {
            self.defined.insert(normalize_symbol(&decl.name));
        }
        self.included.push(path.to_path_buf());

        Ok(())
    }
}
