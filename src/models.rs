//! Core data models for classmap
//!
//! These structures describe what the scanner produces, what the cache
//! persists and what the resolver consults on every lookup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use strum::Display;

/// Separator between namespace segments in qualified names
pub const NAMESPACE_SEPARATOR: char = '\\';

/// Normalize a symbol name into a table key
///
/// Class names are case-insensitive (ASCII only), and a fully qualified
/// reference may carry a leading separator (`\Foo\Bar`).
pub fn normalize_symbol(name: &str) -> String {
    name.trim()
        .trim_start_matches(NAMESPACE_SEPARATOR)
        .to_ascii_lowercase()
}

/// Kind of declaration that introduces an autoloadable symbol
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Class,
    Interface,
    Trait,
    Enum,
}

/// A symbol declared in a source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Declaration {
    /// Namespace-qualified name, original casing (e.g. `Foo\Bar\Baz`)
    pub name: String,
    pub kind: DeclarationKind,
    /// Byte offset of the declared identifier
    pub offset: usize,
    /// 1-indexed line of the declared identifier
    pub line: usize,
}

/// Mapping from normalized symbol name to root-relative file path
///
/// Backed by a `BTreeMap` so iteration and serialization are ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    entries: BTreeMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a symbol to a path, returning the path it was previously bound to
    pub fn insert(&mut self, symbol: &str, path: impl Into<String>) -> Option<String> {
        self.entries.insert(normalize_symbol(symbol), path.into())
    }

    /// Root-relative path of the file declaring `symbol`
    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.entries.get(&normalize_symbol(symbol)).map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(&normalize_symbol(symbol))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate `(normalized symbol, relative path)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct files referenced by the table
    pub fn file_count(&self) -> usize {
        self.entries.values().collect::<BTreeSet<_>>().len()
    }
}

impl<S: AsRef<str>, P: Into<String>> FromIterator<(S, P)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (S, P)>>(iter: I) -> Self {
        let mut table = SymbolTable::new();
        for (symbol, path) in iter {
            table.insert(symbol.as_ref(), path);
        }
        table
    }
}

/// Source-file suffixes the scanner accepts, keyed with a leading dot
///
/// Stored as a mapping so a configuration can switch a default suffix off
/// (`".php4" = false`) as well as add new ones. Keys read from configuration
/// get the leading dot added if it is missing (`inc = true`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct ExtensionAllowList {
    extensions: BTreeMap<String, bool>,
}

impl Default for ExtensionAllowList {
    fn default() -> Self {
        [".php", ".php4", ".php5", ".mphp", ".phpm"]
            .into_iter()
            .map(|ext| (ext, true))
            .collect()
    }
}

impl ExtensionAllowList {
    /// An allow-list that accepts nothing
    pub fn empty() -> Self {
        Self {
            extensions: BTreeMap::new(),
        }
    }

    /// Set whether files with `extension` are scanned. The leading dot is optional.
    pub fn set(&mut self, extension: &str, accepted: bool) -> &mut Self {
        self.extensions.insert(dotted(extension), accepted);
        self
    }

    /// Check whether `path` has an accepted suffix
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };

        self.extensions
            .get(&dotted(ext))
            .copied()
            .unwrap_or(false)
    }

    /// Accepted suffixes, with their leading dot
    pub fn accepted(&self) -> impl Iterator<Item = &str> {
        self.extensions
            .iter()
            .filter(|(_, accepted)| **accepted)
            .map(|(ext, _)| ext.as_str())
    }
}

impl<S: AsRef<str>> FromIterator<(S, bool)> for ExtensionAllowList {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        let mut list = ExtensionAllowList::empty();
        for (ext, accepted) in iter {
            list.set(ext.as_ref(), accepted);
        }
        list
    }
}

impl From<BTreeMap<String, bool>> for ExtensionAllowList {
    fn from(extensions: BTreeMap<String, bool>) -> Self {
        extensions.into_iter().collect()
    }
}

impl From<ExtensionAllowList> for BTreeMap<String, bool> {
    fn from(list: ExtensionAllowList) -> Self {
        list.extensions
    }
}

fn dotted(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{}", ext)
    }
}

/// Root-relative paths excluded from scanning
///
/// A directory entry excludes everything below it; a file entry excludes
/// just that file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoreSet {
    paths: BTreeSet<PathBuf>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path`, given relative to `root` or as an absolute path under it
    pub fn insert(&mut self, root: &Path, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.paths.insert(clean_relative(relative))
    }

    /// Check a root-relative path against the set
    pub fn contains(&self, relative: &Path) -> bool {
        self.paths.contains(&clean_relative(relative))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

/// Drop `.` components and trailing separators so `./lib/` and `lib` compare equal
fn clean_relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Summary of a completed rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildStats {
    /// Source files read and tokenized
    pub files_scanned: usize,
    /// Entries in the resulting symbol table
    pub symbols: usize,
}
