//! Source tree scanner
//!
//! Walks the root depth-first, skipping hidden entries, ignored paths, files
//! with unaccepted extensions and the cache artifact itself, and maps every
//! declaration it finds to the root-relative path of its file.
//!
//! Entries are visited in file-name order, so when two files declare the same
//! symbol the lexicographically later path wins on every platform.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::extractor::declarations;
use crate::models::{ExtensionAllowList, IgnoreSet, SymbolTable};

/// Result of a full scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub table: SymbolTable,
    /// Files read and passed to the extractor
    pub files_scanned: usize,
}

/// Walks a source tree and builds a [`SymbolTable`]
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    extensions: ExtensionAllowList,
    ignore: IgnoreSet,
    cache_path: Option<PathBuf>,
    max_file_size: u64,
    follow_symlinks: bool,
}

impl Scanner {
    /// Scanner for `root` with the default extension list and nothing ignored
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = ResolverConfig::default();
        Self {
            root: root.into(),
            extensions: defaults.extensions,
            ignore: IgnoreSet::new(),
            cache_path: None,
            max_file_size: defaults.max_file_size,
            follow_symlinks: defaults.follow_symlinks,
        }
    }

    /// Scanner configured from a resolver configuration
    pub fn from_config(config: &ResolverConfig, ignore: &IgnoreSet) -> Self {
        Self {
            root: config.root.clone(),
            extensions: config.extensions.clone(),
            ignore: ignore.clone(),
            cache_path: Some(config.cache_location()),
            max_file_size: config.max_file_size,
            follow_symlinks: config.follow_symlinks,
        }
    }

    pub fn with_extensions(mut self, extensions: ExtensionAllowList) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_ignore(mut self, ignore: IgnoreSet) -> Self {
        self.ignore = ignore;
        self
    }

    /// Skip files larger than `bytes`
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Never scan this file, even if its extension is accepted
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the symbol table for the root
    pub fn rebuild(&self) -> Result<SymbolTable, ResolveError> {
        self.scan().map(|outcome| outcome.table)
    }

    /// Build the symbol table and report how many files were read
    ///
    /// Fails only when the root itself cannot be listed. Unreadable
    /// subdirectories and files are logged and skipped.
    pub fn scan(&self) -> Result<ScanOutcome, ResolveError> {
        log::info!("Scanning {:?} for declarations", self.root);

        std::fs::read_dir(&self.root).map_err(|source| ResolveError::ScanRootUnreadable {
            path: self.root.clone(),
            source,
        })?;

        let mut outcome = ScanOutcome::default();

        let walker = WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.should_descend(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.should_scan(&entry) {
                continue;
            }

            self.scan_file(&entry, &mut outcome);
        }

        log::info!(
            "Scan complete: {} files, {} symbols",
            outcome.files_scanned,
            outcome.table.len()
        );

        Ok(outcome)
    }

    /// Filter applied while walking; rejecting a directory prunes its subtree
    fn should_descend(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        let hidden = entry.file_name().as_encoded_bytes().first() == Some(&b'.');
        if hidden {
            return false;
        }

        let ignored = self.ignore.contains(self.relative(entry.path()));
        if ignored {
            log::debug!("Ignoring {}", entry.path().display());
        }
        !ignored
    }

    fn should_scan(&self, entry: &DirEntry) -> bool {
        let path = entry.path();

        if !self.extensions.accepts(path) {
            return false;
        }

        if self.cache_path.as_deref() == Some(path) {
            return false;
        }

        if let Ok(metadata) = entry.metadata() {
            if metadata.len() > self.max_file_size {
                log::debug!(
                    "Skipping {} (too large: {} bytes)",
                    path.display(),
                    metadata.len()
                );
                return false;
            }
        }

        true
    }

    fn scan_file(&self, entry: &DirEntry, outcome: &mut ScanOutcome) {
        let path = entry.path();

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                return;
            }
        };
        let source = String::from_utf8_lossy(&bytes);
        let relative = self.relative(path).to_string_lossy().into_owned();

        outcome.files_scanned += 1;

        let mut found = 0;
        for decl in declarations(&source) {
            found += 1;
            if let Some(previous) = outcome.table.insert(&decl.name, relative.clone()) {
                if previous != relative {
                    log::warn!(
                        "{} '{}' declared in both {} and {}; using {}",
                        decl.kind,
                        decl.name,
                        previous,
                        relative,
                        relative
                    );
                }
            }
        }

        log::debug!("  Extracted {} declarations from {}", found, relative);
    }

    fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}
