//! Symbol resolver
//!
//! The resolver owns the in-memory symbol table for one root and answers
//! "where is this class?" for the host. It is built once at startup and
//! passed to whatever needs it; there is no global instance.
//!
//! # Lifecycle
//!
//! 1. On first use the table is loaded from the cache artifact. If that fails
//!    the tree is scanned instead (a rebuild).
//! 2. [`Resolver::resolve`] consults the table only. The cache is never
//!    re-read mid-process.
//! 3. [`Autoload::autoload`] adds the retry policy: when `resolve` fails, the
//!    table is rebuilt once and the lookup retried once. At most one rebuild
//!    happens per resolver, so a symbol that genuinely does not exist costs
//!    one scan, not one scan per lookup.
//!
//! Single-threaded by construction: all mutation goes through `&mut self`.

use std::path::{Path, PathBuf};

use crate::autoload::Autoload;
use crate::cache::CacheStore;
use crate::config::ResolverConfig;
use crate::error::{RebuildRefusal, ResolveError};
use crate::host::Host;
use crate::models::{normalize_symbol, IgnoreSet, RebuildStats, SymbolTable};
use crate::scanner::Scanner;

/// Whether this resolver has already paid for a full scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildState {
    NotRebuilt,
    Rebuilt,
}

/// Resolves symbol names to files and loads them into a [`Host`]
pub struct Resolver<H: Host> {
    config: ResolverConfig,
    ignore: IgnoreSet,
    cache: CacheStore,
    table: SymbolTable,
    state: RebuildState,
    initialized: bool,
    host: H,
}

impl<H: Host> Resolver<H> {
    /// Create a resolver. Nothing is read until first use or [`Resolver::init`].
    pub fn new(config: ResolverConfig, host: H) -> Self {
        let mut ignore = IgnoreSet::new();
        for path in &config.ignore {
            ignore.insert(&config.root, path);
        }

        let cache = CacheStore::new(&config.root, &config.cache_file);

        Self {
            config,
            ignore,
            cache,
            table: SymbolTable::new(),
            state: RebuildState::NotRebuilt,
            initialized: false,
            host,
        }
    }

    /// Load the table from the cache, falling back to a rebuild
    pub fn init(&mut self) -> Result<(), ResolveError> {
        match self.cache.load() {
            Ok(table) => {
                log::info!(
                    "Loaded symbol map with {} entries from {:?}",
                    table.len(),
                    self.cache.path()
                );
                self.table = table;
            }
            Err(e) => {
                log::info!("{}; rebuilding symbol map", e);
                self.rebuild()?;
            }
        }

        self.initialized = true;
        Ok(())
    }

    /// Exclude a path (relative to the root, or absolute under it) from
    /// future rebuilds. The current table is not touched.
    pub fn ignore(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.ignore.insert(&self.config.root, path);
        self
    }

    /// Rescan the whole tree, replace the table and persist it
    ///
    /// Refused when rebuilding is disabled or has already happened for this
    /// resolver. The one-shot flag is set as soon as a rebuild starts, so a
    /// scan that fails is not retried on the next miss either.
    pub fn rebuild(&mut self) -> Result<RebuildStats, ResolveError> {
        if !self.config.allow_rebuild {
            return Err(ResolveError::RebuildNotAllowed(RebuildRefusal::Disabled));
        }
        if self.state == RebuildState::Rebuilt {
            return Err(ResolveError::RebuildNotAllowed(RebuildRefusal::AlreadyRebuilt));
        }

        self.state = RebuildState::Rebuilt;
        self.table.clear();

        let outcome = Scanner::from_config(&self.config, &self.ignore).scan()?;
        self.table = outcome.table;
        self.initialized = true;

        if let Err(e) = self.cache.save(&self.table) {
            log::warn!("Symbol map rebuilt but not cached: {}", e);
        }

        let stats = RebuildStats {
            files_scanned: outcome.files_scanned,
            symbols: self.table.len(),
        };
        log::info!(
            "Rebuilt symbol map: {} symbols from {} files",
            stats.symbols,
            stats.files_scanned
        );
        Ok(stats)
    }

    /// Make `name` available to the host if the table knows where it lives
    ///
    /// Returns `true` if the host already defines the symbol or its file was
    /// loaded successfully. Unknown symbols and load failures return `false`.
    pub fn resolve(&mut self, name: &str) -> bool {
        let symbol = normalize_symbol(name);

        if self.host.is_defined(&symbol) {
            return true;
        }

        self.ensure_initialized();

        let Some(path) = self.absolute_path(&symbol) else {
            log::debug!("'{}' is not in the symbol map", symbol);
            return false;
        };

        match self.host.load_file(&path) {
            Ok(()) => {
                log::debug!("Loaded '{}' from {}", symbol, path.display());
                true
            }
            Err(e) => {
                let err = ResolveError::LoadFailure {
                    symbol,
                    path,
                    reason: format!("{:#}", e),
                };
                log::warn!("{}", err);
                false
            }
        }
    }

    /// Absolute path of the file declaring `name`, without loading it
    pub fn lookup(&mut self, name: &str) -> Option<PathBuf> {
        self.ensure_initialized();
        self.absolute_path(&normalize_symbol(name))
    }

    /// Replace the in-memory table
    pub fn set_symbol_table(&mut self, table: SymbolTable) {
        self.table = table;
        self.initialized = true;
    }

    /// The current table (empty until initialized)
    pub fn symbols(&self) -> &SymbolTable {
        &self.table
    }

    /// Persist the current table to the cache artifact
    pub fn save_to_cache(&self) -> Result<(), ResolveError> {
        self.cache.save(&self.table)
    }

    /// Delete the cache artifact so the next process rescans
    pub fn expire_cache(&self) -> Result<(), ResolveError> {
        self.cache.invalidate()
    }

    pub fn cache_location(&self) -> &Path {
        self.cache.path()
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn ignored(&self) -> &IgnoreSet {
        &self.ignore
    }

    pub fn rebuild_state(&self) -> RebuildState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn ensure_initialized(&mut self) {
        if self.initialized {
            return;
        }

        if let Err(e) = self.init() {
            log::error!("Symbol map unavailable: {}", e);
            // Don't retry initialization on every lookup
            self.initialized = true;
        }
    }

    fn absolute_path(&self, symbol: &str) -> Option<PathBuf> {
        self.table
            .get(symbol)
            .map(|relative| self.config.root.join(relative))
    }
}

impl<H: Host> Autoload for Resolver<H> {
    /// Resolve, and on failure rebuild once and retry once
    ///
    /// Never fails: refusals and scan errors are logged and reported as
    /// `false` so the host can move on to its next loader.
    fn autoload(&mut self, symbol: &str) -> bool {
        if self.resolve(symbol) {
            return true;
        }

        match self.rebuild() {
            Ok(_) => self.resolve(symbol),
            Err(e) if e.is_expected() => {
                log::debug!("Not retrying '{}': {}", symbol, e);
                false
            }
            Err(e) => {
                log::error!("Rebuild for '{}' failed: {}", symbol, e);
                false
            }
        }
    }
}
