//! CLI argument parsing and command handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::autoload::Autoload;
use crate::cache::CacheStore;
use crate::config::{load_config, ResolverConfig};
use crate::host::IncludeHost;
use crate::models::{normalize_symbol, RebuildStats, SymbolTable};
use crate::output;
use crate::resolver::Resolver;

/// classmap: build and query a symbol-to-file map for PHP source trees
#[derive(Parser, Debug)]
#[command(
    name = "cmap",
    version,
    about = "Map PHP classes, interfaces, traits and enums to the files that declare them",
    long_about = "classmap scans a source tree for class, interface, trait and enum \
                  declarations and caches a map from each symbol to its file, so a \
                  lookup never has to walk the tree again.\n\n\
                  Settings are read from classmap.toml in the scanned directory, if present."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the tree and rewrite the symbol map cache
    ///
    /// Examples:
    ///   cmap index                       # Index current directory
    ///   cmap index app --ignore vendor   # Skip a subtree
    Index {
        /// Directory to scan (defaults to current directory)
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Path to exclude, relative to PATH (can be repeated)
        #[arg(short, long, value_name = "P")]
        ignore: Vec<PathBuf>,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Look up the file declaring a symbol (reads the cache, never scans)
    Find {
        /// Symbol name, optionally namespace-qualified (e.g. 'App\Models\User')
        name: String,

        /// Scanned directory (defaults to current directory)
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Autoload a symbol the way a running host would
    ///
    /// Resolves through the cache, rebuilding once if the symbol is missing,
    /// then includes the file and reports every file that was loaded.
    Resolve {
        /// Symbol name, optionally namespace-qualified
        name: String,

        /// Scanned directory (defaults to current directory)
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Never rescan, even if the symbol is not in the cache
        #[arg(long)]
        no_rebuild: bool,
    },

    /// Print the cached symbol map
    List {
        /// Scanned directory (defaults to current directory)
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Delete the symbol map cache
    Clear {
        /// Scanned directory (defaults to current directory)
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // Setup logging based on verbosity
        let log_level = match self.verbose {
            0 => "warn",   // Default: only warnings and errors
            1 => "info",   // -v: show info messages
            2 => "debug",  // -vv: show debug messages
            _ => "trace",  // -vvv: show trace messages
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        match self.command {
            Command::Index { path, ignore, json, pretty } => handle_index(&path, &ignore, json, pretty),
            Command::Find { name, path, json, pretty } => handle_find(&name, &path, json, pretty),
            Command::Resolve { name, path, no_rebuild } => handle_resolve(&name, &path, no_rebuild),
            Command::List { path, json, pretty } => handle_list(&path, json, pretty),
            Command::Clear { path } => handle_clear(&path),
        }
    }
}

#[derive(Serialize)]
struct IndexReport {
    root: PathBuf,
    cache: PathBuf,
    #[serde(flatten)]
    stats: RebuildStats,
    files: usize,
    elapsed_ms: u128,
}

#[derive(Serialize)]
struct FindReport {
    symbol: String,
    relative: String,
    path: PathBuf,
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json_output);
    Ok(())
}

fn config_for(path: &Path) -> Result<ResolverConfig> {
    if !path.is_dir() {
        anyhow::bail!("{} is not a directory", path.display());
    }
    load_config(path)
}

/// Open the cache for `path`, with a hint when nothing has been indexed yet
fn load_table(path: &Path) -> Result<(CacheStore, SymbolTable)> {
    let config = config_for(path)?;
    let store = CacheStore::new(&config.root, &config.cache_file);

    if !store.exists() {
        anyhow::bail!(
            "No symbol map found in {}.\n\
             \n\
             Run 'cmap index' to scan the tree first.\n\
             \n\
             Example:\n\
             $ cmap index {}",
            path.display(),
            path.display()
        );
    }

    let table = store.load()?;
    Ok((store, table))
}

/// Handle the `index` subcommand
fn handle_index(path: &Path, ignore: &[PathBuf], as_json: bool, pretty_json: bool) -> Result<()> {
    log::info!("Starting index build for {:?}", path);
    let start = Instant::now();

    // An explicit index request overrides allow_rebuild = false
    let config = config_for(path)?.with_allow_rebuild(true);
    let mut resolver = Resolver::new(config, IncludeHost::new());
    for p in ignore {
        resolver.ignore(p);
    }

    let stats = resolver
        .rebuild()
        .with_context(|| format!("Failed to index {}", path.display()))?;

    let report = IndexReport {
        root: resolver.root().to_path_buf(),
        cache: resolver.cache_location().to_path_buf(),
        stats,
        files: resolver.symbols().file_count(),
        elapsed_ms: start.elapsed().as_millis(),
    };

    if as_json {
        return print_json(&report, pretty_json);
    }

    println!("Indexing complete!");
    println!("  Files scanned:  {}", report.stats.files_scanned);
    println!("  Symbols:        {}", report.stats.symbols);
    println!("  Declaring files: {}", report.files);
    println!("  Cache:          {}", report.cache.display());
    println!("  Time:           {}ms", report.elapsed_ms);

    if report.stats.symbols == 0 {
        output::warn("No declarations found. Check the extensions allowed in classmap.toml.");
    }

    Ok(())
}

/// Look `name` up in the cached map for `path`
fn find_symbol(name: &str, path: &Path) -> Result<FindReport> {
    let (_, table) = load_table(path)?;
    let symbol = normalize_symbol(name);

    let Some(relative) = table.get(&symbol) else {
        anyhow::bail!(
            "Symbol '{}' is not in the symbol map.\n\
             Run 'cmap index' if it was added since the last scan.",
            name
        );
    };

    let root = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;

    Ok(FindReport {
        path: root.join(relative),
        relative: relative.to_string(),
        symbol,
    })
}

/// Handle the `find` subcommand
fn handle_find(name: &str, path: &Path, as_json: bool, pretty_json: bool) -> Result<()> {
    let report = find_symbol(name, path)?;

    if as_json {
        return print_json(&report, pretty_json);
    }

    println!(
        "{} {} {}",
        report.symbol.bold(),
        report.relative.green(),
        report.path.display()
    );
    Ok(())
}

/// Handle the `resolve` subcommand
fn handle_resolve(name: &str, path: &Path, no_rebuild: bool) -> Result<()> {
    let mut config = config_for(path)?;
    if no_rebuild {
        config = config.with_allow_rebuild(false);
    }

    let mut resolver = Resolver::new(config, IncludeHost::new());

    if !resolver.autoload(name) {
        anyhow::bail!("Unable to resolve '{}'", name);
    }

    let host = resolver.host();
    if host.included_files().is_empty() {
        println!("'{}' was already defined; nothing loaded.", name);
        return Ok(());
    }

    println!("Resolved '{}'. Loaded files:", name);
    for file in host.included_files() {
        println!("  {}", file.display());
    }

    let mut defined: Vec<_> = host.defined_symbols().collect();
    defined.sort_unstable();
    log::info!("Symbols now defined: {}", defined.join(", "));

    Ok(())
}

/// Handle the `list` subcommand
fn handle_list(path: &Path, as_json: bool, pretty_json: bool) -> Result<()> {
    let (store, table) = load_table(path)?;

    if as_json {
        return print_json(&table, pretty_json);
    }

    if table.is_empty() {
        println!("Symbol map is empty.");
        return Ok(());
    }

    match store.info() {
        Ok(info) => println!(
            "Symbol map ({} symbols in {} files, generated {}):",
            info.symbols,
            table.file_count(),
            info.generated_at
        ),
        Err(_) => println!("Symbol map ({} symbols):", table.len()),
    }
    println!();

    let width = table.iter().map(|(symbol, _)| symbol.len()).max().unwrap_or(0);
    for (symbol, relative) in table.iter() {
        println!("  {:<width$}  {}", symbol, relative.dimmed(), width = width);
    }

    Ok(())
}

/// Handle the `clear` subcommand
fn handle_clear(path: &Path) -> Result<()> {
    let config = config_for(path)?;
    let store = CacheStore::new(&config.root, &config.cache_file);

    if !store.exists() {
        println!("No cache to clear.");
        return Ok(());
    }

    store.invalidate()?;
    println!("Cache cleared successfully.");

    Ok(())
}
