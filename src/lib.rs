//! classmap: cached symbol-to-file resolution for PHP source trees
//!
//! classmap answers "which file declares this class?" for a running host. It
//! keeps a map from every class, interface, trait and enum declared under a
//! root directory to the file declaring it, persists that map to a single
//! cache file, and rebuilds it at most once per process when a lookup misses.
//!
//! # Architecture
//!
//! - **Lexer / Extractor**: Tokenizes source with `logos` and pulls out
//!   namespace-qualified declarations
//! - **Scanner**: Walks the root and builds a [`SymbolTable`]
//! - **Cache**: Checksummed, atomically replaced artifact in the root
//! - **Resolver**: Owns the table, loads files into a [`Host`] and implements
//!   the [`Autoload`] retry policy
//!
//! # Example Usage
//!
//! ```no_run
//! use classmap::{Autoload, IncludeHost, Resolver, ResolverConfig};
//!
//! let config = ResolverConfig::new("/srv/app");
//! let mut resolver = Resolver::new(config, IncludeHost::new());
//! resolver.ignore("vendor").ignore("tests/fixtures");
//!
//! if resolver.autoload("App\\Models\\User") {
//!     println!("Loaded {:?}", resolver.host().included_files());
//! }
//! ```

pub mod autoload;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod host;
pub mod lexer;
pub mod models;
pub mod output;
pub mod resolver;
pub mod scanner;

// Re-export commonly used types
pub use autoload::{Autoload, AutoloadChain};
pub use cache::CacheStore;
pub use config::{load_config, ResolverConfig};
pub use error::{RebuildRefusal, ResolveError};
pub use extractor::declarations;
pub use host::{Host, IncludeHost};
pub use models::{Declaration, DeclarationKind, ExtensionAllowList, IgnoreSet, RebuildStats, SymbolTable};
pub use resolver::{RebuildState, Resolver};
pub use scanner::Scanner;
