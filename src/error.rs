//! Error types for symbol resolution
//!
//! Everything below the autoload entry point reports failures through
//! [`ResolveError`]; the autoload hook itself downgrades them to `false`.

use std::path::PathBuf;
use strum::Display;
use thiserror::Error;

/// Why a rebuild request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RebuildRefusal {
    #[strum(serialize = "rebuilding is disabled by configuration")]
    Disabled,
    #[strum(serialize = "the symbol table was already rebuilt during this run")]
    AlreadyRebuilt,
}

/// Errors raised by the cache store, the scanner and the resolver.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The cache artifact is missing, truncated, corrupt or from another schema.
    #[error("cache unavailable at {}: {reason}", path.display())]
    CacheUnavailable { path: PathBuf, reason: String },

    /// The cache artifact could not be written.
    #[error("failed to write cache {}: {source}", path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rebuild was requested but is not permitted.
    #[error("unable to rebuild symbol map: {0}")]
    RebuildNotAllowed(RebuildRefusal),

    /// The scan root cannot be listed. There is no recovery from this.
    #[error("scan root {} is unreadable: {source}", path.display())]
    ScanRootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The host failed to load the file a symbol maps to.
    #[error("failed to load '{symbol}' from {}: {reason}", path.display())]
    LoadFailure {
        symbol: String,
        path: PathBuf,
        reason: String,
    },
}

impl ResolveError {
    pub(crate) fn cache_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CacheUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that end the autoload attempt quietly
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::RebuildNotAllowed(_) | Self::CacheUnavailable { .. })
    }
}
