//! Resolver configuration
//!
//! Everything the resolver needs is supplied at construction. An optional
//! `classmap.toml` at the root can override the defaults:
//!
//! ```toml
//! allow_rebuild = true
//! cache_file = ".classmap.cache"
//! ignore = ["vendor", "tests/fixtures"]
//! max_file_size = 10485760
//!
//! [extensions]
//! ".php" = true
//! ".inc" = true
//! ".php4" = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::ExtensionAllowList;

/// Default cache artifact name, created in the scan root
pub const CACHE_FILE: &str = ".classmap.cache";

/// Optional per-project configuration file in the scan root
pub const CONFIG_TOML: &str = "classmap.toml";

/// Configuration supplied when constructing a resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directory to scan; table paths are relative to it
    #[serde(skip)]
    pub root: PathBuf,
    /// Whether a missing or stale map may be rebuilt by scanning the tree
    pub allow_rebuild: bool,
    /// Accepted source-file suffixes
    pub extensions: ExtensionAllowList,
    /// Cache artifact file name, relative to `root`
    pub cache_file: String,
    /// Paths (relative to `root`) excluded from scanning
    pub ignore: Vec<PathBuf>,
    /// Files larger than this are not scanned (bytes)
    pub max_file_size: u64,
    /// Follow symbolic links while scanning
    pub follow_symlinks: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            allow_rebuild: true,
            extensions: ExtensionAllowList::default(),
            cache_file: CACHE_FILE.to_string(),
            ignore: Vec::new(),
            max_file_size: 10 * 1024 * 1024, // 10 MB
            follow_symlinks: false,
        }
    }
}

impl ResolverConfig {
    /// Default configuration for `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_allow_rebuild(mut self, allow: bool) -> Self {
        self.allow_rebuild = allow;
        self
    }

    pub fn with_extensions(mut self, extensions: ExtensionAllowList) -> Self {
        self.extensions = extensions;
        self
    }

    /// Absolute (or root-joined) location of the cache artifact
    pub fn cache_location(&self) -> PathBuf {
        self.root.join(&self.cache_file)
    }
}

/// Load configuration for `root`
///
/// Falls back to defaults if `classmap.toml` doesn't exist.
pub fn load_config(root: &Path) -> Result<ResolverConfig> {
    let config_path = root.join(CONFIG_TOML);

    if !config_path.exists() {
        log::debug!("No {} found, using default configuration", CONFIG_TOML);
        return Ok(ResolverConfig::new(root));
    }

    let config_str = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    let mut config: ResolverConfig = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    config.root = root.to_path_buf();

    log::debug!("Loaded configuration from {}", config_path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::new("/srv/app");
        assert!(config.allow_rebuild);
        assert_eq!(config.cache_location(), PathBuf::from("/srv/app/.classmap.cache"));
        assert!(config.extensions.accepts(Path::new("a.php")));
    }

    #[test]
    fn test_load_config_missing_file() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path()).unwrap();
        assert_eq!(config, ResolverConfig::new(temp.path()));
    }

    #[test]
    fn test_load_config_overrides() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_TOML),
            r#"
allow_rebuild = false
cache_file = "map.bin"
ignore = ["vendor"]

[extensions]
".inc" = true
".php" = true
"#,
        )
        .unwrap();

        let config = load_config(temp.path()).unwrap();
        assert!(!config.allow_rebuild);
        assert_eq!(config.root, temp.path());
        assert_eq!(config.cache_location(), temp.path().join("map.bin"));
        assert_eq!(config.ignore, vec![PathBuf::from("vendor")]);
        assert!(config.extensions.accepts(Path::new("x.inc")));
        assert!(!config.extensions.accepts(Path::new("x.php5")));
    }

    #[test]
    fn test_load_config_extension_without_dot() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_TOML),
            "[extensions]\ninc = true\nphp = true\n",
        )
        .unwrap();

        let config = load_config(temp.path()).unwrap();
        assert!(config.extensions.accepts(Path::new("x.inc")));
        assert!(config.extensions.accepts(Path::new("x.php")));
        assert!(!config.extensions.accepts(Path::new("x.php5")));
    }

    #[test]
    fn test_load_config_invalid() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_TOML), "allow_rebuild = \"maybe\"").unwrap();

        let err = load_config(temp.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }
}
