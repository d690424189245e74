//! Symbol map cache
//!
//! The symbol table is persisted to a single file in the scan root
//! (`.classmap.cache` by default) so later processes can skip the scan:
//!
//! ```text
//! magic     "CMAP"                      4 bytes
//! version   u32 LE                      4 bytes
//! schema    CACHE_SCHEMA_HASH (hex)     16 bytes
//! checksum  blake3(payload)             32 bytes
//! length    u64 LE                      8 bytes
//! payload   bincode(artifact)
//! ```
//!
//! The file is written to a temporary sibling and renamed into place, so a
//! reader sees either the old artifact or the new one. Concurrent writers are
//! not coordinated: the last rename wins.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::ResolveError;
use crate::models::SymbolTable;

/// Magic bytes at the start of every cache artifact
pub const MAGIC: &[u8; 4] = b"CMAP";

/// Artifact layout version
pub const VERSION: u32 = 1;

/// Hash of the cache-critical sources, computed by build.rs
pub const SCHEMA_HASH: &str = env!("CACHE_SCHEMA_HASH");

const SCHEMA_LEN: usize = 16;
const HEADER_SIZE: usize = 4 + 4 + SCHEMA_LEN + 32 + 8;

#[derive(Serialize)]
struct ArtifactRef<'a> {
    generated_at: String,
    root: String,
    symbols: &'a SymbolTable,
}

#[derive(Deserialize)]
struct Artifact {
    generated_at: String,
    root: String,
    symbols: SymbolTable,
}

/// Summary of an artifact on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInfo {
    /// RFC 3339 timestamp of the save
    pub generated_at: String,
    /// Root the artifact was generated for
    pub root: String,
    /// Number of symbols in the table
    pub symbols: usize,
    /// Artifact size on disk (bytes)
    pub size_bytes: u64,
}

/// Reads, writes and deletes the cache artifact for one root
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    path: PathBuf,
}

impl CacheStore {
    /// Cache store for `root` using artifact name `file_name`
    pub fn new(root: impl AsRef<Path>, file_name: &str) -> Self {
        let root = root.as_ref().to_path_buf();
        let path = root.join(file_name);
        Self { root, path }
    }

    /// Location of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist `table`, replacing any previous artifact
    pub fn save(&self, table: &SymbolTable) -> Result<(), ResolveError> {
        let artifact = ArtifactRef {
            generated_at: chrono::Utc::now().to_rfc3339(),
            root: self.root.display().to_string(),
            symbols: table,
        };

        let payload = bincode::serialize(&artifact).map_err(|e| ResolveError::CacheWrite {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        })?;

        let tmp_path = self.tmp_path();
        if let Err(source) = write_artifact(&tmp_path, &payload)
            .and_then(|_| fs::rename(&tmp_path, &self.path))
        {
            let _ = fs::remove_file(&tmp_path);
            return Err(ResolveError::CacheWrite {
                path: self.path.clone(),
                source,
            });
        }

        log::debug!(
            "Wrote {} symbols ({} bytes) to {:?}",
            table.len(),
            HEADER_SIZE + payload.len(),
            self.path
        );
        Ok(())
    }

    /// Load the persisted table
    ///
    /// Any problem with the artifact (missing, truncated, wrong magic,
    /// version or schema, checksum mismatch, undecodable payload) is reported
    /// as [`ResolveError::CacheUnavailable`]; nothing is partially loaded.
    pub fn load(&self) -> Result<SymbolTable, ResolveError> {
        let artifact = self.read_artifact()?;
        log::debug!(
            "Loaded {} symbols from {:?} (generated {})",
            artifact.symbols.len(),
            self.path,
            artifact.generated_at
        );
        Ok(artifact.symbols)
    }

    /// Describe the artifact without keeping its table
    pub fn info(&self) -> Result<CacheInfo, ResolveError> {
        let size_bytes = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        let artifact = self.read_artifact()?;
        Ok(CacheInfo {
            generated_at: artifact.generated_at,
            root: artifact.root,
            symbols: artifact.symbols.len(),
            size_bytes,
        })
    }

    /// Delete the artifact. A missing artifact is not an error.
    pub fn invalidate(&self) -> Result<(), ResolveError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Removed cache {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ResolveError::CacheWrite {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path
            .with_file_name(format!("{}.tmp{}", file_name, std::process::id()))
    }

    fn read_artifact(&self) -> Result<Artifact, ResolveError> {
        let unavailable = |reason: String| ResolveError::cache_unavailable(&self.path, reason);

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(unavailable("cache file does not exist".to_string()));
            }
            Err(e) => return Err(unavailable(format!("failed to read cache file: {}", e))),
        };

        if bytes.len() < HEADER_SIZE {
            return Err(unavailable(format!(
                "file is too small ({} bytes, expected at least {})",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let (header, payload) = bytes.split_at(HEADER_SIZE);

        if &header[0..4] != MAGIC {
            return Err(unavailable("invalid magic bytes".to_string()));
        }

        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != VERSION {
            return Err(unavailable(format!("unsupported version {}", version)));
        }

        if header[8..8 + SCHEMA_LEN] != schema_bytes() {
            return Err(unavailable("written by an incompatible build".to_string()));
        }

        let checksum = &header[8 + SCHEMA_LEN..8 + SCHEMA_LEN + 32];

        let mut length = [0u8; 8];
        length.copy_from_slice(&header[HEADER_SIZE - 8..]);
        let length = u64::from_le_bytes(length);
        if length != payload.len() as u64 {
            return Err(unavailable(format!(
                "payload length mismatch (header says {}, found {})",
                length,
                payload.len()
            )));
        }

        if blake3::hash(payload).as_bytes() != checksum {
            return Err(unavailable("checksum mismatch".to_string()));
        }

        bincode::deserialize(payload)
            .map_err(|e| unavailable(format!("failed to decode payload: {}", e)))
    }
}

fn schema_bytes() -> [u8; SCHEMA_LEN] {
    let mut bytes = [0u8; SCHEMA_LEN];
    let hash = SCHEMA_HASH.as_bytes();
    let n = hash.len().min(SCHEMA_LEN);
    bytes[..n].copy_from_slice(&hash[..n]);
    bytes
}

fn write_artifact(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&schema_bytes())?;
    writer.write_all(blake3::hash(payload).as_bytes())?;
    writer.write_all(&(payload.len() as u64).to_le_bytes())?;
    writer.write_all(payload)?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    // Readable and writable by owner and group, never executable
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o664))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_table() -> SymbolTable {
        [
            ("Widget", "src/Widget.php"),
            ("App\\Models\\User", "src/Models/User.php"),
            ("HasName", "src/Contracts/HasName.php"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");
        let table = sample_table();

        store.save(&table).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), table);
    }

    #[test]
    fn test_empty_table_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");

        store.save(&SymbolTable::new()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_overwrites_previous_artifact() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");

        store.save(&sample_table()).unwrap();
        let smaller: SymbolTable = [("Only", "Only.php")].into_iter().collect();
        store.save(&smaller).unwrap();

        assert_eq!(store.load().unwrap(), smaller);
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");
        store.save(&sample_table()).unwrap();

        let entries: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(".classmap.cache")]);
    }

    #[test]
    fn test_load_missing_artifact() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");

        let err = store.load().unwrap_err();
        assert!(matches!(err, ResolveError::CacheUnavailable { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_load_corrupt_payload() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");
        store.save(&sample_table()).unwrap();

        let mut bytes = fs::read(store.path()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(store.path(), &bytes).unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_load_truncated_artifact() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");
        store.save(&sample_table()).unwrap();

        let bytes = fs::read(store.path()).unwrap();
        fs::write(store.path(), &bytes[..bytes.len() - 3]).unwrap();
        assert!(matches!(store.load(), Err(ResolveError::CacheUnavailable { .. })));

        fs::write(store.path(), &bytes[..10]).unwrap();
        assert!(store.load().unwrap_err().to_string().contains("too small"));
    }

    #[test]
    fn test_load_foreign_file() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");
        fs::write(store.path(), "<?php AutoLoader::instance()->setClassMap(array());\n".repeat(4)).unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("invalid magic bytes"));
    }

    #[test]
    fn test_invalidate() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");
        store.save(&sample_table()).unwrap();

        store.invalidate().unwrap();
        assert!(!store.exists());

        // Second call is a no-op
        store.invalidate().unwrap();
    }

    #[test]
    fn test_info() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");
        store.save(&sample_table()).unwrap();

        let info = store.info().unwrap();
        assert_eq!(info.symbols, 3);
        assert!(info.size_bytes > HEADER_SIZE as u64);
        assert!(chrono::DateTime::parse_from_rfc3339(&info.generated_at).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path(), ".classmap.cache");
        store.save(&sample_table()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o664);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().join("missing"), ".classmap.cache");

        let err = store.save(&sample_table()).unwrap_err();
        assert!(matches!(err, ResolveError::CacheWrite { .. }));
    }
}
