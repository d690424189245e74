//! Build-time schema hash computation for automatic cache invalidation
//!
//! This build script hashes every source file that defines the on-disk layout
//! of the symbol cache. The hash is exported as `CACHE_SCHEMA_HASH` and written
//! into the header of `.classmap.cache`; an artifact produced by a build with a
//! different hash is treated as unavailable and the symbol map is rebuilt.
//!
//! ## Cache-critical files:
//! - src/cache.rs: artifact header and payload layout
//! - src/models.rs: `SymbolTable` and the other serialized structures

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Cache-critical source files that affect binary format compatibility
const CACHE_CRITICAL_FILES: &[&str] = &[
    "src/cache.rs",
    "src/models.rs",
];

fn main() {
    let schema_hash = compute_schema_hash();

    println!("cargo:rustc-env=CACHE_SCHEMA_HASH={}", schema_hash);

    for file in CACHE_CRITICAL_FILES {
        println!("cargo:rerun-if-changed={}", file);
    }
}

/// Compute a deterministic hash of all cache-critical source files
fn compute_schema_hash() -> String {
    let mut hasher = blake3::Hasher::new();

    // Sorted so the hash does not depend on the order of the list above
    let files: BTreeSet<&str> = CACHE_CRITICAL_FILES.iter().copied().collect();

    for file_path in &files {
        let path = Path::new(file_path);

        if !path.exists() {
            panic!("Cache-critical file not found: {}", file_path);
        }

        let content = fs::read(path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", file_path, e));

        hasher.update(file_path.as_bytes());
        hasher.update(&content);
    }

    // First 8 bytes as 16 hex chars, stored verbatim in the artifact header
    let hash = hasher.finalize();
    hash.as_bytes()[..8]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
}
