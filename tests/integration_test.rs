//! Integration tests for classmap
//!
//! Exercise the public API end-to-end against scratch copies of the PHP
//! corpus: scanning, the cache artifact, and the autoload protocol.


use classmap::{
    Autoload, AutoloadChain, CacheStore, DeclarationKind, IncludeHost, RebuildRefusal,
    RebuildState, ResolveError, Resolver, ResolverConfig, Scanner, declarations,
};
use std::path::Path;
use tempfile::TempDir;
use test_helpers::*;

// ==================== Scanning ====================

#[test]
fn test_corpus_symbol_map() {
    let corpus = corpus_copy();
    let outcome = Scanner::new(corpus.path()).scan().unwrap();
    let table = &outcome.table;

    assert_maps_to(table, "Widget", "src/Widget.php");
    assert_maps_to(table, "App\\Models\\Model", "src/Models/Model.php");
    assert_maps_to(table, "App\\Models\\User", "src/Models/User.php");
    assert_maps_to(table, "App\\Contracts\\HasName", "src/Contracts/HasName.php");
    assert_maps_to(table, "App\\Concerns\\Greets", "src/Concerns/Greets.php");
    assert_maps_to(table, "App\\Enums\\Status", "src/Enums/Status.php");
    assert_maps_to(table, "Lib\\One\\First", "lib/bundle.php");
    assert_maps_to(table, "Lib\\Two\\Second", "lib/bundle.php");
    assert_maps_to(table, "Lib\\Two\\Third", "lib/bundle.php");
    assert_maps_to(table, "GlobalHelper", "lib/bundle.php");
    assert_maps_to(table, "Legacy_Old_Thing", "legacy/Old.php4");
    assert_maps_to(table, "Acme\\Dependency", "vendor/acme/Dependency.php");
    assert_maps_to(table, "LayoutHelper", "views/layout.php");
    assert_maps_to(table, "Duplicate", "dup/b/Duplicate.php");
    assert_maps_to(table, "App\\Support\\Arr", "src/Support/helpers.php");
    assert_maps_to(table, "Str", "src/Support/helpers.php");
    assert_absent(table, "App\\Support\\Str");

    assert_eq!(table.len(), 16);
    assert_eq!(outcome.files_scanned, 13);
}

#[test]
fn test_corpus_false_positives_are_absent() {
    let corpus = corpus_copy();
    let table = Scanner::new(corpus.path()).rebuild().unwrap();

    // Comments, strings, heredocs, inline HTML and `::class`
    assert_absent(&table, "Admin");
    assert_absent(&table, "Heredoc");
    assert_absent(&table, "HtmlComment");
    assert_absent(&table, "InHtml");
    // .html is not an accepted extension
    assert_absent(&table, "NotSource");
}

#[test]
fn test_user_file_declaration_details() {
    let source = std::fs::read_to_string(corpus_source().join("src/Models/User.php")).unwrap();
    let decls: Vec<_> = declarations(&source).collect();

    assert_eq!(decls.len(), 1);
    assert_eq!(decls[0].name, "App\\Models\\User");
    assert_eq!(decls[0].kind, DeclarationKind::Class);
    assert_eq!(decls[0].line, 14);
}

#[test]
fn test_bundle_declaration_kinds() {
    let source = std::fs::read_to_string(corpus_source().join("lib/bundle.php")).unwrap();
    let kinds: Vec<_> = declarations(&source).map(|d| (d.name, d.kind)).collect();

    assert_eq!(
        kinds,
        vec![
            ("Lib\\One\\First".to_string(), DeclarationKind::Class),
            ("Lib\\Two\\Second".to_string(), DeclarationKind::Interface),
            ("Lib\\Two\\Third".to_string(), DeclarationKind::Class),
            ("GlobalHelper".to_string(), DeclarationKind::Class),
        ]
    );
}

#[test]
fn test_hidden_entries_never_scanned() {
    let corpus = corpus_copy();
    write_file(corpus.path(), ".git/objects/Blob.php", "<?php class Blob {}");
    write_file(corpus.path(), "src/.Draft.php", "<?php class Draft {}");

    let table = Scanner::new(corpus.path()).rebuild().unwrap();
    assert_absent(&table, "Blob");
    assert_absent(&table, "Draft");
}

// ==================== Cache ====================

#[test]
fn test_cache_shared_between_resolvers() {
    let corpus = corpus_copy();

    let mut first = Resolver::new(ResolverConfig::new(corpus.path()), CountingHost::default());
    first.init().unwrap();
    assert_eq!(first.rebuild_state(), RebuildState::Rebuilt);

    // A new file appears after the map was built
    write_file(corpus.path(), "src/Fresh.php", "<?php class Fresh {}");

    let mut second = Resolver::new(ResolverConfig::new(corpus.path()), CountingHost::default());
    second.init().unwrap();
    assert_eq!(second.rebuild_state(), RebuildState::NotRebuilt);
    assert_eq!(second.symbols(), first.symbols());
    assert_absent(second.symbols(), "Fresh");
}

#[test]
fn test_custom_cache_file_name() {
    let corpus = corpus_copy();
    let config = ResolverConfig {
        cache_file: "classmap.php".to_string(),
        ..ResolverConfig::new(corpus.path())
    };

    let mut resolver = Resolver::new(config, CountingHost::default());
    resolver.init().unwrap();
    assert!(corpus.path().join("classmap.php").exists());

    resolver.expire_cache().unwrap();
    assert!(!corpus.path().join("classmap.php").exists());
}

#[test]
fn test_corrupt_cache_triggers_rebuild() {
    let corpus = corpus_copy();
    let store = CacheStore::new(corpus.path(), ".classmap.cache");
    std::fs::write(store.path(), b"garbage").unwrap();

    let mut resolver = Resolver::new(ResolverConfig::new(corpus.path()), CountingHost::default());
    resolver.init().unwrap();

    assert_eq!(resolver.rebuild_state(), RebuildState::Rebuilt);
    assert_eq!(store.load().unwrap().len(), 16);
}

// ==================== Resolver ====================

#[test]
fn test_end_to_end_single_rebuild() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "A.php", "<?php class Widget {}");

    let mut resolver = Resolver::new(ResolverConfig::new(temp.path()), CountingHost::default());

    // Missing cache: the first lookup scans and finds the class
    assert!(resolver.autoload("widget"));
    assert_eq!(resolver.rebuild_state(), RebuildState::Rebuilt);
    assert_eq!(resolver.host().loads, vec![temp.path().join("A.php")]);
    assert!(resolver.cache_location().exists());

    // Unknown symbol: no second rebuild is permitted
    assert!(!resolver.autoload("nonexistent"));
    assert!(matches!(
        resolver.rebuild(),
        Err(ResolveError::RebuildNotAllowed(RebuildRefusal::AlreadyRebuilt))
    ));
    assert_eq!(resolver.host().loads.len(), 1);
}

#[test]
fn test_already_defined_symbols_are_not_loaded() {
    let corpus = corpus_copy();
    let mut host = CountingHost::default();
    host.defined.insert("widget".to_string());

    let mut resolver = Resolver::new(ResolverConfig::new(corpus.path()), host);

    assert!(resolver.autoload("\\Widget"));
    assert!(resolver.host().loads.is_empty());
    // The table was never needed
    assert!(!resolver.is_initialized());
}

#[test]
fn test_ignore_vendor_on_rebuild() {
    let corpus = corpus_copy();
    let mut resolver = Resolver::new(ResolverConfig::new(corpus.path()), CountingHost::default());
    resolver.ignore("vendor").ignore(corpus.path().join("dup").join("a"));

    let stats = resolver.rebuild().unwrap();
    assert_eq!(stats.symbols, 15);
    assert_absent(resolver.symbols(), "Acme\\Dependency");
    assert_maps_to(resolver.symbols(), "Duplicate", "dup/b/Duplicate.php");

    assert!(resolver.ignored().contains(Path::new("vendor")));
    assert!(resolver.ignored().contains(Path::new("dup/a")));
}

#[test]
fn test_config_ignore_and_extensions() {
    let corpus = corpus_copy();
    std::fs::write(
        corpus.path().join("classmap.toml"),
        r#"
ignore = ["vendor", "legacy"]

[extensions]
".php" = true
html = true
"#,
    )
    .unwrap();

    let config = classmap::load_config(corpus.path()).unwrap();
    let mut resolver = Resolver::new(config, CountingHost::default());
    resolver.init().unwrap();

    let table = resolver.symbols();
    assert_absent(table, "Acme\\Dependency");
    assert_absent(table, "Legacy_Old_Thing");
    assert_maps_to(table, "NotSource", "views/page.html");
}

#[test]
fn test_rebuild_disabled_uses_cache_only() {
    let corpus = corpus_copy();
    let config = ResolverConfig::new(corpus.path()).with_allow_rebuild(false);
    let mut resolver = Resolver::new(config, CountingHost::default());

    // No cache and no permission to scan
    assert!(!resolver.autoload("Widget"));
    assert_eq!(resolver.rebuild_state(), RebuildState::NotRebuilt);
    assert!(resolver.host().loads.is_empty());
}

#[test]
fn test_include_host_resolves_dependencies_through_chain() {
    let corpus = corpus_copy();
    let mut resolver = Resolver::new(ResolverConfig::new(corpus.path()), IncludeHost::new());

    let mut chain = AutoloadChain::new();
    chain.register(&mut resolver);

    for symbol in ["App\\Models\\User", "App\\Models\\Model", "App\\Contracts\\HasName"] {
        assert!(chain.autoload(symbol), "failed to autoload {}", symbol);
    }
    assert!(!chain.autoload("App\\Models\\Missing"));
    drop(chain);

    let included = resolver.host().included_files();
    assert_eq!(included.len(), 3);
    assert_eq!(included[0], corpus.path().join("src/Models/User.php"));

    // Already defined now: nothing more to include
    assert!(resolver.autoload("app\\models\\user"));
    assert_eq!(resolver.host().included_files().len(), 3);
}

#[test]
fn test_lookup_reports_absolute_paths() {
    let corpus = corpus_copy();
    let mut resolver = Resolver::new(ResolverConfig::new(corpus.path()), CountingHost::default());

    assert_eq!(
        resolver.lookup("app\\enums\\STATUS"),
        Some(corpus.path().join("src").join("Enums").join("Status.php"))
    );
    assert_eq!(resolver.lookup("Nope"), None);
}
