use std::fs;

use arbiter_core::registry::Registry;
use tempfile::TempDir;

#[test]
fn test_from_path_reads_registry() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("arbiter.toml");
    fs::write(
        &path,
        r#"
[dependencies]
serde = "^1.0.0"

[projects.serde."1.0.200"]
dependencies = { serde_derive = "==1.0.200" }

[projects.serde_derive."1.0.200"]
"#,
    )
    .unwrap();

    let registry = Registry::from_path(&path).unwrap();
    assert_eq!(registry.resolver.max_iterations, None);
    let root = registry.root_dependencies().unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(registry.versions().unwrap().len(), 2);
}

#[test]
fn test_from_path_missing_file_mentions_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("missing.toml");
    let err = Registry::from_path(&path).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("I/O error"), "got: {text}");
    assert!(text.contains("missing.toml"), "got: {text}");
}

#[test]
fn test_unknown_keys_are_ignored() {
    let registry = Registry::from_str("[package]\nname = \"x\"\n[dependencies]\n").unwrap();
    assert!(registry.dependencies.is_empty());
    assert!(registry.projects.is_empty());
}

#[test]
fn test_compound_requirement_text() {
    let registry = Registry::from_str(
        r#"
[dependencies]
a = ">=1.0.0, ~>1.2.0"
"#,
    )
    .unwrap();
    let root = registry.root_dependencies().unwrap();
    assert_eq!(
        root.get(&"a".to_string()).unwrap().to_string(),
        ">=1.0.0, ~>1.2.0"
    );
}
