// API error path tests
// These cover configuration, naming and collection failures surfaced by the API layer

use extension_endpoint::error::{BuildError, CollectError, ConfigError, NamingError};
use extension_endpoint::{load_extension, BuildOptions};
use miette::Diagnostic;
use std::fs;
use std::path::Path;

fn options() -> BuildOptions {
    BuildOptions {
        compile_protos: false,
        ..BuildOptions::default()
    }
}

fn extension_root(config: &str) -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("config.yaml"), config).unwrap();
    fs::create_dir_all(root.path().join("src")).unwrap();
    root
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_missing_config() {
    let root = tempfile::tempdir().unwrap();
    let result = load_extension(root.path(), &options());
    if let Err(BuildError::Config(ConfigError::NotFound { path })) = result {
        assert!(path.ends_with("config.yaml"));
    } else {
        panic!("Expected missing config error");
    }
}

#[test]
fn test_malformed_config_has_span() {
    let root = extension_root("name: X\nnamespace: [oops\n");
    let err = load_extension(root.path(), &options()).unwrap_err();
    assert!(matches!(err, BuildError::Config(ConfigError::Malformed { .. })));
    assert!(err.labels().is_some());
    assert_eq!(
        err.code().map(|c| c.to_string()),
        Some("config::malformed".to_string())
    );
}

#[test]
fn test_invalid_namespace() {
    let root = extension_root("name: X\nnamespace: com.my-ext\n");
    let result = load_extension(root.path(), &options());
    assert!(matches!(
        result,
        Err(BuildError::Config(ConfigError::InvalidNamespace { .. }))
    ));
}

#[test]
fn test_missing_source_dir() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("config.yaml"), "name: X\nnamespace: x\n").unwrap();
    let result = load_extension(root.path(), &options());
    assert!(matches!(
        result,
        Err(BuildError::Collect(CollectError::MissingSourceDir { .. }))
    ));
}

#[test]
fn test_dotted_sql_file_name() {
    let root = extension_root("name: X\nnamespace: x\n");
    write(root.path(), "src/m/sql_modules/foo.bar.sql", "SELECT 1;");
    let result = load_extension(root.path(), &options());
    assert!(matches!(
        result,
        Err(BuildError::Naming(NamingError::DottedComponent { .. }))
    ));
}

#[test]
fn test_malformed_macro() {
    let root = extension_root("name: X\nnamespace: x\n");
    write(root.path(), "src/m/macros/broken.yaml", "commands:\n  - id: a\n");
    let err = load_extension(root.path(), &options()).unwrap_err();
    match err {
        BuildError::Collect(CollectError::MalformedMacro { message, .. }) => {
            assert!(message.contains("name"));
        }
        other => panic!("Expected malformed macro error, got {other:?}"),
    }
}

#[test]
fn test_duplicate_macro_ids_across_directories() {
    let root = extension_root("name: X\nnamespace: x\n");
    write(root.path(), "src/m/macros/tools/pin.yaml", "name: A\n");
    write(root.path(), "src/m/macros/Tools/pin.yaml", "name: B\n");
    let result = load_extension(root.path(), &options());
    assert!(matches!(
        result,
        Err(BuildError::Collect(CollectError::DuplicateName { .. }))
    ));
}

#[test]
fn test_error_display() {
    let root = tempfile::tempdir().unwrap();
    let err = load_extension(root.path(), &options()).unwrap_err();
    let error_string = format!("{}", err);
    assert!(error_string.contains("config.yaml"));
}
