//! Tests for layered loading: file, environment and overrides.

use std::fs;

use depscan_config::figment::providers::Serialized;
use depscan_config::{ConfigError, ScanConfig, Version};
use serial_test::serial;
use tempfile::TempDir;

fn no_overrides() -> Serialized<serde_json::Value> {
    Serialized::defaults(serde_json::json!({}))
}

#[test]
#[serial]
fn discovers_config_in_ancestor_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("depscan.toml"),
        r#"
parallel = false
module_output_path = "/build/modules"

[language]
cxx_interop = true

[target]
triple = "arm64-apple-macosx14.0"
runtime_compatibility_version = "5.4"
"#,
    )
    .unwrap();
    let nested = dir.path().join("a/b");
    fs::create_dir_all(&nested).unwrap();

    let config = ScanConfig::load(&nested, None, no_overrides()).unwrap();

    assert!(!config.parallel);
    assert_eq!(config.module_output_path, "/build/modules");
    assert!(config.language.cxx_interop);
    assert_eq!(
        config.target.runtime_compatibility_version,
        Some(Version::new(5, 4))
    );
}

#[test]
#[serial]
fn overrides_beat_file_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "jobs = 2\n").unwrap();

    let config = ScanConfig::load(
        dir.path(),
        Some(&path),
        Serialized::defaults(serde_json::json!({ "jobs": 6 })),
    )
    .unwrap();

    assert_eq!(config.jobs, Some(6));
}

#[test]
#[serial]
fn environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("depscan.toml"), "[language]\nobjc_interop = false\n").unwrap();

    // SAFETY: serialized with every other test that touches the environment.
    unsafe { std::env::set_var("DEPSCAN_LANGUAGE__OBJC_INTEROP", "true") };
    let config = ScanConfig::load(dir.path(), None, no_overrides());
    unsafe { std::env::remove_var("DEPSCAN_LANGUAGE__OBJC_INTEROP") };

    assert!(config.unwrap().language.objc_interop);
}

#[test]
#[serial]
fn explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = ScanConfig::load(
        dir.path(),
        Some(&dir.path().join("nope.toml")),
        no_overrides(),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn invalid_values_are_rejected() {
    let err = ScanConfig::from_toml_str("jobs = 0").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue(_)));

    let err = ScanConfig::from_toml_str("[target]\nruntime_compatibility_version = \"x.y\"\n")
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue(_)));
}
