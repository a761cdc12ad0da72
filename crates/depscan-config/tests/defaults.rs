//! Tests for default values.

use depscan_config::{CasConfig, LanguageConfig, ScanConfig, SearchConfig, TargetConfig};

#[test]
fn scan_config_defaults() {
    let config = ScanConfig::default();
    assert!(config.parallel);
    assert!(config.jobs.is_none());
    assert_eq!(config.module_output_path, "modules");
    assert!(!config.use_jit);
    assert!(config.worker_count() >= 1);
    assert!(config.validate().is_ok());
}

#[test]
fn language_defaults() {
    let language = LanguageConfig::default();
    assert!(language.cross_import_overlays);
    assert!(language.implicit_stdlib_import);
    assert_eq!(language.stdlib_name, "NeXTCode");
    assert_eq!(language.apinotes_version, "5");
    assert!(!language.cxx_interop);
    assert!(!language.objc_interop);
    assert!(language.testable_imports.is_empty());
}

#[test]
fn target_defaults() {
    let target = TargetConfig::default();
    assert_eq!(target.triple, "x86_64-unknown-linux-gnu");
    assert!(target.clang_target.is_none());
    assert!(target.runtime_compatibility_version.is_none());
}

#[test]
fn cas_and_search_defaults() {
    assert!(!CasConfig::default().enabled);
    assert!(CasConfig::default().prefix_map.is_empty());
    let search = SearchConfig::default();
    assert!(search.vfs_overlays.is_empty());
    assert!(search.clang_args.is_empty());
}
