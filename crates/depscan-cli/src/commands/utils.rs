//! Loading inputs and writing outputs shared by the commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use depscan::{DependencyScanTool, DiagnosticCollector, MainModuleInput, ModuleIndex, SourceImport};
use depscan_config::ScanConfig;
use depscan_config::figment::providers::Serialized;
use depscan_graph::ScanningService;
use serde_json::{Map, Value};

use crate::cli::{MainModuleArgs, ScanOptions};
use crate::error::{CliError, Result, ResultExt};

pub fn get_cwd() -> Result<PathBuf> {
    Ok(std::env::current_dir()?)
}

/// Loads configuration with CLI flags layered on top.
pub fn load_config(options: &ScanOptions) -> Result<ScanConfig> {
    load_config_with(options.config.as_deref(), config_overrides(options))
}

/// Loads configuration from `config_path` (or the discovered `depscan.toml`)
/// with `overrides` taking priority.
pub fn load_config_with(
    config_path: Option<&Path>,
    overrides: Map<String, Value>,
) -> Result<ScanConfig> {
    let overrides = Serialized::defaults(Value::Object(overrides));
    let config = ScanConfig::load(&get_cwd()?, config_path, overrides)?;
    tracing::debug!(
        context_hash = %config.context_hash(),
        workers = config.worker_count(),
        "Loaded configuration"
    );
    Ok(config)
}

/// Configuration keys set by flags. Unset flags are left out so lower
/// layers stay visible.
pub(crate) fn config_overrides(options: &ScanOptions) -> Map<String, Value> {
    let mut root = Map::new();
    if options.serial {
        root.insert("parallel".into(), Value::Bool(false));
    }
    if let Some(jobs) = options.jobs {
        root.insert("jobs".into(), Value::from(jobs));
    }
    if let Some(path) = &options.module_output_path {
        root.insert("module_output_path".into(), Value::from(path.clone()));
    }
    if options.cas {
        let mut cas = Map::new();
        cas.insert("enabled".into(), Value::Bool(true));
        root.insert("cas".into(), Value::Object(cas));
    }
    if let Some(triple) = &options.target {
        let mut target = Map::new();
        target.insert("triple".into(), Value::from(triple.clone()));
        root.insert("target".into(), Value::Object(target));
    }

    let mut language = Map::new();
    if options.cxx_interop {
        language.insert("cxx_interop".into(), Value::Bool(true));
    }
    if options.objc_interop {
        language.insert("objc_interop".into(), Value::Bool(true));
    }
    if !language.is_empty() {
        root.insert("language".into(), Value::Object(language));
    }
    root
}

pub fn load_index(path: &Path) -> Result<ModuleIndex> {
    let text = std::fs::read_to_string(path).with_path(path)?;
    let index = ModuleIndex::from_json(&text)?;
    tracing::debug!(path = %path.display(), modules = index.module_count(), "Loaded module index");
    Ok(index)
}

/// Creates the scan tool, reusing the scanning cache when one exists.
pub fn build_tool(
    options: &ScanOptions,
    config: ScanConfig,
) -> Result<(DependencyScanTool, Arc<DiagnosticCollector>)> {
    let index = load_index(&options.index)?;
    let diagnostics = Arc::new(DiagnosticCollector::new());
    let mut tool = DependencyScanTool::new(config, Arc::new(index), diagnostics.clone());

    if let Some(path) = options.cache_path.as_deref().filter(|path| path.is_file()) {
        let service = ScanningService::load(path)?;
        tracing::debug!(path = %path.display(), "Reusing scanning cache");
        tool = tool.with_service(Arc::new(service));
    }
    Ok((tool, diagnostics))
}

pub fn save_cache(tool: &DependencyScanTool, options: &ScanOptions) -> Result<()> {
    let Some(path) = &options.cache_path else {
        return Ok(());
    };
    create_parent_dir(path)?;
    tool.service().save(path)?;
    tracing::debug!(path = %path.display(), "Saved scanning cache");
    Ok(())
}

/// Builds the main module description from flags or from `--input`.
pub fn main_module_input(args: &MainModuleArgs) -> Result<MainModuleInput> {
    let mut input = match (&args.input, &args.module_name) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path).with_path(path)?;
            serde_json::from_str::<MainModuleInput>(&text)?
        }
        (None, Some(name)) => MainModuleInput::new(name.as_str()),
        (None, None) => {
            return Err(CliError::InvalidArgument(
                "either --module-name or --input is required".into(),
            ));
        }
    };

    input.source_files.extend(args.source_files.iter().cloned());
    input
        .imports
        .extend(args.imports.iter().map(|import| SourceImport::new(import.as_str())));
    input.can_import_checks.extend(args.can_import.iter().cloned());
    if let Some(header) = &args.bridging_header {
        input.bridging_header = Some(header.clone());
    }

    if input.name.is_empty() {
        return Err(CliError::InvalidArgument("main module name is empty".into()));
    }
    Ok(input)
}

/// Writes `text` to `path`, or to stdout without one.
pub fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            create_parent_dir(path)?;
            std::fs::write(path, text)?;
            tracing::debug!(path = %path.display(), bytes = text.len(), "Wrote output");
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Resolves `path` against `base` unless it is absolute.
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_contain_set_flags() {
        let options = ScanOptions {
            serial: true,
            cxx_interop: true,
            ..Default::default()
        };
        let overrides = config_overrides(&options);

        assert_eq!(overrides["parallel"], Value::Bool(false));
        assert_eq!(overrides["language"]["cxx_interop"], Value::Bool(true));
        assert!(!overrides.contains_key("jobs"));
        assert!(!overrides.contains_key("cas"));
        assert!(overrides["language"].get("objc_interop").is_none());
    }

    #[test]
    fn flags_extend_the_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.json");
        std::fs::write(
            &path,
            r#"{"name": "App", "sourceFiles": ["/src/a.nc"], "imports": [{"path": "Foo", "location": null}]}"#,
        )
        .unwrap();
        let args = MainModuleArgs {
            input: Some(path),
            imports: vec!["Bar".into()],
            ..Default::default()
        };

        let input = main_module_input(&args).unwrap();
        assert_eq!(input.name, "App");
        let imports: Vec<&str> = input.imports.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(imports, ["Foo", "Bar"]);
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/out");
        assert_eq!(resolve_path(Path::new("Foo.json"), base), PathBuf::from("/out/Foo.json"));
        assert_eq!(resolve_path(Path::new("/abs.json"), base), PathBuf::from("/abs.json"));
    }
}
