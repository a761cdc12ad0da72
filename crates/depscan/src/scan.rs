//! Scan entry points: full scan, prescan and batch scan.

use std::sync::Arc;
use std::time::Instant;

use depscan_config::ScanConfig;
use depscan_graph::{
    DependenciesCache, ModuleDependencyId, ModuleDependencyKind, ScanningService, topological_sort,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cas::{ContentStore, InMemoryCas};
use crate::diagnose::diagnose_cycle;
use crate::diagnostics::DiagnosticSink;
use crate::finalize::resolve_dependency_command_lines;
use crate::link_libraries::resolve_implicit_link_libraries;
use crate::main_module::{MainModuleInput, main_module_dependency_info};
use crate::oracle::ScanningOracle;
use crate::output::{DependencyGraph, ImportSet, build_dependency_graph};
use crate::scanner::DependencyScanner;
use crate::{Result, ScanError};

/// One entry of a batch scan. Exactly one of the module names is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchScanInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nextcode_module_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clang_module_name: Option<String>,
    /// Whitespace-separated scanning arguments.
    #[serde(default)]
    pub arguments: String,
    /// Where the caller wants the graph written.
    pub output: String,
}

impl BatchScanInput {
    pub fn nextcode(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            nextcode_module_name: Some(name.into()),
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn clang(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            clang_module_name: Some(name.into()),
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }

    /// Parses a JSON array of entries.
    pub fn parse_list(text: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Runs scans against one long-lived [`ScanningService`].
///
/// Every scan gets its own [`DependenciesCache`], so records found by one
/// scan are reused by the next one with the same context hash.
#[derive(Debug, Clone)]
pub struct DependencyScanTool {
    config: Arc<ScanConfig>,
    oracle: Arc<dyn ScanningOracle>,
    service: Arc<ScanningService>,
    cas: Option<Arc<dyn ContentStore>>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl DependencyScanTool {
    /// Creates a tool with a fresh service. An in-memory content store is
    /// used when CAS is enabled in `config`.
    pub fn new(
        config: ScanConfig,
        oracle: Arc<dyn ScanningOracle>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let cas: Option<Arc<dyn ContentStore>> = if config.cas.enabled {
            Some(Arc::new(InMemoryCas::new()))
        } else {
            None
        };
        Self {
            config: Arc::new(config),
            oracle,
            service: Arc::new(ScanningService::new()),
            cas,
            diagnostics,
        }
    }

    /// Uses an existing service, e.g. one loaded from disk.
    pub fn with_service(mut self, service: Arc<ScanningService>) -> Self {
        self.service = service;
        self
    }

    pub fn with_content_store(mut self, cas: Arc<dyn ContentStore>) -> Self {
        self.cas = Some(cas);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<ScanningService> {
        &self.service
    }

    pub fn content_store(&self) -> Option<&Arc<dyn ContentStore>> {
        self.cas.as_ref()
    }

    /// Scans the full graph of the main module described by `input`.
    pub fn perform_module_scan(&self, input: &MainModuleInput) -> Result<DependencyGraph> {
        if input.name.is_empty() {
            return Err(ScanError::InvalidInput(
                "main module name must not be empty".to_string(),
            ));
        }
        self.config.validate()?;
        let started = Instant::now();
        let scanner = self.scanner(Arc::clone(&self.config))?;
        let mut cache = DependenciesCache::new(
            Arc::clone(&self.service),
            input.name.as_str(),
            self.config.module_output_path.as_str(),
            self.config.context_hash(),
        );

        let mut main_info = main_module_dependency_info(input, &self.config);
        let mut command_line = main_info.command_line().to_vec();
        for name in &input.can_import_checks {
            if scanner.can_import_module(name)? {
                command_line.extend(["-module-can-import".to_string(), name.clone()]);
            }
        }
        main_info.update_command_line(command_line)?;

        let main_id = ModuleDependencyId::source(input.name.as_str());
        if cache.has_dependency_id(&main_id)? {
            cache.update_dependency(&main_id, main_info)?;
        } else {
            cache.record_dependency(&input.name, main_info)?;
        }

        let modules = scanner.get_module_dependencies(&main_id, &mut cache)?;
        diagnose_cycle(self.diagnostics.as_ref(), &main_id, &cache)?;
        let order = topological_sort(&modules, |id| cache.all_dependencies(id))?;

        resolve_implicit_link_libraries(&self.config, &mut cache)?;
        resolve_dependency_command_lines(
            &self.config,
            self.cas.as_deref(),
            self.diagnostics.as_ref(),
            &mut cache,
            &order,
        )?;

        let graph = build_dependency_graph(&cache, &modules)?;
        tracing::info!(
            module = %input.name,
            modules = graph.modules.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dependency scan complete"
        );
        Ok(graph)
    }

    /// Lists what the main module imports without resolving anything.
    pub fn perform_module_prescan(&self, input: &MainModuleInput) -> Result<ImportSet> {
        let info = main_module_dependency_info(input, &self.config);
        let imports = info.import_names().map(str::to_string).collect();
        Ok(ImportSet { imports })
    }

    /// Scans each entry's module as the root of its own graph.
    ///
    /// Entries are independent: a failure is reported in that entry's slot
    /// and the remaining entries are still scanned. Entries with the same
    /// arguments share one scanner.
    pub fn perform_batch_module_scan(
        &self,
        inputs: &[BatchScanInput],
    ) -> Vec<Result<DependencyGraph>> {
        let mut scanners: FxHashMap<String, (Arc<ScanConfig>, Arc<DependencyScanner>)> =
            FxHashMap::default();

        inputs
            .iter()
            .map(|input| {
                let (config, scanner) = match scanners.get(&input.arguments) {
                    Some(found) => found.clone(),
                    None => {
                        let config = Arc::new(apply_batch_arguments(
                            &self.config,
                            &input.arguments,
                        )?);
                        let scanner = Arc::new(self.scanner(Arc::clone(&config))?);
                        scanners.insert(
                            input.arguments.clone(),
                            (Arc::clone(&config), Arc::clone(&scanner)),
                        );
                        (config, scanner)
                    }
                };
                self.scan_batch_entry(input, &config, &scanner)
            })
            .collect()
    }

    fn scan_batch_entry(
        &self,
        input: &BatchScanInput,
        config: &ScanConfig,
        scanner: &DependencyScanner,
    ) -> Result<DependencyGraph> {
        let (name, clang) = match (&input.nextcode_module_name, &input.clang_module_name) {
            (Some(name), None) => (name.as_str(), false),
            (None, Some(name)) => (name.as_str(), true),
            _ => {
                return Err(ScanError::InvalidInput(format!(
                    "batch entry for '{}' must name exactly one module",
                    input.output
                )));
            }
        };
        let _span = tracing::debug_span!("batch", module = name, clang).entered();

        let mut cache = DependenciesCache::new(
            Arc::clone(&self.service),
            name,
            config.module_output_path.as_str(),
            config.context_hash(),
        );
        let root_info = if clang {
            scanner.get_named_clang_module_dependency_info(name, &mut cache)?
        } else {
            scanner.get_named_nextcode_module_dependency_info(name, &mut cache)?
        };
        let Some(root_info) = root_info else {
            let kind = if clang {
                ModuleDependencyKind::Clang
            } else {
                ModuleDependencyKind::Interface
            };
            return Err(ScanError::ModuleNotFound {
                name: name.to_string(),
                importer: ModuleDependencyId::new(name, kind),
            });
        };
        let root = ModuleDependencyId::new(name, root_info.kind());

        let modules = scanner.get_module_dependencies(&root, &mut cache)?;
        diagnose_cycle(self.diagnostics.as_ref(), &root, &cache)?;
        let order = topological_sort(&modules, |id| cache.all_dependencies(id))?;
        resolve_dependency_command_lines(
            config,
            self.cas.as_deref(),
            self.diagnostics.as_ref(),
            &mut cache,
            &order,
        )?;
        build_dependency_graph(&cache, &modules)
    }

    fn scanner(&self, config: Arc<ScanConfig>) -> Result<DependencyScanner> {
        DependencyScanner::new(
            config,
            self.oracle.as_ref(),
            Arc::clone(&self.diagnostics),
        )
    }
}

/// Applies the flags of a batch entry on top of `base`.
fn apply_batch_arguments(base: &ScanConfig, arguments: &str) -> Result<ScanConfig> {
    let mut config = base.clone();
    let mut args = arguments.split_whitespace();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .map(str::to_string)
                .ok_or_else(|| ScanError::InvalidInput(format!("missing value after '{flag}'")))
        };
        match arg {
            "-frontend" | "-scan-dependencies" => {}
            "-Xcc" => config.search.clang_args.push(value(arg)?),
            "-target" => config.target.triple = value(arg)?,
            "-clang-target" => config.target.clang_target = Some(value(arg)?),
            "-vfsoverlay" => config.search.vfs_overlays.push(value(arg)?),
            "-enable-objc-interop" => config.language.objc_interop = true,
            "-disable-objc-interop" => config.language.objc_interop = false,
            "-cxx-interoperability-mode=default" => config.language.cxx_interop = true,
            "-cxx-interoperability-mode=off" => config.language.cxx_interop = false,
            "-enable-embedded" => config.language.embedded = true,
            other => {
                return Err(ScanError::InvalidInput(format!(
                    "unsupported batch argument '{other}'"
                )));
            }
        }
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_arguments_override_the_base() {
        let base = ScanConfig::default();
        let config = apply_batch_arguments(
            &base,
            "-target arm64-apple-macos14 -Xcc -DDEBUG -vfsoverlay /o.yaml -enable-objc-interop",
        )
        .unwrap();

        assert_eq!(config.target.triple, "arm64-apple-macos14");
        assert_eq!(config.search.clang_args, ["-DDEBUG"]);
        assert_eq!(config.search.vfs_overlays, ["/o.yaml"]);
        assert!(config.language.objc_interop);
        assert_ne!(config.context_hash(), base.context_hash());
    }

    #[test]
    fn batch_arguments_reject_unknown_flags() {
        let base = ScanConfig::default();
        assert!(matches!(
            apply_batch_arguments(&base, "-O"),
            Err(ScanError::InvalidInput(_))
        ));
        assert!(matches!(
            apply_batch_arguments(&base, "-target"),
            Err(ScanError::InvalidInput(_))
        ));
    }

    #[test]
    fn batch_list_parses_camel_case() {
        let list = BatchScanInput::parse_list(
            r#"[{"nextcodeModuleName": "Foo", "arguments": "", "output": "/out/Foo.json"},
                {"clangModuleName": "Bar", "output": "/out/Bar.json"}]"#,
        )
        .unwrap();
        assert_eq!(list[0], BatchScanInput::nextcode("Foo", "/out/Foo.json"));
        assert_eq!(list[1].clang_module_name.as_deref(), Some("Bar"));
    }
}
