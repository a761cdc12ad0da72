//! The record of the module being built.

use depscan_config::ScanConfig;
use depscan_graph::{ImportLocation, ModuleDependencyInfo, SourceDetails, TextualDetails};
use serde::{Deserialize, Serialize};

use crate::command_line::{extra_pcm_args, source_build_command_line};

/// An `import` written in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceImport {
    /// Dotted module path, e.g. `Foo` or `Foo.Private`.
    pub path: String,
    pub location: Option<ImportLocation>,
}

impl SourceImport {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: ImportLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// Everything known about the main module before scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MainModuleInput {
    pub name: String,
    pub source_files: Vec<String>,
    pub imports: Vec<SourceImport>,
    pub bridging_header: Option<String>,
    /// Modules probed with `canImport` in the sources.
    pub can_import_checks: Vec<String>,
}

impl MainModuleInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn source_file(mut self, path: impl Into<String>) -> Self {
        self.source_files.push(path.into());
        self
    }

    pub fn import(mut self, import: SourceImport) -> Self {
        self.imports.push(import);
        self
    }

    pub fn bridging_header(mut self, path: impl Into<String>) -> Self {
        self.bridging_header = Some(path.into());
        self
    }
}

/// Builds the unresolved source record of the main module.
///
/// Imports are added in this order: the standard library, configured
/// implicit imports, the module's own name when it imports its underlying
/// Clang module, then the source imports.
pub fn main_module_dependency_info(
    input: &MainModuleInput,
    config: &ScanConfig,
) -> ModuleDependencyInfo {
    let language = &config.language;
    let details = SourceDetails {
        source_files: input.source_files.clone(),
        testable_imports: language.testable_imports.iter().cloned().collect(),
        textual: TextualDetails {
            build_command_line: source_build_command_line(&input.name, config),
            extra_pcm_args: extra_pcm_args(config),
            bridging_header: input.bridging_header.clone(),
            ..Default::default()
        },
        ..Default::default()
    };
    let mut info = ModuleDependencyInfo::new(details);

    if language.implicit_stdlib_import && input.name != language.stdlib_name {
        info.add_module_import(&language.stdlib_name, None);
    }
    for import in &language.additional_implicit_imports {
        add_dotted_import(&mut info, import, None);
    }
    if language.import_underlying_module {
        info.add_module_import(&input.name, None);
    }
    for import in &input.imports {
        add_dotted_import(&mut info, &import.path, import.location.clone());
    }
    info
}

fn add_dotted_import(
    info: &mut ModuleDependencyInfo,
    path: &str,
    location: Option<ImportLocation>,
) {
    let components: Vec<&str> = path.split('.').collect();
    info.add_module_import_path(&components, location);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_order_and_stdlib() {
        let mut config = ScanConfig::default();
        config.language.additional_implicit_imports = vec!["Shims".into()];
        config.language.import_underlying_module = true;
        let input = MainModuleInput::new("App")
            .source_file("/src/main.nc")
            .import(SourceImport::new("Foo").at(ImportLocation::new("/src/main.nc", 1, 8)))
            .import(SourceImport::new("Bar.Private"));

        let info = main_module_dependency_info(&input, &config);
        let names: Vec<&str> = info.import_names().collect();
        assert_eq!(names, ["NeXTCode", "Shims", "App", "Foo", "Bar"]);
        let optional: Vec<&str> = info.optional_import_names().collect();
        assert_eq!(optional, ["Bar_Private"]);
        assert_eq!(
            info.imports()[3].first_location(),
            Some(&ImportLocation::new("/src/main.nc", 1, 8))
        );
    }

    #[test]
    fn stdlib_does_not_import_itself() {
        let config = ScanConfig::default();
        let info = main_module_dependency_info(&MainModuleInput::new("NeXTCode"), &config);
        assert_eq!(info.import_names().count(), 0);

        let mut config = ScanConfig::default();
        config.language.implicit_stdlib_import = false;
        let info = main_module_dependency_info(&MainModuleInput::new("App"), &config);
        assert_eq!(info.import_names().count(), 0);
    }

    #[test]
    fn carries_testable_imports_and_bridging_header() {
        let mut config = ScanConfig::default();
        config.language.testable_imports = vec!["Core".into()];
        let input = MainModuleInput::new("AppTests").bridging_header("/src/Bridging.h");

        let info = main_module_dependency_info(&input, &config);
        assert!(info.is_testable_import("Core"));
        assert_eq!(info.bridging_header(), Some("/src/Bridging.h"));
        assert_eq!(info.command_line()[..3], ["-frontend", "-module-name", "AppTests"]);
    }
}
