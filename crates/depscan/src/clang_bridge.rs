//! Turns Clang scanning tool output into dependency records.

use depscan_config::ScanConfig;
use depscan_graph::{ClangDetails, ClangModuleId, ModuleDependencyId, ModuleDependencyInfo};
use rustc_hash::FxHashSet;

use crate::command_line::{referenced_vfs_overlays, xcc};
use crate::oracle::{ClangModuleDeps, ModuleDependencyVector};

/// Where the explicit build of `id` writes its PCM.
pub fn pcm_output_path(module_output_path: &str, id: &ClangModuleId) -> String {
    format!(
        "{}/{}-{}.pcm",
        module_output_path.trim_end_matches('/'),
        id.name,
        id.context_hash
    )
}

/// Converts every reported Clang module into a resolved record, keeping the
/// tool's order.
pub fn bridge_clang_modules(
    modules: Vec<ClangModuleDeps>,
    module_output_path: &str,
    config: &ScanConfig,
) -> ModuleDependencyVector {
    modules
        .into_iter()
        .map(|module| bridge_clang_module(module, module_output_path, config))
        .collect()
}

fn bridge_clang_module(
    module: ClangModuleDeps,
    module_output_path: &str,
    config: &ScanConfig,
) -> (ModuleDependencyId, ModuleDependencyInfo) {
    let pcm_output_path = pcm_output_path(module_output_path, &module.id);
    let mapped_pcm_path = config.cas.remap_path(&pcm_output_path);
    let module_map_file = config.cas.remap_path(&module.module_map_file);

    let mut command_line: Vec<String> = vec![
        "-frontend".into(),
        "-emit-pcm".into(),
        "-module-name".into(),
        module.id.name.clone(),
        "-o".into(),
        pcm_output_path.clone(),
        "-direct-clang-cc1-module-build".into(),
        module_map_file.clone(),
    ];

    // Only overlays the Clang scanner kept for this module.
    if module.include_tree_id.is_none() {
        let mut used = FxHashSet::default();
        referenced_vfs_overlays(&module.build_arguments, &mut used);
        for overlay in &config.search.vfs_overlays {
            if used.contains(overlay.as_str()) {
                command_line.push("-vfsoverlay".into());
                command_line.push(config.cas.remap_path(overlay));
            }
        }
    }

    command_line.extend(xcc(module.build_arguments.iter().map(String::as_str)));

    if let Some(root) = &module.cas_fs_root_id {
        command_line.push("-cas-fs".into());
        command_line.push(root.clone());
    }
    if let Some(tree) = &module.include_tree_id {
        command_line.push("-clang-include-tree-root".into());
        command_line.push(tree.clone());
    }

    let details = ClangDetails {
        pcm_output_path,
        mapped_pcm_path,
        module_map_file,
        context_hash: module.id.context_hash.clone(),
        build_command_line: command_line,
        file_dependencies: module.file_deps,
        captured_pcm_args: xcc([format!(
            "-fapinotes-nextcode-version={}",
            config.language.apinotes_version
        )]),
        cas_fs_root_id: module.cas_fs_root_id,
        include_tree: module.include_tree_id,
        is_system: module.is_system,
    };

    let mut builder = ModuleDependencyInfo::builder(details);
    let mut direct_dependencies = Vec::with_capacity(module.clang_module_deps.len());
    for dependency in &module.clang_module_deps {
        builder = builder.import(&dependency.name);
        direct_dependencies.push(ModuleDependencyId::clang(dependency.name.clone()));
    }
    for library in module.link_libraries {
        builder = builder.link_library(library);
    }

    let id = ModuleDependencyId::clang(module.id.name);
    (id, builder.resolved(direct_dependencies).build())
}

/// Part of the C++ standard library: the system module `std` or one of its
/// split `std_*` modules.
pub fn is_cxx_std_module(name: &str, is_system: bool) -> bool {
    is_system && (name.eq_ignore_ascii_case("std") || name.starts_with("std_"))
}
