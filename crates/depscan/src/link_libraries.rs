//! Libraries the main module links implicitly.

use depscan_config::{ScanConfig, TargetOs, Version};
use depscan_graph::{DependenciesCache, LinkLibrary};

use crate::Result;

/// Which configured compatibility version gates a back-deployment library.
#[derive(Debug, Clone, Copy)]
enum CompatibilityVersion {
    Runtime,
    Concurrency,
    DynamicReplacements,
}

/// `(threshold major, threshold minor, library, force load, gating version)`.
const BACK_DEPLOYMENT_LIBRARIES: [(u32, u32, &str, bool, CompatibilityVersion); 6] = [
    (5, 0, "nextcodeCompatibility50", true, CompatibilityVersion::Runtime),
    (
        5,
        0,
        "nextcodeCompatibilityDynamicReplacements",
        false,
        CompatibilityVersion::DynamicReplacements,
    ),
    (5, 1, "nextcodeCompatibility51", false, CompatibilityVersion::Runtime),
    (
        5,
        4,
        "nextcodeCompatibilityConcurrency",
        false,
        CompatibilityVersion::Concurrency,
    ),
    (5, 6, "nextcodeCompatibility56", true, CompatibilityVersion::Runtime),
    (5, 8, "nextcodeCompatibilityPacks", true, CompatibilityVersion::Runtime),
];

/// Computes the implicit link libraries of `main_module_name`.
///
/// `static_cxx` and `static_cxx_stdlib` say whether the `Cxx` and
/// `CxxStdlib` overlays are linked statically.
pub fn implicit_link_libraries(
    config: &ScanConfig,
    main_module_name: &str,
    static_cxx: bool,
    static_cxx_stdlib: bool,
) -> Vec<LinkLibrary> {
    let mut libraries = Vec::new();
    let os = config.target.os();

    if config.language.objc_interop {
        libraries.push(LinkLibrary::library("objc", false));
    }

    if config.language.cxx_interop {
        match os {
            TargetOs::Darwin => libraries.push(LinkLibrary::library("c++", false)),
            TargetOs::Linux => libraries.push(LinkLibrary::library("stdc++", false)),
            _ => {}
        }

        if main_module_name != "Cxx" {
            let name = if os == TargetOs::Windows && static_cxx {
                "libnextcodeCxx"
            } else {
                "nextcodeCxx"
            };
            libraries.push(LinkLibrary::library(name, false));
        }

        let links_cxx_stdlib = !["Cxx", "CxxStdlib", "std"].contains(&main_module_name);
        if links_cxx_stdlib {
            match os {
                TargetOs::Windows if static_cxx_stdlib => {
                    libraries.push(LinkLibrary::library("libnextcodeCxxStdlib", false));
                }
                TargetOs::Windows | TargetOs::Darwin | TargetOs::Linux => {
                    libraries.push(LinkLibrary::library("nextcodeCxxStdlib", false));
                }
                TargetOs::Other => {}
            }
        }
    }

    if !config.use_jit && !config.language.embedded {
        libraries.extend(back_deployment_libraries(config));
    }
    libraries
}

fn back_deployment_libraries(config: &ScanConfig) -> impl Iterator<Item = LinkLibrary> + '_ {
    BACK_DEPLOYMENT_LIBRARIES.iter().filter_map(
        move |&(major, minor, name, force_load, gate)| {
            let configured: Option<&Version> = match gate {
                CompatibilityVersion::Runtime => {
                    config.target.runtime_compatibility_version.as_ref()
                }
                CompatibilityVersion::Concurrency => {
                    config.target.concurrency_compatibility_version.as_ref()
                }
                CompatibilityVersion::DynamicReplacements => config
                    .target
                    .dynamic_replacements_compatibility_version
                    .as_ref(),
            };
            configured
                .filter(|version| **version <= Version::new(major, minor))
                .map(|_| LinkLibrary::library(name, force_load))
        },
    )
}

/// Sets the implicit link libraries on the main module record.
///
/// Static linkage of the C++ overlays comes from their records when the
/// graph has them, otherwise from configuration.
pub fn resolve_implicit_link_libraries(
    config: &ScanConfig,
    cache: &mut DependenciesCache,
) -> Result<()> {
    let main_id = depscan_graph::ModuleDependencyId::source(cache.main_module_name());
    let static_cxx = match cache.find_dependency("Cxx", None)? {
        Some(info) => info.is_static_library(),
        None => config.target.static_cxx_overlay,
    };
    let static_cxx_stdlib = match cache.find_dependency("CxxStdlib", None)? {
        Some(info) => info.is_static_library(),
        None => config.target.static_cxx_stdlib,
    };

    let libraries =
        implicit_link_libraries(config, cache.main_module_name(), static_cxx, static_cxx_stdlib);
    tracing::debug!(count = libraries.len(), "Resolved implicit link libraries");

    let mut info = cache.find_known_dependency(&main_id)?.as_ref().clone();
    info.set_link_libraries(libraries)?;
    cache.update_dependency(&main_id, info)?;
    Ok(())
}
