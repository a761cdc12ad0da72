//! Building and rewriting frontend command lines.

use depscan_config::{CasConfig, ScanConfig};
use rustc_hash::FxHashSet;

/// `-Xcc` arguments a Clang module must be built with to be importable from
/// a textual module of this configuration.
pub fn extra_pcm_args(config: &ScanConfig) -> Vec<String> {
    let mut args = Vec::new();
    if config.target.clang_target.is_none() {
        args.extend(xcc(["-target", config.target.triple.as_str()]));
    }
    args.extend(xcc([format!(
        "-fapinotes-nextcode-version={}",
        config.language.apinotes_version
    )]));
    args
}

/// Wraps each argument in `-Xcc`.
pub fn xcc<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter()
        .flat_map(|arg| ["-Xcc".to_string(), arg.into()])
        .collect()
}

/// `-Xcc -ivfsoverlay -Xcc <path>` for every configured overlay.
pub fn vfs_overlay_args(config: &ScanConfig) -> Vec<String> {
    config
        .search
        .vfs_overlays
        .iter()
        .flat_map(|overlay| xcc(["-ivfsoverlay", overlay.as_str()]))
        .collect()
}

/// Frontend arguments that compile a textual interface into a binary module.
pub fn interface_build_command_line(
    name: &str,
    interface_file: &str,
    output_path: &str,
    config: &ScanConfig,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "-frontend",
        "-compile-module-from-interface",
        "-module-name",
        name,
        "-explicit-interface-module-build",
        "-disable-implicit-nextcode-modules",
        "-target",
        config.target.triple.as_str(),
    ]
    .into_iter()
    .map(String::from)
    .collect();
    args.extend(xcc(["-fno-implicit-modules", "-fno-implicit-module-maps"]));
    args.extend(vfs_overlay_args(config));
    args.extend(["-o".to_string(), output_path.to_string(), interface_file.to_string()]);
    args
}

/// Frontend arguments for the main module. Module file references are
/// appended by the finalize pass.
pub fn source_build_command_line(name: &str, config: &ScanConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "-frontend",
        "-module-name",
        name,
        "-disable-implicit-nextcode-modules",
        "-target",
        config.target.triple.as_str(),
    ]
    .into_iter()
    .map(String::from)
    .collect();
    args.extend(xcc(["-fno-implicit-modules", "-fno-implicit-module-maps"]));
    args.extend(vfs_overlay_args(config));
    args
}

/// Rewrites every path-like argument through the prefix map.
///
/// `-flag=value` arguments have their final `=`-separated component mapped,
/// which covers `-nextcode-module-file=Name=<path>` and
/// `-fmodule-map-file=<path>`.
pub fn remap_command_line(args: &[String], cas: &CasConfig) -> Vec<String> {
    if cas.prefix_map.is_empty() {
        return args.to_vec();
    }
    args.iter()
        .map(|arg| match arg.rsplit_once('=') {
            Some((head, value)) if arg.starts_with('-') => {
                format!("{head}={}", cas.remap_path(value))
            }
            _ => cas.remap_path(arg),
        })
        .collect()
}

fn is_vfs_overlay_flag(arg: &str) -> bool {
    arg == "-ivfsoverlay" || arg == "-vfsoverlay"
}

/// Overlay paths named by `-vfsoverlay`/`-ivfsoverlay` pairs, with `-Xcc`
/// wrappers ignored.
pub fn referenced_vfs_overlays<'a>(args: &'a [String], into: &mut FxHashSet<&'a str>) {
    let mut take_next = false;
    for arg in args {
        if arg == "-Xcc" {
            continue;
        }
        if take_next {
            take_next = false;
            into.insert(arg.as_str());
        } else if is_vfs_overlay_flag(arg) {
            take_next = true;
        }
    }
}

/// Drops `-Xcc -ivfsoverlay -Xcc <path>` groups whose path is not in `used`.
pub fn prune_vfs_overlays(args: &[String], used: &FxHashSet<&str>) -> Vec<String> {
    let mut pruned = Vec::with_capacity(args.len());
    let mut index = 0;
    while index < args.len() {
        let group = args.get(index..index + 4);
        if let Some([xcc_flag, flag, xcc_path, path]) = group {
            if xcc_flag == "-Xcc"
                && is_vfs_overlay_flag(flag)
                && xcc_path == "-Xcc"
                && !used.contains(path.as_str())
            {
                index += 4;
                continue;
            }
        }
        pruned.push(args[index].clone());
        index += 1;
    }
    pruned
}
