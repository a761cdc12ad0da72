use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the full dependency graph of a main module
    ///
    /// Prints the graph as JSON, with a finalized build command line for
    /// every module.
    Scan(ScanArgs),

    /// List the modules a main module imports without resolving them
    Prescan(PrescanArgs),

    /// Scan several modules, each as the root of its own graph
    ///
    /// Entries are independent: a failing entry is reported and the others
    /// are still written.
    Batch(BatchArgs),
}

/// Options shared by every command that resolves modules.
#[derive(Args, Debug, Clone, Default)]
pub struct ScanOptions {
    /// Module index describing the available modules (JSON)
    #[arg(long, value_name = "FILE")]
    pub index: PathBuf,

    /// Configuration file (defaults to depscan.toml in the current directory
    /// or an ancestor)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of scanning workers
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Scan with a single worker
    #[arg(long, conflicts_with = "jobs")]
    pub serial: bool,

    /// Enable the content-addressed store (CAS file system roots and cache keys)
    #[arg(long)]
    pub cas: bool,

    /// Target triple
    #[arg(long, value_name = "TRIPLE")]
    pub target: Option<String>,

    /// Directory explicit module builds write their outputs to
    #[arg(long, value_name = "DIR")]
    pub module_output_path: Option<String>,

    /// Enable C++ interoperability
    #[arg(long)]
    pub cxx_interop: bool,

    /// Enable Objective-C interoperability
    #[arg(long)]
    pub objc_interop: bool,

    /// Scanning cache reused across invocations; loaded when present and
    /// saved after the scan
    #[arg(long, value_name = "FILE")]
    pub cache_path: Option<PathBuf>,
}

/// How the main module is described.
#[derive(Args, Debug, Clone, Default)]
pub struct MainModuleArgs {
    /// Name of the main module
    #[arg(long, value_name = "NAME", required_unless_present = "input")]
    pub module_name: Option<String>,

    /// Main module description as JSON (name, sourceFiles, imports,
    /// bridgingHeader, canImportChecks)
    #[arg(long, value_name = "FILE", conflicts_with = "module_name")]
    pub input: Option<PathBuf>,

    /// Source file of the main module (repeatable)
    #[arg(long = "source-file", value_name = "FILE")]
    pub source_files: Vec<String>,

    /// Module imported by the main module, e.g. Foo or Foo.Private (repeatable)
    #[arg(long = "import", value_name = "MODULE")]
    pub imports: Vec<String>,

    /// Bridging header of the main module
    #[arg(long, value_name = "FILE")]
    pub bridging_header: Option<String>,

    /// Module probed with canImport (repeatable)
    #[arg(long = "can-import", value_name = "MODULE")]
    pub can_import: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub options: ScanOptions,

    #[command(flatten)]
    pub main: MainModuleArgs,

    /// Write the graph here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PrescanArgs {
    #[command(flatten)]
    pub main: MainModuleArgs,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the import list here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    #[command(flatten)]
    pub options: ScanOptions,

    /// Batch description: a JSON array of {nextcodeModuleName | clangModuleName,
    /// arguments, output}
    #[arg(value_name = "BATCH")]
    pub batch: PathBuf,

    /// Directory relative entry outputs are resolved against
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}
