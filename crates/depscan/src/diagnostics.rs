//! Diagnostics reported while scanning.
//!
//! The scanner never formats user-facing text itself. It reports a
//! [`Diagnostic`] carrying a structured [`DiagnosticKind`] to a
//! [`DiagnosticSink`]; rendering happens in the [`Display`](fmt::Display)
//! impls or in the consumer.

use std::fmt;

use depscan_graph::{ImportLocation, ModuleDependencyKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Remark,
    Note,
    Warning,
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Remark => "remark",
            Self::Note => "note",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// What went wrong, with the arguments needed to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A required import resolved to nothing.
    ModuleNotFound { name: String },

    /// The failing import is imported directly by the main module.
    ImportedByMainModule { main_module: String },

    /// The failing import is reached through `path` from the main module.
    ImportedByModule {
        module: String,
        kind: ModuleDependencyKind,
        path: String,
    },

    DependencyCycle { chain: String },

    /// Explains an overlay edge inside a cycle by the Clang path that
    /// pulled the overlay in.
    OverlayCycleVia {
        module: String,
        overlay: String,
        clang_path: String,
    },

    HeaderScanFailed { header: String, reason: String },

    /// A loader failed on a module that was found.
    ToolingFailure { module: String, reason: String },

    /// An optional import failed with a tooling error and was dropped.
    OptionalImportDropped { name: String, reason: String },

    /// The content-addressed store failed while finalizing `module`.
    CasFailure { module: String, reason: String },

    /// A further place where an unresolved module is imported.
    UnresolvedImportLocation { name: String },

    CrossImportOverlaysFound { module: String, overlays: Vec<String> },

    Other { message: String },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleNotFound { name } => {
                write!(f, "unable to resolve module dependency: '{name}'")
            }
            Self::ImportedByMainModule { main_module } => {
                write!(f, "a dependency of main module '{main_module}'")
            }
            Self::ImportedByModule { module, kind, path } => {
                let family = if *kind == ModuleDependencyKind::Clang {
                    "Clang"
                } else {
                    "NeXTCode"
                };
                write!(f, "a dependency of {family} module '{module}': '{path}'")
            }
            Self::DependencyCycle { chain } => write!(f, "module dependency cycle: '{chain}'"),
            Self::OverlayCycleVia {
                module,
                overlay,
                clang_path,
            } => write!(
                f,
                "NeXTCode overlay dependency of '{module}' on '{overlay}' via Clang module dependency: '{clang_path}'"
            ),
            Self::HeaderScanFailed { header, reason } => {
                write!(f, "failed to scan bridging header dependencies of '{header}': {reason}")
            }
            Self::ToolingFailure { module, reason } => {
                write!(f, "failed to scan module '{module}': {reason}")
            }
            Self::OptionalImportDropped { name, reason } => {
                write!(f, "ignoring optional import '{name}': {reason}")
            }
            Self::CasFailure { module, reason } => {
                write!(f, "content store failure for '{module}': {reason}")
            }
            Self::UnresolvedImportLocation { name } => {
                write!(f, "also imported here: '{name}'")
            }
            Self::CrossImportOverlaysFound { module, overlays } => write!(
                f,
                "cross-import overlays added to '{module}': {}",
                overlays.join(", ")
            ),
            Self::Other { message } => f.write_str(message),
        }
    }
}

/// One reported diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub kind: DiagnosticKind,
    pub location: Option<ImportLocation>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            kind,
            location: None,
        }
    }

    pub fn warning(kind: DiagnosticKind) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            kind,
            location: None,
        }
    }

    pub fn note(kind: DiagnosticKind) -> Self {
        Self {
            severity: DiagnosticSeverity::Note,
            kind,
            location: None,
        }
    }

    pub fn remark(kind: DiagnosticKind) -> Self {
        Self {
            severity: DiagnosticSeverity::Remark,
            kind,
            location: None,
        }
    }

    pub fn at(mut self, location: Option<ImportLocation>) -> Self {
        self.location = location;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(
                f,
                "{}:{}:{}: ",
                location.buffer, location.line, location.column
            )?;
        }
        write!(f, "{}: {}", self.severity, self.kind)
    }
}

/// Receives every diagnostic a scan reports.
///
/// Implementations must be thread-safe: one sink is shared by all scans of
/// a batch.
pub trait DiagnosticSink: Send + Sync + fmt::Debug {
    fn diagnose(&self, diagnostic: Diagnostic);
}

/// Sink that keeps diagnostics in report order and mirrors them to `tracing`.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Drains the collected diagnostics.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .count()
    }
}

impl DiagnosticSink for DiagnosticCollector {
    fn diagnose(&self, diagnostic: Diagnostic) {
        let mut diagnostics = self.diagnostics.lock();
        match mirrored_severity(&diagnostics, &diagnostic) {
            DiagnosticSeverity::Error => tracing::error!("{diagnostic}"),
            DiagnosticSeverity::Warning => tracing::warn!("{diagnostic}"),
            DiagnosticSeverity::Note => tracing::info!("{diagnostic}"),
            DiagnosticSeverity::Remark => tracing::debug!("{diagnostic}"),
        }
        diagnostics.push(diagnostic);
    }
}

/// Level a diagnostic is logged at. Notes follow the error or warning they
/// elaborate so a filter never shows one without the other.
fn mirrored_severity(reported: &[Diagnostic], diagnostic: &Diagnostic) -> DiagnosticSeverity {
    if diagnostic.severity != DiagnosticSeverity::Note {
        return diagnostic.severity;
    }
    reported
        .iter()
        .rev()
        .find(|previous| previous.severity != DiagnosticSeverity::Note)
        .map(|previous| previous.severity)
        .filter(|severity| {
            matches!(severity, DiagnosticSeverity::Error | DiagnosticSeverity::Warning)
        })
        .unwrap_or(DiagnosticSeverity::Note)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_location_prefix() {
        let diagnostic = Diagnostic::error(DiagnosticKind::ModuleNotFound {
            name: "Missing".into(),
        })
        .at(Some(ImportLocation::new("main.nc", 3, 8)));

        assert_eq!(
            diagnostic.to_string(),
            "main.nc:3:8: error: unable to resolve module dependency: 'Missing'"
        );
    }

    #[test]
    fn collector_counts_errors_only() {
        let collector = DiagnosticCollector::new();
        collector.diagnose(Diagnostic::warning(DiagnosticKind::Other {
            message: "careful".into(),
        }));
        collector.diagnose(Diagnostic::error(DiagnosticKind::DependencyCycle {
            chain: "A -> B -> A".into(),
        }));

        assert_eq!(collector.error_count(), 1);
        assert_eq!(collector.take().len(), 2);
        assert!(!collector.has_errors());
    }

    #[test]
    fn kind_serializes_with_tag() {
        let json = serde_json::to_value(DiagnosticKind::ModuleNotFound { name: "X".into() }).unwrap();
        assert_eq!(json["type"], "module_not_found");
        assert_eq!(json["name"], "X");
    }

    #[test]
    fn notes_are_logged_at_the_level_of_their_error() {
        let error = Diagnostic::error(DiagnosticKind::ModuleNotFound {
            name: "Missing".into(),
        });
        let note = Diagnostic::note(DiagnosticKind::ImportedByMainModule {
            main_module: "App".into(),
        });

        assert_eq!(mirrored_severity(&[], &note), DiagnosticSeverity::Note);
        assert_eq!(
            mirrored_severity(&[error.clone(), note.clone()], &note),
            DiagnosticSeverity::Error
        );
        assert_eq!(mirrored_severity(&[error.clone()], &error), DiagnosticSeverity::Error);
    }
}
