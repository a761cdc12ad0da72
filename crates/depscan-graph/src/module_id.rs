use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a module dependency.
///
/// The declaration order is the probing order used when a module is looked up
/// by name only: [`ModuleDependencyKind::ALL`] walks the kinds from first to
/// last and the first hit wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModuleDependencyKind {
    /// Textual NeXTCode interface module.
    Interface,
    /// Precompiled NeXTCode module without an interface.
    Binary,
    /// C/C++ module described by a module map.
    Clang,
    /// The translation unit under compilation.
    Source,
    /// Stub resolved later by the build system.
    Placeholder,
}

impl ModuleDependencyKind {
    /// Every kind, in probing order.
    pub const ALL: [ModuleDependencyKind; 5] = [
        ModuleDependencyKind::Interface,
        ModuleDependencyKind::Binary,
        ModuleDependencyKind::Clang,
        ModuleDependencyKind::Source,
        ModuleDependencyKind::Placeholder,
    ];

    /// Kinds a NeXTCode module lookup may resolve to.
    pub const NEXTCODE: [ModuleDependencyKind; 4] = [
        ModuleDependencyKind::Interface,
        ModuleDependencyKind::Binary,
        ModuleDependencyKind::Source,
        ModuleDependencyKind::Placeholder,
    ];

    /// Returns true for every kind except [`ModuleDependencyKind::Clang`].
    pub fn is_nextcode(self) -> bool {
        !matches!(self, ModuleDependencyKind::Clang)
    }

    /// Interface and source modules carry a textual build description.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            ModuleDependencyKind::Interface | ModuleDependencyKind::Source
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleDependencyKind::Interface => "interface",
            ModuleDependencyKind::Binary => "binary",
            ModuleDependencyKind::Clang => "clang",
            ModuleDependencyKind::Source => "source",
            ModuleDependencyKind::Placeholder => "placeholder",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ModuleDependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a module within a kind.
///
/// The same name may exist as several kinds at once (a Clang module and its
/// NeXTCode overlay share a name). Ordering is lexicographic on the name, then
/// on the kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleDependencyId {
    pub name: String,
    pub kind: ModuleDependencyKind,
}

impl ModuleDependencyId {
    pub fn new(name: impl Into<String>, kind: ModuleDependencyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, ModuleDependencyKind::Interface)
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, ModuleDependencyKind::Binary)
    }

    pub fn clang(name: impl Into<String>) -> Self {
        Self::new(name, ModuleDependencyKind::Clang)
    }

    pub fn source(name: impl Into<String>) -> Self {
        Self::new(name, ModuleDependencyKind::Source)
    }

    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name, ModuleDependencyKind::Placeholder)
    }

    /// Name used by the JSON graph output, e.g. `nextcodeTextual:Foo`.
    pub fn encoded_name(&self) -> String {
        let prefix = match self.kind {
            ModuleDependencyKind::Interface | ModuleDependencyKind::Source => "nextcodeTextual",
            ModuleDependencyKind::Binary => "nextcodeBinary",
            ModuleDependencyKind::Placeholder => "nextcodePlaceholder",
            ModuleDependencyKind::Clang => "clang",
        };
        format!("{prefix}:{}", self.name)
    }

    /// Name decorated with the artifact that backs the module, as shown in
    /// cycle diagnostics (`Foo.codeinterface`, `Bar.pcm`).
    pub fn display_with_artifact(&self) -> String {
        match self.kind {
            ModuleDependencyKind::Source => format!("{} (Source Target)", self.name),
            ModuleDependencyKind::Interface => format!("{}.codeinterface", self.name),
            ModuleDependencyKind::Binary | ModuleDependencyKind::Placeholder => {
                format!("{}.codemodule", self.name)
            }
            ModuleDependencyKind::Clang => format!("{}.pcm", self.name),
        }
    }
}

impl fmt::Display for ModuleDependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// Identity of a module inside the Clang scanner: a name plus the context
/// hash of the invocation that built it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClangModuleId {
    pub name: String,
    pub context_hash: String,
}

impl ClangModuleId {
    pub fn new(name: impl Into<String>, context_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context_hash: context_hash.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_name_then_kind() {
        let mut ids = vec![
            ModuleDependencyId::clang("B"),
            ModuleDependencyId::interface("B"),
            ModuleDependencyId::placeholder("A"),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                ModuleDependencyId::placeholder("A"),
                ModuleDependencyId::interface("B"),
                ModuleDependencyId::clang("B"),
            ]
        );
    }

    #[test]
    fn encoded_names_follow_output_convention() {
        assert_eq!(
            ModuleDependencyId::source("App").encoded_name(),
            "nextcodeTextual:App"
        );
        assert_eq!(ModuleDependencyId::clang("Bar").encoded_name(), "clang:Bar");
        assert_eq!(
            ModuleDependencyId::binary("Baz").encoded_name(),
            "nextcodeBinary:Baz"
        );
    }

    #[test]
    fn probe_order_matches_declaration_order() {
        let mut sorted = ModuleDependencyKind::ALL;
        sorted.sort();
        assert_eq!(sorted, ModuleDependencyKind::ALL);
        assert!(!ModuleDependencyKind::NEXTCODE.contains(&ModuleDependencyKind::Clang));
    }
}
