use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LibraryKind {
    Library,
    Framework,
}

/// A library the consumer of a module must link against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkLibrary {
    pub name: String,
    pub kind: LibraryKind,
    pub force_load: bool,
}

impl LinkLibrary {
    pub fn library(name: impl Into<String>, force_load: bool) -> Self {
        Self {
            name: name.into(),
            kind: LibraryKind::Library,
            force_load,
        }
    }

    pub fn framework(name: impl Into<String>, force_load: bool) -> Self {
        Self {
            name: name.into(),
            kind: LibraryKind::Framework,
            force_load,
        }
    }

    pub fn is_framework(&self) -> bool {
        self.kind == LibraryKind::Framework
    }
}
