use serde::{Deserialize, Serialize};

/// Source location of an `import` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportLocation {
    pub buffer: String,
    pub line: u32,
    pub column: u32,
}

impl ImportLocation {
    pub fn new(buffer: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            buffer: buffer.into(),
            line,
            column,
        }
    }
}

/// One imported module name and every place it was imported from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatement {
    pub identifier: String,
    pub locations: Vec<ImportLocation>,
}

impl ImportStatement {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            locations: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: ImportLocation) -> Self {
        self.add_location(location);
        self
    }

    pub fn add_location(&mut self, location: ImportLocation) {
        if !self.locations.contains(&location) {
            self.locations.push(location);
        }
    }

    pub fn first_location(&self) -> Option<&ImportLocation> {
        self.locations.first()
    }
}
