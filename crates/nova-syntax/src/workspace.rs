use std::collections::BTreeMap;

use crate::ast::{CompilationUnit, FileId};
use crate::parser::parse;
use crate::print::print_compilation_unit;

/// The live syntax trees of a program, keyed by file.
///
/// Iteration order is the `FileId` order, which keeps every walk over the
/// workspace deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    files: BTreeMap<FileId, CompilationUnit>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sources<'a>(sources: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut workspace = Self::new();
        for (path, text) in sources {
            workspace.insert_source(FileId::new(path), text);
        }
        workspace
    }

    /// Parses `text` and stores it under `file`, replacing any previous tree.
    pub fn insert_source(&mut self, file: FileId, text: &str) {
        let unit = parse(file.clone(), text);
        self.files.insert(file, unit);
    }

    pub fn insert(&mut self, unit: CompilationUnit) {
        self.files.insert(unit.file.clone(), unit);
    }

    pub fn file(&self, file: &FileId) -> Option<&CompilationUnit> {
        self.files.get(file)
    }

    pub fn file_mut(&mut self, file: &FileId) -> Option<&mut CompilationUnit> {
        self.files.get_mut(file)
    }

    pub fn files(&self) -> impl Iterator<Item = &CompilationUnit> {
        self.files.values()
    }

    pub fn file_ids(&self) -> impl Iterator<Item = &FileId> {
        self.files.keys()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Renders `file` with the deterministic printer.
    pub fn print_file(&self, file: &FileId) -> Option<String> {
        self.files.get(file).map(print_compilation_unit)
    }
}
