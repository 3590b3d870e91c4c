use std::fmt;

use serde::Serialize;

/// Handle of a declaration in a [`crate::Program`]'s symbol arena.
///
/// Ids are only meaningful for the program snapshot that produced them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId(u32);

impl SymbolId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        SymbolId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena<T> {
    data: Vec<T>,
}

impl<T> Arena<T> {
    pub fn alloc(&mut self, value: T) -> SymbolId {
        let idx = self.data.len() as u32;
        self.data.push(value);
        SymbolId::from_raw(idx)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (SymbolId::from_raw(i as u32), v))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena { data: Vec::new() }
    }
}

impl<T> std::ops::Index<SymbolId> for Arena<T> {
    type Output = T;

    fn index(&self, index: SymbolId) -> &Self::Output {
        &self.data[index.idx()]
    }
}

impl<T> std::ops::IndexMut<SymbolId> for Arena<T> {
    fn index_mut(&mut self, index: SymbolId) -> &mut Self::Output {
        &mut self.data[index.idx()]
    }
}
