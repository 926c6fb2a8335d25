//! Declaration table for cross-file name binding

use std::path::PathBuf;

use dashmap::DashMap;

use crate::model::{DefinitionKind, Location};

/// Where a type declaration lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationRef {
    /// Folded qualified key, e.g. `ClassLibrary1.Outer`1.Inner`.
    pub key: String,
    pub file: PathBuf,
    pub type_index: usize,
    pub arity: usize,
    pub kind: DefinitionKind,
    pub identifier_offset: usize,
}

impl DeclarationRef {
    pub fn location(&self) -> Location {
        Location::new(self.file.clone(), self.identifier_offset)
    }
}

/// Qualified type and namespace names of one compilation context. Thread-safe for concurrent
/// lookups while a graph build fans out.
pub struct DeclarationTable {
    case_sensitive: bool,
    /// Parent key + "." + simple name (no arity) -> declarations, in insertion order.
    types: DashMap<String, Vec<DeclarationRef>>,
    /// Namespace key -> first declaring segment, `None` for implicit root namespaces.
    namespaces: DashMap<String, Option<Location>>,
}

impl DeclarationTable {
    pub fn new(case_sensitive: bool) -> Self {
        DeclarationTable {
            case_sensitive,
            types: DashMap::new(),
            namespaces: DashMap::new(),
        }
    }

    /// Fold a name the way this table compares identifiers.
    pub fn fold(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Join a parent key and a simple name into a lookup key.
    pub fn child_key(&self, parent: &str, name: &str) -> String {
        let name = self.fold(name);
        if parent.is_empty() {
            name
        } else {
            format!("{}.{}", parent, name)
        }
    }

    /// Key of a type used as the parent of nested lookups.
    pub fn type_key(&self, parent: &str, name: &str, arity: usize) -> String {
        let key = self.child_key(parent, name);
        if arity > 0 {
            format!("{}`{}", key, arity)
        } else {
            key
        }
    }

    pub fn insert_type(&self, parent: &str, name: &str, declaration: DeclarationRef) {
        self.types
            .entry(self.child_key(parent, name))
            .or_default()
            .push(declaration);
    }

    /// Look up `parent.name`, preferring an exact arity match over any arity.
    pub fn lookup_type(&self, parent: &str, name: &str, arity: usize) -> Option<DeclarationRef> {
        let candidates = self.types.get(&self.child_key(parent, name))?;
        candidates
            .iter()
            .find(|d| d.arity == arity)
            .or_else(|| candidates.first())
            .cloned()
    }

    /// Register a namespace path. The first location seen for a key is kept.
    pub fn insert_namespace(&self, key: &str, location: Option<Location>) {
        let mut entry = self.namespaces.entry(self.fold(key)).or_insert(None);
        if entry.is_none() {
            *entry = location;
        }
    }

    /// `Some` when the namespace exists; the inner value is its first declaration.
    pub fn namespace(&self, key: &str) -> Option<Option<Location>> {
        self.namespaces.get(&self.fold(key)).map(|r| r.value().clone())
    }

    pub fn type_count(&self) -> usize {
        self.types.iter().map(|r| r.value().len()).sum()
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }
}
