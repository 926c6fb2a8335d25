//! Language-neutral outline of one source file: the input to name binding

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::{DefinitionKind, SourceLanguage, SyntaxHandle};

/// One segment of a dotted name, e.g. `List<T>` in `System.Collections.Generic.List<T>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSegment {
    pub name: String,
    pub arity: usize,
    pub offset: usize,
}

impl NameSegment {
    pub fn new(name: impl Into<String>, arity: usize, offset: usize) -> Self {
        NameSegment {
            name: name.into(),
            arity,
            offset,
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.name.len()
    }
}

/// A possibly qualified type or namespace name as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameReference {
    /// Literal text, generic arguments included.
    pub text: String,
    pub segments: Vec<NameSegment>,
    /// `global::` / `Global.` prefix.
    pub global: bool,
    /// Left side of `alias::Name`.
    pub alias_qualifier: Option<NameSegment>,
    pub start: usize,
    pub end: usize,
}

impl NameReference {
    /// Offset to query when resolving the whole reference: the start of its last segment.
    pub fn query_offset(&self) -> usize {
        self.segments.last().map_or(self.start, |s| s.offset)
    }

    pub fn last(&self) -> Option<&NameSegment> {
        self.segments.last()
    }

    pub fn is_qualified(&self) -> bool {
        self.segments.len() > 1 || self.global || self.alias_qualifier.is_some()
    }
}

/// A namespace declaration block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    /// Segments as written in this declaration.
    pub segments: Vec<NameSegment>,
    /// Fully qualified path including enclosing namespace declarations.
    pub path: Vec<String>,
    pub start: usize,
    pub end: usize,
}

/// A member declared inside a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    pub kind: DefinitionKind,
    pub identifier_offset: usize,
}

/// A type declaration (class, struct, interface, module, enum, delegate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub arity: usize,
    pub kind: DefinitionKind,
    /// Namespace path the declaration lives in, without any project root namespace.
    pub namespace: Vec<String>,
    /// Index of the enclosing type in the same outline.
    pub parent: Option<usize>,
    pub identifier_offset: usize,
    pub start: usize,
    pub end: usize,
    pub bases: Vec<NameReference>,
    pub members: Vec<MemberDecl>,
}

/// `using` / `Imports` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDirective {
    pub alias: Option<NameSegment>,
    pub target: NameReference,
    pub is_static: bool,
    /// Namespace path of the declaration the directive appears in (empty at file level).
    pub scope: Vec<String>,
    pub scope_start: usize,
    pub scope_end: usize,
    pub start: usize,
    pub end: usize,
}

/// Everything name binding needs to know about one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutline {
    pub path: PathBuf,
    pub language: SourceLanguage,
    pub namespaces: Vec<NamespaceDecl>,
    pub types: Vec<TypeDecl>,
    pub imports: Vec<ImportDirective>,
}

impl FileOutline {
    pub fn new(path: PathBuf, language: SourceLanguage) -> Self {
        FileOutline {
            path,
            language,
            namespaces: Vec::new(),
            types: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn type_decl(&self, handle: SyntaxHandle) -> Option<&TypeDecl> {
        self.types.get(handle.index())
    }

    /// Namespace declarations containing `offset`, outermost first.
    pub fn namespaces_at(&self, offset: usize) -> Vec<&NamespaceDecl> {
        let mut found: Vec<&NamespaceDecl> = self
            .namespaces
            .iter()
            .filter(|ns| ns.start <= offset && offset < ns.end)
            .collect();
        found.sort_by_key(|ns| ns.start);
        found
    }

    /// Type declarations containing `offset`, innermost first.
    pub fn types_at(&self, offset: usize) -> Vec<usize> {
        let mut found: Vec<usize> = (0..self.types.len())
            .filter(|&idx| {
                let decl = &self.types[idx];
                decl.start <= offset && offset < decl.end
            })
            .collect();
        found.sort_by_key(|&idx| std::cmp::Reverse(self.types[idx].start));
        found
    }

    /// Names of the enclosing types of `idx`, outermost first, each with its arity.
    pub fn type_path(&self, idx: usize) -> Vec<(&str, usize)> {
        let mut path = Vec::new();
        let mut current = Some(idx);
        while let Some(i) = current {
            let decl = &self.types[i];
            path.push((decl.name.as_str(), decl.arity));
            current = decl.parent;
        }
        path.reverse();
        path
    }

    /// Alias directives visible from `offset`, innermost scope first.
    pub fn imports_at(&self, offset: usize) -> impl Iterator<Item = &ImportDirective> {
        self.imports
            .iter()
            .filter(move |import| import.scope_start <= offset && offset <= import.scope_end)
    }

    /// The alias directive whose alias identifier starts at `offset`.
    pub fn alias_at(&self, offset: usize) -> Option<&ImportDirective> {
        self.imports
            .iter()
            .find(|import| import.alias.as_ref().is_some_and(|a| a.offset == offset))
    }
}
