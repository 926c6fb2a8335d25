//! Definition tree data model

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Source languages understood by the front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLanguage {
    CSharp,
    VisualBasic,
}

impl SourceLanguage {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "cs" | "csx" => Some(SourceLanguage::CSharp),
            "vb" => Some(SourceLanguage::VisualBasic),
            _ => None,
        }
    }

    /// Detect language from an MSBuild project file extension.
    pub fn from_project_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csproj" => Some(SourceLanguage::CSharp),
            "vbproj" => Some(SourceLanguage::VisualBasic),
            _ => None,
        }
    }

    /// Visual Basic identifiers compare without regard to case.
    pub fn is_case_sensitive(self) -> bool {
        matches!(self, SourceLanguage::CSharp)
    }

    pub fn source_extension(self) -> &'static str {
        match self {
            SourceLanguage::CSharp => "cs",
            SourceLanguage::VisualBasic => "vb",
        }
    }

    /// Normalize an identifier for lookups in this language.
    pub fn fold(self, name: &str) -> String {
        if self.is_case_sensitive() {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLanguage::CSharp => write!(f, "C#"),
            SourceLanguage::VisualBasic => write!(f, "Visual Basic"),
        }
    }
}

/// Closed set of declaration kinds shown in definition trees and relationship views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DefinitionKind {
    // ── Containers ──────────────────────────────────────────
    Namespace,
    Class,
    Struct,
    Interface,
    Module,

    // ── Enumerations ────────────────────────────────────────
    Enum,
    EnumMember,

    // ── Members ─────────────────────────────────────────────
    Delegate,
    Event,
    Field,
    Indexer,
    Property,
    Constructor,
    Operator,
    PlatformImport,
    EventHandler,
    Method,

    // ── Project graph ───────────────────────────────────────
    Project,
    Dependency,

    // ── Fallback ────────────────────────────────────────────
    Unknown,
}

impl DefinitionKind {
    /// Kinds that may own nested declarations. Enums own their members.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            DefinitionKind::Namespace
                | DefinitionKind::Class
                | DefinitionKind::Struct
                | DefinitionKind::Interface
                | DefinitionKind::Module
                | DefinitionKind::Enum
        )
    }

    /// Kinds that can carry a base-type list and take part in relationship views.
    pub fn is_type_like(self) -> bool {
        matches!(
            self,
            DefinitionKind::Class
                | DefinitionKind::Struct
                | DefinitionKind::Interface
                | DefinitionKind::Module
                | DefinitionKind::Enum
                | DefinitionKind::Delegate
        )
    }

    /// Header text used when members of this kind are grouped.
    pub fn group_label(self) -> &'static str {
        match self {
            DefinitionKind::Enum => "Enums",
            DefinitionKind::Delegate => "Delegates",
            DefinitionKind::Event => "Events",
            DefinitionKind::Field => "Fields",
            DefinitionKind::Indexer => "Indexers",
            DefinitionKind::Property => "Properties",
            DefinitionKind::Constructor => "Constructors",
            DefinitionKind::Operator => "Operators",
            DefinitionKind::PlatformImport => "Platform imports",
            DefinitionKind::EventHandler => "Event handlers",
            DefinitionKind::Method => "Methods",
            DefinitionKind::Dependency => "References",
            _ => "Members",
        }
    }
}

/// Handle into the owning file outline's type table.
///
/// Lets a [`DefinitionNode`] be cloned and kept around after the parse that produced it is
/// gone; base-type lists are read back through `FileOutline::type_decl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyntaxHandle(pub u32);

impl SyntaxHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One declaration in a definition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionNode {
    pub kind: DefinitionKind,
    pub text: String,
    pub file: PathBuf,
    pub start: usize,
    pub end: usize,
    pub identifier_offset: usize,
    pub comment: Option<String>,
    pub language: SourceLanguage,
    pub children: Vec<DefinitionNode>,
    #[serde(skip)]
    pub handle: Option<SyntaxHandle>,
}

impl DefinitionNode {
    pub fn new(
        kind: DefinitionKind,
        text: impl Into<String>,
        file: &Path,
        language: SourceLanguage,
        span: (usize, usize),
        identifier_offset: usize,
    ) -> Self {
        DefinitionNode {
            kind,
            text: text.into(),
            file: file.to_path_buf(),
            start: span.0,
            end: span.1,
            identifier_offset,
            comment: None,
            language,
            children: Vec::new(),
            handle: None,
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment.filter(|c| !c.is_empty());
        self
    }

    pub fn with_handle(mut self, handle: SyntaxHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Whether `[start, end)` lies inside this node. The start must be strictly greater.
    pub fn contains_span(&self, start: usize, end: usize) -> bool {
        self.start < start && end <= self.end
    }

    /// Find this node or a descendant whose name token starts at `offset`.
    pub fn find_by_identifier(&self, offset: usize) -> Option<&DefinitionNode> {
        if self.identifier_offset == offset && self.kind != DefinitionKind::Namespace {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_by_identifier(offset))
    }

    /// Depth-first iteration over this node and its descendants.
    pub fn iter(&self) -> DefinitionIter<'_> {
        DefinitionIter { stack: vec![self] }
    }
}

/// Depth-first, declaration-order iterator.
pub struct DefinitionIter<'a> {
    stack: Vec<&'a DefinitionNode>,
}

impl<'a> Iterator for DefinitionIter<'a> {
    type Item = &'a DefinitionNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// All declarations extracted from one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionTree {
    pub file: PathBuf,
    pub language: SourceLanguage,
    pub roots: Vec<DefinitionNode>,
}

impl DefinitionTree {
    /// Find the node whose identifier token starts at `offset`.
    pub fn find_by_identifier(&self, offset: usize) -> Option<&DefinitionNode> {
        self.roots
            .iter()
            .find_map(|root| root.find_by_identifier(offset))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DefinitionNode> {
        self.roots.iter().flat_map(|root| root.iter())
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// First type-like node with the given simple name (text up to any generic suffix).
    pub fn find_type_by_name(&self, name: &str) -> Option<&DefinitionNode> {
        self.iter()
            .filter(|n| n.kind.is_type_like())
            .find(|n| simple_name(&n.text) == name)
    }
}

/// Display text stripped of generic parameters and signature tails.
pub fn simple_name(text: &str) -> &str {
    let end = text
        .find(|c: char| c == '<' || c == '(' || c == ' ')
        .unwrap_or(text.len());
    &text[..end]
}

/// Assembles an owned tree from declarations discovered in walk order.
///
/// Each inserted node is parented under the innermost already-inserted container that
/// contains it; ties on containment go to the container with the largest start offset.
pub struct DefinitionTreeBuilder {
    file: PathBuf,
    language: SourceLanguage,
    entries: Vec<(DefinitionNode, Option<usize>)>,
}

impl DefinitionTreeBuilder {
    pub fn new(file: &Path, language: SourceLanguage) -> Self {
        DefinitionTreeBuilder {
            file: file.to_path_buf(),
            language,
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, node: DefinitionNode) -> usize {
        let parent = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, (candidate, _))| {
                candidate.kind.is_container() && candidate.contains_span(node.start, node.end)
            })
            .max_by_key(|(_, (candidate, _))| candidate.start)
            .map(|(idx, _)| idx);
        self.entries.push((node, parent));
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> DefinitionTree {
        let mut slots: Vec<Option<DefinitionNode>> = Vec::with_capacity(self.entries.len());
        let mut parents = Vec::with_capacity(self.entries.len());
        for (node, parent) in self.entries {
            slots.push(Some(node));
            parents.push(parent);
        }

        // Parents always precede their children, so walking backwards attaches every
        // subtree before its owner is moved.
        let mut roots = Vec::new();
        for idx in (0..slots.len()).rev() {
            let Some(node) = slots[idx].take() else { continue };
            match parents[idx].and_then(|p| slots[p].as_mut()) {
                Some(parent) => parent.children.push(node),
                None => roots.push(node),
            }
        }

        fn restore_order(nodes: &mut Vec<DefinitionNode>) {
            nodes.reverse();
            for node in nodes.iter_mut() {
                restore_order(&mut node.children);
            }
        }
        restore_order(&mut roots);

        DefinitionTree {
            file: self.file,
            language: self.language,
            roots,
        }
    }
}

/// A resolved source position: the identifier token of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub offset: usize,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, offset: usize) -> Self {
        Location {
            file: file.into(),
            offset,
        }
    }
}

/// Outcome of a symbol lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionResult {
    Found(Location),
    NotFound,
}

impl ResolutionResult {
    pub fn found(file: impl Into<PathBuf>, offset: usize) -> Self {
        ResolutionResult::Found(Location::new(file, offset))
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ResolutionResult::Found(_))
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            ResolutionResult::Found(location) => Some(location),
            ResolutionResult::NotFound => None,
        }
    }
}

impl From<Option<Location>> for ResolutionResult {
    fn from(location: Option<Location>) -> Self {
        location.map_or(ResolutionResult::NotFound, ResolutionResult::Found)
    }
}
