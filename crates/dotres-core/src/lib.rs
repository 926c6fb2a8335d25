//! dotres core: definition trees, file outlines, declaration tables and relationship graphs

pub mod error;
pub mod graph;
pub mod model;
pub mod outline;
pub mod project;
pub mod symbols;


#[cfg(test)]
pub mod test_utils;

pub use error::{ExtractError, GraphError, LocateError};
pub use graph::{MemberGroup, RelationId, RelationshipGraph, RelationshipNode};
pub use model::{
    DefinitionKind, DefinitionNode, DefinitionTree, DefinitionTreeBuilder, Location,
    ResolutionResult, SourceLanguage, SyntaxHandle, simple_name,
};
pub use outline::{FileOutline, ImportDirective, MemberDecl, NameReference, NameSegment, NamespaceDecl, TypeDecl};
pub use project::ProjectSpec;
pub use symbols::{DeclarationRef, DeclarationTable};
