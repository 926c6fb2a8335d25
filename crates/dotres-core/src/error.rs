//! Error types shared across crates

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::RelationId;

/// Relationship graph invariant violations. Always fatal for the build in progress.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("relation {relation:?} does not name an inserted node")]
    MissingRelation { relation: RelationId },
}

/// Failures producing a definition tree for one file.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported source file {0}")]
    UnsupportedLanguage(PathBuf),
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Per-context lookup failures. Callers skip to the next context.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("{0} is not part of this compilation context")]
    NotInContext(PathBuf),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}
