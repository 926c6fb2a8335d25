//! Test utilities for dotres-core

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::model::{DefinitionKind, DefinitionNode, SourceLanguage};

/// A C# definition node in `file` spanning `[start, end)` whose name starts at `start + 1`.
pub fn node(kind: DefinitionKind, text: &str, start: usize, end: usize) -> DefinitionNode {
    DefinitionNode::new(
        kind,
        text,
        Path::new("Sample.cs"),
        SourceLanguage::CSharp,
        (start, end),
        start + 1,
    )
}

/// Create a temporary source tree from `(relative path, content)` pairs
pub fn create_source_tree(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = temp_dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
    temp_dir
}
