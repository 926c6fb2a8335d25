//! Language extractor trait definition

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dotres_core::{DefinitionTree, ExtractError, FileOutline, SourceLanguage};

use crate::parser_pool::SyntaxTree;

/// Everything one walk over a syntax tree produces.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub tree: DefinitionTree,
    pub outline: FileOutline,
}

pub trait LanguageExtractor: Send + Sync {
    fn language(&self) -> SourceLanguage;

    /// Walk `syntax` (parsed from `text`) and build the definition tree and outline.
    fn extract(
        &self,
        path: &Path,
        text: &str,
        syntax: &SyntaxTree,
    ) -> Result<ExtractionResult, ExtractError>;
}

/// A source file after parsing and extraction, as held by a compilation context.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub language: SourceLanguage,
    pub text: Arc<str>,
    pub tree: Arc<DefinitionTree>,
    pub outline: Arc<FileOutline>,
    /// Project root namespace segments (Visual Basic only).
    pub root_namespace: Vec<String>,
}

impl ParsedFile {
    pub fn new(path: PathBuf, text: &str, result: ExtractionResult) -> Self {
        ParsedFile {
            path,
            language: result.tree.language,
            text: Arc::from(text),
            tree: Arc::new(result.tree),
            outline: Arc::new(result.outline),
            root_namespace: Vec::new(),
        }
    }

    pub fn with_root_namespace(mut self, root_namespace: Vec<String>) -> Self {
        self.root_namespace = root_namespace;
        self
    }
}
