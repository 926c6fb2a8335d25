//! Symbol locator: (file, offset) → defining (file, identifier offset)

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dotres_core::{ResolutionResult, SourceLanguage};
use dotres_indexer::{CompilationContext, SourceReader, find_symbol_at_position};

/// Per-language compilation contexts in build order. Context *k* of a language sees the files
/// of the first *k* projects of that language.
#[derive(Default)]
pub struct SymbolLocator {
    contexts: HashMap<SourceLanguage, Vec<Arc<CompilationContext>>>,
}

impl SymbolLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, context: CompilationContext) {
        self.contexts
            .entry(context.language())
            .or_default()
            .push(Arc::new(context));
    }

    /// Contexts of `language`, oldest first.
    pub fn contexts(&self, language: SourceLanguage) -> &[Arc<CompilationContext>] {
        self.contexts.get(&language).map_or(&[], Vec::as_slice)
    }

    /// The context that sees every loaded file of `language`.
    pub fn newest(&self, language: SourceLanguage) -> Option<&Arc<CompilationContext>> {
        self.contexts(language).last()
    }

    /// Search contexts newest first. Contexts that do not hold `file` or fail are skipped; the
    /// first in-source location wins unless its file has since disappeared.
    pub fn locate(&self, reader: &dyn SourceReader, file: &Path, offset: usize) -> ResolutionResult {
        let Some(language) = SourceLanguage::from_path(file) else {
            return ResolutionResult::NotFound;
        };

        for (idx, context) in self.contexts(language).iter().enumerate().rev() {
            match find_symbol_at_position(context, file, offset) {
                Ok(Some(location)) => {
                    if !reader.exists(&location.file) {
                        tracing::debug!("{} no longer exists", location.file.display());
                        return ResolutionResult::NotFound;
                    }
                    return ResolutionResult::Found(location);
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("Context {} skipped for {}: {}", idx, file.display(), e),
            }
        }
        ResolutionResult::NotFound
    }
}
