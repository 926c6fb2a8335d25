//! Resolution through `using X = Y;` / `Imports X = Y` aliases

use dotres_core::ResolutionResult;

use crate::session::AnalysisSession;

impl AnalysisSession {
    /// If `result` points at an alias identifier, resolve the aliased name instead.
    ///
    /// The aliased name is resolved from its final segment. `NotFound` when `result` is not an
    /// alias.
    pub fn resolve_if_alias(&self, result: &ResolutionResult) -> ResolutionResult {
        let Some(location) = result.location() else {
            return ResolutionResult::NotFound;
        };
        let parsed = match self.parsed_file(&location.file) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Alias lookup skipped: {}", e);
                return ResolutionResult::NotFound;
            }
        };
        let Some(directive) = parsed.outline.alias_at(location.offset) else {
            return ResolutionResult::NotFound;
        };

        tracing::trace!(
            "Following alias {} to {}",
            directive.alias.as_ref().map_or("", |a| a.name.as_str()),
            directive.target.text
        );
        self.find_definition_at(&location.file, directive.target.query_offset())
    }
}
