//! Base-type and derived-type relationship graphs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use dotres_core::{
    DefinitionKind, DefinitionNode, GraphError, Location, MemberGroup, NameReference, RelationId,
    RelationshipGraph, RelationshipNode, ResolutionResult,
};
use rayon::prelude::*;

use crate::session::AnalysisSession;

/// Member groups in display order.
pub const MEMBER_GROUP_ORDER: [DefinitionKind; 11] = [
    DefinitionKind::Enum,
    DefinitionKind::Delegate,
    DefinitionKind::Event,
    DefinitionKind::Field,
    DefinitionKind::Indexer,
    DefinitionKind::Property,
    DefinitionKind::Constructor,
    DefinitionKind::Operator,
    DefinitionKind::PlatformImport,
    DefinitionKind::EventHandler,
    DefinitionKind::Method,
];

/// A relationship node summarizing `node` and its direct members, grouped by kind and sorted by
/// display text within each group.
pub fn build_header_model(node: &DefinitionNode, arrow_end: bool) -> RelationshipNode {
    let member_groups: Vec<MemberGroup> = MEMBER_GROUP_ORDER
        .iter()
        .filter_map(|&kind| {
            let mut members: Vec<DefinitionNode> = node
                .children
                .iter()
                .filter(|child| child.kind == kind)
                .cloned()
                .collect();
            if members.is_empty() {
                return None;
            }
            members.sort_by(|a, b| a.text.cmp(&b.text));
            Some(MemberGroup {
                kind,
                label: kind.group_label().to_string(),
                members,
            })
        })
        .collect();

    RelationshipNode {
        language: Some(node.language),
        definition: Some(node.clone()),
        is_expanded: !member_groups.is_empty(),
        member_groups,
        ..RelationshipNode::new(node.text.clone(), node.kind)
    }
    .with_arrow_end(arrow_end)
}

fn same_definition(node: &DefinitionNode, file: &Path, offset: usize) -> bool {
    node.file == file && node.identifier_offset == offset
}

/// True when `file`/`offset` already appears at `id` or above it.
fn on_path(graph: &RelationshipGraph, id: RelationId, file: &Path, offset: usize) -> bool {
    std::iter::once(id)
        .chain(graph.ancestors(id))
        .filter_map(|ancestor| graph.node(ancestor))
        .filter_map(|node| node.definition.as_ref())
        .any(|definition| same_definition(definition, file, offset))
}

impl AnalysisSession {
    /// Base-type references declared on `node`, as written.
    fn base_references(&self, node: &DefinitionNode) -> Vec<NameReference> {
        if !matches!(
            node.kind,
            DefinitionKind::Class | DefinitionKind::Struct | DefinitionKind::Interface
        ) {
            return Vec::new();
        }
        let parsed = match self.parsed_file(&node.file) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Cannot read base types of {}: {}", node.text, e);
                return Vec::new();
            }
        };
        let outline = &parsed.outline;
        let decl = node
            .handle
            .and_then(|handle| outline.type_decl(handle))
            .filter(|decl| decl.identifier_offset == node.identifier_offset)
            .or_else(|| {
                outline
                    .types
                    .iter()
                    .find(|decl| decl.identifier_offset == node.identifier_offset)
            });
        decl.map(|decl| decl.bases.clone()).unwrap_or_default()
    }

    fn header(&self, node: &DefinitionNode, arrow_end: bool) -> RelationshipNode {
        let mut header = build_header_model(node, arrow_end);
        header.base_types = self
            .base_references(node)
            .into_iter()
            .map(|reference| reference.text)
            .collect();
        header
    }

    /// The definition node a resolution result lands on, following an alias once.
    fn definition_for(&self, result: &ResolutionResult) -> Option<DefinitionNode> {
        let lookup = |location: &Location| {
            self.build_definition_tree(&location.file)
                .ok()
                .and_then(|tree| tree.find_by_identifier(location.offset).cloned())
        };
        if let Some(found) = result.location().and_then(lookup) {
            return Some(found);
        }
        let aliased = self.resolve_if_alias(result);
        aliased.location().and_then(lookup)
    }

    /// Does `reference`, written in `file`, denote `target` (directly or through an alias)?
    fn references(&self, file: &Path, reference: &NameReference, target: &DefinitionNode) -> bool {
        let result = self.find_definition_at(file, reference.query_offset());
        let hits = |result: &ResolutionResult| {
            result
                .location()
                .is_some_and(|l| same_definition(target, &l.file, l.offset))
        };
        if hits(&result) {
            return true;
        }
        result.is_found() && hits(&self.resolve_if_alias(&result))
    }

    /// Insert a node unless it repeats on its ancestor path. Returns the id to recurse from.
    fn insert_related(
        &self,
        graph: &mut RelationshipGraph,
        mut node: RelationshipNode,
        parent: RelationId,
        definition: &DefinitionNode,
    ) -> Result<Option<RelationId>, GraphError> {
        node.relation_id = Some(parent);
        if on_path(graph, parent, &definition.file, definition.identifier_offset) {
            if self.options.cycle_guard {
                node.cycle = true;
                graph.insert(node)?;
            }
            tracing::debug!("Cycle at {}", definition.text);
            return Ok(None);
        }
        Ok(Some(graph.insert(node)?))
    }

    /// `node` followed by everything it inherits from, each related to its subtype.
    pub fn build_base_type_relationships(
        &self,
        node: &DefinitionNode,
    ) -> Result<Vec<RelationshipNode>, GraphError> {
        let mut graph = RelationshipGraph::new();
        let mut root = self.header(node, true);
        root.is_target = true;
        let root_id = graph.insert(root)?;
        self.add_base_types(&mut graph, node, root_id)?;
        tracing::debug!("Base graph for {}: {} nodes", node.text, graph.len());
        Ok(graph.into_nodes())
    }

    fn add_base_types(
        &self,
        graph: &mut RelationshipGraph,
        node: &DefinitionNode,
        id: RelationId,
    ) -> Result<(), GraphError> {
        for reference in self.base_references(node) {
            let result = self.find_definition_at(&node.file, reference.query_offset());
            let Some(base) = self.definition_for(&result) else {
                tracing::debug!("Base type {} of {} not in source", reference.text, node.text);
                let placeholder = RelationshipNode::placeholder(&reference.text)
                    .with_arrow_end(true)
                    .related_to(Some(id));
                graph.insert(placeholder)?;
                continue;
            };

            let mut related = self.header(&base, true);
            if base.file != node.file {
                related = related.in_different_file(base.file.clone());
            }
            if let Some(next) = self.insert_related(graph, related, id, &base)? {
                self.add_base_types(graph, &base, next)?;
            }
        }
        Ok(())
    }

    /// `node` followed by every type that inherits from it, each related to its base.
    ///
    /// Scans every file visible to the newest context of the node's language.
    pub fn build_derived_type_relationships(
        &self,
        node: &DefinitionNode,
    ) -> Result<Vec<RelationshipNode>, GraphError> {
        let mut graph = RelationshipGraph::new();
        let mut root = self.header(node, false);
        root.is_target = true;
        let root_id = graph.insert(root)?;
        self.add_derived_types(&mut graph, node, root_id)?;
        tracing::debug!("Derived graph for {}: {} nodes", node.text, graph.len());
        Ok(graph.into_nodes())
    }

    fn add_derived_types(
        &self,
        graph: &mut RelationshipGraph,
        node: &DefinitionNode,
        id: RelationId,
    ) -> Result<(), GraphError> {
        let Some(context) = self.locator.newest(node.language) else {
            return Ok(());
        };

        // (file, type index, base reference) in file load order, then declaration order.
        let candidates: Vec<(PathBuf, usize, usize, &NameReference)> = context
            .files()
            .iter()
            .flat_map(|entry| {
                let path = entry.file.path.clone();
                entry
                    .file
                    .outline
                    .types
                    .iter()
                    .enumerate()
                    .filter(|(_, decl)| {
                        matches!(
                            decl.kind,
                            DefinitionKind::Class | DefinitionKind::Struct | DefinitionKind::Interface
                        )
                    })
                    .flat_map(move |(idx, decl)| {
                        let path = path.clone();
                        decl.bases
                            .iter()
                            .map(move |base| (path.clone(), idx, decl.identifier_offset, base))
                    })
            })
            .collect();

        let matches: Vec<bool> = candidates
            .par_iter()
            .map(|(file, _, _, reference)| self.references(file, reference, node))
            .collect();

        let mut emitted: HashSet<(PathBuf, usize)> = HashSet::new();
        for ((file, type_idx, identifier_offset, _), hit) in candidates.iter().zip(matches) {
            if !hit || !emitted.insert((file.clone(), *type_idx)) {
                continue;
            }
            let Some(derived) = self
                .build_definition_tree(file)
                .ok()
                .and_then(|tree| tree.find_by_identifier(*identifier_offset).cloned())
            else {
                continue;
            };

            let mut related = self.header(&derived, false);
            if derived.file != node.file {
                related = related.in_different_file(derived.file.clone());
            }
            if let Some(next) = self.insert_related(graph, related, id, &derived)? {
                self.add_derived_types(graph, &derived, next)?;
            }
        }
        Ok(())
    }
}
