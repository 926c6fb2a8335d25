//! Relationship graph using petgraph::StableDiGraph with RelationId back-references

use std::path::PathBuf;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::model::{DefinitionKind, DefinitionNode, SourceLanguage};

/// Identifier of a node within one relationship graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId(pub u64);

impl RelationId {
    fn index(self) -> NodeIndex {
        NodeIndex::new(self.0 as usize)
    }
}

/// Members of one kind, shown under a header inside a relationship node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberGroup {
    pub kind: DefinitionKind,
    pub label: String,
    pub members: Vec<DefinitionNode>,
}

/// A node exposed to base-type, derived-type and project views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipNode {
    pub id: RelationId,
    /// Node this one relates to; `None` only for graph roots.
    pub relation_id: Option<RelationId>,
    pub is_target: bool,
    pub arrow_end: bool,
    pub name: String,
    pub kind: DefinitionKind,
    pub language: Option<SourceLanguage>,
    pub definition: Option<DefinitionNode>,
    pub not_found: bool,
    pub base_types: Vec<String>,
    pub difference_file: Option<PathBuf>,
    pub difference_name: Option<String>,
    pub is_expanded: bool,
    pub member_groups: Vec<MemberGroup>,
    /// Set when recursion stopped because this definition already appears above it.
    pub cycle: bool,
}

impl RelationshipNode {
    pub fn new(name: impl Into<String>, kind: DefinitionKind) -> Self {
        RelationshipNode {
            id: RelationId(0),
            relation_id: None,
            is_target: false,
            arrow_end: false,
            name: name.into(),
            kind,
            language: None,
            definition: None,
            not_found: false,
            base_types: Vec::new(),
            difference_file: None,
            difference_name: None,
            is_expanded: false,
            member_groups: Vec::new(),
            cycle: false,
        }
    }

    /// Stand-in for a base type that could not be resolved to source.
    pub fn placeholder(name: &str) -> Self {
        let kind = if name.to_lowercase().starts_with('i') {
            DefinitionKind::Interface
        } else {
            DefinitionKind::Class
        };
        RelationshipNode {
            not_found: true,
            ..RelationshipNode::new(name, kind)
        }
    }

    pub fn related_to(mut self, relation: Option<RelationId>) -> Self {
        self.relation_id = relation;
        self
    }

    pub fn with_arrow_end(mut self, arrow_end: bool) -> Self {
        self.arrow_end = arrow_end;
        self
    }

    /// Mark as living in `file`, a different file than the node it relates to.
    pub fn in_different_file(mut self, file: PathBuf) -> Self {
        self.difference_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        self.difference_file = Some(file);
        self
    }

    pub fn is_difference_file(&self) -> bool {
        self.difference_file.is_some()
    }

    pub fn has_base_type(&self) -> bool {
        !self.base_types.is_empty()
    }

    /// Base types joined for display.
    pub fn base_types_text(&self) -> String {
        self.base_types.join(", ")
    }
}

/// Flat collection of relationship nodes linked child → related node.
pub struct RelationshipGraph {
    inner: StableDiGraph<RelationshipNode, ()>,
}

impl std::fmt::Debug for RelationshipGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipGraph")
            .field("node_count", &self.inner.node_count())
            .finish()
    }
}

impl RelationshipGraph {
    pub fn new() -> Self {
        RelationshipGraph {
            inner: StableDiGraph::new(),
        }
    }

    /// Insert a node, assigning its id. Fails if its relation names no inserted node.
    pub fn insert(&mut self, node: RelationshipNode) -> Result<RelationId, GraphError> {
        let related = match node.relation_id {
            Some(relation) if self.inner.contains_node(relation.index()) => Some(relation),
            Some(relation) => {
                tracing::error!("{} relates to {:?}, which is not in the graph", node.name, relation);
                return Err(GraphError::MissingRelation { relation });
            }
            None => None,
        };

        let idx = self.inner.add_node(node);
        let id = RelationId(idx.index() as u64);
        if let Some(weight) = self.inner.node_weight_mut(idx) {
            weight.id = id;
        }
        if let Some(relation) = related {
            self.inner.add_edge(idx, relation.index(), ());
        }
        Ok(id)
    }

    pub fn node(&self, id: RelationId) -> Option<&RelationshipNode> {
        self.inner.node_weight(id.index())
    }

    pub fn node_mut(&mut self, id: RelationId) -> Option<&mut RelationshipNode> {
        self.inner.node_weight_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Nodes that relate to `id`, in insertion order.
    pub fn children(&self, id: RelationId) -> Vec<RelationId> {
        let mut children: Vec<RelationId> = self
            .inner
            .neighbors_directed(id.index(), Direction::Incoming)
            .map(|idx| RelationId(idx.index() as u64))
            .collect();
        children.sort();
        children
    }

    /// Nodes without a relation, in insertion order.
    pub fn roots(&self) -> Vec<RelationId> {
        self.inner
            .node_indices()
            .filter(|&idx| {
                self.inner
                    .neighbors_directed(idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|idx| RelationId(idx.index() as u64))
            .collect()
    }

    /// Chain of related nodes from `id` up to its root, nearest first.
    pub fn ancestors(&self, id: RelationId) -> Vec<RelationId> {
        let mut chain = Vec::new();
        let mut current = id.index();
        while let Some(next) = self
            .inner
            .neighbors_directed(current, Direction::Outgoing)
            .next()
        {
            if chain.contains(&RelationId(next.index() as u64)) {
                break;
            }
            chain.push(RelationId(next.index() as u64));
            current = next;
        }
        chain
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationshipNode> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// Consume the graph into its flat, insertion-ordered node list.
    pub fn into_nodes(mut self) -> Vec<RelationshipNode> {
        let indices: Vec<NodeIndex> = self.inner.node_indices().collect();
        indices
            .into_iter()
            .filter_map(|idx| self.inner.remove_node(idx))
            .collect()
    }
}

impl Default for RelationshipGraph {
    fn default() -> Self {
        Self::new()
    }
}
