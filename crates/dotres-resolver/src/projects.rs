//! Project reference graphs

use std::path::{Path, PathBuf};

use dotres_core::{
    DefinitionKind, DefinitionNode, GraphError, MemberGroup, RelationId, RelationshipGraph,
    RelationshipNode, SourceLanguage,
};

use crate::session::{AnalysisSession, LoadedProject};

fn dependency(name: &str, file: &Path, language: SourceLanguage) -> DefinitionNode {
    DefinitionNode::new(DefinitionKind::Dependency, name, file, language, (0, 0), 0)
}

fn group(kind: DefinitionKind, label: &str, members: Vec<DefinitionNode>) -> Option<MemberGroup> {
    (!members.is_empty()).then(|| MemberGroup {
        kind,
        label: label.to_string(),
        members,
    })
}

fn project_file(project: &LoadedProject) -> PathBuf {
    project
        .spec
        .project_file
        .clone()
        .unwrap_or_else(|| project.spec.root.clone())
}

/// Relationship node summarizing one project.
fn project_node(project: &LoadedProject) -> RelationshipNode {
    let spec = &project.spec;
    let file = project_file(project);
    let definition = DefinitionNode::new(
        DefinitionKind::Project,
        spec.name.clone(),
        &file,
        spec.language,
        (0, 0),
        0,
    );

    let mut references: Vec<DefinitionNode> = spec
        .references
        .iter()
        .map(|r| dependency(r, &file, spec.language))
        .collect();
    references.sort_by(|a, b| a.text.cmp(&b.text));
    let mut packages: Vec<DefinitionNode> = spec
        .packages
        .iter()
        .map(|p| dependency(p, &file, spec.language))
        .collect();
    packages.sort_by(|a, b| a.text.cmp(&b.text));

    let assembly = dependency(&spec.assembly_file_name(), &file, spec.language);
    let member_groups: Vec<MemberGroup> = [
        group(DefinitionKind::Project, "Assembly file name", vec![assembly]),
        group(DefinitionKind::Dependency, "References", references),
        group(DefinitionKind::Dependency, "Package references", packages),
    ]
    .into_iter()
    .flatten()
    .collect();

    RelationshipNode {
        language: Some(spec.language),
        definition: Some(definition),
        is_expanded: true,
        member_groups,
        ..RelationshipNode::new(spec.name.clone(), DefinitionKind::Project)
    }
}

impl AnalysisSession {
    /// Loaded project named `name`, ignoring case.
    pub fn project(&self, name: &str) -> Option<&LoadedProject> {
        self.projects
            .iter()
            .find(|p| p.spec.name.eq_ignore_ascii_case(name))
    }

    /// `name` followed by the projects it references, transitively.
    ///
    /// Returns an empty list when no such project was loaded.
    pub fn build_project_relationships(
        &self,
        name: &str,
    ) -> Result<Vec<RelationshipNode>, GraphError> {
        let mut graph = RelationshipGraph::new();
        if let Some(project) = self.project(name) {
            let mut root = project_node(project);
            root.is_target = true;
            let id = graph.insert(root)?;
            self.add_project_references(&mut graph, project, id)?;
        }
        Ok(graph.into_nodes())
    }

    /// Every project that no other project references, each followed by its references.
    ///
    /// When every project is referenced by another one, every project is a root.
    pub fn build_solution_relationships(&self) -> Result<Vec<RelationshipNode>, GraphError> {
        let referenced = |project: &LoadedProject| {
            self.projects.iter().any(|other| {
                other
                    .spec
                    .project_references
                    .iter()
                    .any(|r| r.eq_ignore_ascii_case(&project.spec.name))
            })
        };
        let mut roots: Vec<&LoadedProject> =
            self.projects.iter().filter(|p| !referenced(p)).collect();
        if roots.is_empty() {
            roots = self.projects.iter().collect();
        }

        let mut graph = RelationshipGraph::new();
        for project in roots {
            let id = graph.insert(project_node(project))?;
            self.add_project_references(&mut graph, project, id)?;
        }
        tracing::debug!("Solution graph: {} nodes", graph.len());
        Ok(graph.into_nodes())
    }

    fn add_project_references(
        &self,
        graph: &mut RelationshipGraph,
        project: &LoadedProject,
        id: RelationId,
    ) -> Result<(), GraphError> {
        for reference in &project.spec.project_references {
            let Some(referenced) = self.project(reference) else {
                tracing::debug!("{} references unknown project {}", project.spec.name, reference);
                let missing = RelationshipNode {
                    not_found: true,
                    ..RelationshipNode::new(reference.clone(), DefinitionKind::Dependency)
                }
                .with_arrow_end(true)
                .related_to(Some(id));
                graph.insert(missing)?;
                continue;
            };

            let mut node = project_node(referenced).with_arrow_end(true).related_to(Some(id));
            let repeats = std::iter::once(id)
                .chain(graph.ancestors(id))
                .filter_map(|ancestor| graph.node(ancestor))
                .any(|n| n.name.eq_ignore_ascii_case(&referenced.spec.name));
            if repeats {
                if self.options.cycle_guard {
                    node.cycle = true;
                    graph.insert(node)?;
                }
                continue;
            }

            let next = graph.insert(node)?;
            self.add_project_references(graph, referenced, next)?;
        }
        Ok(())
    }
}
