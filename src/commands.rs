//! CLI command implementations

use std::path::Path;

use anyhow::{Context, bail};
use dotres_core::{DefinitionNode, RelationshipNode, ResolutionResult, simple_name};
use dotres_indexer::load_workspace;
use dotres_resolver::AnalysisSession;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::Format;

pub async fn load_session(root: &Path, manifest: Option<&Path>) -> anyhow::Result<AnalysisSession> {
    let config = load_workspace(root, manifest)
        .with_context(|| format!("Cannot load workspace at {}", root.display()))?;
    if config.projects.is_empty() {
        tracing::warn!("No projects found under {}", root.display());
    }
    AnalysisSession::load(&config).await
}

pub fn outline(session: &AnalysisSession, file: &Path, format: Format) -> anyhow::Result<()> {
    let tree = session.build_definition_tree(file)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&*tree)?),
        Format::Text => {
            for root in &tree.roots {
                print_definition(root, 0);
            }
        }
    }
    Ok(())
}

fn print_definition(node: &DefinitionNode, depth: usize) {
    println!(
        "{}{:?} {}  [{}..{}]",
        "  ".repeat(depth),
        node.kind,
        node.text,
        node.start,
        node.end
    );
    for child in &node.children {
        print_definition(child, depth + 1);
    }
}

/// The type in `file` named by `target`: an identifier offset, or the best fuzzy name match.
fn select_type(session: &AnalysisSession, file: &Path, target: &str) -> anyhow::Result<DefinitionNode> {
    let tree = session.build_definition_tree(file)?;
    if let Ok(offset) = target.parse::<usize>() {
        return tree
            .find_by_identifier(offset)
            .filter(|node| node.kind.is_type_like())
            .cloned()
            .with_context(|| format!("No type declared at offset {} in {}", offset, file.display()));
    }

    if let Some(exact) = tree.find_type_by_name(target) {
        return Ok(exact.clone());
    }
    let matcher = SkimMatcherV2::default();
    let best = tree
        .iter()
        .filter(|node| node.kind.is_type_like())
        .filter_map(|node| {
            matcher
                .fuzzy_match(simple_name(&node.text), target)
                .map(|score| (score, node))
        })
        .max_by_key(|(score, _)| *score);
    match best {
        Some((_, node)) => {
            tracing::debug!("'{}' matched {}", target, node.text);
            Ok(node.clone())
        }
        None => bail!("No type matching '{}' in {}", target, file.display()),
    }
}

pub fn bases(session: &AnalysisSession, file: &Path, target: &str, format: Format) -> anyhow::Result<()> {
    let node = select_type(session, file, target)?;
    let nodes = session.build_base_type_relationships(&node)?;
    print_relationships(&nodes, format)
}

pub fn derived(session: &AnalysisSession, file: &Path, target: &str, format: Format) -> anyhow::Result<()> {
    let node = select_type(session, file, target)?;
    let nodes = session.build_derived_type_relationships(&node)?;
    print_relationships(&nodes, format)
}

pub fn projects(session: &AnalysisSession, name: Option<&str>, format: Format) -> anyhow::Result<()> {
    let nodes = match name {
        Some(name) => {
            if session.project(name).is_none() {
                bail!("No project named '{}'", name);
            }
            session.build_project_relationships(name)?
        }
        None => session.build_solution_relationships()?,
    };
    print_relationships(&nodes, format)
}

fn print_relationships(nodes: &[RelationshipNode], format: Format) -> anyhow::Result<()> {
    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(nodes)?);
        return Ok(());
    }

    for node in nodes {
        let depth = std::iter::successors(node.relation_id, |id| {
            nodes.iter().find(|n| n.id == *id).and_then(|n| n.relation_id)
        })
        .take(nodes.len())
        .count();

        let mut line = format!("{}{:?} {}", "  ".repeat(depth), node.kind, node.name);
        if node.has_base_type() {
            line.push_str(&format!(" : {}", node.base_types_text()));
        }
        if let Some(name) = &node.difference_name {
            line.push_str(&format!("  ({})", name));
        }
        if node.not_found {
            line.push_str("  [not in source]");
        }
        if node.cycle {
            line.push_str("  [cycle]");
        }
        println!("{}", line);

        for group in &node.member_groups {
            println!("{}  {}:", "  ".repeat(depth), group.label);
            for member in &group.members {
                println!("{}    {}", "  ".repeat(depth), member.text);
            }
        }
    }
    Ok(())
}

pub fn goto(session: &AnalysisSession, file: &Path, offset: usize, format: Format) -> anyhow::Result<()> {
    let result = session.find_definition_at(file, offset);
    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match &result {
        ResolutionResult::Found(location) => {
            let parsed = session.parsed_file(&location.file)?;
            let before = parsed.text.get(..location.offset).unwrap_or(&*parsed.text);
            let line = before.matches('\n').count() + 1;
            let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
            println!("{}:{}:{}", location.file.display(), line, column);
        }
        ResolutionResult::NotFound => println!("not found"),
    }
    Ok(())
}
