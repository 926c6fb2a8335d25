//! Workspace configuration: manifests, MSBuild project files and source discovery

pub mod manifest;
pub mod project_file;

use std::path::{Path, PathBuf};

use dotres_core::ProjectSpec;
use thiserror::Error;

pub use manifest::{AnalysisOptions, Manifest, ProjectEntry, find_manifest, load_manifest};
pub use project_file::{build_excludes, discover_projects, discover_sources, parse_project_file};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unsupported manifest format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("invalid exclude pattern: {0}")]
    Glob(#[from] globset::Error),
    #[error("project {name} needs a language or a .csproj/.vbproj project file")]
    MissingLanguage { name: String },
}

/// Projects to load, in load order, and the options that govern analysis.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    pub projects: Vec<ProjectSpec>,
    pub options: AnalysisOptions,
}

/// Load the workspace at `root`.
///
/// An explicit manifest wins, then `dotres.toml` / `dotres.yaml` at the root. Without project
/// entries, every `.csproj` / `.vbproj` under the root is loaded in path order.
pub fn load_workspace(root: &Path, manifest: Option<&Path>) -> Result<WorkspaceConfig, ConfigError> {
    let manifest_path = match manifest {
        Some(path) => Some(path.to_path_buf()),
        None => find_manifest(root),
    };
    let manifest = match &manifest_path {
        Some(path) => {
            tracing::info!("Using manifest {}", path.display());
            load_manifest(path)?
        }
        None => Manifest::default(),
    };
    let base = manifest_path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());

    let excludes = build_excludes(&manifest.analysis.exclude)?;
    let projects = if manifest.projects.is_empty() {
        discover_projects(root, &excludes)
            .into_iter()
            .filter_map(|path| match parse_project_file(&path) {
                Ok(spec) => Some(spec),
                Err(e) => {
                    tracing::warn!("Skipping project {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    } else {
        manifest
            .projects
            .iter()
            .map(|entry| entry.to_spec(&base))
            .collect::<Result<Vec<_>, _>>()?
    };

    tracing::debug!("Workspace {} has {} projects", root.display(), projects.len());
    Ok(WorkspaceConfig {
        root: root.to_path_buf(),
        projects,
        options: manifest.analysis,
    })
}
