//! `dotres.toml` / `dotres.yaml` manifest

use std::path::{Path, PathBuf};

use dotres_core::{ProjectSpec, SourceLanguage};
use serde::{Deserialize, Serialize};

use super::ConfigError;
use super::project_file::parse_project_file;

const MANIFEST_NAMES: &[&str] = &["dotres.toml", "dotres.yaml", "dotres.yml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub analysis: AnalysisOptions,
    #[serde(rename = "project")]
    pub projects: Vec<ProjectEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Glob patterns for source files and project files to skip.
    pub exclude: Vec<String>,
    /// Stop relationship recursion when a type repeats on the current path.
    pub cycle_guard: bool,
    /// Reuse definition trees within a session.
    pub memoize_trees: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            exclude: vec!["**/obj/**".to_string(), "**/bin/**".to_string()],
            cycle_guard: true,
            memoize_trees: true,
        }
    }
}

/// A `[[project]]` table. Either `project_file` or `name` + `language` + `root` is needed;
/// explicit keys override what the project file says.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    pub name: Option<String>,
    pub language: Option<SourceLanguage>,
    pub root: Option<PathBuf>,
    pub project_file: Option<PathBuf>,
    pub files: Vec<PathBuf>,
    pub root_namespace: Option<String>,
    pub assembly_name: Option<String>,
    pub output_type: Option<String>,
    pub references: Vec<String>,
    pub packages: Vec<String>,
    pub project_references: Vec<String>,
}

impl ProjectEntry {
    /// Resolve relative paths against `base` and merge with the project file, if any.
    pub fn to_spec(&self, base: &Path) -> Result<ProjectSpec, ConfigError> {
        let resolve = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        };

        let mut spec = match &self.project_file {
            Some(file) => parse_project_file(&resolve(file))?,
            None => {
                let name = self.name.clone().unwrap_or_else(|| "project".to_string());
                let Some(language) = self.language else {
                    return Err(ConfigError::MissingLanguage { name });
                };
                let root = self.root.as_deref().map(resolve).unwrap_or_else(|| base.to_path_buf());
                ProjectSpec::new(name, language, root)
            }
        };

        if let Some(name) = &self.name {
            spec.name = name.clone();
        }
        if let Some(language) = self.language {
            spec.language = language;
        }
        if let Some(root) = &self.root {
            spec.root = resolve(root);
        }
        if !self.files.is_empty() {
            spec.files = self.files.iter().map(|f| resolve(f)).collect();
        }
        if self.root_namespace.is_some() {
            spec.root_namespace = self.root_namespace.clone();
        }
        if self.assembly_name.is_some() {
            spec.assembly_name = self.assembly_name.clone();
        }
        if self.output_type.is_some() {
            spec.output_type = self.output_type.clone();
        }
        spec.references.extend(self.references.iter().cloned());
        spec.packages.extend(self.packages.iter().cloned());
        spec.project_references.extend(self.project_references.iter().cloned());
        Ok(spec)
    }
}

/// First manifest file present in `root`.
pub fn find_manifest(root: &Path) -> Option<PathBuf> {
    MANIFEST_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

pub fn load_manifest(path: &Path) -> Result<Manifest, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("toml") => toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}
