//! Project descriptions: what a compilation context is built from

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::SourceLanguage;

/// One C# or Visual Basic project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub name: String,
    pub language: SourceLanguage,
    /// Directory that source discovery starts from.
    pub root: PathBuf,
    #[serde(default)]
    pub project_file: Option<PathBuf>,
    /// Explicit source files. Empty means every source file under `root`.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Visual Basic implicit namespace wrapping every declaration in the project.
    #[serde(default)]
    pub root_namespace: Option<String>,
    #[serde(default)]
    pub assembly_name: Option<String>,
    /// MSBuild OutputType (`Library`, `Exe`, `WinExe`).
    #[serde(default)]
    pub output_type: Option<String>,
    /// Assembly references by file or assembly name.
    #[serde(default)]
    pub references: Vec<String>,
    /// NuGet package references.
    #[serde(default)]
    pub packages: Vec<String>,
    /// Names of referenced projects.
    #[serde(default)]
    pub project_references: Vec<String>,
}

impl ProjectSpec {
    pub fn new(name: impl Into<String>, language: SourceLanguage, root: impl Into<PathBuf>) -> Self {
        ProjectSpec {
            name: name.into(),
            language,
            root: root.into(),
            project_file: None,
            files: Vec::new(),
            root_namespace: None,
            assembly_name: None,
            output_type: None,
            references: Vec::new(),
            packages: Vec::new(),
            project_references: Vec::new(),
        }
    }

    /// Output file name, e.g. `ClassLibrary1.dll`.
    pub fn assembly_file_name(&self) -> String {
        let base = self.assembly_name.as_deref().unwrap_or(&self.name);
        let extension = match self.output_type.as_deref().map(str::to_ascii_lowercase) {
            Some(kind) if kind == "exe" || kind == "winexe" => "exe",
            _ => "dll",
        };
        format!("{}.{}", base, extension)
    }

    /// Root namespace split into segments; empty for C# projects.
    pub fn root_namespace_path(&self) -> Vec<String> {
        match (&self.language, &self.root_namespace) {
            (SourceLanguage::VisualBasic, Some(ns)) => ns
                .split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}
