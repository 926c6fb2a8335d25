//! MSBuild project files and source discovery

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use dotres_core::{ProjectSpec, SourceLanguage};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use regex::Regex;

use super::ConfigError;
use crate::source::decode;

static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(RootNamespace|AssemblyName|OutputType)>\s*(.*?)\s*</")
        .expect("valid property pattern")
});
static ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(Reference|PackageReference|ProjectReference|Compile)\s+Include\s*=\s*"([^"]+)"(.*?)(?:/>|</(?:Reference|PackageReference|ProjectReference|Compile)>)"#)
        .expect("valid item pattern")
});
static HINT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<HintPath>\s*(.*?)\s*</HintPath>").expect("valid hint path pattern")
});

/// `..\Common\Common.csproj` → `Common`.
fn file_stem(include: &str) -> String {
    let normalized = include.replace('\\', "/");
    Path::new(&normalized)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&normalized)
        .to_string()
}

/// Read a `.csproj` / `.vbproj`.
///
/// SDK-style projects list no `Compile` items, so `files` stays empty and sources are discovered
/// under the project directory. Visual Basic projects default their root namespace to the
/// assembly name.
pub fn parse_project_file(path: &Path) -> Result<ProjectSpec, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (content, _) = decode(&bytes);
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("project")
        .to_string();
    let language = SourceLanguage::from_project_path(path)
        .ok_or_else(|| ConfigError::MissingLanguage { name: name.clone() })?;
    let root = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut spec = ProjectSpec::new(name, language, root.clone());
    spec.project_file = Some(path.to_path_buf());

    for caps in PROPERTY.captures_iter(&content) {
        let value = caps[2].trim().to_string();
        if value.is_empty() {
            continue;
        }
        let slot = match &caps[1] {
            "RootNamespace" => &mut spec.root_namespace,
            "AssemblyName" => &mut spec.assembly_name,
            _ => &mut spec.output_type,
        };
        // First definition wins; later ones are usually conditional.
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    for caps in ITEM.captures_iter(&content) {
        let include = caps[2].trim();
        let body = caps.get(3).map_or("", |m| m.as_str());
        match &caps[1] {
            "Reference" => {
                let assembly = include.split(',').next().unwrap_or(include).trim().to_string();
                let from_packages = HINT_PATH
                    .captures(body)
                    .is_some_and(|hint| hint[1].replace('\\', "/").contains("/packages/"));
                if from_packages {
                    spec.packages.push(assembly);
                } else {
                    spec.references.push(assembly);
                }
            }
            "PackageReference" => spec.packages.push(include.to_string()),
            "ProjectReference" => spec.project_references.push(file_stem(include)),
            _ => {
                let relative = include.replace('\\', "/");
                if SourceLanguage::from_path(Path::new(&relative)) == Some(language) {
                    spec.files.push(root.join(relative));
                }
            }
        }
    }

    if language == SourceLanguage::VisualBasic && spec.root_namespace.is_none() {
        spec.root_namespace = Some(spec.assembly_name.clone().unwrap_or_else(|| spec.name.clone()));
    }

    tracing::debug!(
        "Parsed {}: {} files, {} references, {} packages, {} project references",
        path.display(),
        spec.files.len(),
        spec.references.len(),
        spec.packages.len(),
        spec.project_references.len()
    );
    Ok(spec)
}

pub fn build_excludes(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn is_project_file(path: &Path) -> bool {
    SourceLanguage::from_project_path(path).is_some()
}

fn is_excluded(path: &Path, root: &Path, excludes: &GlobSet) -> bool {
    excludes.is_match(path) || path.strip_prefix(root).is_ok_and(|rel| excludes.is_match(rel))
}

/// Every `.csproj` / `.vbproj` under `root`, sorted by path.
pub fn discover_projects(root: &Path, excludes: &GlobSet) -> Vec<PathBuf> {
    let mut projects: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Failed to read entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| is_project_file(path) && !is_excluded(path, root, excludes))
        .collect();
    projects.sort();
    tracing::info!("Found {} project files under {}", projects.len(), root.display());
    projects
}

/// True when `dir` holds its own project file, so its sources belong to that project.
fn holds_project(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .any(|entry| is_project_file(&entry.path()))
        })
        .unwrap_or(false)
}

/// Source files of `project`: its explicit list, or everything under its root with the
/// project's extension, minus excluded paths and nested projects.
pub fn discover_sources(project: &ProjectSpec, excludes: &GlobSet) -> Vec<PathBuf> {
    if !project.files.is_empty() {
        return project
            .files
            .iter()
            .filter(|path| !is_excluded(path, &project.root, excludes))
            .cloned()
            .collect();
    }

    let root = project.root.clone();
    let mut builder = WalkBuilder::new(&project.root);
    builder.hidden(true).git_ignore(true);
    builder.filter_entry(move |entry| {
        if entry.path() == root || !entry.file_type().is_some_and(|t| t.is_dir()) {
            return true;
        }
        if matches!(entry.file_name().to_str(), Some("obj") | Some("bin")) {
            return false;
        }
        !holds_project(entry.path())
    });

    let mut files: Vec<PathBuf> = builder
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| SourceLanguage::from_path(path) == Some(project.language))
        .filter(|path| !is_excluded(path, &project.root, excludes))
        .collect();
    files.sort();
    tracing::debug!("Project {} has {} source files", project.name, files.len());
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="15.0">
  <PropertyGroup>
    <OutputType>Exe</OutputType>
    <RootNamespace>ConsoleApp1</RootNamespace>
    <AssemblyName>ConsoleApp1</AssemblyName>
  </PropertyGroup>
  <ItemGroup>
    <Reference Include="System" />
    <Reference Include="Newtonsoft.Json, Version=13.0.0.0, Culture=neutral">
      <HintPath>..\packages\Newtonsoft.Json.13.0.1\lib\net45\Newtonsoft.Json.dll</HintPath>
    </Reference>
  </ItemGroup>
  <ItemGroup>
    <Compile Include="Program.cs" />
    <Compile Include="Models\Person.cs" />
  </ItemGroup>
  <ItemGroup>
    <ProjectReference Include="..\ClassLibrary1\ClassLibrary1.csproj">
      <Name>ClassLibrary1</Name>
    </ProjectReference>
  </ItemGroup>
</Project>
"#;

    #[test]
    fn test_classic_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ConsoleApp1.csproj");
        std::fs::write(&path, CLASSIC).unwrap();

        let spec = parse_project_file(&path).unwrap();
        assert_eq!(spec.name, "ConsoleApp1");
        assert_eq!(spec.language, SourceLanguage::CSharp);
        assert_eq!(spec.assembly_file_name(), "ConsoleApp1.exe");
        assert_eq!(spec.references, vec!["System".to_string()]);
        assert_eq!(spec.packages, vec!["Newtonsoft.Json".to_string()]);
        assert_eq!(spec.project_references, vec!["ClassLibrary1".to_string()]);
        assert_eq!(
            spec.files,
            vec![dir.path().join("Program.cs"), dir.path().join("Models/Person.cs")]
        );
    }

    #[test]
    fn test_sdk_style_vb_project_discovers_sources() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("App");
        std::fs::create_dir_all(app.join("obj")).unwrap();
        std::fs::create_dir_all(app.join("Nested")).unwrap();
        std::fs::write(
            app.join("App.vbproj"),
            r#"<Project Sdk="Microsoft.NET.Sdk"><ItemGroup><PackageReference Include="Serilog" Version="3.0.0" /></ItemGroup></Project>"#,
        )
        .unwrap();
        std::fs::write(app.join("Module1.vb"), "Module Module1\nEnd Module\n").unwrap();
        std::fs::write(app.join("obj").join("AssemblyInfo.vb"), "").unwrap();
        std::fs::write(app.join("Nested").join("Nested.vbproj"), "<Project />").unwrap();
        std::fs::write(app.join("Nested").join("Other.vb"), "").unwrap();
        std::fs::write(app.join("Skip.cs"), "").unwrap();

        let excludes = build_excludes(&[]).unwrap();
        let projects = discover_projects(dir.path(), &excludes);
        assert_eq!(projects, vec![app.join("App.vbproj"), app.join("Nested").join("Nested.vbproj")]);

        let spec = parse_project_file(&app.join("App.vbproj")).unwrap();
        assert_eq!(spec.root_namespace.as_deref(), Some("App"));
        assert_eq!(spec.packages, vec!["Serilog".to_string()]);
        assert_eq!(discover_sources(&spec, &excludes), vec![app.join("Module1.vb")]);
    }

    #[test]
    fn test_excludes_apply_to_relative_paths() {
        let excludes = build_excludes(&["Generated/**".to_string()]).unwrap();
        let root = Path::new("/work/App");
        assert!(is_excluded(&root.join("Generated/Foo.cs"), root, &excludes));
        assert!(!is_excluded(&root.join("Foo.cs"), root, &excludes));
        assert!(build_excludes(&["[".to_string()]).is_err());
    }
}
