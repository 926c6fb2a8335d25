//! Integration tests for dotres
//!
//! These tests load real project trees from disk and drive the CLI end to end.

use std::path::{Path, PathBuf};
use std::process::Command;

use dotres_core::{DefinitionKind, RelationshipNode, ResolutionResult, SourceLanguage};
use dotres_indexer::load_workspace;
use dotres_resolver::AnalysisSession;
use tempfile::TempDir;

const SHAPES: &str = "namespace Core\n{\n    public class Shape { }\n    public interface IDrawable { }\n}\n";
const CIRCLE: &str = "using Core;\n\nnamespace App\n{\n    public class Circle : Shape, IDrawable\n    {\n        public double Radius { get; set; }\n    }\n}\n";
const FORM: &str = "Public Class Form1\n    Inherits Legacy.Base\nEnd Class\n\nPublic Class Base\nEnd Class\n";

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

/// App (C#) → Core (C#), plus a standalone Visual Basic project.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        &root.join("Core/Core.csproj"),
        r#"<Project Sdk="Microsoft.NET.Sdk"><ItemGroup><PackageReference Include="Serilog" Version="3.0.0" /></ItemGroup></Project>"#,
    );
    write(&root.join("Core/Shapes.cs"), SHAPES);
    write(
        &root.join("App/App.csproj"),
        r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup><OutputType>Exe</OutputType></PropertyGroup>
  <ItemGroup><ProjectReference Include="..\Core\Core.csproj" /></ItemGroup>
</Project>"#,
    );
    write(&root.join("App/Circle.cs"), CIRCLE);
    write(&root.join("App/obj/Generated.cs"), "class Generated : Shape { }");
    write(
        &root.join("Legacy/Legacy.vbproj"),
        "<Project><PropertyGroup><RootNamespace>Legacy</RootNamespace></PropertyGroup></Project>",
    );
    write(&root.join("Legacy/Form1.vb"), FORM);
    dir
}

async fn load(root: &Path) -> AnalysisSession {
    let config = load_workspace(root, None).unwrap();
    AnalysisSession::load(&config).await.unwrap()
}

fn names(nodes: &[RelationshipNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.name.as_str()).collect()
}

#[tokio::test]
async fn test_discovered_workspace_loads() {
    let dir = workspace();
    let session = load(dir.path()).await;

    let projects: Vec<&str> = session.projects().iter().map(|p| p.spec.name.as_str()).collect();
    assert_eq!(projects, ["App", "Core", "Legacy"]);
    assert_eq!(session.files().count(), 3);
    assert!(session.files().all(|f| f.components().all(|c| c.as_os_str() != "obj")));
    assert_eq!(session.locator().contexts(SourceLanguage::CSharp).len(), 2);
    assert_eq!(session.locator().contexts(SourceLanguage::VisualBasic).len(), 1);
}

#[tokio::test]
async fn test_relationships_across_projects() {
    let dir = workspace();
    let session = load(dir.path()).await;
    let circle_file = dir.path().join("App/Circle.cs");
    let shapes_file = dir.path().join("Core/Shapes.cs");

    let circle = session
        .build_definition_tree(&circle_file)
        .unwrap()
        .find_type_by_name("Circle")
        .cloned()
        .unwrap();
    let bases = session.build_base_type_relationships(&circle).unwrap();
    assert_eq!(names(&bases), ["Circle", "Shape", "IDrawable"]);
    assert_eq!(bases[1].difference_name.as_deref(), Some("Shapes.cs"));
    assert_eq!(bases[2].kind, DefinitionKind::Interface);
    assert_eq!(bases[0].member_groups[0].label, "Properties");

    let shape = session
        .build_definition_tree(&shapes_file)
        .unwrap()
        .find_type_by_name("Shape")
        .cloned()
        .unwrap();
    let derived = session.build_derived_type_relationships(&shape).unwrap();
    assert_eq!(names(&derived), ["Shape", "Circle"]);
    assert_eq!(derived[1].relation_id, Some(derived[0].id));
}

#[tokio::test]
async fn test_visual_basic_project() {
    let dir = workspace();
    let session = load(dir.path()).await;
    let form_file = dir.path().join("Legacy/Form1.vb");

    let offset = FORM.find("Base").unwrap();
    let found = session.find_definition_at(&form_file, offset);
    let expected = ResolutionResult::found(
        session.normalize(&form_file),
        FORM.rfind("Base").unwrap(),
    );
    assert_eq!(found, expected);
}

#[tokio::test]
async fn test_solution_graph() {
    let dir = workspace();
    let session = load(dir.path()).await;

    let nodes = session.build_solution_relationships().unwrap();
    assert_eq!(names(&nodes), ["App", "Core", "Legacy"]);
    assert_eq!(nodes[1].relation_id, Some(nodes[0].id));
    assert_eq!(nodes[2].relation_id, None);
    assert_eq!(nodes[0].member_groups[0].members[0].text, "App.exe");
    assert_eq!(nodes[1].member_groups[1].label, "Package references");
}

#[tokio::test]
async fn test_manifest_overrides_discovery() {
    let dir = workspace();
    write(
        &dir.path().join("dotres.yaml"),
        "analysis:\n  cycle_guard: false\nproject:\n  - name: OnlyVb\n    language: visual_basic\n    root: Legacy\n    root_namespace: Legacy\n",
    );

    let config = load_workspace(dir.path(), None).unwrap();
    assert!(!config.options.cycle_guard);
    assert_eq!(config.projects.len(), 1);

    let session = AnalysisSession::load(&config).await.unwrap();
    assert_eq!(session.projects()[0].files.len(), 1);
    assert!(session.locator().contexts(SourceLanguage::CSharp).is_empty());
}

fn dotres(root: &Path, args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_dotres"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute dotres");
    assert!(
        output.status.success(),
        "dotres {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_help_and_version() {
    let dir = TempDir::new().unwrap();
    let help = dotres(dir.path(), &["--help"]);
    assert!(help.contains("C# and Visual Basic"));
    let version = dotres(dir.path(), &["version"]);
    assert!(version.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_commands() {
    let dir = workspace();
    let circle: PathBuf = dir.path().join("App/Circle.cs");
    let circle = circle.to_string_lossy();

    let outline = dotres(dir.path(), &["outline", &circle]);
    assert!(outline.contains("Class Circle"));
    assert!(outline.contains("Property Radius : double"));

    let bases = dotres(dir.path(), &["bases", &circle, "Circl"]);
    assert!(bases.contains("Class Shape"));
    assert!(bases.contains("(Shapes.cs)"));

    let offset = CIRCLE.find(": Shape").unwrap() + 2;
    let goto = dotres(dir.path(), &["goto", &circle, &offset.to_string()]);
    assert!(goto.trim_end().ends_with("Shapes.cs:3:18"), "{}", goto);

    let json = dotres(dir.path(), &["--format", "json", "projects", "App"]);
    let nodes: Vec<RelationshipNode> = serde_json::from_str(&json).unwrap();
    assert_eq!(names(&nodes), ["App", "Core"]);
}
