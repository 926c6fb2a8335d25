//! Unit tests for dotres-resolver

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dotres_core::{
    DefinitionKind, DefinitionNode, ProjectSpec, RelationshipNode, ResolutionResult, SourceLanguage,
};
use dotres_indexer::{AnalysisOptions, MemorySourceReader, WorkspaceConfig};

use crate::relations::build_header_model;
use crate::session::AnalysisSession;

fn project(name: &str, language: SourceLanguage, files: &[&str]) -> ProjectSpec {
    let mut spec = ProjectSpec::new(name, language, "/ws");
    spec.files = files.iter().map(PathBuf::from).collect();
    spec
}

async fn session_with(
    projects: Vec<ProjectSpec>,
    files: &[(&str, &str)],
    options: AnalysisOptions,
) -> AnalysisSession {
    let reader = files
        .iter()
        .fold(MemorySourceReader::new(), |reader, (path, text)| {
            reader.with_file(*path, *text)
        });
    let config = WorkspaceConfig {
        root: PathBuf::from("/ws"),
        projects,
        options,
    };
    AnalysisSession::load_with_reader(&config, Arc::new(reader))
        .await
        .unwrap()
}

async fn csharp_session(files: &[(&str, &str)]) -> AnalysisSession {
    let paths: Vec<&str> = files.iter().map(|(path, _)| *path).collect();
    session_with(
        vec![project("App", SourceLanguage::CSharp, &paths)],
        files,
        AnalysisOptions::default(),
    )
    .await
}

fn type_named(session: &AnalysisSession, file: &str, name: &str) -> DefinitionNode {
    session
        .build_definition_tree(Path::new(file))
        .unwrap()
        .find_type_by_name(name)
        .cloned()
        .unwrap_or_else(|| panic!("{} not declared in {}", name, file))
}

fn render(nodes: &[RelationshipNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        out.push_str(&format!("{:?} {}", node.kind, node.name));
        if let Some(parent) = node
            .relation_id
            .and_then(|id| nodes.iter().find(|n| n.id == id))
        {
            out.push_str(&format!(" -> {}", parent.name));
        }
        if node.is_target {
            out.push_str(" [target]");
        }
        if node.not_found {
            out.push_str(" [missing]");
        }
        if node.cycle {
            out.push_str(" [cycle]");
        }
        if let Some(name) = &node.difference_name {
            out.push_str(&format!(" ({})", name));
        }
        out.push('\n');
    }
    out
}

const BASE_FILE: (&str, &str) = ("/ws/A.cs", "namespace Shapes { public class Base { } }");
const DERIVED_FILE: (&str, &str) = (
    "/ws/B.cs",
    "using Shapes;\nnamespace App { class Derived : Base { } }",
);

#[tokio::test]
async fn test_base_types_cross_file() {
    let session = session_with(
        vec![
            project("Shapes", SourceLanguage::CSharp, &[BASE_FILE.0]),
            project("App", SourceLanguage::CSharp, &[DERIVED_FILE.0]),
        ],
        &[BASE_FILE, DERIVED_FILE],
        AnalysisOptions::default(),
    )
    .await;

    let derived = type_named(&session, DERIVED_FILE.0, "Derived");
    let nodes = session.build_base_type_relationships(&derived).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class Derived [target]
    Class Base -> Derived (A.cs)
    ");

    assert!(nodes.iter().all(|n| n.arrow_end));
    assert_eq!(nodes[0].base_types, vec!["Base".to_string()]);
    assert!(!nodes[1].has_base_type());
    assert_eq!(nodes[1].difference_file, Some(PathBuf::from(BASE_FILE.0)));
}

#[tokio::test]
async fn test_derived_types_invert_base_types() {
    let session = csharp_session(&[BASE_FILE, DERIVED_FILE]).await;

    let base = type_named(&session, BASE_FILE.0, "Base");
    let nodes = session.build_derived_type_relationships(&base).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class Base [target]
    Class Derived -> Base (B.cs)
    ");
    assert!(!nodes[1].arrow_end);
    assert_eq!(nodes[1].base_types, vec!["Base".to_string()]);

    let derived = type_named(&session, DERIVED_FILE.0, "Derived");
    let bases = session.build_base_type_relationships(&derived).unwrap();
    assert_eq!(bases[1].definition.as_ref(), Some(&base));
}

#[tokio::test]
async fn test_alias_base_resolves_to_target() {
    let files = [
        ("/ws/Foo.cs", "namespace Foo { public class BaseClass { } }"),
        ("/ws/C.cs", "using Xxx = Foo.BaseClass;\nclass C : Xxx { }"),
    ];
    let session = csharp_session(&files).await;

    let c = type_named(&session, files[1].0, "C");
    let nodes = session.build_base_type_relationships(&c).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class C [target]
    Class BaseClass -> C (Foo.cs)
    ");

    let base = type_named(&session, files[0].0, "BaseClass");
    let derived = session.build_derived_type_relationships(&base).unwrap();
    assert_eq!(derived.len(), 2);
    assert_eq!(derived[1].name, "C");
}

#[tokio::test]
async fn test_resolve_if_alias() {
    let text = "using Xxx = Foo.BaseClass;\nnamespace Foo { class BaseClass { } }";
    let session = csharp_session(&[("/ws/A.cs", text)]).await;

    let alias = ResolutionResult::found("/ws/A.cs", text.find("Xxx").unwrap());
    let target = session.resolve_if_alias(&alias);
    assert_eq!(
        target,
        ResolutionResult::found("/ws/A.cs", text.rfind("BaseClass").unwrap())
    );

    let not_alias = ResolutionResult::found("/ws/A.cs", text.rfind("BaseClass").unwrap());
    assert_eq!(session.resolve_if_alias(&not_alias), ResolutionResult::NotFound);
    assert_eq!(
        session.resolve_if_alias(&ResolutionResult::NotFound),
        ResolutionResult::NotFound
    );
}

#[tokio::test]
async fn test_unresolved_bases_become_placeholders() {
    let session = csharp_session(&[("/ws/W.cs", "class Widget : Bar, IFoo { }")]).await;

    let widget = type_named(&session, "/ws/W.cs", "Widget");
    let nodes = session.build_base_type_relationships(&widget).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class Widget [target]
    Class Bar -> Widget [missing]
    Interface IFoo -> Widget [missing]
    ");
    assert_eq!(nodes[0].base_types_text(), "Bar, IFoo");
}

#[tokio::test]
async fn test_cycle_guard() {
    let files = [("/ws/Cycle.cs", "class A : B { }\nclass B : A { }")];

    let session = csharp_session(&files).await;
    let a = type_named(&session, files[0].0, "A");
    let nodes = session.build_base_type_relationships(&a).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class A [target]
    Class B -> A
    Class A -> B [cycle]
    ");

    let options = AnalysisOptions {
        cycle_guard: false,
        ..AnalysisOptions::default()
    };
    let session = session_with(
        vec![project("App", SourceLanguage::CSharp, &[files[0].0])],
        &files,
        options,
    )
    .await;
    let a = type_named(&session, files[0].0, "A");
    let nodes = session.build_base_type_relationships(&a).unwrap();
    assert_eq!(nodes.len(), 2);
    assert!(nodes.iter().all(|n| !n.cycle));
}

#[tokio::test]
async fn test_diamond_appears_twice() {
    let text = "interface IRoot { }\ninterface ILeft : IRoot { }\ninterface IRight : IRoot { }\nclass Both : ILeft, IRight { }";
    let session = csharp_session(&[("/ws/D.cs", text)]).await;

    let both = type_named(&session, "/ws/D.cs", "Both");
    let nodes = session.build_base_type_relationships(&both).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class Both [target]
    Interface ILeft -> Both
    Interface IRoot -> ILeft
    Interface IRight -> Both
    Interface IRoot -> IRight
    ");
}

#[test]
fn test_header_model_groups() {
    let file = Path::new("/ws/H.cs");
    let member = |kind, text: &str, at| {
        DefinitionNode::new(kind, text, file, SourceLanguage::CSharp, (at, at + 1), at)
    };
    let mut class = DefinitionNode::new(
        DefinitionKind::Class,
        "Holder",
        file,
        SourceLanguage::CSharp,
        (0, 100),
        6,
    );
    class.children = vec![
        member(DefinitionKind::Method, "Zed() : void", 10),
        member(DefinitionKind::Field, "count : int", 20),
        member(DefinitionKind::Method, "Alpha() : void", 30),
        member(DefinitionKind::Property, "Name : string", 40),
        member(DefinitionKind::Constructor, "Holder()", 50),
    ];

    let header = build_header_model(&class, true);
    let labels: Vec<&str> = header.member_groups.iter().map(|g| g.label.as_str()).collect();
    assert_eq!(labels, ["Fields", "Properties", "Constructors", "Methods"]);
    let methods: Vec<&str> = header.member_groups[3]
        .members
        .iter()
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(methods, ["Alpha() : void", "Zed() : void"]);
    assert!(header.is_expanded);
    assert!(header.arrow_end);
    assert_eq!(header.language, Some(SourceLanguage::CSharp));

    class.children.clear();
    let empty = build_header_model(&class, false);
    assert!(empty.member_groups.is_empty());
    assert!(!empty.is_expanded);
}

#[tokio::test]
async fn test_visual_basic_root_namespace() {
    let files = [
        ("/ws/Base.vb", "Public Class Base\nEnd Class\n"),
        (
            "/ws/Derived.vb",
            "Public Class Derived\n    Inherits Company.Product.Base\nEnd Class\n",
        ),
    ];
    let mut spec = project(
        "Product",
        SourceLanguage::VisualBasic,
        &[files[0].0, files[1].0],
    );
    spec.root_namespace = Some("Company.Product".to_string());
    let session = session_with(vec![spec], &files, AnalysisOptions::default()).await;

    let derived = type_named(&session, files[1].0, "Derived");
    let nodes = session.build_base_type_relationships(&derived).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class Derived [target]
    Class Base -> Derived (Base.vb)
    ");
    assert_eq!(nodes[1].language, Some(SourceLanguage::VisualBasic));
}

#[tokio::test]
async fn test_base_named_like_member_or_nested_type() {
    let files = [
        BASE_FILE,
        (
            "/ws/B.cs",
            "using Shapes;\nnamespace App\n{\n    class Derived : Base\n    {\n        public Base Base { get; set; }\n        public Derived Clone(Base other) => this;\n    }\n    class Other : Base { class Base { } }\n}\n",
        ),
    ];
    let session = csharp_session(&files).await;

    let derived = type_named(&session, files[1].0, "Derived");
    let nodes = session.build_base_type_relationships(&derived).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class Derived [target]
    Class Base -> Derived (A.cs)
    ");

    let other = type_named(&session, files[1].0, "Other");
    let nodes = session.build_base_type_relationships(&other).unwrap();
    assert_eq!(nodes[1].definition.as_ref(), Some(&type_named(&session, BASE_FILE.0, "Base")));

    let base = type_named(&session, BASE_FILE.0, "Base");
    let nodes = session.build_derived_type_relationships(&base).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class Base [target]
    Class Derived -> Base (B.cs)
    Class Other -> Base (B.cs)
    ");

    let offset = files[1].1.find("Base other").unwrap();
    let expected = ResolutionResult::found(
        session.normalize(Path::new(BASE_FILE.0)),
        BASE_FILE.1.find("Base").unwrap(),
    );
    assert_eq!(session.find_definition_at(Path::new(files[1].0), offset), expected);
}

#[tokio::test]
async fn test_visual_basic_base_named_like_member() {
    let files = [
        ("/ws/Shape.vb", "Public Class Shape\nEnd Class\n"),
        (
            "/ws/Circle.vb",
            "Public Class Circle\n    Inherits Shape\n    Public Property shape As Shape\nEnd Class\n",
        ),
    ];
    let spec = project("Drawing", SourceLanguage::VisualBasic, &[files[0].0, files[1].0]);
    let session = session_with(vec![spec], &files, AnalysisOptions::default()).await;

    let circle = type_named(&session, files[1].0, "Circle");
    let nodes = session.build_base_type_relationships(&circle).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class Circle [target]
    Class Shape -> Circle (Shape.vb)
    ");

    let shape = type_named(&session, files[0].0, "Shape");
    let nodes = session.build_derived_type_relationships(&shape).unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Class Shape [target]
    Class Circle -> Shape (Circle.vb)
    ");
}

#[tokio::test]
async fn test_project_relationships() {
    let mut app = project("App", SourceLanguage::CSharp, &[]);
    app.output_type = Some("Exe".to_string());
    app.references = vec!["System.Xml".to_string(), "System.Data".to_string()];
    app.packages = vec!["Newtonsoft.Json".to_string()];
    app.project_references = vec!["core".to_string(), "Missing".to_string()];
    let core = project("Core", SourceLanguage::CSharp, &[]);
    let session = session_with(vec![app, core], &[], AnalysisOptions::default()).await;

    let nodes = session.build_solution_relationships().unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Project App
    Project Core -> App
    Dependency Missing -> App [missing]
    ");

    let labels: Vec<&str> = nodes[0].member_groups.iter().map(|g| g.label.as_str()).collect();
    assert_eq!(labels, ["Assembly file name", "References", "Package references"]);
    assert_eq!(nodes[0].member_groups[0].members[0].text, "App.exe");
    let references: Vec<&str> = nodes[0].member_groups[1]
        .members
        .iter()
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(references, ["System.Data", "System.Xml"]);

    let core_only = session.build_project_relationships("CORE").unwrap();
    assert_eq!(core_only.len(), 1);
    assert!(core_only[0].is_target);
    assert_eq!(core_only[0].member_groups.len(), 1);
    assert!(session.build_project_relationships("Nope").unwrap().is_empty());
}

#[tokio::test]
async fn test_project_reference_cycle() {
    let mut a = project("A", SourceLanguage::CSharp, &[]);
    a.project_references = vec!["B".to_string()];
    let mut b = project("B", SourceLanguage::CSharp, &[]);
    b.project_references = vec!["A".to_string()];
    let session = session_with(vec![a, b], &[], AnalysisOptions::default()).await;

    let nodes = session.build_solution_relationships().unwrap();
    insta::assert_snapshot!(render(&nodes), @r"
    Project A
    Project B -> A
    Project A -> B [cycle]
    Project B
    Project A -> B
    Project B -> A [cycle]
    ");
}

#[tokio::test]
async fn test_memoized_trees_match_rederived() {
    let memoized = csharp_session(&[BASE_FILE, DERIVED_FILE]).await;
    let first = memoized.build_definition_tree(Path::new(BASE_FILE.0)).unwrap();
    let second = memoized.build_definition_tree(Path::new(BASE_FILE.0)).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let options = AnalysisOptions {
        memoize_trees: false,
        ..AnalysisOptions::default()
    };
    let fresh = session_with(
        vec![project("App", SourceLanguage::CSharp, &[BASE_FILE.0, DERIVED_FILE.0])],
        &[BASE_FILE, DERIVED_FILE],
        options,
    )
    .await;
    let rederived = fresh.build_definition_tree(Path::new(BASE_FILE.0)).unwrap();
    assert!(!Arc::ptr_eq(&first, &rederived));
    assert_eq!(*first, *rederived);
}

#[tokio::test]
async fn test_unreadable_file_is_skipped() {
    let session = session_with(
        vec![project("App", SourceLanguage::CSharp, &[BASE_FILE.0, "/ws/Gone.cs"])],
        &[BASE_FILE],
        AnalysisOptions::default(),
    )
    .await;
    assert_eq!(session.projects()[0].files, vec![PathBuf::from(BASE_FILE.0)]);
    assert!(session.build_definition_tree(Path::new("/ws/Gone.cs")).is_err());
}

#[tokio::test]
async fn test_deleted_definition_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("A.cs");
    let derived = dir.path().join("B.cs");
    std::fs::write(&base, BASE_FILE.1).unwrap();
    std::fs::write(&derived, DERIVED_FILE.1).unwrap();

    let mut spec = ProjectSpec::new("App", SourceLanguage::CSharp, dir.path());
    spec.files = vec![base.clone(), derived.clone()];
    let config = WorkspaceConfig {
        root: dir.path().to_path_buf(),
        projects: vec![spec],
        options: AnalysisOptions::default(),
    };
    let session = AnalysisSession::load(&config).await.unwrap();

    let offset = DERIVED_FILE.1.rfind("Base").unwrap();
    assert!(session.find_definition_at(&derived, offset).is_found());

    std::fs::remove_file(&base).unwrap();
    assert_eq!(session.find_definition_at(&derived, offset), ResolutionResult::NotFound);

    let node = type_named(&session, derived.to_str().unwrap(), "Derived");
    let nodes = session.build_base_type_relationships(&node).unwrap();
    assert_eq!(nodes.len(), 2);
    assert!(nodes[1].not_found);
}
