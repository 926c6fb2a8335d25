//! Visual Basic language extractor over the statement/block parser

use std::path::Path;

use dotres_core::{
    DefinitionKind, DefinitionNode, DefinitionTreeBuilder, ExtractError, FileOutline,
    ImportDirective, MemberDecl, NamespaceDecl, SourceLanguage, SyntaxHandle, TypeDecl,
};

use super::{
    ExtractionResult, LanguageExtractor, Parameter, format_arguments, generic_display,
    method_kind,
};
use crate::comments::{DeclSpan, Neighbors, comment_for};
use crate::parser_pool::SyntaxTree;
use crate::vb_syntax::{VbNode, VbNodeKind, VbParam, VbSyntaxTree};

const LANGUAGE: SourceLanguage = SourceLanguage::VisualBasic;

pub struct VisualBasicExtractor;

impl LanguageExtractor for VisualBasicExtractor {
    fn language(&self) -> SourceLanguage {
        LANGUAGE
    }

    fn extract(
        &self,
        path: &Path,
        _text: &str,
        syntax: &SyntaxTree,
    ) -> Result<ExtractionResult, ExtractError> {
        let SyntaxTree::VisualBasic(tree) = syntax else {
            return Err(ExtractError::Parse {
                path: path.to_path_buf(),
                reason: "expected a Visual Basic syntax tree".to_string(),
            });
        };

        let mut walker = Walker {
            path,
            tree,
            builder: DefinitionTreeBuilder::new(path, LANGUAGE),
            outline: FileOutline::new(path.to_path_buf(), LANGUAGE),
            namespace_paths: vec![None; tree.nodes.len()],
            type_handles: vec![None; tree.nodes.len()],
        };
        for idx in 0..tree.nodes.len() {
            walker.visit(idx);
        }
        tracing::trace!(
            "Extracted {} definitions from {}",
            walker.builder.len(),
            path.display()
        );

        Ok(ExtractionResult {
            tree: walker.builder.finish(),
            outline: walker.outline,
        })
    }
}

fn to_parameters(params: &[VbParam]) -> Vec<Parameter> {
    params
        .iter()
        .map(|p| Parameter {
            type_text: p.type_text.clone().unwrap_or_else(|| "Object".to_string()),
            is_ref: p.by_ref,
            is_params: p.param_array,
            is_optional: p.optional,
            ..Default::default()
        })
        .collect()
}

/// `Name(args)` followed by ` As Type` when the declaration returns something.
fn signature(name: &str, node: &VbNode, returns: bool) -> String {
    let params = to_parameters(node.params.as_deref().unwrap_or_default());
    let mut text = format!("{}({})", name, format_arguments(&params, LANGUAGE, false));
    if returns {
        if let Some(ret) = node.as_type.as_deref().filter(|t| !t.eq_ignore_ascii_case("void")) {
            text.push_str(" As ");
            text.push_str(ret);
        }
    }
    text
}

struct Walker<'a> {
    path: &'a Path,
    tree: &'a VbSyntaxTree,
    builder: DefinitionTreeBuilder,
    outline: FileOutline,
    /// Namespace path per namespace node.
    namespace_paths: Vec<Option<Vec<String>>>,
    /// Outline type index per type node.
    type_handles: Vec<Option<usize>>,
}

impl<'a> Walker<'a> {
    fn comment(&self, node: &VbNode) -> Option<String> {
        let statements = &self.tree.statements;
        let end_row = statements.get(node.end_stmt).map_or(0, |s| s.end_row);
        let prev = node
            .stmt
            .checked_sub(1)
            .and_then(|i| statements.get(i))
            .map(|s| (s.end, s.end_row));
        let next = statements.get(node.end_stmt + 1).map(|s| s.start);
        let decl = DeclSpan {
            start: node.start,
            end: node.end,
            end_row,
        };
        comment_for(
            &self.tree.comments,
            LANGUAGE,
            decl,
            Neighbors {
                prev_end: prev,
                next_start: next,
            },
        )
    }

    /// Namespace path for declarations directly inside `parent`.
    fn namespace_of(&self, parent: Option<usize>) -> Vec<String> {
        let mut current = parent;
        while let Some(idx) = current {
            if let Some(path) = &self.namespace_paths[idx] {
                return path.clone();
            }
            current = self.tree.nodes[idx].parent;
        }
        Vec::new()
    }

    fn owner_type(&self, parent: Option<usize>) -> Option<usize> {
        parent.and_then(|p| self.type_handles[p])
    }

    fn add_member(&mut self, node: &VbNode, name: &str, kind: DefinitionKind, identifier_offset: usize) {
        if let Some(owner) = self.owner_type(node.parent) {
            self.outline.types[owner].members.push(MemberDecl {
                name: name.to_string(),
                kind,
                identifier_offset,
            });
        }
    }

    fn insert(&mut self, node: &VbNode, kind: DefinitionKind, text: String, identifier_offset: usize) {
        let comment = self.comment(node);
        let definition = DefinitionNode::new(
            kind,
            text,
            self.path,
            LANGUAGE,
            (node.start, node.end),
            identifier_offset,
        )
        .with_comment(comment);
        self.builder.insert(definition);
    }

    fn visit(&mut self, idx: usize) {
        let tree = self.tree;
        let node = &tree.nodes[idx];
        match node.kind {
            VbNodeKind::Imports => self.visit_imports(node),
            VbNodeKind::Namespace => self.visit_namespace(idx, node),
            VbNodeKind::Class
            | VbNodeKind::Structure
            | VbNodeKind::Interface
            | VbNodeKind::Module
            | VbNodeKind::Enum => self.visit_type(idx, node),
            VbNodeKind::Delegate => self.visit_delegate(idx, node),
            VbNodeKind::EnumMember => {
                let Some(name) = &node.name else { return };
                self.add_member(node, &name.text, DefinitionKind::EnumMember, name.offset);
                self.insert(node, DefinitionKind::EnumMember, name.text.clone(), name.offset);
            }
            VbNodeKind::Method => {
                let Some(name) = &node.name else { return };
                let display = generic_display(&name.text, &node.type_params, LANGUAGE);
                let params = to_parameters(node.params.as_deref().unwrap_or_default());
                let returns_void = node.is_sub
                    || node.as_type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("void"));
                let kind = method_kind(&params, returns_void, node.has_attribute("DllImport"));
                let text = signature(&display, node, !node.is_sub);
                self.add_member(node, &name.text, kind, name.offset);
                self.insert(node, kind, text, name.offset);
            }
            VbNodeKind::Constructor => {
                let Some(name) = &node.name else { return };
                let text = signature("New", node, false);
                self.add_member(node, "New", DefinitionKind::Constructor, name.offset);
                self.insert(node, DefinitionKind::Constructor, text, name.offset);
            }
            VbNodeKind::Operator => {
                let Some(name) = &node.name else { return };
                let text = signature(&name.text, node, true);
                self.insert(node, DefinitionKind::Operator, text, name.offset);
            }
            VbNodeKind::Declare => {
                let Some(name) = &node.name else { return };
                let text = signature(&name.text, node, !node.is_sub);
                self.add_member(node, &name.text, DefinitionKind::PlatformImport, name.offset);
                self.insert(node, DefinitionKind::PlatformImport, text, name.offset);
            }
            VbNodeKind::Property => self.visit_property(node),
            VbNodeKind::Event => {
                let Some(name) = &node.name else { return };
                let mut text = name.text.clone();
                if let Some(params) = &node.params {
                    text = format!("{}({})", text, format_arguments(&to_parameters(params), LANGUAGE, false));
                }
                if let Some(event_type) = node.as_type.as_deref().filter(|t| !t.eq_ignore_ascii_case("void")) {
                    text = format!("{} As {}", text, event_type);
                }
                self.add_member(node, &name.text, DefinitionKind::Event, name.offset);
                self.insert(node, DefinitionKind::Event, text, name.offset);
            }
            VbNodeKind::Field => self.visit_field(node),
            VbNodeKind::Inherits | VbNodeKind::Implements => {}
        }
    }

    fn visit_imports(&mut self, node: &VbNode) {
        let len = self.tree.len;
        for clause in &node.imports {
            self.outline.imports.push(ImportDirective {
                alias: clause.alias.clone(),
                target: clause.target.clone(),
                is_static: false,
                scope: Vec::new(),
                scope_start: 0,
                scope_end: len,
                start: node.start,
                end: node.end,
            });
        }
    }

    fn visit_namespace(&mut self, idx: usize, node: &VbNode) {
        let Some(name) = node.names.first() else { return };
        let mut path = if name.global {
            Vec::new()
        } else {
            self.namespace_of(node.parent)
        };
        path.extend(name.segments.iter().map(|s| s.name.clone()));
        self.namespace_paths[idx] = Some(path.clone());
        self.outline.namespaces.push(NamespaceDecl {
            segments: name.segments.clone(),
            path,
            start: node.start,
            end: node.end,
        });

        let offset = name.segments.first().map_or(name.start, |s| s.offset);
        self.insert(node, DefinitionKind::Namespace, name.text.clone(), offset);
    }

    fn record_type(&mut self, idx: usize, node: &VbNode, kind: DefinitionKind, name: &str, offset: usize) -> SyntaxHandle {
        let bases = if matches!(kind, DefinitionKind::Enum | DefinitionKind::Module | DefinitionKind::Delegate) {
            Vec::new()
        } else {
            node.children
                .iter()
                .map(|&c| &self.tree.nodes[c])
                .filter(|c| matches!(c.kind, VbNodeKind::Inherits | VbNodeKind::Implements))
                .flat_map(|c| c.names.iter().cloned())
                .collect()
        };
        let handle = self.outline.types.len();
        let decl = TypeDecl {
            name: name.to_string(),
            arity: node.type_params.len(),
            kind,
            namespace: self.namespace_of(node.parent),
            parent: self.owner_type(node.parent),
            identifier_offset: offset,
            start: node.start,
            end: node.end,
            bases,
            members: Vec::new(),
        };
        self.outline.types.push(decl);
        self.type_handles[idx] = Some(handle);
        SyntaxHandle(handle as u32)
    }

    fn visit_type(&mut self, idx: usize, node: &VbNode) {
        let Some(name) = &node.name else { return };
        let kind = match node.kind {
            VbNodeKind::Structure => DefinitionKind::Struct,
            VbNodeKind::Interface => DefinitionKind::Interface,
            VbNodeKind::Module => DefinitionKind::Module,
            VbNodeKind::Enum => DefinitionKind::Enum,
            _ => DefinitionKind::Class,
        };
        let handle = self.record_type(idx, node, kind, &name.text, name.offset);
        let comment = self.comment(node);
        let definition = DefinitionNode::new(
            kind,
            generic_display(&name.text, &node.type_params, LANGUAGE),
            self.path,
            LANGUAGE,
            (node.start, node.end),
            name.offset,
        )
        .with_comment(comment)
        .with_handle(handle);
        self.builder.insert(definition);
    }

    fn visit_delegate(&mut self, idx: usize, node: &VbNode) {
        let Some(name) = &node.name else { return };
        let handle = self.record_type(idx, node, DefinitionKind::Delegate, &name.text, name.offset);
        let display = generic_display(&name.text, &node.type_params, LANGUAGE);
        let text = signature(&display, node, !node.is_sub);
        let comment = self.comment(node);
        let definition = DefinitionNode::new(
            DefinitionKind::Delegate,
            text,
            self.path,
            LANGUAGE,
            (node.start, node.end),
            name.offset,
        )
        .with_comment(comment)
        .with_handle(handle);
        self.builder.insert(definition);
    }

    /// Properties with parameters are indexers.
    fn visit_property(&mut self, node: &VbNode) {
        let Some(name) = &node.name else { return };
        let type_text = node.as_type.clone().unwrap_or_else(|| "Object".to_string());
        let params = node.params.as_deref().unwrap_or_default();
        let (kind, text) = if params.is_empty() {
            (DefinitionKind::Property, format!("{} As {}", name.text, type_text))
        } else {
            let prefix = if node.has_modifier("default") { "Default " } else { "" };
            (
                DefinitionKind::Indexer,
                format!(
                    "{}{}({}) As {}",
                    prefix,
                    name.text,
                    format_arguments(&to_parameters(params), LANGUAGE, false),
                    type_text
                ),
            )
        };
        self.add_member(node, &name.text, kind, name.offset);
        self.insert(node, kind, text, name.offset);
    }

    /// One node per declarator, spanning the declarator, sharing the statement's comment.
    fn visit_field(&mut self, node: &VbNode) {
        let comment = self.comment(node);
        let kind = DefinitionKind::Field;
        for declarator in &node.declarators {
            let text = match &declarator.type_text {
                Some(type_text) => format!("{} As {}", declarator.name.text, type_text),
                None => declarator.name.text.clone(),
            };
            self.add_member(node, &declarator.name.text, kind, declarator.name.offset);
            let definition = DefinitionNode::new(
                kind,
                text,
                self.path,
                LANGUAGE,
                (declarator.name.offset, declarator.end),
                declarator.name.offset,
            )
            .with_comment(comment.clone());
            self.builder.insert(definition);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::languages::extract;

    fn run(source: &str) -> ExtractionResult {
        extract(&PathBuf::from("Sample.vb"), source, SourceLanguage::VisualBasic).unwrap()
    }

    fn texts(result: &ExtractionResult) -> Vec<(DefinitionKind, String)> {
        result
            .tree
            .iter()
            .map(|n| (n.kind, n.text.clone()))
            .collect()
    }

    #[test]
    fn test_members_render() {
        let result = run(r#"Imports System
Namespace Lib
    Public Class Repository(Of T)
        Inherits BaseRepository
        Implements IDisposable

        Private items() As String, count As Integer
        Public Property Name As String
        Default Public ReadOnly Property Item(ByVal index As Integer) As T
            Get
                Return Nothing
            End Get
        End Property
        Public Event Changed(ByVal sender As Object)
        Public Sub New(ByRef seed As Integer, Optional ByVal label As System.String = "")
        End Sub
        Public Function Find(ParamArray keys() As String) As T
            Return Nothing
        End Function
        Public Shared Operator +(a As Repository(Of T), b As Repository(Of T)) As Repository(Of T)
            Return a
        End Operator
        Declare Function GetTickCount Lib "kernel32" () As Integer
        Private Sub Button1_Click(sender As Object, e As EventArgs)
        End Sub
        Public Sub Dispose() Implements IDisposable.Dispose
        End Sub
    End Class
End Namespace
"#);
        assert_eq!(
            texts(&result),
            vec![
                (DefinitionKind::Namespace, "Lib".to_string()),
                (DefinitionKind::Class, "Repository(Of T)".to_string()),
                (DefinitionKind::Field, "items As String()".to_string()),
                (DefinitionKind::Field, "count As Integer".to_string()),
                (DefinitionKind::Property, "Name As String".to_string()),
                (DefinitionKind::Indexer, "Default Item(Integer) As T".to_string()),
                (DefinitionKind::Event, "Changed(Object)".to_string()),
                (DefinitionKind::Constructor, "New(ByRef Integer, [String])".to_string()),
                (DefinitionKind::Method, "Find(ParamArray String()) As T".to_string()),
                (DefinitionKind::Operator, "+(Repository(Of T), Repository(Of T)) As Repository(Of T)".to_string()),
                (DefinitionKind::PlatformImport, "GetTickCount() As Integer".to_string()),
                (DefinitionKind::EventHandler, "Button1_Click(Object, EventArgs)".to_string()),
                (DefinitionKind::Method, "Dispose()".to_string()),
            ]
        );

        let repository = &result.outline.types[0];
        assert_eq!(repository.arity, 1);
        assert_eq!(repository.namespace, vec!["Lib".to_string()]);
        let bases: Vec<_> = repository.bases.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(bases, vec!["BaseRepository", "IDisposable"]);
        assert_eq!(result.outline.imports.len(), 1);
    }

    #[test]
    fn test_enum_members_nest() {
        let result = run("Public Enum Color As Byte\n    Red\n    Green = 2\nEnd Enum\n");
        let root = &result.tree.roots[0];
        assert_eq!(root.kind, DefinitionKind::Enum);
        let members: Vec<_> = root.children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(members, vec!["Red", "Green"]);
    }

    #[test]
    fn test_dll_import_sub_is_platform_import() {
        let result = run(r#"Module NativeMethods
    <DllImport("user32.dll")>
    Public Sub Handler(sender As Object, e As EventArgs)
    End Sub
End Module
"#);
        let kinds: Vec<_> = result.tree.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![DefinitionKind::Module, DefinitionKind::PlatformImport]);
    }

    #[test]
    fn test_doc_comment_summary() {
        let result = run("''' <summary>\n''' Holds state.\n''' </summary>\nPublic Class State\nEnd Class\n");
        assert_eq!(result.tree.roots[0].comment.as_deref(), Some("Holds state."));
    }
}
