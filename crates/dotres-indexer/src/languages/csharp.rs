//! C# language extractor using tree-sitter

use std::path::Path;

use dotres_core::{
    DefinitionKind, DefinitionNode, DefinitionTreeBuilder, ExtractError, FileOutline,
    ImportDirective, MemberDecl, NameSegment, NamespaceDecl, SourceLanguage, SyntaxHandle,
    TypeDecl,
};
use tree_sitter::Node;

use super::{
    ExtractionResult, LanguageExtractor, Parameter, format_arguments, generic_display,
    method_kind,
};
use crate::comments::{CommentSpan, DeclSpan, Neighbors, comment_for};
use crate::parser_pool::SyntaxTree;
use crate::reference::parse_reference;

const LANGUAGE: SourceLanguage = SourceLanguage::CSharp;

/// Node kinds that hold code rather than declarations.
const SKIPPED: &[&str] = &[
    "block",
    "arrow_expression_clause",
    "accessor_list",
    "parameter_list",
    "bracketed_parameter_list",
    "attribute_list",
    "base_list",
    "equals_value_clause",
    "variable_declaration",
    "type_parameter_constraints_clause",
    "argument_list",
];

const TYPE_KINDS: &[&str] = &[
    "predefined_type",
    "identifier",
    "qualified_name",
    "generic_name",
    "alias_qualified_name",
    "array_type",
    "nullable_type",
    "pointer_type",
    "tuple_type",
    "ref_type",
    "function_pointer_type",
    "scoped_type",
    "implicit_type",
];

pub struct CSharpExtractor;

impl LanguageExtractor for CSharpExtractor {
    fn language(&self) -> SourceLanguage {
        LANGUAGE
    }

    fn extract(
        &self,
        path: &Path,
        text: &str,
        syntax: &SyntaxTree,
    ) -> Result<ExtractionResult, ExtractError> {
        let SyntaxTree::CSharp(tree) = syntax else {
            return Err(ExtractError::Parse {
                path: path.to_path_buf(),
                reason: "expected a C# syntax tree".to_string(),
            });
        };

        let root = tree.root_node();
        let mut walker = Walker {
            path,
            text,
            comments: collect_comments(root, text),
            builder: DefinitionTreeBuilder::new(path, LANGUAGE),
            outline: FileOutline::new(path.to_path_buf(), LANGUAGE),
        };
        walker.visit(root);
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

fn collect_comments(root: Node, text: &str) -> Vec<CommentSpan> {
    let mut comments = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "comment" {
            comments.push(CommentSpan {
                start: node.start_byte(),
                end: node.end_byte(),
                start_row: node.start_position().row,
                end_row: node.end_position().row,
                text: text[node.start_byte()..node.end_byte()].to_string(),
            });
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }
    comments.sort_by_key(|c| c.start);
    comments
}

fn children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    children(node).into_iter().find(|c| c.kind() == kind)
}

fn is_type_node(node: &Node) -> bool {
    TYPE_KINDS.contains(&node.kind())
}

fn neighbors(node: Node) -> Neighbors {
    let mut prev = node.prev_sibling();
    while let Some(p) = prev.filter(|p| p.kind() == "comment") {
        prev = p.prev_sibling();
    }
    let mut next = node.next_sibling();
    while let Some(n) = next.filter(|n| n.kind() == "comment") {
        next = n.next_sibling();
    }
    Neighbors {
        prev_end: prev.map(|p| (p.end_byte(), p.end_position().row)),
        next_start: next.map(|n| n.start_byte()),
    }
}

struct Walker<'a> {
    path: &'a Path,
    text: &'a str,
    comments: Vec<CommentSpan>,
    builder: DefinitionTreeBuilder,
    outline: FileOutline,
}

impl<'a> Walker<'a> {
    fn text_of(&self, node: Node) -> &'a str {
        &self.text[node.start_byte()..node.end_byte()]
    }

    /// Source text with runs of whitespace collapsed.
    fn compact(&self, node: Node) -> String {
        self.text_of(node).split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn identifier(&self, node: Node) -> String {
        self.text_of(node).trim_start_matches('@').to_string()
    }

    fn comment(&self, node: Node) -> Option<String> {
        let decl = DeclSpan {
            start: node.start_byte(),
            end: node.end_byte(),
            end_row: node.end_position().row,
        };
        comment_for(&self.comments, LANGUAGE, decl, neighbors(node))
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "namespace_declaration" => self.visit_namespace(node, false),
            "file_scoped_namespace_declaration" => self.visit_namespace(node, true),
            "using_directive" => self.visit_using(node),
            "class_declaration" => self.visit_type(node, DefinitionKind::Class),
            "struct_declaration" | "record_struct_declaration" => {
                self.visit_type(node, DefinitionKind::Struct)
            }
            "interface_declaration" => self.visit_type(node, DefinitionKind::Interface),
            "enum_declaration" => self.visit_type(node, DefinitionKind::Enum),
            "record_declaration" => {
                let kind = if child_of_kind(node, "struct").is_some() {
                    DefinitionKind::Struct
                } else {
                    DefinitionKind::Class
                };
                self.visit_type(node, kind)
            }
            "delegate_declaration" => self.visit_delegate(node),
            "enum_member_declaration" => self.visit_enum_member(node),
            "method_declaration" => self.visit_method(node),
            "constructor_declaration" => self.visit_constructor(node),
            "destructor_declaration" => self.visit_destructor(node),
            "operator_declaration" => self.visit_operator(node),
            "conversion_operator_declaration" => self.visit_conversion_operator(node),
            "indexer_declaration" => self.visit_indexer(node),
            "property_declaration" => self.visit_property(node),
            "field_declaration" => self.visit_field(node, DefinitionKind::Field),
            "event_field_declaration" => self.visit_field(node, DefinitionKind::Event),
            "event_declaration" => self.visit_event(node),
            _ => {}
        }

        for child in named_children(node) {
            if !SKIPPED.contains(&child.kind()) {
                self.visit(child);
            }
        }
    }

    /// Path of the innermost namespace declaration containing `offset`.
    fn namespace_at(&self, offset: usize) -> Option<&NamespaceDecl> {
        self.outline
            .namespaces
            .iter()
            .filter(|ns| ns.start <= offset && offset < ns.end)
            .max_by_key(|ns| ns.start)
    }

    /// Innermost type strictly containing `[start, end)`.
    fn enclosing_type(&self, start: usize, end: usize) -> Option<usize> {
        (0..self.outline.types.len())
            .filter(|&i| {
                let t = &self.outline.types[i];
                t.start < start && end <= t.end
            })
            .max_by_key(|&i| self.outline.types[i].start)
    }

    fn add_member(&mut self, name: &str, kind: DefinitionKind, identifier_offset: usize, span: (usize, usize)) {
        if let Some(owner) = self.enclosing_type(span.0, span.1) {
            self.outline.types[owner].members.push(MemberDecl {
                name: name.to_string(),
                kind,
                identifier_offset,
            });
        }
    }

    fn insert(
        &mut self,
        kind: DefinitionKind,
        text: String,
        span: (usize, usize),
        identifier_offset: usize,
        comment: Option<String>,
    ) {
        let node = DefinitionNode::new(kind, text, self.path, LANGUAGE, span, identifier_offset)
            .with_comment(comment);
        self.builder.insert(node);
    }

    fn visit_namespace(&mut self, node: Node, file_scoped: bool) {
        let Some(name_node) = node.child_by_field_name("name").or_else(|| {
            named_children(node)
                .into_iter()
                .find(|c| matches!(c.kind(), "qualified_name" | "identifier"))
        }) else {
            return;
        };
        let Some(reference) =
            parse_reference(self.text, name_node.start_byte(), name_node.end_byte(), LANGUAGE)
        else {
            return;
        };

        let start = node.start_byte();
        let end = if file_scoped { self.text.len() } else { node.end_byte() };
        let mut path = self
            .namespace_at(start)
            .map(|ns| ns.path.clone())
            .unwrap_or_default();
        path.extend(reference.segments.iter().map(|s| s.name.clone()));
        self.outline.namespaces.push(NamespaceDecl {
            segments: reference.segments,
            path,
            start,
            end,
        });

        let comment = self.comment(node);
        self.insert(
            DefinitionKind::Namespace,
            self.compact(name_node),
            (start, end),
            name_node.start_byte(),
            comment,
        );
    }

    fn visit_using(&mut self, node: Node) {
        let kids = children(node);
        let is_static = kids.iter().any(|c| c.kind() == "static");

        let alias_node = if let Some(name_equals) = kids.iter().find(|c| c.kind() == "name_equals") {
            named_children(*name_equals)
                .into_iter()
                .find(|c| c.kind() == "identifier")
        } else if let Some(eq) = kids.iter().position(|c| c.kind() == "=") {
            node.child_by_field_name("alias")
                .or_else(|| kids[..eq].iter().rev().find(|c| c.kind() == "identifier").copied())
        } else {
            None
        };

        let Some(target_node) = named_children(node).into_iter().rev().find(|c| {
            c.kind() != "name_equals"
                && c.kind() != "comment"
                && alias_node.is_none_or(|a| a.id() != c.id())
        }) else {
            return;
        };
        let Some(target) =
            parse_reference(self.text, target_node.start_byte(), target_node.end_byte(), LANGUAGE)
        else {
            return;
        };

        let (scope, scope_start, scope_end) = match self.namespace_at(node.start_byte()) {
            Some(ns) => (ns.path.clone(), ns.start, ns.end),
            None => (Vec::new(), 0, self.text.len()),
        };
        let alias = alias_node.map(|a| NameSegment::new(self.identifier(a), 0, a.start_byte()));
        self.outline.imports.push(ImportDirective {
            alias,
            target,
            is_static,
            scope,
            scope_start,
            scope_end,
            start: node.start_byte(),
            end: node.end_byte(),
        });
    }

    fn type_parameters(&self, node: Node) -> Vec<String> {
        let Some(list) = node
            .child_by_field_name("type_parameters")
            .or_else(|| child_of_kind(node, "type_parameter_list"))
        else {
            return Vec::new();
        };
        named_children(list)
            .into_iter()
            .filter(|c| c.kind() == "type_parameter")
            .filter_map(|p| {
                p.child_by_field_name("name")
                    .or_else(|| named_children(p).into_iter().find(|c| c.kind() == "identifier"))
            })
            .map(|n| self.identifier(n))
            .collect()
    }

    fn name_node<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        node.child_by_field_name("name")
            .or_else(|| named_children(node).into_iter().find(|c| c.kind() == "identifier"))
    }

    fn visit_type(&mut self, node: Node, kind: DefinitionKind) {
        let Some(name_node) = self.name_node(node) else { return };
        let name = self.identifier(name_node);
        let type_params = self.type_parameters(node);

        let mut bases = Vec::new();
        if kind != DefinitionKind::Enum {
            if let Some(base_list) = child_of_kind(node, "base_list") {
                for entry in named_children(base_list) {
                    let entry = match entry.kind() {
                        "primary_constructor_base_type" => entry
                            .child_by_field_name("type")
                            .or_else(|| named_children(entry).into_iter().next()),
                        "argument_list" | "comment" => None,
                        _ => Some(entry),
                    };
                    if let Some(reference) = entry.and_then(|e| {
                        parse_reference(self.text, e.start_byte(), e.end_byte(), LANGUAGE)
                    }) {
                        bases.push(reference);
                    }
                }
            }
        }

        let span = (node.start_byte(), node.end_byte());
        let handle = self.record_type(&name, type_params.len(), kind, name_node.start_byte(), span, bases);
        let comment = self.comment(node);
        let definition = DefinitionNode::new(
            kind,
            generic_display(&name, &type_params, LANGUAGE),
            self.path,
            LANGUAGE,
            span,
            name_node.start_byte(),
        )
        .with_comment(comment)
        .with_handle(handle);
        self.builder.insert(definition);
    }

    fn record_type(
        &mut self,
        name: &str,
        arity: usize,
        kind: DefinitionKind,
        identifier_offset: usize,
        span: (usize, usize),
        bases: Vec<dotres_core::NameReference>,
    ) -> SyntaxHandle {
        let namespace = self
            .namespace_at(span.0)
            .map(|ns| ns.path.clone())
            .unwrap_or_default();
        let parent = self.enclosing_type(span.0, span.1);
        let handle = SyntaxHandle(self.outline.types.len() as u32);
        self.outline.types.push(TypeDecl {
            name: name.to_string(),
            arity,
            kind,
            namespace,
            parent,
            identifier_offset,
            start: span.0,
            end: span.1,
            bases,
            members: Vec::new(),
        });
        handle
    }

    fn visit_enum_member(&mut self, node: Node) {
        let Some(name_node) = self.name_node(node) else { return };
        let name = self.identifier(name_node);
        let span = (node.start_byte(), node.end_byte());
        self.add_member(&name, DefinitionKind::EnumMember, name_node.start_byte(), span);
        let comment = self.comment(node);
        self.insert(DefinitionKind::EnumMember, name, span, name_node.start_byte(), comment);
    }

    fn parameter_list<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        node.child_by_field_name("parameters").or_else(|| {
            children(node)
                .into_iter()
                .find(|c| matches!(c.kind(), "parameter_list" | "bracketed_parameter_list"))
        })
    }

    fn parameters(&self, list: Option<Node>) -> Vec<Parameter> {
        let Some(list) = list else { return Vec::new() };
        named_children(list)
            .into_iter()
            .filter(|c| matches!(c.kind(), "parameter" | "parameter_array"))
            .map(|p| self.parameter(p))
            .collect()
    }

    fn parameter(&self, node: Node) -> Parameter {
        let mut parameter = Parameter {
            is_params: node.kind() == "parameter_array",
            ..Default::default()
        };
        for child in children(node) {
            let keyword = match child.kind() {
                "modifier" | "parameter_modifier" => self.text_of(child),
                kind => kind,
            };
            match keyword {
                "in" => parameter.is_in = true,
                "out" => parameter.is_out = true,
                "ref" => parameter.is_ref = true,
                "params" => parameter.is_params = true,
                "equals_value_clause" | "=" => parameter.is_optional = true,
                _ => {}
            }
        }
        let name = node.child_by_field_name("name");
        let type_node = node.child_by_field_name("type").or_else(|| {
            named_children(node)
                .into_iter()
                .find(|c| is_type_node(c) && name.is_none_or(|n| n.id() != c.id()))
        });
        parameter.type_text = type_node.map(|t| self.compact(t)).unwrap_or_default();
        parameter
    }

    /// Declared return or member type: the `returns`/`type` field, else the first type node
    /// before `before` (or anywhere when `before` is `None`).
    fn declared_type(&self, node: Node, before: Option<Node>) -> Option<String> {
        node.child_by_field_name("returns")
            .or_else(|| node.child_by_field_name("type"))
            .or_else(|| {
                named_children(node)
                    .into_iter()
                    .take_while(|c| before.is_none_or(|b| b.id() != c.id()))
                    .find(is_type_node)
            })
            .map(|t| self.compact(t))
    }

    fn has_attribute(&self, node: Node, name: &str) -> bool {
        children(node)
            .into_iter()
            .any(|c| c.kind() == "attribute_list" && self.text_of(c).contains(name))
    }

    /// Method-like name: the `name` field, else the last identifier before the parameter list.
    fn callable_name<'t>(&self, node: Node<'t>, params: Option<Node<'t>>) -> Option<Node<'t>> {
        node.child_by_field_name("name").or_else(|| {
            let kids = children(node);
            let limit = params
                .and_then(|p| kids.iter().position(|c| c.id() == p.id()))
                .unwrap_or(kids.len());
            kids[..limit]
                .iter()
                .rev()
                .find(|c| c.kind() == "identifier")
                .copied()
        })
    }

    fn visit_method(&mut self, node: Node) {
        let list = self.parameter_list(node);
        let Some(name_node) = self.callable_name(node, list) else { return };
        let name = self.identifier(name_node);
        let type_params = self.type_parameters(node);
        let params = self.parameters(list);
        let return_type = self
            .declared_type(node, Some(name_node))
            .unwrap_or_else(|| "void".to_string());

        let kind = method_kind(
            &params,
            return_type == "void",
            self.has_attribute(node, "DllImport"),
        );
        let text = format!(
            "{}({}) : {}",
            generic_display(&name, &type_params, LANGUAGE),
            format_arguments(&params, LANGUAGE, false),
            return_type
        );
        let span = (node.start_byte(), node.end_byte());
        self.add_member(&name, kind, name_node.start_byte(), span);
        let comment = self.comment(node);
        self.insert(kind, text, span, name_node.start_byte(), comment);
    }

    fn visit_constructor(&mut self, node: Node) {
        let list = self.parameter_list(node);
        let Some(name_node) = self.callable_name(node, list) else { return };
        let name = self.identifier(name_node);
        let params = self.parameters(list);
        let text = format!("{}({})", name, format_arguments(&params, LANGUAGE, false));
        let span = (node.start_byte(), node.end_byte());
        self.add_member(&name, DefinitionKind::Constructor, name_node.start_byte(), span);
        let comment = self.comment(node);
        self.insert(DefinitionKind::Constructor, text, span, name_node.start_byte(), comment);
    }

    fn visit_destructor(&mut self, node: Node) {
        let list = self.parameter_list(node);
        let Some(name_node) = self.callable_name(node, list) else { return };
        let text = format!("~{}()", self.identifier(name_node));
        let span = (node.start_byte(), node.end_byte());
        let comment = self.comment(node);
        self.insert(DefinitionKind::Method, text, span, name_node.start_byte(), comment);
    }

    fn visit_operator(&mut self, node: Node) {
        let kids = children(node);
        let Some(keyword) = kids.iter().position(|c| c.kind() == "operator") else { return };
        let Some(token) = node
            .child_by_field_name("operator")
            .or_else(|| kids.get(keyword + 1).copied())
        else {
            return;
        };
        let list = self.parameter_list(node);
        let params = self.parameters(list);
        let return_type = self
            .declared_type(node, Some(kids[keyword]))
            .unwrap_or_default();
        let text = format!(
            "operator {}({}) : {}",
            self.text_of(token),
            format_arguments(&params, LANGUAGE, false),
            return_type
        );
        let span = (node.start_byte(), node.end_byte());
        let comment = self.comment(node);
        self.insert(DefinitionKind::Operator, text, span, token.start_byte(), comment);
    }

    fn visit_conversion_operator(&mut self, node: Node) {
        let kids = children(node);
        let Some(conversion) = kids
            .iter()
            .find(|c| matches!(c.kind(), "implicit" | "explicit"))
        else {
            return;
        };
        let keyword = kids.iter().position(|c| c.kind() == "operator");
        let Some(type_node) = node.child_by_field_name("type").or_else(|| {
            keyword.and_then(|k| kids[k + 1..].iter().find(|c| is_type_node(c)).copied())
        }) else {
            return;
        };
        let target = self.compact(type_node);
        let params = self.parameters(self.parameter_list(node));
        let text = format!(
            "{} operator {}({}) : {}",
            self.text_of(*conversion),
            target,
            format_arguments(&params, LANGUAGE, false),
            target
        );
        let span = (node.start_byte(), node.end_byte());
        let comment = self.comment(node);
        // The target type is a reference, so the `implicit` / `explicit` keyword stands in for a name.
        self.insert(DefinitionKind::Operator, text, span, conversion.start_byte(), comment);
    }

    fn visit_indexer(&mut self, node: Node) {
        let Some(this) = child_of_kind(node, "this") else { return };
        let type_text = self.declared_type(node, Some(this)).unwrap_or_default();
        let params = self.parameters(self.parameter_list(node));
        let text = format!(
            "this[{}] : {}",
            format_arguments(&params, LANGUAGE, true),
            type_text
        );
        let span = (node.start_byte(), node.end_byte());
        self.add_member("this", DefinitionKind::Indexer, this.start_byte(), span);
        let comment = self.comment(node);
        self.insert(DefinitionKind::Indexer, text, span, this.start_byte(), comment);
    }

    /// `name` field, else the first identifier after the member's type node.
    fn member_name<'t>(&self, node: Node<'t>) -> Option<(Node<'t>, Option<Node<'t>>)> {
        let type_node = node.child_by_field_name("type").or_else(|| {
            named_children(node)
                .into_iter()
                .find(|c| is_type_node(c))
        });
        let name = node.child_by_field_name("name").or_else(|| {
            let type_id = type_node.map(|t| t.id());
            named_children(node)
                .into_iter()
                .skip_while(|c| Some(c.id()) != type_id)
                .skip(1)
                .find(|c| c.kind() == "identifier")
        })?;
        Some((name, type_node))
    }

    fn visit_property(&mut self, node: Node) {
        let Some((name_node, type_node)) = self.member_name(node) else { return };
        let name = self.identifier(name_node);
        let type_text = type_node.map(|t| self.compact(t)).unwrap_or_default();
        let span = (node.start_byte(), node.end_byte());
        self.add_member(&name, DefinitionKind::Property, name_node.start_byte(), span);
        let comment = self.comment(node);
        self.insert(
            DefinitionKind::Property,
            format!("{} : {}", name, type_text),
            span,
            name_node.start_byte(),
            comment,
        );
    }

    fn visit_event(&mut self, node: Node) {
        let Some((name_node, type_node)) = self.member_name(node) else { return };
        let name = self.identifier(name_node);
        let type_text = type_node.map(|t| self.compact(t)).unwrap_or_default();
        let span = (node.start_byte(), node.end_byte());
        self.add_member(&name, DefinitionKind::Event, name_node.start_byte(), span);
        let comment = self.comment(node);
        self.insert(
            DefinitionKind::Event,
            format!("{} : {}", name, type_text),
            span,
            name_node.start_byte(),
            comment,
        );
    }

    /// One node per declarator; every declarator shares the declaration's comment.
    fn visit_field(&mut self, node: Node, kind: DefinitionKind) {
        let Some(declaration) = child_of_kind(node, "variable_declaration") else { return };
        let type_text = declaration
            .child_by_field_name("type")
            .or_else(|| named_children(declaration).into_iter().next())
            .map(|t| self.compact(t))
            .unwrap_or_default();
        let comment = self.comment(node);

        for declarator in named_children(declaration)
            .into_iter()
            .filter(|c| c.kind() == "variable_declarator")
        {
            let Some(name_node) = self.name_node(declarator) else { continue };
            let name = self.identifier(name_node);
            let span = (declarator.start_byte(), declarator.end_byte());
            self.add_member(&name, kind, name_node.start_byte(), span);
            self.insert(
                kind,
                format!("{} : {}", name, type_text),
                span,
                name_node.start_byte(),
                comment.clone(),
            );
        }
    }

    fn visit_delegate(&mut self, node: Node) {
        let list = self.parameter_list(node);
        let name_node = node.child_by_field_name("name").or_else(|| {
            let kids = children(node);
            let limit = kids
                .iter()
                .position(|c| matches!(c.kind(), "type_parameter_list" | "parameter_list"))
                .unwrap_or(kids.len());
            kids[..limit]
                .iter()
                .rev()
                .find(|c| c.kind() == "identifier")
                .copied()
        });
        let Some(name_node) = name_node else { return };
        let name = self.identifier(name_node);
        let type_params = self.type_parameters(node);
        let params = self.parameters(list);
        let return_type = self
            .declared_type(node, Some(name_node))
            .unwrap_or_else(|| "void".to_string());

        let span = (node.start_byte(), node.end_byte());
        let handle = self.record_type(
            &name,
            type_params.len(),
            DefinitionKind::Delegate,
            name_node.start_byte(),
            span,
            Vec::new(),
        );
        let text = format!(
            "{}({}) : {}",
            generic_display(&name, &type_params, LANGUAGE),
            format_arguments(&params, LANGUAGE, false),
            return_type
        );
        let comment = self.comment(node);
        let definition = DefinitionNode::new(
            DefinitionKind::Delegate,
            text,
            self.path,
            LANGUAGE,
            span,
            name_node.start_byte(),
        )
        .with_comment(comment)
        .with_handle(handle);
        self.builder.insert(definition);
    }
}
