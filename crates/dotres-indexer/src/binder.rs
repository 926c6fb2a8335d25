//! Name binding: from a cursor offset to the declaration the name under it denotes

use std::path::Path;

use dotres_core::{
    DeclarationRef, DefinitionKind, ImportDirective, Location, LocateError, MemberDecl,
    NameReference, NameSegment, SourceLanguage, TypeDecl,
};

use crate::context::{CompilationContext, ContextFile};
use crate::reference::reference_at;

/// Resolve the name at `offset` in `file` against `context`.
///
/// `Ok(None)` means the name is not declared in source within this context. An offset on a
/// declaration's own identifier resolves to itself; an alias name resolves to the alias
/// directive's identifier.
pub fn find_symbol_at_position(
    context: &CompilationContext,
    file: &Path,
    offset: usize,
) -> Result<Option<Location>, LocateError> {
    let entry = context
        .file(file)
        .ok_or_else(|| LocateError::NotInContext(file.to_path_buf()))?;

    if is_declaration(entry, offset) {
        return Ok(Some(Location::new(file, offset)));
    }

    let Some(reference) = reference_at(&entry.file.text, offset, context.language()) else {
        tracing::trace!("No name at {}:{}", file.display(), offset);
        return Ok(None);
    };

    let in_directive = entry
        .file
        .outline
        .imports
        .iter()
        .any(|import| import.start <= offset && offset < import.end);
    let base_of = entry.file.outline.types.iter().position(|decl| {
        decl.bases
            .iter()
            .any(|base| base.start <= offset && offset < base.end)
    });
    let binder = Binder {
        context,
        entry,
        offset,
        in_directive,
        base_of,
    };
    Ok(binder.bind(&reference))
}

fn is_declaration(entry: &ContextFile, offset: usize) -> bool {
    let outline = &entry.file.outline;
    entry.file.tree.iter().any(|node| node.identifier_offset == offset)
        || outline.alias_at(offset).is_some()
        || outline
            .namespaces
            .iter()
            .any(|ns| ns.segments.iter().any(|s| s.offset == offset))
}

#[derive(Debug, Clone)]
enum Entity {
    Namespace(String),
    Type(DeclarationRef),
    Member(Location),
}

enum Binding<'a> {
    Entity(Entity),
    Alias(&'a ImportDirective),
}

struct Binder<'a> {
    context: &'a CompilationContext,
    entry: &'a ContextFile,
    offset: usize,
    /// Names inside `using` / `Imports` directives see neither aliases nor imports.
    in_directive: bool,
    /// Type whose base list holds the cursor. Its own scope is not visible and the name must
    /// denote a type.
    base_of: Option<usize>,
}

impl<'a> Binder<'a> {
    fn same(&self, a: &str, b: &str) -> bool {
        let language = self.context.language();
        language.fold(a) == language.fold(b)
    }

    fn location(&self, entity: &Entity) -> Option<Location> {
        match entity {
            Entity::Namespace(key) => self.context.table().namespace(key).flatten(),
            Entity::Type(declaration) => Some(declaration.location()),
            Entity::Member(location) => Some(location.clone()),
        }
    }

    /// Members reachable by simple name. Constructors are named after their type and never are.
    fn member_named<'d>(&self, decl: &'d TypeDecl, name: &str) -> Option<&'d MemberDecl> {
        decl.members
            .iter()
            .filter(|m| m.kind != DefinitionKind::Constructor)
            .find(|m| self.same(&m.name, name))
    }

    fn alias_location(&self, directive: &ImportDirective) -> Option<Location> {
        directive
            .alias
            .as_ref()
            .map(|alias| Location::new(self.entry.file.path.clone(), alias.offset))
    }

    fn bind(&self, reference: &NameReference) -> Option<Location> {
        if let Some(qualifier) = &reference.alias_qualifier {
            let directive = self.alias_named(&qualifier.name)?;
            if qualifier.offset <= self.offset && self.offset < qualifier.end() {
                return self.alias_location(directive);
            }
            let target = self.resolve_directive(directive)?;
            let entity = self.walk(target, &reference.segments)?;
            return self.location(&entity);
        }

        if reference.global {
            let entity = self.walk(Entity::Namespace(String::new()), &reference.segments)?;
            return self.location(&entity);
        }

        let (first, rest) = reference.segments.split_first()?;
        match self.lookup(first)? {
            Binding::Alias(directive) if rest.is_empty() => self.alias_location(directive),
            Binding::Alias(directive) => {
                let target = self.resolve_directive(directive)?;
                let entity = self.walk(target, rest)?;
                self.location(&entity)
            }
            Binding::Entity(entity) => {
                let entity = self.walk(entity, rest)?;
                self.location(&entity)
            }
        }
    }

    /// Namespace paths from the innermost enclosing namespace out to the global namespace.
    fn levels(&self) -> Vec<Vec<String>> {
        let file = &self.entry.file;
        let innermost = file
            .outline
            .namespaces_at(self.offset)
            .last()
            .map(|ns| ns.path.clone())
            .unwrap_or_default();
        let full: Vec<String> = file.root_namespace.iter().cloned().chain(innermost).collect();
        (0..=full.len()).rev().map(|n| full[..n].to_vec()).collect()
    }

    /// Directives visible from the cursor that were declared at namespace `level`.
    fn directives_at<'b>(&'b self, level: &'b [String]) -> impl Iterator<Item = &'a ImportDirective> + 'b {
        let entry: &'a ContextFile = self.entry;
        let root = &entry.file.root_namespace;
        entry.file.outline.imports_at(self.offset).filter(move |import| {
            root.len() + import.scope.len() == level.len()
                && root
                    .iter()
                    .chain(import.scope.iter())
                    .zip(level)
                    .all(|(a, b)| self.same(a, b))
        })
    }

    fn alias_named(&self, name: &str) -> Option<&'a ImportDirective> {
        self.levels().iter().find_map(|level| {
            self.directives_at(level)
                .find(|d| d.alias.as_ref().is_some_and(|a| self.same(&a.name, name)))
        })
    }

    /// Simple-name lookup for the first segment of a reference.
    fn lookup(&self, segment: &NameSegment) -> Option<Binding<'a>> {
        let table = self.context.table();
        let outline = &self.entry.file.outline;

        if !self.in_directive {
            let enclosing = outline
                .types_at(self.offset)
                .into_iter()
                .filter(|&idx| Some(idx) != self.base_of);
            for idx in enclosing {
                let key = &self.entry.type_keys[idx];
                if let Some(nested) = table.lookup_type(key, &segment.name, segment.arity) {
                    return Some(Binding::Entity(Entity::Type(nested)));
                }
                if segment.arity == 0 && self.base_of.is_none() {
                    if let Some(member) = self.member_named(&outline.types[idx], &segment.name) {
                        let location =
                            Location::new(self.entry.file.path.clone(), member.identifier_offset);
                        return Some(Binding::Entity(Entity::Member(location)));
                    }
                }
            }
        }

        for level in self.levels() {
            let key = self.context.namespace_key(&level[..]);
            if let Some(entity) = self.step(&Entity::Namespace(key), segment) {
                return Some(Binding::Entity(entity));
            }
            if self.in_directive {
                continue;
            }

            let directives: Vec<&ImportDirective> = self.directives_at(&level).collect();
            if segment.arity == 0 {
                if let Some(directive) = directives
                    .iter()
                    .copied()
                    .find(|d| d.alias.as_ref().is_some_and(|a| self.same(&a.name, &segment.name)))
                {
                    return Some(Binding::Alias(directive));
                }
            }
            for directive in directives.iter().filter(|d| d.alias.is_none()) {
                let found = match self.resolve_directive(directive) {
                    Some(Entity::Namespace(key)) => table
                        .lookup_type(&key, &segment.name, segment.arity)
                        .map(Entity::Type),
                    Some(Entity::Type(declaration)) => table
                        .lookup_type(&declaration.key, &segment.name, segment.arity)
                        .map(Entity::Type),
                    _ => None,
                };
                if let Some(entity) = found {
                    return Some(Binding::Entity(entity));
                }
            }
        }
        None
    }

    /// What a directive's target names.
    ///
    /// C# `using` targets resolve from the directive's own scope outwards. Visual Basic `Imports`
    /// targets are fully qualified and never see the project root namespace.
    fn resolve_directive(&self, directive: &ImportDirective) -> Option<Entity> {
        let target = &directive.target;
        if target.global || self.context.language() == SourceLanguage::VisualBasic {
            return self.walk(Entity::Namespace(String::new()), &target.segments);
        }
        let full: Vec<&String> = self
            .entry
            .file
            .root_namespace
            .iter()
            .chain(directive.scope.iter())
            .collect();
        (0..=full.len()).rev().find_map(|n| {
            let key = self.context.namespace_key(&full[..n]);
            self.walk(Entity::Namespace(key), &target.segments)
        })
    }

    fn walk(&self, mut entity: Entity, segments: &[NameSegment]) -> Option<Entity> {
        for segment in segments {
            entity = self.step(&entity, segment)?;
        }
        Some(entity)
    }

    fn step(&self, entity: &Entity, segment: &NameSegment) -> Option<Entity> {
        let table = self.context.table();
        match entity {
            Entity::Namespace(key) => {
                if let Some(declaration) = table.lookup_type(key, &segment.name, segment.arity) {
                    return Some(Entity::Type(declaration));
                }
                let child = table.child_key(key, &segment.name);
                (segment.arity == 0 && table.namespace(&child).is_some())
                    .then_some(Entity::Namespace(child))
            }
            Entity::Type(declaration) => {
                if let Some(nested) =
                    table.lookup_type(&declaration.key, &segment.name, segment.arity)
                {
                    return Some(Entity::Type(nested));
                }
                if self.base_of.is_some() {
                    return None;
                }
                let file = self.context.declaring_file(declaration)?;
                let decl = file.file.outline.types.get(declaration.type_index)?;
                self.member_named(decl, &segment.name)
                    .map(|m| Entity::Member(Location::new(file.file.path.clone(), m.identifier_offset)))
            }
            Entity::Member(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::extractor::ParsedFile;
    use crate::languages::extract;

    fn context(files: &[(&str, &str)]) -> CompilationContext {
        let parsed = files
            .iter()
            .map(|(path, text)| {
                let path = PathBuf::from(path);
                let language = SourceLanguage::from_path(&path).unwrap();
                let result = extract(&path, text, language).unwrap();
                Arc::new(ParsedFile::new(path, text, result))
            })
            .collect();
        let language = SourceLanguage::from_path(Path::new(files[0].0)).unwrap();
        CompilationContext::build(language, parsed)
    }

    fn locate(context: &CompilationContext, file: &str, text: &str, needle: &str) -> Option<Location> {
        let offset = text.find(needle).unwrap();
        find_symbol_at_position(context, Path::new(file), offset).unwrap()
    }

    #[test]
    fn test_cross_file_base() {
        let a = "namespace Shapes { public class Base {} }";
        let b = "namespace Shapes { class Derived : Base {} }";
        let ctx = context(&[("A.cs", a), ("B.cs", b)]);
        let found = locate(&ctx, "B.cs", b, "Base").unwrap();
        assert_eq!(found, Location::new("A.cs", a.find("Base").unwrap()));
    }

    #[test]
    fn test_using_namespace_and_qualified_names() {
        let a = "namespace Lib.Models { public class Entity<T> {} public class Entity {} }";
        let b = "using Lib.Models;\nclass Repo : Entity<int> {}\nclass Plain : Lib.Models.Entity {}";
        let ctx = context(&[("A.cs", a), ("B.cs", b)]);

        let generic = locate(&ctx, "B.cs", b, "Entity<int>").unwrap();
        assert_eq!(generic.offset, a.find("Entity<T>").unwrap());

        let qualified_offset = b.rfind("Entity").unwrap();
        let plain = find_symbol_at_position(&ctx, Path::new("B.cs"), qualified_offset)
            .unwrap()
            .unwrap();
        assert_eq!(plain.offset, a.rfind("Entity").unwrap());

        // Querying a namespace segment resolves to its declaring segment.
        let models = locate(&ctx, "B.cs", b, "Models.Entity").unwrap();
        assert_eq!(models, Location::new("A.cs", a.find("Models").unwrap()));
    }

    #[test]
    fn test_alias_resolves_to_directive_then_target() {
        let a = "namespace Foo { public class BaseClass {} }";
        let b = "using Xxx = Foo.BaseClass;\nclass C : Xxx {}";
        let ctx = context(&[("A.cs", a), ("B.cs", b)]);

        let alias = locate(&ctx, "B.cs", b, "Xxx {}").unwrap();
        assert_eq!(alias, Location::new("B.cs", b.find("Xxx").unwrap()));

        let target = locate(&ctx, "B.cs", b, "BaseClass;").unwrap();
        assert_eq!(target, Location::new("A.cs", a.find("BaseClass").unwrap()));
    }

    #[test]
    fn test_nested_types_and_members() {
        let a = "class Outer { public class Inner {} public int Count; class Child : Inner {} }\nclass Other : Outer.Inner {}";
        let ctx = context(&[("A.cs", a)]);
        let inner = a.find("Inner").unwrap();
        assert_eq!(locate(&ctx, "A.cs", a, "Inner {} }").unwrap().offset, inner);
        let qualified = a.rfind("Inner").unwrap();
        let found = find_symbol_at_position(&ctx, Path::new("A.cs"), qualified).unwrap().unwrap();
        assert_eq!(found.offset, inner);
    }

    #[test]
    fn test_base_list_ignores_own_members() {
        let a = "class Base {}\nclass Derived : Base { public Base Base { get; set; } class Inner : Base {} }";
        let ctx = context(&[("A.cs", a)]);
        let base = Location::new("A.cs", a.find("Base").unwrap());

        let derived_base = a.find(": Base").unwrap() + 2;
        let found = find_symbol_at_position(&ctx, Path::new("A.cs"), derived_base).unwrap();
        assert_eq!(found, Some(base.clone()));

        // Nested types still see the enclosing type's scope, minus its members.
        let inner_base = a.rfind(": Base").unwrap() + 2;
        let found = find_symbol_at_position(&ctx, Path::new("A.cs"), inner_base).unwrap();
        assert_eq!(found, Some(base));
    }

    #[test]
    fn test_base_list_ignores_own_nested_types() {
        let a = "class Base {}\nclass Derived : Base { class Base {} }";
        let ctx = context(&[("A.cs", a)]);
        let offset = a.find(": Base").unwrap() + 2;
        let found = find_symbol_at_position(&ctx, Path::new("A.cs"), offset).unwrap();
        assert_eq!(found, Some(Location::new("A.cs", a.find("Base").unwrap())));
    }

    #[test]
    fn test_visual_basic_inherits_ignores_members() {
        let a = "Public Class Shape\nEnd Class\n\nPublic Class Circle\n    Inherits Shape\n    Public Property shape As Shape\nEnd Class\n";
        let ctx = context(&[("A.vb", a)]);
        let offset = a.find("Inherits Shape").unwrap() + "Inherits ".len();
        let found = find_symbol_at_position(&ctx, Path::new("A.vb"), offset).unwrap();
        assert_eq!(found, Some(Location::new("A.vb", a.find("Shape").unwrap())));
    }

    #[test]
    fn test_signature_types_resolve_to_types() {
        let a = "class Base {}\nclass Derived\n{\n    public Derived(Derived other) {}\n    public static implicit operator Base(Derived d) => null;\n}";
        let ctx = context(&[("A.cs", a)]);
        let base = Location::new("A.cs", a.find("Base").unwrap());
        let derived = Location::new("A.cs", a.find("Derived").unwrap());

        assert_eq!(locate(&ctx, "A.cs", a, "Base(Derived d)"), Some(base));
        assert_eq!(locate(&ctx, "A.cs", a, "Derived other"), Some(derived.clone()));
        assert_eq!(locate(&ctx, "A.cs", a, "Derived d)"), Some(derived));

        // The operator itself is found through its keyword.
        let keyword = a.find("implicit").unwrap();
        assert_eq!(locate(&ctx, "A.cs", a, "implicit"), Some(Location::new("A.cs", keyword)));
    }

    #[test]
    fn test_visual_basic_imports_skip_root_namespace() {
        let a = "Namespace Models\nPublic Class Shape\nEnd Class\nEnd Namespace\n";
        let b = "Imports Models\nPublic Class Circle\nInherits Shape\nEnd Class\n";
        let c = "Imports App.Models\nPublic Class Square\nInherits Shape\nEnd Class\n";
        let parsed = [("A.vb", a), ("B.vb", b), ("C.vb", c)]
            .iter()
            .map(|(path, text)| {
                let path = PathBuf::from(path);
                let result = extract(&path, text, SourceLanguage::VisualBasic).unwrap();
                Arc::new(ParsedFile::new(path, text, result).with_root_namespace(vec!["App".to_string()]))
            })
            .collect();
        let ctx = CompilationContext::build(SourceLanguage::VisualBasic, parsed);
        let shape = Location::new("A.vb", a.find("Shape").unwrap());

        assert_eq!(locate(&ctx, "B.vb", b, "Shape"), None);
        assert_eq!(locate(&ctx, "C.vb", c, "Shape"), Some(shape));
    }

    #[test]
    fn test_visual_basic_case_insensitive() {
        let a = "Namespace Shapes\nPublic Class Shape\nEnd Class\nEnd Namespace\n";
        let b = "Imports Shapes\nPublic Class Circle\nInherits SHAPE\nEnd Class\n";
        let ctx = context(&[("A.vb", a), ("B.vb", b)]);
        let found = locate(&ctx, "B.vb", b, "SHAPE").unwrap();
        assert_eq!(found, Location::new("A.vb", a.find("Shape\n").unwrap()));
    }

    #[test]
    fn test_unknown_names_and_foreign_files() {
        let a = "class A : System.IDisposable {}";
        let ctx = context(&[("A.cs", a)]);
        assert!(locate(&ctx, "A.cs", a, "IDisposable").is_none());
        assert!(matches!(
            find_symbol_at_position(&ctx, Path::new("Missing.cs"), 0),
            Err(LocateError::NotInContext(_))
        ));
    }

    #[test]
    fn test_declaration_identifier_is_its_own_location() {
        let a = "namespace N { class A {} }";
        let ctx = context(&[("A.cs", a)]);
        let offset = a.find("A {").unwrap();
        assert_eq!(locate(&ctx, "A.cs", a, "A {"), Some(Location::new("A.cs", offset)));
    }
}
