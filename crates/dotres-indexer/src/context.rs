//! Compilation contexts: immutable snapshots of parsed files plus their declaration table

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dotres_core::{DeclarationRef, DeclarationTable, Location, SourceLanguage};

use crate::extractor::ParsedFile;

/// A file inside a context, with the qualified keys of its type declarations.
#[derive(Debug, Clone)]
pub struct ContextFile {
    pub file: Arc<ParsedFile>,
    /// Table key per entry of `file.outline.types`.
    pub type_keys: Vec<String>,
}

pub struct CompilationContext {
    language: SourceLanguage,
    files: Vec<ContextFile>,
    by_path: HashMap<PathBuf, usize>,
    table: DeclarationTable,
}

impl CompilationContext {
    /// Register every namespace and type declaration of `files`, in load order.
    pub fn build(language: SourceLanguage, files: Vec<Arc<ParsedFile>>) -> Self {
        let table = DeclarationTable::new(language.is_case_sensitive());
        let mut context_files = Vec::with_capacity(files.len());
        let mut by_path = HashMap::with_capacity(files.len());

        for file in files {
            if file.language != language {
                tracing::warn!(
                    "Skipping {} in {} context: file language is {}",
                    file.path.display(),
                    language,
                    file.language
                );
                continue;
            }
            if by_path.contains_key(&file.path) {
                continue;
            }
            let type_keys = register_file(&table, &file);
            by_path.insert(file.path.clone(), context_files.len());
            context_files.push(ContextFile { file, type_keys });
        }

        tracing::debug!(
            "Built {} context: {} files, {} types, {} namespaces",
            language,
            context_files.len(),
            table.type_count(),
            table.namespace_count()
        );

        CompilationContext {
            language,
            files: context_files,
            by_path,
            table,
        }
    }

    pub fn language(&self) -> SourceLanguage {
        self.language
    }

    /// Files in load order.
    pub fn files(&self) -> &[ContextFile] {
        &self.files
    }

    pub fn file(&self, path: &Path) -> Option<&ContextFile> {
        self.by_path.get(path).map(|&idx| &self.files[idx])
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn table(&self) -> &DeclarationTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Table key of a namespace path.
    pub fn namespace_key<S: AsRef<str>>(&self, path: &[S]) -> String {
        namespace_key(&self.table, path)
    }

    /// The declaring file entry of a table hit.
    pub fn declaring_file(&self, declaration: &DeclarationRef) -> Option<&ContextFile> {
        self.file(&declaration.file)
    }
}

fn namespace_key<S: AsRef<str>>(table: &DeclarationTable, path: &[S]) -> String {
    path.iter()
        .fold(String::new(), |key, segment| table.child_key(&key, segment.as_ref()))
}

fn register_file(table: &DeclarationTable, file: &ParsedFile) -> Vec<String> {
    let outline = &file.outline;
    let root = &file.root_namespace;

    // Root namespace prefixes have no declaring source.
    for depth in 1..=root.len() {
        table.insert_namespace(&namespace_key(table, &root[..depth]), None);
    }

    for namespace in &outline.namespaces {
        let full: Vec<&str> = root
            .iter()
            .chain(namespace.path.iter())
            .map(String::as_str)
            .collect();
        // Written segments are the tail of the full path.
        let written_from = full.len().saturating_sub(namespace.segments.len());
        for depth in 1..=full.len() {
            let location = depth
                .checked_sub(written_from + 1)
                .and_then(|i| namespace.segments.get(i))
                .map(|segment| Location::new(file.path.clone(), segment.offset));
            table.insert_namespace(&namespace_key(table, &full[..depth]), location);
        }
    }

    let mut type_keys: Vec<String> = Vec::with_capacity(outline.types.len());
    for (idx, decl) in outline.types.iter().enumerate() {
        let parent_key = match decl.parent.and_then(|p| type_keys.get(p)) {
            Some(key) => key.clone(),
            None => {
                let full: Vec<&str> = root
                    .iter()
                    .chain(decl.namespace.iter())
                    .map(String::as_str)
                    .collect();
                for depth in 1..=full.len() {
                    table.insert_namespace(&namespace_key(table, &full[..depth]), None);
                }
                namespace_key(table, &full[..])
            }
        };
        let key = table.type_key(&parent_key, &decl.name, decl.arity);
        table.insert_type(
            &parent_key,
            &decl.name,
            DeclarationRef {
                key: key.clone(),
                file: file.path.clone(),
                type_index: idx,
                arity: decl.arity,
                kind: decl.kind,
                identifier_offset: decl.identifier_offset,
            },
        );
        type_keys.push(key);
    }
    type_keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::extract;

    fn parsed(path: &str, text: &str, language: SourceLanguage) -> Arc<ParsedFile> {
        let path = PathBuf::from(path);
        let result = extract(&path, text, language).unwrap();
        Arc::new(ParsedFile::new(path, text, result))
    }

    #[test]
    fn test_registers_nested_types_under_generic_parent() {
        let file = parsed(
            "A.cs",
            "namespace Lib.Core { class Outer<T> { class Inner {} } }",
            SourceLanguage::CSharp,
        );
        let context = CompilationContext::build(SourceLanguage::CSharp, vec![file]);
        let table = context.table();

        let outer = table.lookup_type("Lib.Core", "Outer", 1).unwrap();
        assert_eq!(outer.key, "Lib.Core.Outer`1");
        let inner = table.lookup_type(&outer.key, "Inner", 0).unwrap();
        assert_eq!(inner.key, "Lib.Core.Outer`1.Inner");
        assert!(table.namespace("Lib").is_some());
        assert_eq!(
            table.namespace("Lib.Core").flatten().map(|l| l.offset),
            Some("namespace Lib.".len())
        );
    }

    #[test]
    fn test_visual_basic_root_namespace_is_case_insensitive() {
        let path = PathBuf::from("Module1.vb");
        let text = "Namespace Helpers\nPublic Class Widget\nEnd Class\nEnd Namespace\n";
        let result = extract(&path, text, SourceLanguage::VisualBasic).unwrap();
        let file = Arc::new(
            ParsedFile::new(path, text, result).with_root_namespace(vec!["App".to_string()]),
        );
        let context = CompilationContext::build(SourceLanguage::VisualBasic, vec![file]);

        assert!(context.table().namespace("app").is_some());
        assert_eq!(context.table().namespace("App"), Some(None));
        assert!(context.table().lookup_type("app.helpers", "WIDGET", 0).is_some());
    }

    #[test]
    fn test_duplicate_and_foreign_files_are_skipped() {
        let cs = parsed("A.cs", "class A {}", SourceLanguage::CSharp);
        let vb = parsed("B.vb", "Class B\nEnd Class\n", SourceLanguage::VisualBasic);
        let context =
            CompilationContext::build(SourceLanguage::CSharp, vec![cs.clone(), cs, vb]);
        assert_eq!(context.len(), 1);
        assert!(context.contains(Path::new("A.cs")));
        assert!(!context.contains(Path::new("B.vb")));
    }
}
