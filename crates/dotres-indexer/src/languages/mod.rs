//! Language extractors for C# and Visual Basic

pub mod csharp;
pub mod visual_basic;

use std::path::Path;
use std::sync::LazyLock;

use dotres_core::{DefinitionKind, ExtractError, SourceLanguage};
use regex::Regex;

pub use crate::extractor::{ExtractionResult, LanguageExtractor};
use crate::parser_pool;

/// Get the appropriate extractor for a file based on its extension
pub fn get_extractor(path: &Path) -> Option<Box<dyn LanguageExtractor>> {
    SourceLanguage::from_path(path).map(extractor_for)
}

pub fn extractor_for(language: SourceLanguage) -> Box<dyn LanguageExtractor> {
    match language {
        SourceLanguage::CSharp => Box::new(csharp::CSharpExtractor),
        SourceLanguage::VisualBasic => Box::new(visual_basic::VisualBasicExtractor),
    }
}

/// Parse and extract one file's source text.
pub fn extract(
    path: &Path,
    text: &str,
    language: SourceLanguage,
) -> Result<ExtractionResult, ExtractError> {
    let syntax = parser_pool::parse_source(language, text).map_err(|e| ExtractError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    extractor_for(language).extract(path, text, &syntax)
}

/// One parameter as needed for display and event-handler classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameter {
    pub type_text: String,
    pub is_in: bool,
    pub is_out: bool,
    pub is_ref: bool,
    pub is_params: bool,
    pub is_optional: bool,
}

static NAMESPACE_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+\.)*").expect("valid namespace pattern"));

/// `System.Collections.Generic.IEnumerable<System.Int32>` → `IEnumerable<Int32>`.
pub fn strip_namespace(type_text: &str) -> String {
    if !type_text.contains('.') {
        return type_text.to_string();
    }
    NAMESPACE_QUALIFIER.replace_all(type_text, "").into_owned()
}

/// Render an argument list (without the surrounding brackets).
///
/// Indexer parameters put the optional bracket before `params`.
pub fn format_arguments(params: &[Parameter], language: SourceLanguage, indexer: bool) -> String {
    params
        .iter()
        .map(|p| {
            let mut text = String::new();
            let type_text = strip_namespace(&p.type_text);
            match language {
                SourceLanguage::CSharp => {
                    if p.is_in {
                        text.push_str("in ");
                    }
                    if p.is_out {
                        text.push_str("out ");
                    }
                    if p.is_ref {
                        text.push_str("ref ");
                    }
                    if indexer {
                        if p.is_optional {
                            text.push('[');
                        }
                        if p.is_params {
                            text.push_str("params ");
                        }
                    } else {
                        if p.is_params {
                            text.push_str("params ");
                        }
                        if p.is_optional {
                            text.push('[');
                        }
                    }
                }
                SourceLanguage::VisualBasic => {
                    if p.is_ref {
                        text.push_str("ByRef ");
                    }
                    if p.is_params {
                        text.push_str("ParamArray ");
                    }
                    if p.is_optional {
                        text.push('[');
                    }
                }
            }
            text.push_str(&type_text);
            if p.is_optional {
                text.push(']');
            }
            text
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `(object sender, XxxEventArgs e)` with no return value.
pub fn is_event_handler(params: &[Parameter], returns_void: bool) -> bool {
    if !returns_void || params.len() != 2 {
        return false;
    }
    let first = strip_namespace(&params[0].type_text);
    let second = strip_namespace(&params[1].type_text);
    (first == "object" || first == "Object") && second.ends_with("EventArgs")
}

/// Method kind: platform import wins over the event-handler pattern.
pub fn method_kind(params: &[Parameter], returns_void: bool, platform_import: bool) -> DefinitionKind {
    if platform_import {
        DefinitionKind::PlatformImport
    } else if is_event_handler(params, returns_void) {
        DefinitionKind::EventHandler
    } else {
        DefinitionKind::Method
    }
}

/// `Name<T1, T2>` or `Name(Of T1, T2)`.
pub fn generic_display(name: &str, type_params: &[String], language: SourceLanguage) -> String {
    if type_params.is_empty() {
        return name.to_string();
    }
    match language {
        SourceLanguage::CSharp => format!("{}<{}>", name, type_params.join(", ")),
        SourceLanguage::VisualBasic => format!("{}(Of {})", name, type_params.join(", ")),
    }
}
