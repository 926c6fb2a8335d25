//! Source reading, parsing, structural extraction and name binding for C# and Visual Basic

pub mod binder;
pub mod comments;
pub mod config;
pub mod context;
pub mod extractor;
pub mod languages;
pub mod parser_pool;
pub mod reference;
pub mod source;
pub mod vb_syntax;


pub use binder::find_symbol_at_position;
pub use config::{AnalysisOptions, ConfigError, WorkspaceConfig, load_workspace};
pub use context::{CompilationContext, ContextFile};
pub use extractor::{ExtractionResult, LanguageExtractor, ParsedFile};
pub use parser_pool::{ParseRequest, ParseResult, ParserPool, SyntaxTree, create_parser_pool, parse_source};
pub use source::{FsSourceReader, MemorySourceReader, SourceReader};
