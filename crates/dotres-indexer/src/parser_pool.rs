//! Thread-safe parser pool
//!
//! Tree-sitter parsers are not Send + Sync, so parses run on dedicated worker threads that
//! each own a C# parser. Visual Basic files are parsed by the line-oriented parser on the
//! same workers so both languages share one queue.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};

use anyhow::{Result, anyhow};
use dotres_core::SourceLanguage;
use tree_sitter::{Language, Parser};

use crate::vb_syntax::{self, VbSyntaxTree};

/// Tree-sitter language for C# sources.
pub fn csharp_language() -> Language {
    tree_sitter_c_sharp::LANGUAGE.into()
}

/// A parsed source file in its front-end's native form.
#[derive(Debug, Clone)]
pub enum SyntaxTree {
    CSharp(tree_sitter::Tree),
    VisualBasic(VbSyntaxTree),
}

impl SyntaxTree {
    pub fn language(&self) -> SourceLanguage {
        match self {
            SyntaxTree::CSharp(_) => SourceLanguage::CSharp,
            SyntaxTree::VisualBasic(_) => SourceLanguage::VisualBasic,
        }
    }
}

/// A parsing request sent to the parser pool
#[derive(Debug)]
pub struct ParseRequest {
    pub language: SourceLanguage,
    pub content: String,
    pub path: PathBuf,
}

/// Result of a parsing operation
#[derive(Debug)]
pub struct ParseResult {
    pub tree: SyntaxTree,
    pub path: PathBuf,
    pub content: String,
}

struct WorkerRequest {
    request: ParseRequest,
    response_sender: mpsc::Sender<Result<ParseResult>>,
}

/// Parse one request with a caller-owned C# parser.
pub fn parse_with(parser: &mut Parser, request: ParseRequest) -> Result<ParseResult> {
    let tree = match request.language {
        SourceLanguage::CSharp => {
            parser
                .set_language(&csharp_language())
                .map_err(|e| anyhow!("Failed to set language: {}", e))?;
            let tree = parser
                .parse(&request.content, None)
                .ok_or_else(|| anyhow!("Failed to parse {}", request.path.display()))?;
            SyntaxTree::CSharp(tree)
        }
        SourceLanguage::VisualBasic => SyntaxTree::VisualBasic(vb_syntax::parse(&request.content)),
    };
    Ok(ParseResult {
        tree,
        path: request.path,
        content: request.content,
    })
}

/// Parse without going through a pool.
pub fn parse_source(language: SourceLanguage, content: &str) -> Result<SyntaxTree> {
    let mut parser = Parser::new();
    let request = ParseRequest {
        language,
        content: content.to_string(),
        path: PathBuf::new(),
    };
    Ok(parse_with(&mut parser, request)?.tree)
}

/// Thread-safe parser pool
#[derive(Clone)]
pub struct ParserPool {
    sender: mpsc::Sender<WorkerRequest>,
}

impl ParserPool {
    /// Create a new parser pool with the specified number of worker threads
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for i in 0..num_workers.max(1) {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<mpsc::Receiver<WorkerRequest>>>) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();

        loop {
            let next = match receiver.lock() {
                Ok(guard) => guard.recv(),
                Err(_) => {
                    tracing::warn!("Parser worker {} found a poisoned queue", worker_id);
                    break;
                }
            };
            let WorkerRequest {
                request,
                response_sender,
            } = match next {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("Parser worker {} shutting down", worker_id);
                    break;
                }
            };

            let result = parse_with(&mut parser, request);
            if response_sender.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }
    }

    fn submit(sender: &mpsc::Sender<WorkerRequest>, request: ParseRequest) -> Result<ParseResult> {
        let (response_sender, response_receiver) = mpsc::channel();
        sender
            .send(WorkerRequest {
                request,
                response_sender,
            })
            .map_err(|_| anyhow!("Parser pool is shut down"))?;
        response_receiver
            .recv()
            .map_err(|_| anyhow!("Parser worker died"))?
    }

    /// Parse content synchronously using the parser pool
    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        Self::submit(&self.sender, request)
    }

    /// Parse content asynchronously using the parser pool
    pub async fn parse(&self, request: ParseRequest) -> Result<ParseResult> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || Self::submit(&sender, request))
            .await
            .map_err(|e| anyhow!("Task join error: {}", e))?
    }
}

/// Convenience function to create a parser pool with default settings
pub fn create_parser_pool() -> ParserPool {
    // Use number of CPU cores as default worker count, but at least 2
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);

    ParserPool::new(num_workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_csharp() {
        let pool = create_parser_pool();
        let request = ParseRequest {
            language: SourceLanguage::CSharp,
            content: "namespace A { class B : C { } }".to_string(),
            path: PathBuf::from("test.cs"),
        };

        let result = pool.parse(request).await.unwrap();
        match result.tree {
            SyntaxTree::CSharp(tree) => assert_eq!(tree.root_node().kind(), "compilation_unit"),
            other => panic!("unexpected tree {:?}", other.language()),
        }
    }

    #[tokio::test]
    async fn test_parse_visual_basic() {
        let pool = create_parser_pool();
        let request = ParseRequest {
            language: SourceLanguage::VisualBasic,
            content: "Public Class B\n    Inherits C\nEnd Class\n".to_string(),
            path: PathBuf::from("test.vb"),
        };

        let result = pool.parse(request).await.unwrap();
        match result.tree {
            SyntaxTree::VisualBasic(tree) => assert_eq!(tree.nodes.len(), 2),
            other => panic!("unexpected tree {:?}", other.language()),
        }
    }

    #[test]
    fn test_parse_blocking() {
        let pool = ParserPool::new(1);
        let request = ParseRequest {
            language: SourceLanguage::CSharp,
            content: "class A {}".to_string(),
            path: PathBuf::from("a.cs"),
        };
        assert!(pool.parse_blocking(request).is_ok());
    }
}
