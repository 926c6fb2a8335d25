//! Analysis session: loaded projects, compilation contexts and the definition tree cache

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use dotres_core::{DefinitionTree, ExtractError, ProjectSpec, ResolutionResult, SourceLanguage};
use dotres_indexer::config::{build_excludes, discover_sources};
use dotres_indexer::languages::{extract, extractor_for};
use dotres_indexer::{
    AnalysisOptions, CompilationContext, FsSourceReader, ParseRequest, ParsedFile, ParserPool,
    SourceReader, WorkspaceConfig, create_parser_pool,
};
use tokio::task::JoinHandle;

use crate::locator::SymbolLocator;

/// A project and the source files that were loaded for it, in load order.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub spec: ProjectSpec,
    pub files: Vec<PathBuf>,
}

/// Everything one analysis works against. Cheap to share behind an `Arc`; all queries take
/// `&self`.
pub struct AnalysisSession {
    pub(crate) reader: Arc<dyn SourceReader>,
    pub(crate) projects: Vec<LoadedProject>,
    pub(crate) locator: SymbolLocator,
    pub(crate) options: AnalysisOptions,
    /// Root namespace per loaded file.
    root_namespaces: HashMap<PathBuf, Vec<String>>,
    parsed: DashMap<PathBuf, Arc<ParsedFile>>,
}

impl AnalysisSession {
    /// Load every project of `config` from disk.
    pub async fn load(config: &WorkspaceConfig) -> Result<Self> {
        Self::load_with_reader(config, Arc::new(FsSourceReader)).await
    }

    pub async fn load_with_reader(
        config: &WorkspaceConfig,
        reader: Arc<dyn SourceReader>,
    ) -> Result<Self> {
        let excludes = build_excludes(&config.options.exclude)
            .context("Invalid exclude patterns in [analysis]")?;
        let pool = create_parser_pool();

        let mut session = AnalysisSession {
            reader: reader.clone(),
            projects: Vec::with_capacity(config.projects.len()),
            locator: SymbolLocator::new(),
            options: config.options.clone(),
            root_namespaces: HashMap::new(),
            parsed: DashMap::new(),
        };
        let mut visible: BTreeMap<SourceLanguage, Vec<Arc<ParsedFile>>> = BTreeMap::new();

        for spec in &config.projects {
            let root_namespace = spec.root_namespace_path();
            let sources = discover_sources(spec, &excludes);
            tracing::info!("Loading project {} ({} files)", spec.name, sources.len());

            let handles: Vec<(PathBuf, JoinHandle<Result<ParsedFile, ExtractError>>)> = sources
                .iter()
                .map(|path| {
                    let path = reader.normalize(path);
                    let task = tokio::spawn(load_file(
                        reader.clone(),
                        pool.clone(),
                        path.clone(),
                        spec.language,
                        root_namespace.clone(),
                    ));
                    (path, task)
                })
                .collect();

            let mut files = Vec::with_capacity(handles.len());
            for (path, handle) in handles {
                match handle.await {
                    Ok(Ok(parsed)) => {
                        let parsed = Arc::new(parsed);
                        session
                            .root_namespaces
                            .insert(path.clone(), root_namespace.clone());
                        if session.options.memoize_trees {
                            session.parsed.insert(path.clone(), parsed.clone());
                        }
                        visible.entry(spec.language).or_default().push(parsed);
                        files.push(path);
                    }
                    Ok(Err(e)) => tracing::warn!("Skipping {}: {}", path.display(), e),
                    Err(e) => tracing::warn!("Load task for {} failed: {}", path.display(), e),
                }
            }

            let snapshot = visible.get(&spec.language).cloned().unwrap_or_default();
            session
                .locator
                .push(CompilationContext::build(spec.language, snapshot));
            session.projects.push(LoadedProject {
                spec: spec.clone(),
                files,
            });
        }

        tracing::info!(
            "Session ready: {} projects, {} files",
            session.projects.len(),
            session.projects.iter().map(|p| p.files.len()).sum::<usize>()
        );
        Ok(session)
    }

    pub fn projects(&self) -> &[LoadedProject] {
        &self.projects
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn locator(&self) -> &SymbolLocator {
        &self.locator
    }

    /// Every loaded source file, in load order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.projects
            .iter()
            .flat_map(|p| p.files.iter().map(PathBuf::as_path))
    }

    /// The session's key for a user-supplied path.
    pub fn normalize(&self, path: &Path) -> PathBuf {
        self.reader.normalize(path)
    }

    /// Parse and extract `file` again, or reuse the cached result.
    pub fn parsed_file(&self, file: &Path) -> Result<Arc<ParsedFile>, ExtractError> {
        let path = self.normalize(file);
        if let Some(cached) = self.parsed.get(&path) {
            return Ok(cached.clone());
        }

        let language = SourceLanguage::from_path(&path)
            .ok_or_else(|| ExtractError::UnsupportedLanguage(path.clone()))?;
        let text = self.reader.read(&path)?;
        let result = extract(&path, &text, language)?;
        let root_namespace = self.root_namespaces.get(&path).cloned().unwrap_or_default();
        let parsed = Arc::new(
            ParsedFile::new(path.clone(), &text, result).with_root_namespace(root_namespace),
        );
        tracing::debug!("Derived {} definitions for {}", parsed.tree.node_count(), path.display());

        if self.options.memoize_trees {
            self.parsed.insert(path, parsed.clone());
        }
        Ok(parsed)
    }

    /// The definition tree of `file`.
    pub fn build_definition_tree(&self, file: &Path) -> Result<Arc<DefinitionTree>, ExtractError> {
        Ok(self.parsed_file(file)?.tree.clone())
    }

    /// Where the name at `offset` in `file` is declared.
    pub fn find_definition_at(&self, file: &Path, offset: usize) -> ResolutionResult {
        let file = self.normalize(file);
        self.locator.locate(self.reader.as_ref(), &file, offset)
    }
}

async fn load_file(
    reader: Arc<dyn SourceReader>,
    pool: ParserPool,
    path: PathBuf,
    language: SourceLanguage,
    root_namespace: Vec<String>,
) -> Result<ParsedFile, ExtractError> {
    let read_path = path.clone();
    let text = tokio::task::spawn_blocking(move || reader.read(&read_path))
        .await
        .map_err(|e| ExtractError::Parse {
            path: path.clone(),
            reason: e.to_string(),
        })??;

    let parsed = pool
        .parse(ParseRequest {
            language,
            content: text,
            path: path.clone(),
        })
        .await
        .map_err(|e| ExtractError::Parse {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    let result = extractor_for(language).extract(&path, &parsed.content, &parsed.tree)?;
    Ok(ParsedFile::new(path, &parsed.content, result).with_root_namespace(root_namespace))
}
