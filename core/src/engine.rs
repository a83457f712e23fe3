//! One handle over the persisted index and every query service built on it.

use crate::boolean::BooleanQueryEngine;
use crate::builder::{discover_corpus, IndexBuilder};
use crate::config::EngineConfig;
use crate::correct::{Correction, SpellCorrector};
use crate::index::{CorpusIndex, IndexStats};
use crate::persist::{load_index, IndexPaths};
use crate::proximity::{is_proximity_query, ProximityQueryEngine};
use crate::tokenizer::Tokenizer;
use crate::trie::AutocompleteTrie;
use crate::vector::{ScoredDoc, VectorModel, VectorSpaceRanker};
use anyhow::Result;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Boolean,
    Proximity,
    Ranked,
}

/// Route a stop-word-cleaned query: any literal `AND`/`OR`/`NOT` word makes it
/// boolean, a trailing `/k` makes it proximity, anything else is ranked.
pub fn classify(query: &str) -> QueryKind {
    let has_operator = query
        .split_whitespace()
        .any(|w| matches!(w, "AND" | "OR" | "NOT"));
    if has_operator {
        QueryKind::Boolean
    } else if is_proximity_query(query) {
        QueryKind::Proximity
    } else {
        QueryKind::Ranked
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "results", rename_all = "snake_case")]
pub enum SearchResults {
    Boolean(Vec<String>),
    Proximity(Vec<String>),
    Ranked(Vec<ScoredDoc>),
}

impl SearchResults {
    pub fn kind(&self) -> QueryKind {
        match self {
            SearchResults::Boolean(_) => QueryKind::Boolean,
            SearchResults::Proximity(_) => QueryKind::Proximity,
            SearchResults::Ranked(_) => QueryKind::Ranked,
        }
    }

    /// Matching document ids in result order.
    pub fn doc_ids(&self) -> Vec<String> {
        match self {
            SearchResults::Boolean(ids) | SearchResults::Proximity(ids) => ids.clone(),
            SearchResults::Ranked(docs) => docs.iter().map(|d| d.doc_id.clone()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SearchResults::Boolean(ids) | SearchResults::Proximity(ids) => ids.len(),
            SearchResults::Ranked(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Read-through cache of autocomplete results keyed by lower-cased prefix.
///
/// Values are a pure function of the immutable index, so a racing insert simply
/// overwrites an identical entry.
#[derive(Debug, Default)]
pub struct SuggestionCache {
    entries: RwLock<HashMap<String, Vec<String>>>,
}

impl SuggestionCache {
    pub fn new() -> Self { Self::default() }

    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> Vec<String>
    where
        F: FnOnce() -> Vec<String>,
    {
        if let Some(hit) = self.entries.read().get(key) {
            return hit.clone();
        }
        let value = compute();
        self.entries.write().insert(key.to_string(), value.clone());
        value
    }

    pub fn len(&self) -> usize { self.entries.read().len() }
    pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }
}

pub struct RetrievalEngine {
    config: EngineConfig,
    tokenizer: Arc<Tokenizer>,
    index: Arc<CorpusIndex>,
    boolean: BooleanQueryEngine,
    proximity: ProximityQueryEngine,
    ranker: VectorSpaceRanker,
    trie: AutocompleteTrie,
    corrector: SpellCorrector,
    suggestions: SuggestionCache,
}

impl RetrievalEngine {
    /// Load the persisted index, rebuilding from the corpus when any index file
    /// is missing or unreadable. A missing stop-word list is fatal.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let tokenizer = Tokenizer::from_config(&config)?;
        let paths = IndexPaths::new(&config.index_dir);
        let missing = paths.missing_files();
        let index = if !missing.is_empty() {
            tracing::warn!(index_dir = %config.index_dir.display(), missing = missing.len(), "index files missing, rebuilding");
            build_index(&config, &tokenizer, &paths)?
        } else {
            match load_index(&paths) {
                Ok(index) => {
                    tracing::info!(num_docs = index.documents.len(), num_terms = index.inverted.len(), "loaded index");
                    index
                }
                Err(error) => {
                    tracing::warn!(%error, "persisted index unreadable, rebuilding");
                    build_index(&config, &tokenizer, &paths)?
                }
            }
        };
        let model = VectorModel::load_or_build(&index, &paths);
        Ok(Self::assemble(config, Arc::new(tokenizer), Arc::new(index), model))
    }

    /// Rebuild the index from the corpus unconditionally and persist it.
    pub fn build(config: EngineConfig) -> Result<Self> {
        let tokenizer = Tokenizer::from_config(&config)?;
        let paths = IndexPaths::new(&config.index_dir);
        let index = build_index(&config, &tokenizer, &paths)?;
        let model = VectorModel::load_or_build(&index, &paths);
        Ok(Self::assemble(config, Arc::new(tokenizer), Arc::new(index), model))
    }

    /// Wrap an index already in memory. Nothing is read from or written to disk.
    pub fn from_index(config: EngineConfig, tokenizer: Tokenizer, index: CorpusIndex) -> Self {
        let model = VectorModel::build(&index);
        Self::assemble(config, Arc::new(tokenizer), Arc::new(index), model)
    }

    fn assemble(config: EngineConfig, tokenizer: Arc<Tokenizer>, index: Arc<CorpusIndex>, model: VectorModel) -> Self {
        Self {
            boolean: BooleanQueryEngine::new(Arc::clone(&index), Arc::clone(&tokenizer)),
            proximity: ProximityQueryEngine::new(Arc::clone(&index), Arc::clone(&tokenizer)),
            ranker: VectorSpaceRanker::new(model, Arc::clone(&tokenizer)),
            trie: AutocompleteTrie::with_limit(&index.vocabulary, config.suggestion_limit),
            corrector: SpellCorrector::new(&index.vocabulary),
            suggestions: SuggestionCache::new(),
            config,
            tokenizer,
            index,
        }
    }

    /// Strip stop words, classify, and dispatch to the matching engine.
    pub fn search(&self, query: &str) -> SearchResults {
        let cleaned = self.tokenizer.remove_stop_words(query);
        let results = match classify(&cleaned) {
            QueryKind::Boolean => SearchResults::Boolean(self.boolean.search(&cleaned)),
            QueryKind::Proximity => SearchResults::Proximity(self.proximity.search(&cleaned)),
            QueryKind::Ranked => SearchResults::Ranked(self.ranker.search(&cleaned, self.config.alpha)),
        };
        tracing::info!(query, kind = ?results.kind(), hits = results.len(), "search");
        results
    }

    /// Completions for the last word of a partially typed query.
    pub fn suggest(&self, query: &str) -> Vec<String> {
        let Some(last) = query.split_whitespace().last() else {
            return Vec::new();
        };
        let key = last.to_lowercase();
        self.suggestions.get_or_compute(&key, || self.trie.suggest(&key))
    }

    pub fn correct_query(&self, query: &str) -> Correction {
        self.corrector.correct_query(query)
    }

    pub fn stats(&self) -> IndexStats { self.index.stats() }
    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn index(&self) -> &Arc<CorpusIndex> { &self.index }
    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }
    pub fn boolean(&self) -> &BooleanQueryEngine { &self.boolean }
    pub fn proximity(&self) -> &ProximityQueryEngine { &self.proximity }
    pub fn ranker(&self) -> &VectorSpaceRanker { &self.ranker }
    pub fn trie(&self) -> &AutocompleteTrie { &self.trie }
    pub fn suggestion_cache(&self) -> &SuggestionCache { &self.suggestions }
}

fn build_index(config: &EngineConfig, tokenizer: &Tokenizer, paths: &IndexPaths) -> Result<CorpusIndex> {
    let documents = discover_corpus(&config.corpus_dir, &config.stop_words_file)?;
    tracing::info!(corpus = %config.corpus_dir.display(), documents = documents.len(), "building index");
    IndexBuilder::new(tokenizer)
        .parallel(config.parallel)
        .reuse_fragments(config.reuse_fragments)
        .build_corpus(&documents, paths)
}
