use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_STOP_WORDS_FILE: &str = "Stopword-List.txt";
pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

/// Settings shared by the index builder and the query engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory of plain-text documents.
    pub corpus_dir: PathBuf,
    /// Where the persisted index lives.
    pub index_dir: PathBuf,
    /// Stop-word list, resolved against `corpus_dir` and excluded from indexing.
    pub stop_words_file: String,
    /// Relevance threshold for ranked queries; scores must be strictly above it.
    pub alpha: f64,
    pub suggestion_limit: usize,
    pub min_token_len: usize,
    pub max_token_len: usize,
    /// Tokenize documents on the rayon pool.
    pub parallel: bool,
    /// Reuse per-document fragments from a previous build when the source is unchanged.
    pub reuse_fragments: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("./data"),
            index_dir: PathBuf::from("./index"),
            stop_words_file: DEFAULT_STOP_WORDS_FILE.to_string(),
            alpha: DEFAULT_ALPHA,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            min_token_len: 2,
            max_token_len: 24,
            parallel: true,
            reuse_fragments: true,
        }
    }
}

impl EngineConfig {
    pub fn new(corpus_dir: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self { corpus_dir: corpus_dir.into(), index_dir: index_dir.into(), ..Self::default() }
    }

    pub fn stop_words_path(&self) -> PathBuf {
        self.corpus_dir.join(&self.stop_words_file)
    }
}
