pub mod boolean;
pub mod builder;
pub mod config;
pub mod correct;
pub mod engine;
pub mod error;
pub mod index;
pub mod persist;
pub mod proximity;
pub mod stemmer;
pub mod tokenizer;
pub mod trie;
pub mod vector;

pub use config::EngineConfig;
pub use correct::Correction;
pub use engine::{QueryKind, RetrievalEngine, SearchResults};
pub use error::{Error, QueryError};
pub use index::{CorpusIndex, DocKey, IndexStats, Position};
pub use vector::ScoredDoc;
