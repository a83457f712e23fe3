use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ir_core::config::{DEFAULT_ALPHA, DEFAULT_STOP_WORDS_FILE};
use ir_core::{EngineConfig, RetrievalEngine};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a boolean, proximity and vector-space index over a text corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct IndexArgs {
    /// Directory of plain-text documents
    #[arg(long, env = "IR_CORPUS")]
    corpus: PathBuf,
    /// Index directory
    #[arg(long, env = "IR_INDEX", default_value = "./index")]
    index: PathBuf,
    /// Stop-word list inside the corpus directory, excluded from indexing
    #[arg(long, default_value = DEFAULT_STOP_WORDS_FILE)]
    stop_words: String,
}

impl IndexArgs {
    fn config(&self) -> EngineConfig {
        let mut config = EngineConfig::new(&self.corpus, &self.index);
        config.stop_words_file = self.stop_words.clone();
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from the corpus directory
    Build {
        #[command(flatten)]
        args: IndexArgs,
        /// Re-tokenize every document instead of reusing cached fragments
        #[arg(long, default_value_t = false)]
        no_cache: bool,
        /// Tokenize documents on a single thread
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Run a boolean, proximity or free-text query
    Search {
        #[command(flatten)]
        args: IndexArgs,
        /// Relevance threshold for ranked queries
        #[arg(long, env = "IR_ALPHA", default_value_t = DEFAULT_ALPHA)]
        alpha: f64,
        query: String,
    },
    /// Autocomplete the last word of a partial query
    Suggest {
        #[command(flatten)]
        args: IndexArgs,
        query: String,
    },
    /// Spell-correct a query against the vocabulary
    Correct {
        #[command(flatten)]
        args: IndexArgs,
        query: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { args, no_cache, sequential } => {
            let mut config = args.config();
            config.reuse_fragments = !no_cache;
            config.parallel = !sequential;
            let engine = RetrievalEngine::build(config)?;
            let stats = engine.stats();
            tracing::info!(output = %engine.config().index_dir.display(), "index build complete");
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Search { args, alpha, query } => {
            let mut config = args.config();
            config.alpha = alpha;
            let engine = RetrievalEngine::open(config)?;
            let results = engine.search(&query);
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Suggest { args, query } => {
            let engine = RetrievalEngine::open(args.config())?;
            println!("{}", serde_json::to_string_pretty(&engine.suggest(&query))?);
        }
        Commands::Correct { args, query } => {
            let engine = RetrievalEngine::open(args.config())?;
            println!("{}", serde_json::to_string_pretty(&engine.correct_query(&query))?);
        }
    }
    Ok(())
}
