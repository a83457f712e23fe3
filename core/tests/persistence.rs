use ir_core::builder::{discover_corpus, IndexBuilder};
use ir_core::persist::{load_index, load_metadata, load_vector_model, IndexPaths};
use ir_core::tokenizer::Tokenizer;
use ir_core::{EngineConfig, RetrievalEngine, SearchResults};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn write_corpus(dir: &Path) {
    fs::write(dir.join("Stopword-List.txt"), "the\na\nis\nof\n").unwrap();
    fs::write(dir.join("1.txt"), "The cat is running in the garden.").unwrap();
    fs::write(dir.join("2.txt"), "A cat runs and a dog barks.").unwrap();
    fs::write(dir.join("10.txt"), "Dogs of the garden bark at night.").unwrap();
}

fn setup() -> (TempDir, EngineConfig) {
    let tmp = tempdir().unwrap();
    let corpus = tmp.path().join("corpus");
    fs::create_dir_all(&corpus).unwrap();
    write_corpus(&corpus);
    let config = EngineConfig::new(corpus, tmp.path().join("index"));
    (tmp, config)
}

#[test]
fn build_persists_and_reloads_identically() {
    let (_tmp, config) = setup();
    let engine = RetrievalEngine::build(config.clone()).unwrap();
    let paths = IndexPaths::new(&config.index_dir);
    assert!(paths.missing_files().is_empty());

    let reloaded = load_index(&paths).unwrap();
    assert_eq!(&reloaded, engine.index().as_ref());
    assert_eq!(engine.stats().documents, 3);

    let model = load_vector_model(&paths).unwrap();
    assert_eq!(&model, engine.ranker().model());
}

#[test]
fn discovery_orders_by_file_name_and_skips_stop_words() {
    let (_tmp, config) = setup();
    let docs = discover_corpus(&config.corpus_dir, &config.stop_words_file).unwrap();
    let ids: Vec<&str> = docs.iter().map(|d| d.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["1_1", "2_10", "3_2"]);
}

#[test]
fn reused_fragments_match_a_full_rebuild() {
    let (_tmp, config) = setup();
    let paths = IndexPaths::new(&config.index_dir);
    let tokenizer = Tokenizer::from_config(&config).unwrap();
    let docs = discover_corpus(&config.corpus_dir, &config.stop_words_file).unwrap();

    let first = IndexBuilder::new(&tokenizer).build_corpus(&docs, &paths).unwrap();
    assert_eq!(load_metadata(&paths).unwrap().len(), 3);
    let log_lines = || fs::read_to_string(paths.root.join("metadata.jsonl")).unwrap().lines().count();
    assert_eq!(log_lines(), 3);

    let cached = IndexBuilder::new(&tokenizer).build_corpus(&docs, &paths).unwrap();
    assert_eq!(cached, first);
    // nothing was re-tokenized, so nothing new was logged
    assert_eq!(log_lines(), 3);

    fs::write(config.corpus_dir.join("2.txt"), "A cat sleeps.").unwrap();
    let updated = IndexBuilder::new(&tokenizer).build_corpus(&docs, &paths).unwrap();
    assert_eq!(log_lines(), 4);
    let fresh = IndexBuilder::new(&tokenizer).reuse_fragments(false).parallel(false).build_corpus(&docs, &paths).unwrap();
    assert_eq!(updated, fresh);
    assert!(updated.inverted.postings("sleep").is_some());
    assert!(updated.inverted.doc_keys("bark").contains("2_10"));
    assert!(!updated.inverted.doc_keys("bark").contains("3_2"));
}

#[test]
fn open_rebuilds_when_index_files_are_missing() {
    let (_tmp, config) = setup();
    let paths = IndexPaths::new(&config.index_dir);
    assert_eq!(paths.missing_files().len(), 5);

    let engine = RetrievalEngine::open(config.clone()).unwrap();
    assert!(paths.missing_files().is_empty());
    assert_eq!(engine.search("cat AND garden"), SearchResults::Boolean(vec!["1".into()]));

    fs::remove_file(paths.root.join("vocabulary.json")).unwrap();
    fs::write(paths.root.join("vector_model.bin"), b"not a model").unwrap();
    let reopened = RetrievalEngine::open(config).unwrap();
    assert_eq!(reopened.index().as_ref(), engine.index().as_ref());
    assert_eq!(reopened.ranker().model(), engine.ranker().model());
}

#[test]
fn open_recovers_from_a_corrupt_index_file() {
    let (_tmp, config) = setup();
    let engine = RetrievalEngine::build(config.clone()).unwrap();
    let paths = IndexPaths::new(&config.index_dir);
    fs::write(paths.root.join("inverted_index.json"), "{ truncated").unwrap();
    let reopened = RetrievalEngine::open(config).unwrap();
    assert_eq!(reopened.index().as_ref(), engine.index().as_ref());
}

#[test]
fn missing_stop_words_are_fatal() {
    let (_tmp, config) = setup();
    fs::remove_file(config.stop_words_path()).unwrap();
    let err = RetrievalEngine::open(config).err().unwrap();
    assert!(err.downcast_ref::<ir_core::Error>().is_some());
}
