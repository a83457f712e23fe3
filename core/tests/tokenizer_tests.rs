use ir_core::stemmer::stem;
use ir_core::tokenizer::{StopWords, Tokenizer};

#[test]
fn it_normalizes_and_stems() {
    let tk = Tokenizer::new(StopWords::english());
    let toks = tk.tokenize("Running Runners RUN! The café's menu.");
    let stems: Vec<String> = toks.iter().map(|t| stem(t)).collect();
    assert!(stems.contains(&"run".to_string()));
    // abbreviations keep their case and skip stemming
    assert!(toks.contains(&"RUN".to_string()));
    assert!(stems.contains(&"RUN".to_string()));
    assert!(toks.contains(&"cafe".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let tk = Tokenizer::new(StopWords::english());
    let toks = tk.tokenize("The quick brown fox and the lazy dog");
    assert!(!toks.contains(&"the".to_string()));
    assert!(!toks.contains(&"and".to_string()));
    assert_eq!(toks, vec!["quick", "brown", "fox", "lazy", "dog"]);
}

#[test]
fn it_loads_stopwords_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Stopword-List.txt");
    std::fs::write(&path, "a\nis\n  the  \n\n").unwrap();
    let words = StopWords::load(&path).unwrap();
    assert_eq!(words.len(), 3);
    assert!(words.contains("the"));

    let missing = StopWords::load(&dir.path().join("nope.txt"));
    assert!(matches!(missing, Err(ir_core::Error::MissingStopWords { .. })));
}

#[test]
fn stems_are_fixed_points() {
    for word in ["running", "cats", "generalizations", "happiness", "run", "hopeful"] {
        let once = stem(word);
        assert_eq!(stem(&once), once, "{word}");
    }
}
