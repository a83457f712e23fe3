//! Corpus discovery and index construction.
//!
//! Each document is tokenized into its own [`DocumentFragment`] (in parallel when
//! enabled); fragments are then merged into the shared indices on one thread, in
//! discovery order, so the result does not depend on scheduling.

use crate::index::{CorpusIndex, DocKey, DocumentEntry, Position, Vocabulary};
use crate::persist::{
    append_metadata, load_fragment, load_metadata, now_rfc3339, save_fragment, save_index, IndexPaths,
    MetadataEntry,
};
use crate::stemmer::stem;
use crate::tokenizer::Tokenizer;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A corpus file and the key it is indexed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub doc_id: DocKey,
    pub path: PathBuf,
}

/// List `.txt` files under `dir` in file-name order, skipping `exclude`.
///
/// Keys are `"{order}_{digits}"`: a 1-based discovery counter and the first digit run
/// in the file name (the whole file stem when it has no digits).
pub fn discover_corpus(dir: &Path, exclude: &str) -> Result<Vec<SourceDocument>> {
    if !dir.is_dir() {
        anyhow::bail!("corpus directory {} does not exist", dir.display());
    }
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if !p.is_file() { continue; }
        if p.file_name().and_then(|s| s.to_str()) == Some(exclude) { continue; }
        if p.extension().and_then(|s| s.to_str()) == Some("txt") {
            files.push(p.to_path_buf());
        }
    }
    Ok(files
        .into_iter()
        .enumerate()
        .map(|(i, path)| SourceDocument { doc_id: format!("{}_{}", i + 1, file_digits(&path)), path })
        .collect())
}

fn file_digits(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let digits: String = stem
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() { stem.to_string() } else { digits }
}

pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha1::digest(bytes))
}

/// Partial indices for a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFragment {
    pub doc_id: DocKey,
    pub content_hash: String,
    /// Raw `\w+` words before filtering.
    pub words: usize,
    pub inverted: BTreeMap<String, u32>,
    pub positions: BTreeMap<String, Vec<Position>>,
    pub vocabulary: Vocabulary,
}

impl DocumentFragment {
    pub fn build(tokenizer: &Tokenizer, doc_id: &str, content_hash: &str, text: &str) -> Self {
        let mut inverted: BTreeMap<String, u32> = BTreeMap::new();
        let mut positions: BTreeMap<String, Vec<Position>> = BTreeMap::new();
        let mut vocabulary = Vocabulary::new();
        for (pos, token) in tokenizer.tokenize_with_positions(text) {
            vocabulary.add(&token.to_lowercase(), 1);
            let s = stem(&token);
            *inverted.entry(s.clone()).or_insert(0) += 1;
            positions.entry(s).or_default().push(pos);
        }
        Self {
            doc_id: doc_id.to_string(),
            content_hash: content_hash.to_string(),
            words: tokenizer.word_count(text),
            inverted,
            positions,
            vocabulary,
        }
    }

    pub fn stemmed_tokens(&self) -> usize {
        self.inverted.values().map(|&c| c as usize).sum()
    }

    pub fn unique_tokens(&self) -> usize {
        self.vocabulary.len()
    }
}

impl CorpusIndex {
    /// Commit one document's fragment into the shared indices.
    pub fn merge_fragment(&mut self, path: &Path, fragment: &DocumentFragment) {
        let doc = fragment.doc_id.as_str();
        for (term, &count) in &fragment.inverted {
            self.inverted.add_count(term, doc, count);
        }
        for (term, positions) in &fragment.positions {
            self.positional.extend(term, doc, positions);
        }
        self.vocabulary.merge(&fragment.vocabulary);
        self.documents.push(DocumentEntry {
            doc_id: fragment.doc_id.clone(),
            path: path.to_path_buf(),
            tokens: fragment.stemmed_tokens(),
        });
    }
}

struct Prepared {
    fragment: DocumentFragment,
    reused: bool,
}

pub struct IndexBuilder<'a> {
    tokenizer: &'a Tokenizer,
    parallel: bool,
    reuse_fragments: bool,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(tokenizer: &'a Tokenizer) -> Self {
        Self { tokenizer, parallel: true, reuse_fragments: true }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn reuse_fragments(mut self, reuse: bool) -> Self {
        self.reuse_fragments = reuse;
        self
    }

    /// Build from in-memory `(doc_id, text)` pairs without touching the disk.
    pub fn build<K, T>(&self, docs: &[(K, T)]) -> CorpusIndex
    where
        K: AsRef<str> + Sync,
        T: AsRef<str> + Sync,
    {
        let make = |(id, text): &(K, T)| {
            let text: &str = text.as_ref();
            DocumentFragment::build(self.tokenizer, id.as_ref(), &content_hash(text.as_bytes()), text)
        };
        let fragments: Vec<DocumentFragment> = if self.parallel {
            docs.par_iter().map(make).collect()
        } else {
            docs.iter().map(make).collect()
        };
        let mut index = CorpusIndex::default();
        for fragment in &fragments {
            index.merge_fragment(Path::new(""), fragment);
        }
        index
    }

    /// Build from corpus files, reusing cached fragments, and persist the result.
    pub fn build_corpus(&self, documents: &[SourceDocument], paths: &IndexPaths) -> Result<CorpusIndex> {
        let logged = if self.reuse_fragments { load_metadata(paths)? } else { HashMap::new() };
        let prepared: Vec<Prepared> = if self.parallel {
            documents.par_iter().map(|doc| self.prepare(doc, &logged)).collect::<Result<_>>()?
        } else {
            documents.iter().map(|doc| self.prepare(doc, &logged)).collect::<Result<_>>()?
        };

        let mut index = CorpusIndex::default();
        let mut log = Vec::new();
        let mut reused = 0usize;
        for (doc, p) in documents.iter().zip(prepared) {
            if p.reused {
                reused += 1;
            } else {
                let fragment_file = save_fragment(paths, &p.fragment)?;
                log.push(MetadataEntry {
                    doc_id: doc.doc_id.clone(),
                    path: doc.path.clone(),
                    content_hash: p.fragment.content_hash.clone(),
                    tokens: p.fragment.words,
                    unique_tokens: p.fragment.unique_tokens(),
                    stemmed_tokens: p.fragment.stemmed_tokens(),
                    fragment_file,
                    created_at: now_rfc3339(),
                });
            }
            index.merge_fragment(&doc.path, &p.fragment);
        }
        append_metadata(paths, &log)?;
        save_index(paths, &index)?;

        let stats = index.stats();
        tracing::info!(
            num_docs = stats.documents,
            num_terms = stats.terms,
            vocabulary = stats.vocabulary,
            reused,
            "index build complete"
        );
        Ok(index)
    }

    fn prepare(&self, doc: &SourceDocument, logged: &HashMap<DocKey, MetadataEntry>) -> Result<Prepared> {
        let bytes = fs::read(&doc.path).with_context(|| format!("reading {}", doc.path.display()))?;
        let hash = content_hash(&bytes);
        if let Some(fragment) = logged.get(&doc.doc_id).and_then(|entry| reusable(entry, &hash)) {
            tracing::debug!(doc_id = %doc.doc_id, "reusing cached fragment");
            return Ok(Prepared { fragment, reused: true });
        }
        let text = String::from_utf8_lossy(&bytes);
        let fragment = DocumentFragment::build(self.tokenizer, &doc.doc_id, &hash, &text);
        Ok(Prepared { fragment, reused: false })
    }
}

/// A logged fragment is reusable when the source hash matches and the stored
/// fragment still agrees with the logged token counts.
fn reusable(entry: &MetadataEntry, hash: &str) -> Option<DocumentFragment> {
    if entry.content_hash != hash {
        return None;
    }
    match load_fragment(&entry.fragment_file) {
        Ok(f)
            if f.doc_id == entry.doc_id
                && f.content_hash == hash
                && f.words == entry.tokens
                && f.stemmed_tokens() == entry.stemmed_tokens =>
        {
            Some(f)
        }
        Ok(_) => {
            tracing::warn!(doc_id = %entry.doc_id, "cached fragment disagrees with metadata log, rebuilding");
            None
        }
        Err(e) => {
            tracing::warn!(doc_id = %entry.doc_id, error = %e, "cached fragment unreadable, rebuilding");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::StopWords;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(StopWords::from_words(["the", "a"]))
    }

    #[test]
    fn fragment_counts_positions_and_surface_forms() {
        let tk = tokenizer();
        let f = DocumentFragment::build(&tk, "1_1", "h", "Cats chase the cats. Running!");
        assert_eq!(f.words, 5);
        assert_eq!(f.inverted["cat"], 2);
        // "the" is dropped but still occupies position 2
        assert_eq!(f.positions["cat"], vec![0, 3]);
        assert_eq!(f.positions["run"], vec![4]);
        assert_eq!(f.vocabulary.get("cats"), Some(2));
        assert_eq!(f.stemmed_tokens(), 4);
    }

    #[test]
    fn parallel_and_sequential_builds_agree() {
        let tk = tokenizer();
        let docs = vec![
            ("1_1", "cats running in the park"),
            ("2_2", "a cat runs"),
            ("3_3", "dogs barking at cats"),
        ];
        let par = IndexBuilder::new(&tk).parallel(true).build(&docs);
        let seq = IndexBuilder::new(&tk).parallel(false).build(&docs);
        assert_eq!(par, seq);
        assert_eq!(par.inverted.doc_frequency("cat"), 3);
        assert_eq!(par.documents.len(), 3);
    }

    #[test]
    fn discovery_assigns_order_and_digits() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("12.txt"), "x").unwrap();
        fs::write(dir.path().join("3.txt"), "y").unwrap();
        fs::write(dir.path().join("Stopword-List.txt"), "the").unwrap();
        fs::write(dir.path().join("notes.md"), "z").unwrap();
        let docs = discover_corpus(dir.path(), "Stopword-List.txt").unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["1_12", "2_3"]);
    }
}
