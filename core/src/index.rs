use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

/// Composite document key, `"{discovery_order}_{file_digits}"`.
pub type DocKey = String;
pub type Position = u32;

/// The caller-facing id: the part of a [`DocKey`] after the first `_`.
pub fn external_id(key: &str) -> &str {
    key.split_once('_').map(|(_, id)| id).unwrap_or(key)
}

/// Numeric order when both ids are integers, lexicographic otherwise.
pub fn compare_doc_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

/// Map keys to external ids, sorted and deduplicated.
pub fn external_ids<'a, I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a DocKey>,
{
    let mut ids: Vec<String> = keys.into_iter().map(|k| external_id(k).to_string()).collect();
    ids.sort_by(|a, b| compare_doc_ids(a, b));
    ids.dedup();
    ids
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub doc_id: DocKey,
    pub path: PathBuf,
    /// Surviving tokens after normalization.
    pub tokens: usize,
}

/// stem -> doc -> term frequency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    terms: BTreeMap<String, BTreeMap<DocKey, u32>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, stem: &str, doc: &str) {
        self.add_count(stem, doc, 1);
    }

    pub fn add_count(&mut self, stem: &str, doc: &str, count: u32) {
        let docs = self.terms.entry(stem.to_string()).or_default();
        *docs.entry(doc.to_string()).or_insert(0) += count;
    }

    pub fn postings(&self, stem: &str) -> Option<&BTreeMap<DocKey, u32>> {
        self.terms.get(stem)
    }

    /// Doc keys for a stem in lexicographic order; empty for unknown stems.
    pub fn doc_keys(&self, stem: &str) -> BTreeSet<DocKey> {
        self.terms.get(stem).map(|docs| docs.keys().cloned().collect()).unwrap_or_default()
    }

    pub fn doc_frequency(&self, stem: &str) -> usize {
        self.terms.get(stem).map_or(0, BTreeMap::len)
    }

    pub fn contains(&self, stem: &str) -> bool { self.terms.contains_key(stem) }

    /// Stems in lexicographic order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<DocKey, u32>)> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize { self.terms.len() }
    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn posting_count(&self) -> usize {
        self.terms.values().map(BTreeMap::len).sum()
    }
}

/// stem -> doc -> ascending token positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionalIndex {
    terms: BTreeMap<String, BTreeMap<DocKey, Vec<Position>>>,
}

impl PositionalIndex {
    pub fn new() -> Self { Self::default() }

    /// Positions must arrive in ascending order per document.
    pub fn add(&mut self, stem: &str, doc: &str, position: Position) {
        self.terms
            .entry(stem.to_string())
            .or_default()
            .entry(doc.to_string())
            .or_default()
            .push(position);
    }

    pub fn extend(&mut self, stem: &str, doc: &str, positions: &[Position]) {
        self.terms
            .entry(stem.to_string())
            .or_default()
            .entry(doc.to_string())
            .or_default()
            .extend_from_slice(positions);
    }

    pub fn positions(&self, stem: &str) -> Option<&BTreeMap<DocKey, Vec<Position>>> {
        self.terms.get(stem)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<DocKey, Vec<Position>>)> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize { self.terms.len() }
    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

/// Lower-cased surface form -> corpus occurrence count.
///
/// Iterates in first-seen order, which is also the order it is persisted in, so
/// ties that depend on iteration order resolve the same way after a reload.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    words: Vec<(String, u64)>,
    slots: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, word: &str, count: u64) {
        match self.slots.get(word) {
            Some(&slot) => self.words[slot].1 += count,
            None => {
                self.slots.insert(word.to_string(), self.words.len());
                self.words.push((word.to_string(), count));
            }
        }
    }

    pub fn merge(&mut self, other: &Vocabulary) {
        for (word, count) in other.iter() {
            self.add(word, count);
        }
    }

    pub fn get(&self, word: &str) -> Option<u64> {
        self.slots.get(word).map(|&slot| self.words[slot].1)
    }

    pub fn contains(&self, word: &str) -> bool { self.slots.contains_key(word) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.words.iter().map(|(w, c)| (w.as_str(), *c))
    }

    pub fn len(&self) -> usize { self.words.len() }
    pub fn is_empty(&self) -> bool { self.words.is_empty() }
}

impl PartialEq for Vocabulary {
    fn eq(&self, other: &Self) -> bool { self.words == other.words }
}

impl Eq for Vocabulary {}

impl<S: AsRef<str>> FromIterator<(S, u64)> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut vocab = Vocabulary::new();
        for (word, count) in iter {
            vocab.add(word.as_ref(), count);
        }
        vocab
    }
}

impl Serialize for Vocabulary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.words.len()))?;
        for (word, count) in &self.words {
            map.serialize_entry(word, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Vocabulary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Vocabulary;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of word to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Vocabulary, A::Error> {
                let mut vocab = Vocabulary::new();
                while let Some((word, count)) = access.next_entry::<String, u64>()? {
                    vocab.add(&word, count);
                }
                Ok(vocab)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub terms: usize,
    pub vocabulary: usize,
    pub postings: usize,
}

/// Everything the query engines read. Built once, then shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusIndex {
    pub documents: Vec<DocumentEntry>,
    pub inverted: InvertedIndex,
    pub positional: PositionalIndex,
    pub vocabulary: Vocabulary,
}

impl CorpusIndex {
    /// Every document key, including documents without surviving tokens.
    pub fn doc_keys(&self) -> BTreeSet<DocKey> {
        self.documents.iter().map(|d| d.doc_id.clone()).collect()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.documents.len(),
            terms: self.inverted.len(),
            vocabulary: self.vocabulary.len(),
            postings: self.inverted.posting_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_ids_strip_order_prefix() {
        assert_eq!(external_id("3_17"), "17");
        assert_eq!(external_id("plain"), "plain");
        let keys = vec!["2_10".to_string(), "1_9".to_string(), "3_9".to_string()];
        assert_eq!(external_ids(&keys), vec!["9", "10"]);
    }

    #[test]
    fn vocabulary_keeps_first_seen_order_through_json() {
        let vocab: Vocabulary = [("zebra", 1), ("apple", 2), ("zebra", 3)].into_iter().collect();
        assert_eq!(vocab.get("zebra"), Some(4));
        let json = serde_json::to_string(&vocab).unwrap();
        assert_eq!(json, r#"{"zebra":4,"apple":2}"#);
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vocab);
    }

    #[test]
    fn inverted_index_serializes_sorted() {
        let mut ix = InvertedIndex::new();
        ix.add("run", "2_2");
        ix.add("cat", "1_1");
        ix.add("cat", "1_1");
        let json = serde_json::to_string(&ix).unwrap();
        assert_eq!(json, r#"{"cat":{"1_1":2},"run":{"2_2":1}}"#);
        assert_eq!(ix.doc_frequency("cat"), 1);
        assert_eq!(ix.doc_frequency("dog"), 0);
    }
}
