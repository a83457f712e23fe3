//! TF-IDF vector-space ranking.
//!
//! Rows are documents in discovery order, columns are stems in lexicographic order.
//! `idf = log10(N / df)`; document rows are L2-normalized, and an all-zero row is
//! kept as zeros with a zero norm so it is skipped when scoring instead of producing NaN.

use crate::index::{compare_doc_ids, external_id, CorpusIndex, DocKey};
use crate::persist::{load_vector_model, save_vector_model, IndexPaths};
use crate::stemmer::stem;
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub doc_id: String,
    pub score: f64,
}

/// Dense term-document, TF-IDF and normalized TF-IDF matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorModel {
    pub fingerprint: String,
    pub doc_ids: Vec<DocKey>,
    pub terms: Vec<String>,
    pub idf: Vec<f64>,
    pub term_document: Vec<Vec<u32>>,
    pub tfidf: Vec<Vec<f64>>,
    pub normalized: Vec<Vec<f64>>,
    pub norms: Vec<f64>,
}

/// SHA-1 over document keys and every (term, doc, tf) posting.
pub fn corpus_fingerprint(index: &CorpusIndex) -> String {
    let mut hasher = Sha1::new();
    for doc in &index.documents {
        hasher.update(doc.doc_id.as_bytes());
        hasher.update([0u8]);
    }
    for (term, postings) in index.inverted.iter() {
        hasher.update(term.as_bytes());
        hasher.update([1u8]);
        for (doc, tf) in postings {
            hasher.update(doc.as_bytes());
            hasher.update(tf.to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

impl VectorModel {
    pub fn build(index: &CorpusIndex) -> Self {
        let doc_ids: Vec<DocKey> = index.documents.iter().map(|d| d.doc_id.clone()).collect();
        let terms: Vec<String> = index.inverted.terms().map(str::to_string).collect();
        let row_of: HashMap<&str, usize> = doc_ids.iter().enumerate().map(|(i, d)| (d.as_str(), i)).collect();

        let mut term_document = vec![vec![0u32; terms.len()]; doc_ids.len()];
        let mut df = vec![0usize; terms.len()];
        for (col, (_, postings)) in index.inverted.iter().enumerate() {
            for (doc, &tf) in postings {
                if let Some(&row) = row_of.get(doc.as_str()) {
                    term_document[row][col] = tf;
                    if tf > 0 {
                        df[col] += 1;
                    }
                }
            }
        }

        let n = doc_ids.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| if d == 0 { 0.0 } else { (n / d as f64).log10() })
            .collect();

        let tfidf: Vec<Vec<f64>> = term_document
            .iter()
            .map(|row| row.iter().zip(&idf).map(|(&tf, &w)| f64::from(tf) * w).collect())
            .collect();
        let norms: Vec<f64> = tfidf.iter().map(|row| l2_norm(row)).collect();
        let normalized: Vec<Vec<f64>> = tfidf
            .iter()
            .zip(&norms)
            .map(|(row, &norm)| {
                if norm > 0.0 { row.iter().map(|w| w / norm).collect() } else { vec![0.0; row.len()] }
            })
            .collect();

        Self { fingerprint: corpus_fingerprint(index), doc_ids, terms, idf, term_document, tfidf, normalized, norms }
    }

    /// Reuse the persisted matrices when their fingerprint matches `index`,
    /// otherwise rebuild and refresh the cache.
    pub fn load_or_build(index: &CorpusIndex, paths: &IndexPaths) -> Self {
        let fingerprint = corpus_fingerprint(index);
        match load_vector_model(paths) {
            Ok(model) if model.fingerprint == fingerprint => {
                tracing::debug!(%fingerprint, "loaded cached vector model");
                return model;
            }
            Ok(_) => tracing::warn!("vector model cache is stale, rebuilding"),
            Err(error) => tracing::warn!(%error, "vector model cache unavailable, rebuilding"),
        }
        let model = Self::build(index);
        if let Err(error) = save_vector_model(paths, &model) {
            tracing::warn!(%error, "could not persist vector model");
        }
        model
    }
}

fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|w| w * w).sum::<f64>().sqrt()
}

pub struct VectorSpaceRanker {
    model: VectorModel,
    column: HashMap<String, usize>,
    tokenizer: Arc<Tokenizer>,
}

impl VectorSpaceRanker {
    pub fn new(model: VectorModel, tokenizer: Arc<Tokenizer>) -> Self {
        let column = model.terms.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();
        Self { model, column, tokenizer }
    }

    pub fn model(&self) -> &VectorModel { &self.model }

    /// Unit-length query vector as sparse `(column, weight)` pairs.
    ///
    /// `None` when any query term is outside the vocabulary or nothing survives
    /// tokenization; the query is then unanswerable rather than zero-scored.
    pub fn query_vector(&self, query: &str) -> Option<Vec<(usize, f64)>> {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in self.tokenizer.tokenize(query) {
            let term = stem(&token);
            let Some(&col) = self.column.get(&term) else {
                tracing::warn!(query, term = %term, "term not in the inverted index");
                return None;
            };
            *counts.entry(col).or_insert(0.0) += 1.0;
        }
        let norm = counts.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return None;
        }
        let mut vector: Vec<(usize, f64)> = counts.into_iter().map(|(col, w)| (col, w / norm)).collect();
        vector.sort_unstable_by_key(|&(col, _)| col);
        Some(vector)
    }

    /// Cosine score for every document with a non-zero row, best first.
    pub fn rank(&self, query: &str) -> Vec<ScoredDoc> {
        let Some(q) = self.query_vector(query) else {
            return Vec::new();
        };
        let mut scored: Vec<ScoredDoc> = self
            .model
            .normalized
            .iter()
            .zip(&self.model.norms)
            .zip(&self.model.doc_ids)
            .filter(|((_, &norm), _)| norm > 0.0)
            .map(|((row, _), doc)| ScoredDoc {
                doc_id: external_id(doc).to_string(),
                score: q.iter().map(|&(col, w)| w * row[col]).sum(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| compare_doc_ids(&a.doc_id, &b.doc_id)));
        scored
    }

    /// Documents scoring strictly above `alpha`.
    pub fn search(&self, query: &str, alpha: f64) -> Vec<ScoredDoc> {
        let mut results = self.rank(query);
        results.retain(|d| d.score > alpha);
        tracing::debug!(query, alpha, hits = results.len(), "ranked query");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use crate::tokenizer::StopWords;

    fn ranker() -> VectorSpaceRanker {
        let tk = Arc::new(Tokenizer::new(StopWords::from_words(["the"])));
        let docs = [
            ("1_1", "cats running fast"),
            ("2_2", "cat sleeping"),
            ("3_3", "dogs barking"),
            ("4_4", "12 34"),
        ];
        let index = IndexBuilder::new(&tk).build(&docs);
        VectorSpaceRanker::new(VectorModel::build(&index), tk)
    }

    #[test]
    fn idf_is_log10_of_inverse_document_frequency() {
        let r = ranker();
        let m = r.model();
        let cat = m.terms.iter().position(|t| t == "cat").unwrap();
        assert!((m.idf[cat] - (4.0f64 / 2.0).log10()).abs() < 1e-12);
        let fast = m.terms.iter().position(|t| t == "fast").unwrap();
        assert!((m.idf[fast] - 4.0f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn rows_are_unit_length_or_zero() {
        let r = ranker();
        let m = r.model();
        for (row, &norm) in m.normalized.iter().zip(&m.norms) {
            let len = l2_norm(row);
            if norm > 0.0 {
                assert!((len - 1.0).abs() < 1e-9);
            } else {
                assert_eq!(len, 0.0);
            }
        }
        // the all-numeric document has no terms at all
        assert_eq!(m.norms[3], 0.0);
    }

    #[test]
    fn exact_document_text_ranks_its_document_first() {
        let r = ranker();
        let ranked = r.rank("cats running fast");
        assert_eq!(ranked[0].doc_id, "1");
        assert!(ranked[0].score > ranked[1].score);
        assert!(ranked.iter().all(|d| d.score.is_finite()));
        assert!(ranked.iter().all(|d| d.doc_id != "4"));
    }

    #[test]
    fn unknown_term_invalidates_the_query() {
        let r = ranker();
        assert!(r.query_vector("cat unicorn").is_none());
        assert!(r.rank("cat unicorn").is_empty());
        assert!(r.rank("the").is_empty());
    }

    #[test]
    fn alpha_is_a_strict_threshold() {
        let r = ranker();
        let all = r.rank("cat");
        assert_eq!(all.len(), 3);
        let cut = all[1].score;
        let above = r.search("cat", cut);
        assert!(above.iter().all(|d| d.score > cut));
        assert_eq!(above.len(), 1);
    }

    #[test]
    fn fingerprint_tracks_postings() {
        let tk = Tokenizer::new(StopWords::default());
        let a = IndexBuilder::new(&tk).build(&[("1_1", "alpha beta")]);
        let b = IndexBuilder::new(&tk).build(&[("1_1", "alpha beta beta")]);
        assert_eq!(corpus_fingerprint(&a), corpus_fingerprint(&a.clone()));
        assert_ne!(corpus_fingerprint(&a), corpus_fingerprint(&b));
    }
}
