use crate::boolean::operand_stems;
use crate::error::QueryError;
use crate::index::{external_ids, CorpusIndex, DocKey, Position};
use crate::tokenizer::Tokenizer;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

lazy_static! {
    static ref PROXIMITY_RE: Regex = Regex::new(r"^(?P<terms>.*?)\s*/(?P<k>\d+)\s*$").expect("valid regex");
}

/// `word1 word2 … wordN /k`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProximityQuery {
    /// Stems of each query word, in query order. A word with no surviving
    /// token has no stems and makes the query unmatchable.
    pub words: Vec<Vec<String>>,
    pub distance: u32,
}

impl ProximityQuery {
    pub fn parse(query: &str, tokenizer: &Tokenizer) -> Result<Self, QueryError> {
        let caps = PROXIMITY_RE
            .captures(query.trim())
            .ok_or_else(|| QueryError::Proximity(query.to_string()))?;
        let distance = caps["k"].parse::<u32>().map_err(|_| QueryError::Proximity(query.to_string()))?;
        let words: Vec<Vec<String>> = caps["terms"]
            .split_whitespace()
            .map(|word| operand_stems(tokenizer, word))
            .collect();
        if words.is_empty() {
            return Err(QueryError::Proximity(query.to_string()));
        }
        Ok(Self { words, distance })
    }
}

/// Whether the query ends in a `/k` distance marker.
pub fn is_proximity_query(query: &str) -> bool {
    PROXIMITY_RE.is_match(query.trim())
}

/// Positions from either side that have a partner on the other side within `k`.
fn near_positions(left: &[Position], right: &[Position], k: u32) -> Vec<Position> {
    fn has_partner(p: Position, others: &[Position], k: u32) -> bool {
        let lo = p.saturating_sub(k);
        let i = others.partition_point(|&o| o < lo);
        others.get(i).is_some_and(|&o| u64::from(o) <= u64::from(p) + u64::from(k))
    }
    let mut kept: Vec<Position> = left
        .iter()
        .copied()
        .filter(|&p| has_partner(p, right, k))
        .chain(right.iter().copied().filter(|&p| has_partner(p, left, k)))
        .collect();
    kept.sort_unstable();
    kept.dedup();
    kept
}

pub struct ProximityQueryEngine {
    index: Arc<CorpusIndex>,
    tokenizer: Arc<Tokenizer>,
}

impl ProximityQueryEngine {
    pub fn new(index: Arc<CorpusIndex>, tokenizer: Arc<Tokenizer>) -> Self {
        Self { index, tokenizer }
    }

    /// Fold the terms' position lists left to right, keeping only documents and
    /// positions that stay within `distance` at every step.
    pub fn evaluate(&self, query: &ProximityQuery) -> BTreeMap<DocKey, Vec<Position>> {
        if query.words.iter().any(Vec::is_empty) {
            return BTreeMap::new();
        }
        let mut running: Option<BTreeMap<DocKey, Vec<Position>>> = None;
        for term in query.words.iter().flatten() {
            let Some(current) = self.index.positional.positions(term) else {
                return BTreeMap::new();
            };
            let next = match running {
                None => current.clone(),
                Some(prev) => prev
                    .into_iter()
                    .filter_map(|(doc, left)| {
                        let right = current.get(&doc)?;
                        let kept = near_positions(&left, right, query.distance);
                        (!kept.is_empty()).then_some((doc, kept))
                    })
                    .collect(),
            };
            if next.is_empty() {
                return next;
            }
            running = Some(next);
        }
        running.unwrap_or_default()
    }

    /// External ids of matching documents; unparsable queries are logged and match nothing.
    pub fn search(&self, query: &str) -> Vec<String> {
        match ProximityQuery::parse(query, &self.tokenizer) {
            Ok(parsed) => {
                let ids = external_ids(self.evaluate(&parsed).keys());
                tracing::debug!(query, hits = ids.len(), "proximity query");
                ids
            }
            Err(error) => {
                tracing::warn!(query, %error, "malformed proximity query");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use crate::tokenizer::{StopWords, Tokenizer};

    fn engine_with(stop_words: StopWords, docs: &[(&str, &str)]) -> ProximityQueryEngine {
        let tk = Arc::new(Tokenizer::new(stop_words));
        let index = IndexBuilder::new(&tk).build(docs);
        ProximityQueryEngine::new(Arc::new(index), tk)
    }

    fn engine() -> ProximityQueryEngine {
        engine_with(
            StopWords::from_words(["the"]),
            &[
                ("1_1", "cats running"),
                ("2_2", "cat run"),
                ("3_3", "cat sat on mat then run"),
                ("4_4", "run far from every cat"),
            ],
        )
    }

    #[test]
    fn parses_terms_and_distance() {
        let tk = Tokenizer::new(StopWords::from_words(["the"]));
        let q = ProximityQuery::parse("cats running /3", &tk).unwrap();
        assert_eq!(q.words, vec![vec!["cat"], vec!["run"]]);
        assert_eq!(q.distance, 3);
        let q = ProximityQuery::parse("mp3-player the /1", &tk).unwrap();
        assert_eq!(q.words, vec![vec!["mp".to_string(), "player".to_string()], vec![]]);
        assert!(ProximityQuery::parse("cats running", &tk).is_err());
        assert!(ProximityQuery::parse("/3", &tk).is_err());
        assert!(is_proximity_query("a b /0"));
        assert!(!is_proximity_query("a AND b"));
    }

    #[test]
    fn adjacent_terms_match_at_distance_one() {
        let e = engine();
        assert_eq!(e.search("cat run /1"), vec!["1", "2"]);
        assert_eq!(e.search("run cat /1"), vec!["1", "2"]);
    }

    #[test]
    fn wider_windows_admit_more_documents() {
        let e = engine();
        assert_eq!(e.search("cat run /5"), vec!["1", "2", "3", "4"]);
        assert_eq!(e.search("cat run /4"), vec!["1", "2", "4"]);
    }

    #[test]
    fn zero_distance_needs_the_same_position() {
        let e = engine();
        assert!(e.search("cat run /0").is_empty());
        assert_eq!(e.search("cat /0"), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn unknown_term_empties_the_result() {
        let e = engine();
        assert!(e.search("cat unicorn run /10").is_empty());
    }

    #[test]
    fn three_term_fold() {
        let e = engine();
        // sat@1 within 1 of cat@0, then run@5 is 4 from sat and 5 from cat
        assert!(e.search("cat sat run /1").is_empty());
        assert_eq!(e.search("cat sat run /4"), vec!["3"]);
    }

    #[test]
    fn operands_are_tokenized_like_documents() {
        let e = engine_with(
            StopWords::from_words(["the"]),
            &[("1_1", "mp3 player reviews"), ("2_2", "NASA's e-mail archive")],
        );
        assert_eq!(e.search("mp3 player /1"), vec!["1"]);
        assert_eq!(e.search("e-mail archive /1"), vec!["2"]);
        // "NASA's" is two words in the document, so mail sits three slots after NASA
        assert!(e.search("NASA's e-mail /2").is_empty());
        assert_eq!(e.search("NASA's e-mail /3"), vec!["2"]);
        assert!(e.search("player the /5").is_empty());
    }

    #[test]
    fn stop_words_keep_their_slot() {
        let e = engine_with(StopWords::english(), &[("1_1", "cat sat in the middle of the run")]);
        // middle@4, run@7
        assert!(e.search("middle run /1").is_empty());
        assert!(e.search("middle run /2").is_empty());
        assert_eq!(e.search("middle run /3"), vec!["1"]);
        assert_eq!(e.search("cat sat /1"), vec!["1"]);
    }

    #[test]
    fn near_positions_keeps_both_sides() {
        assert_eq!(near_positions(&[0, 10], &[2, 30], 2), vec![0, 2]);
        assert!(near_positions(&[5], &[9], 3).is_empty());
    }
}
