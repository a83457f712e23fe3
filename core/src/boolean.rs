//! Boolean set queries over the inverted index.
//!
//! Evaluation is strictly left to right with no precedence: `a OR b AND c` is
//! `(a OR b) AND c`. `NOT` binds to the single operand that follows it, and a run
//! of `NOT`s applies by parity.

use crate::error::QueryError;
use crate::index::{external_ids, CorpusIndex, DocKey};
use crate::stemmer::stem;
use crate::tokenizer::Tokenizer;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    /// Keywords match case-insensitively.
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "NOT" => Some(Self::Not),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryToken {
    Op(Operator),
    /// Stems of one query word. Empty when nothing in the word survives tokenization.
    Term(Vec<String>),
}

/// Tokenize and stem one query word exactly as document text is processed.
///
/// A word such as `mp3-player` yields several stems; a stop word yields none.
pub fn operand_stems(tokenizer: &Tokenizer, word: &str) -> Vec<String> {
    tokenizer.tokenize(word).iter().map(|token| stem(token)).collect()
}

/// Split on whitespace into operators and stemmed operands, keeping positions.
pub fn lex(tokenizer: &Tokenizer, query: &str) -> Vec<QueryToken> {
    query
        .split_whitespace()
        .map(|word| match Operator::parse(word) {
            Some(op) => QueryToken::Op(op),
            None => QueryToken::Term(operand_stems(tokenizer, word)),
        })
        .collect()
}

/// `term (AND term)*` with no other operators.
fn is_conjunctive(tokens: &[QueryToken]) -> bool {
    tokens.len() % 2 == 1
        && tokens.iter().enumerate().all(|(i, tok)| match tok {
            QueryToken::Term(_) => i % 2 == 0,
            QueryToken::Op(Operator::And) => i % 2 == 1,
            QueryToken::Op(_) => false,
        })
}

pub struct BooleanQueryEngine {
    index: Arc<CorpusIndex>,
    tokenizer: Arc<Tokenizer>,
    universe: BTreeSet<DocKey>,
}

impl BooleanQueryEngine {
    pub fn new(index: Arc<CorpusIndex>, tokenizer: Arc<Tokenizer>) -> Self {
        let universe = index.doc_keys();
        Self { index, tokenizer, universe }
    }

    /// Documents containing `term`; empty for unknown terms.
    pub fn postings(&self, term: &str) -> BTreeSet<DocKey> {
        self.index.inverted.doc_keys(term)
    }

    /// Documents containing every stem of one query word.
    fn operand(&self, stems: &[String]) -> BTreeSet<DocKey> {
        let Some((first, rest)) = stems.split_first() else {
            return BTreeSet::new();
        };
        let mut docs = self.postings(first);
        for term in rest {
            let Some(postings) = self.index.inverted.postings(term) else {
                return BTreeSet::new();
            };
            docs.retain(|doc| postings.contains_key(doc));
        }
        docs
    }

    fn complement(&self, set: &BTreeSet<DocKey>) -> BTreeSet<DocKey> {
        self.universe.difference(set).cloned().collect()
    }

    /// Evaluate to internal document keys, or explain why the query is malformed.
    pub fn evaluate(&self, query: &str) -> Result<BTreeSet<DocKey>, QueryError> {
        let tokens = lex(&self.tokenizer, query);
        if tokens.is_empty() {
            return Err(QueryError::Empty);
        }
        if is_conjunctive(&tokens) {
            return Ok(self.intersect_all(&tokens));
        }

        let raw = || query.split_whitespace().map(str::to_string).collect::<Vec<_>>();
        let mut acc: Option<BTreeSet<DocKey>> = None;
        let mut pending: Option<Operator> = None;
        let mut negate = false;
        for (position, token) in tokens.iter().enumerate() {
            match token {
                QueryToken::Op(Operator::Not) => negate = !negate,
                QueryToken::Op(op) => {
                    if acc.is_none() {
                        return Err(QueryError::DanglingOperator { position, tokens: raw() });
                    }
                    if pending.is_some() || negate {
                        return Err(QueryError::ConsecutiveOperators { position, tokens: raw() });
                    }
                    pending = Some(*op);
                }
                QueryToken::Term(stems) => {
                    let mut operand = self.operand(stems);
                    if negate {
                        operand = self.complement(&operand);
                        negate = false;
                    }
                    acc = Some(match (acc.take(), pending.take()) {
                        (None, _) => operand,
                        (Some(prev), Some(Operator::And)) => prev.intersection(&operand).cloned().collect(),
                        (Some(prev), Some(Operator::Or)) => prev.union(&operand).cloned().collect(),
                        (Some(_), _) => return Err(QueryError::MissingOperator { position, tokens: raw() }),
                    });
                }
            }
        }
        if pending.is_some() || negate {
            return Err(QueryError::DanglingOperator { position: tokens.len() - 1, tokens: raw() });
        }
        acc.ok_or(QueryError::Empty)
    }

    /// Pure conjunction: intersect shortest postings first.
    fn intersect_all(&self, tokens: &[QueryToken]) -> BTreeSet<DocKey> {
        let mut lists: Vec<BTreeSet<DocKey>> = tokens
            .iter()
            .filter_map(|t| match t {
                QueryToken::Term(stems) => Some(self.operand(stems)),
                QueryToken::Op(_) => None,
            })
            .collect();
        lists.sort_by_key(BTreeSet::len);
        let mut iter = lists.into_iter();
        let mut acc = iter.next().unwrap_or_default();
        for list in iter {
            if acc.is_empty() {
                break;
            }
            acc.retain(|doc| list.contains(doc));
        }
        acc
    }

    /// External document ids matching `query`. Malformed queries are logged and
    /// yield no documents.
    pub fn search(&self, query: &str) -> Vec<String> {
        match self.evaluate(query) {
            Ok(docs) => {
                let ids = external_ids(&docs);
                tracing::debug!(query, hits = ids.len(), "boolean query");
                ids
            }
            Err(error) => {
                tracing::warn!(query, %error, "malformed boolean query");
                Vec::new()
            }
        }
    }
}
