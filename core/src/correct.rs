//! Nearest-word spelling correction over the vocabulary.

use crate::index::Vocabulary;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

lazy_static! {
    static ref DISTANCE_MARKER_RE: Regex = Regex::new(r"/\d+$").expect("valid regex");
}

/// Outcome of correcting a word or a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Correction {
    Unchanged { text: String },
    Corrected { original: String, corrected: String },
}

impl Correction {
    pub fn text(&self) -> &str {
        match self {
            Correction::Unchanged { text } => text,
            Correction::Corrected { corrected, .. } => corrected,
        }
    }

    pub fn is_corrected(&self) -> bool {
        matches!(self, Correction::Corrected { .. })
    }
}

/// Upper-case operators and `/k` distance markers are never corrected.
pub fn is_reserved(word: &str) -> bool {
    matches!(word, "AND" | "OR" | "NOT") || DISTANCE_MARKER_RE.is_match(word)
}

/// Classic edit distance with unit insert, delete and substitute costs.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != cb);
            cur[j + 1] = substitute.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

pub struct SpellCorrector {
    /// Vocabulary words in iteration order; ties go to the earliest.
    words: Vec<String>,
    known: HashSet<String>,
}

impl SpellCorrector {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let words: Vec<String> = vocabulary.iter().map(|(w, _)| w.to_string()).collect();
        let known = words.iter().cloned().collect();
        Self { words, known }
    }

    pub fn correct(&self, word: &str) -> Correction {
        if word.is_empty() || is_reserved(word) {
            return Correction::Unchanged { text: word.to_string() };
        }
        let lower = word.to_lowercase();
        if self.known.contains(&lower) {
            return Correction::Unchanged { text: lower };
        }
        let mut best: Option<(&str, usize)> = None;
        for candidate in &self.words {
            let d = levenshtein(&lower, candidate);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((candidate.as_str(), d));
                if d == 1 {
                    break;
                }
            }
        }
        match best {
            Some((corrected, _)) => Correction::Corrected { original: word.to_string(), corrected: corrected.to_string() },
            None => Correction::Unchanged { text: word.to_string() },
        }
    }

    /// Correct each whitespace-separated word, leaving operators and distance markers as typed.
    pub fn correct_query(&self, query: &str) -> Correction {
        let mut changed = false;
        let words: Vec<String> = query
            .split_whitespace()
            .map(|w| match self.correct(w) {
                Correction::Corrected { corrected, .. } => {
                    changed = true;
                    corrected
                }
                Correction::Unchanged { .. } => w.to_string(),
            })
            .collect();
        if changed {
            let corrected = words.join(" ");
            tracing::debug!(query, %corrected, "corrected query");
            Correction::Corrected { original: query.to_string(), corrected }
        } else {
            Correction::Unchanged { text: query.to_string() }
        }
    }

    pub fn len(&self) -> usize { self.words.len() }
    pub fn is_empty(&self) -> bool { self.words.is_empty() }
}
