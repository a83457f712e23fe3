use crate::config::DEFAULT_SUGGESTION_LIMIT;
use crate::index::Vocabulary;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    end_of_word: bool,
    frequency: u64,
}

/// Prefix tree over vocabulary surface forms. Built once, never mutated.
#[derive(Debug)]
pub struct AutocompleteTrie {
    root: TrieNode,
    limit: usize,
    words: usize,
}

impl AutocompleteTrie {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        Self::with_limit(vocabulary, DEFAULT_SUGGESTION_LIMIT)
    }

    pub fn with_limit(vocabulary: &Vocabulary, limit: usize) -> Self {
        let mut trie = Self { root: TrieNode::default(), limit, words: 0 };
        for (word, frequency) in vocabulary.iter() {
            trie.insert(word, frequency);
        }
        trie
    }

    fn insert(&mut self, word: &str, frequency: u64) {
        if word.is_empty() {
            return;
        }
        let mut node = &mut self.root;
        for c in word.chars() {
            node = node.children.entry(c).or_default();
        }
        if !node.end_of_word {
            self.words += 1;
        }
        node.end_of_word = true;
        node.frequency = frequency;
    }

    fn find(&self, prefix: &str) -> Option<&TrieNode> {
        let mut node = &self.root;
        for c in prefix.chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }

    /// Up to `limit` completions of `prefix`, most frequent first.
    ///
    /// Equal frequencies keep depth-first order (shorter words and smaller
    /// characters first), so results are stable for a given vocabulary.
    pub fn suggest(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Vec::new();
        }
        let Some(start) = self.find(&prefix) else {
            return Vec::new();
        };

        let mut found: Vec<(String, u64)> = Vec::new();
        let mut stack: Vec<(&TrieNode, String)> = vec![(start, prefix)];
        while let Some((node, word)) = stack.pop() {
            if node.end_of_word {
                found.push((word.clone(), node.frequency));
            }
            for (c, child) in node.children.iter().rev() {
                let mut next = word.clone();
                next.push(*c);
                stack.push((child, next));
            }
        }

        found.sort_by(|a, b| b.1.cmp(&a.1));
        found.into_iter().take(self.limit).map(|(w, _)| w).collect()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.find(word).is_some_and(|n| n.end_of_word)
    }

    pub fn len(&self) -> usize { self.words }
    pub fn is_empty(&self) -> bool { self.words == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie() -> AutocompleteTrie {
        let vocab: Vocabulary = [("cat", 5), ("cats", 2), ("car", 9), ("dog", 4)].into_iter().collect();
        AutocompleteTrie::new(&vocab)
    }

    #[test]
    fn ranks_completions_by_frequency() {
        assert_eq!(trie().suggest("ca"), vec!["car", "cat", "cats"]);
    }

    #[test]
    fn prefix_that_is_a_word_is_included() {
        assert_eq!(trie().suggest("cat"), vec!["cat", "cats"]);
        assert_eq!(trie().suggest("CAT"), vec!["cat", "cats"]);
    }

    #[test]
    fn missing_path_is_empty() {
        assert!(trie().suggest("cow").is_empty());
        assert!(trie().suggest("").is_empty());
    }

    #[test]
    fn truncates_and_keeps_ties_stable() {
        let vocab: Vocabulary = (0..12).map(|i| (format!("ab{}", (b'a' + i) as char), 1u64)).collect();
        let t = AutocompleteTrie::new(&vocab);
        let got = t.suggest("ab");
        assert_eq!(got.len(), DEFAULT_SUGGESTION_LIMIT);
        assert_eq!(got[0], "aba");
        assert_eq!(got[7], "abh");
        assert_eq!(got, t.suggest("ab"));
    }

    #[test]
    fn counts_words() {
        let t = trie();
        assert_eq!(t.len(), 4);
        assert!(t.contains("cats"));
        assert!(!t.contains("ca"));
    }
}
