use crate::config::EngineConfig;
use crate::error::Error;
use crate::index::Position;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\w+").expect("valid regex");
    static ref ENGLISH_STOPWORDS: Vec<&'static str> = vec![
        "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
        "be","because","been","before","being","below","between","both","but","by",
        "can","can't","cannot","could","couldn't",
        "did","didn't","do","does","doesn't","doing","don't","down","during",
        "each","few","for","from","further",
        "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
        "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
        "let's","me","more","most","mustn't","my","myself",
        "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
        "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
        "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
        "under","until","up","very",
        "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
        "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
    ];
}

/// Lower-cased stop-word set.
#[derive(Debug, Clone, Default)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    /// Load one word per line. A missing file is fatal for the engine.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| Error::MissingStopWords { path: path.to_path_buf(), source })?;
        Ok(Self::from_words(text.lines()))
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        )
    }

    /// Built-in English list, for callers without a resource file.
    pub fn english() -> Self {
        Self::from_words(ENGLISH_STOPWORDS.iter())
    }

    pub fn contains(&self, word: &str) -> bool { self.0.contains(word) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// Splits text into normalized word tokens.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stop_words: StopWords,
    min_len: usize,
    max_len: usize,
}

impl Tokenizer {
    pub fn new(stop_words: StopWords) -> Self {
        Self { stop_words, min_len: 2, max_len: 24 }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, Error> {
        let stop_words = StopWords::load(&config.stop_words_path())?;
        tracing::debug!(count = stop_words.len(), "loaded stop words");
        Ok(Self::new(stop_words).with_limits(config.min_token_len, config.max_token_len))
    }

    pub fn with_limits(mut self, min_len: usize, max_len: usize) -> Self {
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    pub fn stop_words(&self) -> &StopWords { &self.stop_words }

    /// Tokenize text into surviving tokens.
    ///
    /// All-caps abbreviations keep their case; everything else is lower-cased,
    /// ASCII-folded and stripped of digits.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for mat in WORD_RE.find_iter(text) {
            self.push_normalized(mat.as_str(), &mut tokens);
        }
        tokens
    }

    /// Surviving tokens tagged with the index of the `\w+` word they came from.
    ///
    /// Dropped words and stop words still advance the position; chunks of one
    /// over-long word share that word's position.
    pub fn tokenize_with_positions(&self, text: &str) -> Vec<(Position, String)> {
        let mut tagged = Vec::new();
        let mut chunks = Vec::new();
        for (i, mat) in WORD_RE.find_iter(text).enumerate() {
            self.push_normalized(mat.as_str(), &mut chunks);
            tagged.extend(chunks.drain(..).map(|token| (i as Position, token)));
        }
        tagged
    }

    /// Number of raw `\w+` words before any filtering.
    pub fn word_count(&self, text: &str) -> usize {
        WORD_RE.find_iter(text).count()
    }

    /// Drop stop words from a query while keeping the remaining words' spacing.
    ///
    /// Matching is exact, so upper-case operators such as `AND` survive.
    pub fn remove_stop_words(&self, text: &str) -> String {
        text.split(' ')
            .filter(|word| !self.stop_words.contains(word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn push_normalized(&self, word: &str, out: &mut Vec<String>) {
        let folded = ascii_fold(word);
        if folded.is_empty() || folded.chars().all(|c| c.is_ascii_digit()) {
            return;
        }
        let stripped: String = folded.chars().filter(|c| !c.is_ascii_digit()).collect();
        let token = if is_abbreviation(&stripped) { stripped } else { stripped.to_lowercase() };
        let len = token.chars().count();
        if len > self.max_len {
            // pathological strings are kept only as sqrt-sized chunks
            let width = (len as f64).sqrt() as usize;
            let chars: Vec<char> = token.chars().collect();
            for chunk in chars.chunks(width.max(1)) {
                let chunk: String = chunk.iter().collect();
                self.push_if_kept(chunk, out);
            }
        } else {
            self.push_if_kept(token, out);
        }
    }

    fn push_if_kept(&self, token: String, out: &mut Vec<String>) {
        let len = token.chars().count();
        if len < self.min_len || len > self.max_len {
            return;
        }
        if self.stop_words.contains(&token.to_lowercase()) {
            return;
        }
        out.push(token);
    }
}

/// NFKD-decompose and drop everything outside ASCII, so `café` becomes `cafe`.
pub fn ascii_fold(word: &str) -> String {
    word.nfkd().filter(char::is_ascii).collect()
}

/// Upper-case words with at least one letter, e.g. `NASA`.
pub fn is_abbreviation(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_alphabetic()) && !word.chars().any(|c| c.is_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(StopWords::from_words(["the", "and", "of", "is"]))
    }

    #[test]
    fn basic_tokenize() {
        let t = tokenizer().tokenize("Running, runner's run!");
        assert_eq!(t, vec!["running", "runner", "run"]);
    }

    #[test]
    fn keeps_abbreviations_and_strips_digits() {
        let t = tokenizer().tokenize("NASA launched mp3 files in 1969");
        assert_eq!(t, vec!["NASA", "launched", "mp", "files", "in"]);
    }

    #[test]
    fn length_window_and_chunking() {
        let tk = tokenizer();
        assert!(tk.tokenize("a I x").is_empty());
        // 25 chars -> chunks of 5
        let long = "abcdefghijklmnopqrstuvwxy";
        assert_eq!(tk.tokenize(long), vec!["abcde", "fghij", "klmno", "pqrst", "uvwxy"]);
        // 24 chars is still a single token
        let edge = "abcdefghijklmnopqrstuvwx";
        assert_eq!(tk.tokenize(edge), vec![edge]);
    }

    #[test]
    fn positions_count_every_word() {
        let tk = tokenizer();
        let tagged = tk.tokenize_with_positions("the cat and 42 dogs");
        assert_eq!(tagged, vec![(1, "cat".to_string()), (4, "dogs".to_string())]);
        let long = tk.tokenize_with_positions("x abcdefghijklmnopqrstuvwxy");
        assert!(long.iter().all(|(pos, _)| *pos == 1));
        assert_eq!(long.len(), 5);
    }

    #[test]
    fn removes_stop_words_case_sensitively() {
        let tk = tokenizer();
        assert_eq!(tk.remove_stop_words("the cat AND the dog"), "cat AND dog");
        assert_eq!(tk.remove_stop_words("cat and dog"), "cat dog");
    }

    #[test]
    fn folds_to_ascii() {
        assert_eq!(ascii_fold("café"), "cafe");
        assert_eq!(ascii_fold("naïve"), "naive");
    }
}
