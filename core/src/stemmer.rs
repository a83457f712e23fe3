//! Porter suffix-stripping stemmer.
//!
//! Index keys are stems, so the rules here must not drift: any change re-keys every
//! persisted index. The tables are scanned in order and the first suffix that matches
//! decides the step, even when its measure condition then rejects the rewrite.

const STEP2: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("tional", "tion"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("abli", "able"),
    ("alli", "al"),
    ("entli", "ent"),
    ("eli", "e"),
    ("ousli", "ous"),
    ("ization", "ize"),
    ("ation", "ate"),
    ("ator", "ate"),
    ("alism", "al"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("aliti", "al"),
    ("iviti", "ive"),
    ("biliti", "ble"),
];

const STEP3: &[(&str, &str)] = &[
    ("icate", "ic"),
    ("ative", ""),
    ("alize", "al"),
    ("iciti", "ic"),
    ("ical", "ic"),
    ("ful", ""),
    ("ness", ""),
];

const STEP4: &[(&str, &str)] = &[
    ("al", ""),
    ("ance", ""),
    ("ence", ""),
    ("er", ""),
    ("ic", ""),
    ("able", ""),
    ("ible", ""),
    ("ant", ""),
    ("ement", ""),
    ("ment", ""),
    ("ent", ""),
    ("ou", ""),
    ("ism", ""),
    ("ate", ""),
    ("iti", ""),
    ("ous", ""),
    ("ive", ""),
    ("ize", ""),
];

/// Reduce a word to its stem.
///
/// Words without lower-case letters are treated as abbreviations and returned as-is.
pub fn stem(word: &str) -> String {
    if !word.chars().any(char::is_lowercase) {
        return word.to_string();
    }
    let mut w: Vec<char> = word.to_lowercase().chars().collect();
    step1a(&mut w);
    step1b(&mut w);
    step1c(&mut w);
    replace_suffix(&mut w, STEP2, 0);
    replace_suffix(&mut w, STEP3, 0);
    step4(&mut w);
    step5a(&mut w);
    step5b(&mut w);
    w.into_iter().collect()
}

fn is_consonant(w: &[char], i: usize) -> bool {
    match w[i] {
        'a' | 'e' | 'i' | 'o' | 'u' => false,
        'y' => i == 0 || !is_consonant(w, i - 1),
        _ => true,
    }
}

/// Number of vowel-to-consonant transitions, the `m` in `[C](VC)^m[V]`.
fn measure(w: &[char]) -> usize {
    let mut m = 0;
    let mut prev_vowel = false;
    for i in 0..w.len() {
        let consonant = is_consonant(w, i);
        if consonant && prev_vowel {
            m += 1;
        }
        prev_vowel = !consonant;
    }
    m
}

fn contains_vowel(w: &[char]) -> bool {
    (0..w.len()).any(|i| !is_consonant(w, i))
}

fn ends_with(w: &[char], suffix: &str) -> bool {
    let n = suffix.chars().count();
    w.len() >= n && w[w.len() - n..].iter().copied().eq(suffix.chars())
}

fn ends_double_consonant(w: &[char]) -> bool {
    let n = w.len();
    n >= 2 && w[n - 1] == w[n - 2] && is_consonant(w, n - 1)
}

/// `*o`: ends consonant-vowel-consonant, the last consonant not w, x or y.
fn ends_cvc(w: &[char]) -> bool {
    let n = w.len();
    n >= 3
        && is_consonant(w, n - 3)
        && !is_consonant(w, n - 2)
        && is_consonant(w, n - 1)
        && !matches!(w[n - 1], 'w' | 'x' | 'y')
}

fn set_suffix(w: &mut Vec<char>, strip: usize, replacement: &str) {
    w.truncate(w.len() - strip);
    w.extend(replacement.chars());
}

/// Apply the first table entry whose suffix matches. Returns whether any suffix matched.
fn replace_suffix(w: &mut Vec<char>, table: &[(&str, &str)], min_measure: usize) -> bool {
    for (suffix, replacement) in table {
        if ends_with(w, suffix) {
            let stem_len = w.len() - suffix.len();
            if measure(&w[..stem_len]) > min_measure {
                set_suffix(w, suffix.len(), replacement);
            }
            return true;
        }
    }
    false
}

fn step1a(w: &mut Vec<char>) {
    if ends_with(w, "sses") || ends_with(w, "ies") {
        w.truncate(w.len() - 2);
    } else if ends_with(w, "ss") {
        // ss -> ss
    } else if ends_with(w, "s") {
        w.pop();
    }
}

fn step1b(w: &mut Vec<char>) {
    if ends_with(w, "eed") {
        if measure(&w[..w.len() - 3]) > 0 {
            w.pop();
        }
        return;
    }
    let stripped = if ends_with(w, "ed") && contains_vowel(&w[..w.len() - 2]) {
        w.truncate(w.len() - 2);
        true
    } else if ends_with(w, "ing") && contains_vowel(&w[..w.len() - 3]) {
        w.truncate(w.len() - 3);
        true
    } else {
        false
    };
    if !stripped {
        return;
    }
    if ends_with(w, "at") || ends_with(w, "bl") || ends_with(w, "iz") {
        w.push('e');
    } else if ends_double_consonant(w) && !matches!(w[w.len() - 1], 'l' | 's' | 'z') {
        w.pop();
    } else if measure(w) == 1 && ends_cvc(w) {
        w.push('e');
    }
}

fn step1c(w: &mut [char]) {
    let n = w.len();
    if n > 0 && w[n - 1] == 'y' && contains_vowel(&w[..n - 1]) {
        w[n - 1] = 'i';
    }
}

fn step4(w: &mut Vec<char>) {
    if replace_suffix(w, STEP4, 1) {
        return;
    }
    if ends_with(w, "ion") {
        let stem_len = w.len() - 3;
        let base = &w[..stem_len];
        if measure(base) > 1 && matches!(base.last(), Some('s') | Some('t')) {
            w.truncate(stem_len);
        }
    }
}

fn step5a(w: &mut Vec<char>) {
    if !ends_with(w, "e") {
        return;
    }
    let stem = &w[..w.len() - 1];
    let m = measure(stem);
    if m > 1 || (m == 1 && !ends_cvc(stem)) {
        w.pop();
    }
}

fn step5b(w: &mut Vec<char>) {
    if measure(w) > 1 && ends_with(w, "ll") {
        w.pop();
    }
}
