use crate::index::WordSet;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // a whole word: a letter, then at least one more letter, digit or underscore
    static ref RE: Regex = Regex::new(r"(?u)\b\p{L}[\p{L}\p{N}_]+\b").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "al","con","de","del","el","en","es","la","las","lo","los","para","por","que","se","su","sus","un","una","y",
            "duración","hora","horas","precio",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into lowercase words using NFKC normalization and stopword removal.
/// Order and repeats are preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}

pub fn word_set(text: &str) -> WordSet {
    tokenize(text).into_iter().collect()
}

/// Normalize user keywords exactly like indexed text. A single keyword may
/// contribute several words.
pub fn normalize_keywords<S: AsRef<str>>(keywords: &[S]) -> WordSet {
    keywords.iter().flat_map(|k| tokenize(k.as_ref())).collect()
}
