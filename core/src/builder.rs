use crate::error::CoreError;
use crate::index::{CourseId, CourseIndex, CourseRecord, WordSet};
use crate::tokenizer::word_set;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Build the inverted index and url map from crawled records.
///
/// Words whose document frequency is `>= threshold` are treated as corpus
/// noise and never become index keys. Every record gets a url entry, even one
/// whose words were all filtered out.
pub fn build(records: &[CourseRecord], threshold: u32) -> Result<CourseIndex, CoreError> {
    if threshold == 0 {
        return Err(CoreError::InvalidInput("common word threshold must be at least 1".into()));
    }
    let mut seen: HashSet<CourseId> = HashSet::with_capacity(records.len());
    for r in records {
        if !seen.insert(r.id) {
            return Err(CoreError::InvalidInput(format!("duplicate course id {}", r.id)));
        }
    }

    // First pass: word sets and document frequency
    let sets: Vec<(CourseId, WordSet)> = records.iter().map(|r| (r.id, word_set(&r.text()))).collect();
    let mut df: HashMap<&str, u32> = HashMap::new();
    for (_, words) in &sets {
        for w in words {
            *df.entry(w.as_str()).or_insert(0) += 1;
        }
    }
    let common_words: WordSet = df
        .iter()
        .filter(|(_, count)| **count >= threshold)
        .map(|(w, _)| w.to_string())
        .collect();

    // Second pass: postings for the surviving vocabulary
    let mut out = CourseIndex { threshold, common_words, ..CourseIndex::default() };
    let mut kept_words: BTreeMap<CourseId, WordSet> = BTreeMap::new();
    for (id, words) in &sets {
        let kept: WordSet = words.iter().filter(|w| !out.common_words.contains(*w)).cloned().collect();
        for w in &kept {
            out.index.entry(w.clone()).or_default().insert(*id);
        }
        kept_words.insert(*id, kept);
    }
    for r in records {
        out.urls.insert(r.id, r.url.clone());
    }
    out.words = kept_words;

    tracing::info!(
        num_courses = out.num_courses(),
        num_words = out.num_words(),
        common_words = out.common_words.len(),
        threshold,
        "built course index"
    );
    Ok(out)
}
