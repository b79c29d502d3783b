use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type CourseId = u32;

/// Normalized tokens of one course or one query.
pub type WordSet = BTreeSet<String>;

/// word -> courses whose text contains it
pub type InvertedIndex = BTreeMap<String, BTreeSet<CourseId>>;

pub type CourseUrlMap = BTreeMap<CourseId, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: CourseId,
    pub url: String,
    pub title: String,
    pub description: String,
}

impl CourseRecord {
    /// Title and description joined, the text the index is built from.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Everything produced by one index build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseIndex {
    pub index: InvertedIndex,
    pub urls: CourseUrlMap,
    /// Indexed vocabulary of each course (common words removed).
    pub words: BTreeMap<CourseId, WordSet>,
    pub common_words: WordSet,
    pub threshold: u32,
}

impl CourseIndex {
    pub fn new() -> Self { Self::default() }

    pub fn num_courses(&self) -> usize { self.urls.len() }

    pub fn num_words(&self) -> usize { self.index.len() }

    pub fn url(&self, id: CourseId) -> Option<&str> {
        self.urls.get(&id).map(String::as_str)
    }

    pub fn words_of(&self, id: CourseId) -> Option<&WordSet> {
        self.words.get(&id)
    }

    /// Checks that every course referenced by the index resolves to a URL.
    pub fn check_consistency(&self) -> Result<(), crate::CoreError> {
        check_consistency(&self.index, &self.urls)
    }
}

pub(crate) fn check_consistency(index: &InvertedIndex, urls: &CourseUrlMap) -> Result<(), crate::CoreError> {
    for ids in index.values() {
        if let Some(&course_id) = ids.iter().find(|id| !urls.contains_key(id)) {
            return Err(crate::CoreError::Consistency { course_id });
        }
    }
    Ok(())
}

/// Rebuilds each course's word set from the index alone.
pub fn words_by_course(index: &InvertedIndex) -> BTreeMap<CourseId, WordSet> {
    let mut out: BTreeMap<CourseId, WordSet> = BTreeMap::new();
    for (word, ids) in index {
        for id in ids {
            out.entry(*id).or_default().insert(word.clone());
        }
    }
    out
}
