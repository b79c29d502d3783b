//! Shared-word metrics between word sets.
//!
//! Course-to-course comparison is a Jaccard ratio; keyword relevance is the raw
//! number of shared words, so a course satisfying more query terms always ranks
//! higher regardless of how long its description is.

use crate::index::{CourseId, CourseIndex, WordSet};

/// `|A ∩ B| / |A ∪ B|`, or 0 when both sets are empty.
pub fn compare_courses(a: &WordSet, b: &WordSet) -> f64 {
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    if union == 0 {
        return 0.0;
    }
    shared as f64 / union as f64
}

/// `|keywords ∩ course_words|`.
pub fn score_relevance(keywords: &WordSet, course_words: &WordSet) -> usize {
    // iterate the smaller side
    if keywords.len() <= course_words.len() {
        keywords.iter().filter(|w| course_words.contains(*w)).count()
    } else {
        course_words.iter().filter(|w| keywords.contains(*w)).count()
    }
}

impl CourseIndex {
    /// Jaccard similarity of two indexed courses. Unknown IDs compare as empty sets.
    pub fn compare(&self, a: CourseId, b: CourseId) -> f64 {
        let empty = WordSet::new();
        compare_courses(
            self.words_of(a).unwrap_or(&empty),
            self.words_of(b).unwrap_or(&empty),
        )
    }
}
