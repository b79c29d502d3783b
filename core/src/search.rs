use crate::error::CoreError;
use crate::index::{check_consistency, words_by_course, CourseId, CourseIndex, CourseUrlMap, InvertedIndex, WordSet};
use crate::similarity::score_relevance;
use crate::tokenizer::normalize_keywords;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCourse {
    pub id: CourseId,
    pub score: usize,
    pub url: String,
}

/// Rank courses for the given keywords and return their URLs, most relevant first.
///
/// Course word sets are recovered from the index itself, which is exactly the
/// indexed vocabulary retained at build time.
pub fn search<S: AsRef<str>>(keywords: &[S], index: &InvertedIndex, urls: &CourseUrlMap) -> Result<Vec<String>, CoreError> {
    let words = words_by_course(index);
    Ok(rank(keywords, index, &words, urls)?.into_iter().map(|r| r.url).collect())
}

/// Score every candidate course by the number of query words it contains.
/// Ties are broken by ascending course id. Any indexed course without a url
/// fails the whole query, whether or not the query touches it.
pub fn rank<S: AsRef<str>>(
    keywords: &[S],
    index: &InvertedIndex,
    words: &BTreeMap<CourseId, WordSet>,
    urls: &CourseUrlMap,
) -> Result<Vec<RankedCourse>, CoreError> {
    let query = normalize_keywords(keywords);
    if query.is_empty() {
        return Ok(Vec::new());
    }
    check_consistency(index, urls)?;

    let candidates: BTreeSet<CourseId> = query
        .iter()
        .filter_map(|w| index.get(w))
        .flat_map(|ids| ids.iter().copied())
        .collect();

    let empty = WordSet::new();
    let mut scored: Vec<(CourseId, usize)> = candidates
        .into_iter()
        .map(|id| (id, score_relevance(&query, words.get(&id).unwrap_or(&empty))))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    scored
        .into_iter()
        .map(|(id, score)| match urls.get(&id) {
            Some(url) => Ok(RankedCourse { id, score, url: url.clone() }),
            None => Err(CoreError::Consistency { course_id: id }),
        })
        .collect()
}

impl CourseIndex {
    pub fn search<S: AsRef<str>>(&self, keywords: &[S]) -> Result<Vec<String>, CoreError> {
        Ok(self.rank(keywords)?.into_iter().map(|r| r.url).collect())
    }

    pub fn rank<S: AsRef<str>>(&self, keywords: &[S]) -> Result<Vec<RankedCourse>, CoreError> {
        rank(keywords, &self.index, &self.words, &self.urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (InvertedIndex, CourseUrlMap) {
        let mut index = InvertedIndex::new();
        index.insert("machine".into(), [1, 2].into_iter().collect());
        index.insert("learning".into(), [1].into_iter().collect());
        index.insert("ethics".into(), [3].into_iter().collect());
        let urls = [(1, "u1"), (2, "u2"), (3, "u3")].into_iter().map(|(id, u)| (id, u.to_string())).collect();
        (index, urls)
    }

    #[test]
    fn ranks_by_shared_keywords() {
        let (index, urls) = fixture();
        assert_eq!(search(&["machine", "learning"], &index, &urls).unwrap(), vec!["u1", "u2"]);
    }

    #[test]
    fn keywords_are_normalized_like_the_index() {
        let (index, urls) = fixture();
        assert_eq!(search(&["MACHINE Learning!"], &index, &urls).unwrap(), vec!["u1", "u2"]);
    }

    #[test]
    fn unknown_and_empty_queries_match_nothing() {
        let (index, urls) = fixture();
        assert!(search(&["quantum"], &index, &urls).unwrap().is_empty());
        assert!(search::<&str>(&[], &index, &urls).unwrap().is_empty());
        assert!(search(&["!!", "  "], &index, &urls).unwrap().is_empty());
    }

    #[test]
    fn ties_break_on_course_id() {
        let (mut index, urls) = fixture();
        index.get_mut("ethics").unwrap().insert(2);
        let ranked = rank(&["machine", "ethics"], &index, &words_by_course(&index), &urls).unwrap();
        let ids: Vec<CourseId> = ranked.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(ranked[0].score, 2);
    }

    #[test]
    fn missing_url_is_a_consistency_error() {
        let (mut index, urls) = fixture();
        index.get_mut("ethics").unwrap().insert(7);
        assert!(matches!(
            search(&["ethics"], &index, &urls),
            Err(CoreError::Consistency { course_id: 7 })
        ));
    }

    #[test]
    fn orphan_outside_the_query_still_fails() {
        let mut index = InvertedIndex::new();
        index.insert("machine".into(), [1].into_iter().collect());
        index.insert("ethics".into(), [7].into_iter().collect());
        let urls: CourseUrlMap = [(1, "u1".to_string())].into_iter().collect();
        assert!(matches!(
            search(&["machine"], &index, &urls),
            Err(CoreError::Consistency { course_id: 7 })
        ));
    }
}
