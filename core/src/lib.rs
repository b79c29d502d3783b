pub mod builder;
pub mod crawl;
pub mod error;
pub mod index;
pub mod persist;
pub mod search;
pub mod similarity;
pub mod tokenizer;

pub use builder::build;
pub use crawl::{crawl, crawl_concurrent, CrawlConfig, CrawlOutcome, Document, Fetch, Parse, VisitedSet};
pub use error::{CoreError, FetchError};
pub use index::{CourseId, CourseIndex, CourseRecord, CourseUrlMap, InvertedIndex, WordSet};
pub use search::{rank, search, RankedCourse};
pub use similarity::{compare_courses, score_relevance};
