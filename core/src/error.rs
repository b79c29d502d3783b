use crate::index::CourseId;
use thiserror::Error;

/// Failure of the injected fetch capability. Always recoverable: the crawler
/// skips the page and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("robots.txt disallows {url}")]
    Disallowed { url: String },
    #[error("skipped {url}: {reason}")]
    Unsupported { url: String, reason: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Timeout { url }
            | FetchError::Disallowed { url }
            | FetchError::Unsupported { url, .. } => url,
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    /// Rejected at the call boundary before any work starts.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The inverted index references a course that has no URL.
    #[error("course {course_id} is indexed but missing from the url map")]
    Consistency { course_id: CourseId },
}
