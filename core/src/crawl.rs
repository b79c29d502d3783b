//! Course catalog traversal over injected fetch and parse capabilities.
//!
//! The frontier is a FIFO queue, so pages are visited breadth-first from the
//! seed. When the catalog holds more pages than `max_pages`, the courses
//! closest to the seed are the ones captured.

use crate::error::{CoreError, FetchError};
use crate::index::{CourseId, CourseRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Fetches raw markup for a URL.
pub trait Fetch {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Parsed page exposing structural queries. Missing elements yield empty results.
pub trait Document {
    /// Trimmed text of every `tag` element, restricted to those carrying `class` when given.
    fn find_text(&self, tag: &str, class: Option<&str>) -> Vec<String>;
    /// Values of `attr` on every `tag` element that has it.
    fn find_attr(&self, tag: &str, attr: &str) -> Vec<String>;
}

/// Turns markup into a [`Document`]. Never fails; malformed markup gives a partial document.
pub trait Parse {
    type Doc: Document;
    fn parse(&self, markup: &str) -> Self::Doc;
}

/// An element located by tag name and optional class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    pub tag: String,
    #[serde(default)]
    pub class: Option<String>,
}

impl Landmark {
    pub fn new(tag: &str, class: Option<&str>) -> Self {
        Self { tag: tag.to_string(), class: class.map(str::to_string) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// URL the traversal starts from
    pub seed: String,

    /// Maximum number of course records to extract
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Host links must stay on. Defaults to the seed's host.
    #[serde(default)]
    pub domain: Option<String>,

    /// Regex every followed link must match
    #[serde(default)]
    pub link_pattern: Option<String>,

    /// Title landmarks, first non-empty match wins
    #[serde(default = "default_title_landmarks")]
    pub title: Vec<Landmark>,

    /// Description landmark, all matches are joined
    #[serde(default = "default_description_landmark")]
    pub description: Landmark,
}

fn default_max_pages() -> usize {
    50
}

fn default_title_landmarks() -> Vec<Landmark> {
    vec![Landmark::new("b", Some("card-title")), Landmark::new("h1", None)]
}

fn default_description_landmark() -> Landmark {
    Landmark::new("p", Some("card-text"))
}

impl CrawlConfig {
    pub fn new(seed: &str, max_pages: usize) -> Self {
        Self {
            seed: seed.to_string(),
            max_pages,
            domain: None,
            link_pattern: None,
            title: default_title_landmarks(),
            description: default_description_landmark(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::InvalidInput(format!("crawl config: {e}")))
    }
}

/// URLs already fetched during one crawl.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self { Self::default() }

    /// Marks `url` visited. Returns false if it already was.
    pub fn mark(&mut self, url: &Url) -> bool {
        self.urls.insert(url.as_str().to_string())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(url.as_str())
    }

    pub fn len(&self) -> usize { self.urls.len() }

    pub fn is_empty(&self) -> bool { self.urls.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub records: Vec<CourseRecord>,
    pub visited: VisitedSet,
    /// Pages skipped because the fetch failed
    pub failures: usize,
}

/// Which discovered links are worth following.
#[derive(Debug, Clone)]
pub struct LinkScope {
    domain: Option<String>,
    pattern: Option<Regex>,
}

impl LinkScope {
    pub fn new(domain: Option<String>, pattern: Option<Regex>) -> Self {
        Self { domain, pattern }
    }

    pub fn allows(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if let Some(domain) = &self.domain {
            if url.host_str() != Some(domain.as_str()) {
                return false;
            }
        }
        let s = url.as_str();
        if s.contains('@') || s.contains("mailto:") {
            return false;
        }
        let path = url.path();
        let last = path.rsplit('/').next().unwrap_or("");
        if !(path.ends_with('/') || path.ends_with(".html") || !last.contains('.')) {
            return false;
        }
        self.pattern.as_ref().map_or(true, |re| re.is_match(s))
    }
}

/// What one page contributes to the crawl.
#[derive(Debug, Clone, Default)]
pub struct PageExtract {
    pub title: String,
    pub description: String,
    pub links: Vec<Url>,
}

struct Plan {
    seed: Url,
    scope: LinkScope,
    title: Vec<Landmark>,
    description: Landmark,
}

impl Plan {
    fn from_config(config: &CrawlConfig) -> Result<Self, CoreError> {
        let seed = Url::parse(&config.seed)
            .map_err(|e| CoreError::InvalidInput(format!("seed url {:?}: {e}", config.seed)))?;
        if !matches!(seed.scheme(), "http" | "https") {
            return Err(CoreError::InvalidInput(format!("seed url {:?} is not http(s)", config.seed)));
        }
        let pattern = match &config.link_pattern {
            Some(p) => Some(Regex::new(p).map_err(|e| CoreError::InvalidInput(format!("link pattern: {e}")))?),
            None => None,
        };
        let domain = config.domain.clone().or_else(|| seed.host_str().map(str::to_string));
        Ok(Self {
            seed: strip_fragment(seed),
            scope: LinkScope::new(domain, pattern),
            title: config.title.clone(),
            description: config.description.clone(),
        })
    }
}

fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// Extract title, description and in-scope links from one page of markup.
pub fn extract_page<P: Parse>(
    parser: &P,
    page_url: &Url,
    markup: &str,
    scope: &LinkScope,
    title: &[Landmark],
    description: &Landmark,
) -> PageExtract {
    let doc = parser.parse(markup);

    let title = title
        .iter()
        .flat_map(|l| doc.find_text(&l.tag, l.class.as_deref()))
        .find(|t| !t.is_empty())
        .unwrap_or_default();
    let description = doc
        .find_text(&description.tag, description.class.as_deref())
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let mut links = Vec::new();
    for href in doc.find_attr("a", "href") {
        if let Ok(u) = page_url.join(href.trim()) {
            let u = strip_fragment(u);
            if scope.allows(&u) && !links.contains(&u) {
                links.push(u);
            }
        }
    }
    PageExtract { title, description, links }
}

/// Sequential breadth-first crawl. Stops when the frontier is exhausted or
/// `max_pages` records have been extracted. Failed fetches are logged and skipped.
pub async fn crawl<F: Fetch, P: Parse>(config: &CrawlConfig, fetcher: &F, parser: &P) -> Result<CrawlOutcome, CoreError> {
    let plan = Plan::from_config(config)?;
    let mut out = CrawlOutcome::default();
    let mut frontier: VecDeque<Url> = VecDeque::from([plan.seed.clone()]);
    let mut next_id: CourseId = 0;

    while out.records.len() < config.max_pages {
        let Some(url) = frontier.pop_front() else { break };
        if !out.visited.mark(&url) {
            continue;
        }
        let markup = match fetcher.fetch(&url).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "fetch failed, skipping page");
                out.failures += 1;
                continue;
            }
        };
        let page = extract_page(parser, &url, &markup, &plan.scope, &plan.title, &plan.description);
        for link in page.links {
            if !out.visited.contains(&link) {
                frontier.push_back(link);
            }
        }
        out.records.push(CourseRecord { id: next_id, url: url.to_string(), title: page.title, description: page.description });
        next_id += 1;
        tracing::debug!(url = %url, extracted = out.records.len(), frontier = frontier.len(), "page extracted");
    }

    tracing::info!(
        records = out.records.len(),
        visited = out.visited.len(),
        failures = out.failures,
        "crawl finished"
    );
    Ok(out)
}

/// Crawl with up to `concurrency` fetches in flight.
///
/// The driver loop alone owns the visited set and the page budget, so a URL
/// is checked and marked in one step and `records + in_flight` never exceeds
/// `max_pages`. Course ids follow completion order and are not deterministic.
pub async fn crawl_concurrent<F, P>(
    config: &CrawlConfig,
    fetcher: Arc<F>,
    parser: Arc<P>,
    concurrency: usize,
) -> Result<CrawlOutcome, CoreError>
where
    F: Fetch + Send + Sync + 'static,
    P: Parse + Send + Sync + 'static,
{
    if concurrency == 0 {
        return Err(CoreError::InvalidInput("concurrency must be at least 1".into()));
    }
    if concurrency == 1 {
        return crawl(config, fetcher.as_ref(), parser.as_ref()).await;
    }
    let plan = Arc::new(Plan::from_config(config)?);
    let mut out = CrawlOutcome::default();
    let mut frontier: VecDeque<Url> = VecDeque::from([plan.seed.clone()]);
    let mut inflight: JoinSet<(Url, Result<PageExtract, FetchError>)> = JoinSet::new();
    let mut next_id: CourseId = 0;

    loop {
        while inflight.len() < concurrency && out.records.len() + inflight.len() < config.max_pages {
            let Some(url) = frontier.pop_front() else { break };
            if !out.visited.mark(&url) {
                continue;
            }
            let fetcher = Arc::clone(&fetcher);
            let parser = Arc::clone(&parser);
            let plan = Arc::clone(&plan);
            inflight.spawn(async move {
                let page = match fetcher.fetch(&url).await {
                    Ok(markup) => Ok(extract_page(parser.as_ref(), &url, &markup, &plan.scope, &plan.title, &plan.description)),
                    Err(e) => Err(e),
                };
                (url, page)
            });
        }

        let Some(joined) = inflight.join_next().await else { break };
        match joined {
            Ok((url, Ok(page))) => {
                for link in page.links {
                    if !out.visited.contains(&link) {
                        frontier.push_back(link);
                    }
                }
                out.records.push(CourseRecord { id: next_id, url: url.to_string(), title: page.title, description: page.description });
                next_id += 1;
            }
            Ok((url, Err(e))) => {
                tracing::warn!(url = %url, error = %e, "fetch failed, skipping page");
                out.failures += 1;
            }
            Err(e) => {
                tracing::warn!(error = %e, "crawl task aborted");
                out.failures += 1;
            }
        }
    }

    tracing::info!(
        records = out.records.len(),
        visited = out.visited.len(),
        failures = out.failures,
        concurrency,
        "crawl finished"
    );
    Ok(out)
}
