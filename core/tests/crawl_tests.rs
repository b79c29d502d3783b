//! Crawl behaviour over an in-memory site.
//!
//! Pages use a tiny line format instead of HTML so the core can be exercised
//! without a real parser:
//!   `title:<text>` / `desc:<text>` / `link:<href>`

use catalog_core::crawl::{crawl, crawl_concurrent, CrawlConfig, Document, Fetch, Parse};
use catalog_core::{build, FetchError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

struct FakeSite {
    pages: HashMap<String, String>,
    hits: AtomicUsize,
}

impl FakeSite {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages.iter().map(|(u, m)| (u.to_string(), m.to_string())).collect(),
            hits: AtomicUsize::new(0),
        }
    }
}

impl Fetch for FakeSite {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status { url: url.to_string(), status: 404 })
    }
}

struct LineDoc(Vec<(String, String)>);

impl Document for LineDoc {
    fn find_text(&self, tag: &str, _class: Option<&str>) -> Vec<String> {
        self.0.iter().filter(|(k, _)| k == tag).map(|(_, v)| v.trim().to_string()).collect()
    }

    fn find_attr(&self, tag: &str, attr: &str) -> Vec<String> {
        if tag != "a" || attr != "href" {
            return Vec::new();
        }
        self.find_text("link", None)
    }
}

struct LineParser;

impl Parse for LineParser {
    type Doc = LineDoc;
    fn parse(&self, markup: &str) -> LineDoc {
        LineDoc(
            markup
                .lines()
                .filter_map(|l| l.split_once(':'))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

fn config(max_pages: usize) -> CrawlConfig {
    let mut cfg = CrawlConfig::from_json(
        r#"{
            "seed": "https://catalog.test/",
            "title": [{"tag": "title"}],
            "description": {"tag": "desc"}
        }"#,
    )
    .unwrap();
    cfg.max_pages = max_pages;
    cfg
}

// seed -> a, b ; a -> b, seed, broken ; b -> c, a (cycle) ; c -> external, pdf
fn catalog() -> FakeSite {
    FakeSite::new(&[
        ("https://catalog.test/", "title:Programas\nlink:/curso/a\nlink:/curso/b#detalles"),
        ("https://catalog.test/curso/a", "title:Fotografía\ndesc:Luz y enfoque\nlink:/curso/b\nlink:/\nlink:/curso/roto"),
        ("https://catalog.test/curso/b", "title:Retrato\ndesc:Luz de estudio\ndesc:Modelos\nlink:/curso/c\nlink:/curso/a"),
        ("https://catalog.test/curso/c", "desc:Sin título\nlink:https://other.test/curso/x\nlink:/files/plan.pdf"),
    ])
}

#[tokio::test]
async fn crawls_breadth_first_and_survives_cycles() {
    let site = catalog();
    let out = crawl(&config(100), &site, &LineParser).await.unwrap();

    let urls: Vec<&str> = out.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://catalog.test/",
            "https://catalog.test/curso/a",
            "https://catalog.test/curso/b",
            "https://catalog.test/curso/c",
        ]
    );
    let ids: Vec<u32> = out.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);

    assert_eq!(out.records[2].title, "Retrato");
    assert_eq!(out.records[2].description, "Luz de estudio Modelos");
    // missing title degrades to empty
    assert_eq!(out.records[3].title, "");

    // the broken link is visited once and counted as a failure
    assert_eq!(out.failures, 1);
    assert_eq!(out.visited.len(), 5);
    assert_eq!(site.hits.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn page_budget_caps_records() {
    let site = catalog();
    let out = crawl(&config(2), &site, &LineParser).await.unwrap();
    assert_eq!(out.records.len(), 2);
    assert_eq!(out.records[1].url, "https://catalog.test/curso/a");
}

#[tokio::test]
async fn zero_budget_fetches_nothing() {
    let site = catalog();
    let out = crawl(&config(0), &site, &LineParser).await.unwrap();
    assert!(out.records.is_empty());
    assert!(out.visited.is_empty());
    assert_eq!(site.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_seed_yields_empty_crawl() {
    let site = FakeSite::new(&[]);
    let out = crawl(&config(10), &site, &LineParser).await.unwrap();
    assert!(out.records.is_empty());
    assert_eq!(out.failures, 1);
}

#[tokio::test]
async fn invalid_seed_is_rejected_before_fetching() {
    let site = catalog();
    let mut cfg = config(10);
    cfg.seed = "catalog".into();
    assert!(crawl(&cfg, &site, &LineParser).await.is_err());
    assert_eq!(site.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_crawl_visits_each_page_once() {
    let site = Arc::new(catalog());
    let out = crawl_concurrent(&config(100), Arc::clone(&site), Arc::new(LineParser), 4).await.unwrap();

    let mut urls: Vec<String> = out.records.iter().map(|r| r.url.clone()).collect();
    urls.sort();
    assert_eq!(urls.len(), 4);
    urls.dedup();
    assert_eq!(urls.len(), 4);
    assert_eq!(site.hits.load(Ordering::SeqCst), 5);
    assert_eq!(out.failures, 1);

    let mut ids: Vec<u32> = out.records.iter().map(|r| r.id).collect();
    ids.sort();
    assert_eq!(ids, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn concurrent_crawl_respects_budget() {
    let site = Arc::new(catalog());
    let out = crawl_concurrent(&config(3), site, Arc::new(LineParser), 8).await.unwrap();
    assert!(out.records.len() <= 3);
    assert!(crawl_concurrent(&config(3), Arc::new(catalog()), Arc::new(LineParser), 0).await.is_err());
}

#[tokio::test]
async fn crawl_output_feeds_the_index() {
    let out = crawl(&config(100), &catalog(), &LineParser).await.unwrap();
    let idx = build(&out.records, 2).unwrap();
    assert_eq!(idx.num_courses(), 4);
    // "luz" is in two courses and therefore common at threshold 2
    assert!(!idx.index.contains_key("luz"));
    let hits = idx.search(&["retrato", "modelos"]).unwrap();
    assert_eq!(hits, vec!["https://catalog.test/curso/b"]);
}
