pub mod html;
pub mod robots;

pub use html::{HtmlParser, ScrapedDocument};

use catalog_core::{Fetch, FetchError};
use parking_lot::{Mutex, RwLock};
use reqwest::{header, Client, Url};
use robots::Robots;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Largest body accepted, larger pages are skipped.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub respect_robots: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: "catalog-crawler/0.1 (+https://example.com/bot)".to_string(),
            timeout: Duration::from_secs(12),
            respect_robots: true,
        }
    }
}

/// HTTP fetch capability with per-host robots.txt rules.
pub struct HttpFetcher {
    client: Client,
    options: FetchOptions,
    robots: RwLock<HashMap<String, Robots>>,
    pacer: HostPacer,
}

/// Spaces out requests to the same host, shared by every in-flight fetch.
#[derive(Debug, Default)]
pub struct HostPacer {
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostPacer {
    /// Claims the next free slot for `host` and returns how long to wait for it.
    pub fn reserve(&self, host: &str, delay: Duration, now: Instant) -> Duration {
        let mut slots = self.next_slot.lock();
        let start = slots.get(host).copied().filter(|t| *t > now).unwrap_or(now);
        slots.insert(host.to_string(), start + delay);
        start.saturating_duration_since(now)
    }
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(options.timeout)
            .build()?;
        Ok(Self { client, options, robots: RwLock::new(HashMap::new()), pacer: HostPacer::default() })
    }

    async fn rules_for(&self, url: &Url) -> Option<Robots> {
        let host = url.host_str()?.to_string();
        let cached = { let c = self.robots.read(); c.get(&host).cloned() };
        if cached.is_some() {
            return cached;
        }
        let robots_url = url.join("/robots.txt").ok()?;
        let txt = match self.client.get(robots_url).send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            _ => String::new(),
        };
        let parsed = Robots::parse(&txt);
        tracing::debug!(host = %host, rules = parsed.len(), "robots.txt loaded");
        self.robots.write().insert(host, parsed.clone());
        Some(parsed)
    }
}

fn transport_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else {
        FetchError::Transport { url: url.to_string(), reason: e.to_string() }
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        if self.options.respect_robots {
            if let Some(rules) = self.rules_for(url).await {
                if !rules.allows(url.path()) {
                    return Err(FetchError::Disallowed { url: url.to_string() });
                }
                if let (Some(delay), Some(host)) = (rules.crawl_delay_ms, url.host_str()) {
                    let wait = self.pacer.reserve(host, Duration::from_millis(delay), Instant::now());
                    if !wait.is_zero() {
                        sleep(wait).await;
                    }
                }
            }
        }

        let resp = self.client.get(url.clone()).send().await.map_err(|e| transport_error(url, e))?;
        if !resp.status().is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: resp.status().as_u16() });
        }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            if !ct.starts_with("text/html") {
                return Err(FetchError::Unsupported { url: url.to_string(), reason: format!("content type {ct}") });
            }
        }
        let bytes = resp.bytes().await.map_err(|e| transport_error(url, e))?;
        if bytes.len() > MAX_BODY_BYTES {
            return Err(FetchError::Unsupported { url: url.to_string(), reason: format!("body of {} bytes", bytes.len()) });
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
