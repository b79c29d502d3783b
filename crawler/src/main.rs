use anyhow::{Context, Result};
use catalog_core::{crawl_concurrent, CourseRecord, CrawlConfig};
use catalog_crawler::{FetchOptions, HtmlParser, HttpFetcher};
use clap::Parser;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl a course catalog into JSONL course records")]
struct Cli {
    /// Catalog page to start from
    #[arg(long, default_value = "https://educacionvirtual.javeriana.edu.co/nuestros-programas-nuevo")]
    seed: String,
    /// JSON crawl config (seed, landmarks, link pattern); replaces --seed, while --max-pages and --link-pattern still override it
    #[arg(long)]
    config: Option<String>,
    /// Output JSONL file path
    #[arg(long, default_value = "./data/crawl.jsonl")]
    output: String,
    /// Maximum number of course pages to extract
    #[arg(long)]
    max_pages: Option<usize>,
    /// Number of fetches in flight; 1 crawls sequentially in breadth-first order
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// User-Agent string to use for robots.txt and crawling
    #[arg(long, default_value = "catalog-crawler/0.1 (+https://example.com/bot)")]
    user_agent: String,
    /// Regex every followed link must match
    #[arg(long)]
    link_pattern: Option<String>,
    /// Ignore robots.txt
    #[arg(long, default_value_t = false)]
    ignore_robots: bool,
}

#[derive(Serialize)]
struct OutRecord<'a> {
    #[serde(flatten)]
    record: &'a CourseRecord,
    crawled_at: &'a str,
}

fn load_config(args: &Cli) -> Result<CrawlConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading crawl config {path}"))?;
            CrawlConfig::from_json(&json)?
        }
        None => CrawlConfig::new(&args.seed, 50),
    };
    if let Some(n) = args.max_pages {
        config.max_pages = n;
    }
    if args.link_pattern.is_some() {
        config.link_pattern = args.link_pattern.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    let config = load_config(&args)?;

    let fetcher = HttpFetcher::new(FetchOptions {
        user_agent: args.user_agent.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        respect_robots: !args.ignore_robots,
    })?;
    tracing::info!(
        seed = %config.seed,
        max_pages = config.max_pages,
        concurrency = args.concurrency,
        output = %args.output,
        "crawler starting"
    );

    let outcome = crawl_concurrent(&config, Arc::new(fetcher), Arc::new(HtmlParser), args.concurrency).await?;

    if let Some(dir) = std::path::Path::new(&args.output).parent() {
        fs::create_dir_all(dir).ok();
    }
    let mut out = BufWriter::new(File::create(&args.output)?);
    let ts = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    for record in &outcome.records {
        serde_json::to_writer(&mut out, &OutRecord { record, crawled_at: &ts })?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    tracing::info!(
        records = outcome.records.len(),
        visited = outcome.visited.len(),
        failures = outcome.failures,
        output = %args.output,
        "done"
    );
    Ok(())
}
