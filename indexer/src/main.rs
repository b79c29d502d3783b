use anyhow::{Context, Result};
use catalog_core::persist::{load_index, save_meta, save_snapshot, save_tables, IndexPaths, MetaFile};
use catalog_core::{build, CourseId, CourseRecord};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the course word index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from crawled JSON/JSONL files or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Words found in at least this many courses are dropped as common
        #[arg(long, default_value_t = 10)]
        threshold: u32,
    },
    /// Print course URLs ranked by how many keywords they contain
    Search {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(required = true)]
        keywords: Vec<String>,
    },
    /// Print the word-overlap similarity of two courses
    Compare {
        #[arg(long, default_value = "./index")]
        index: String,
        a: CourseId,
        b: CourseId,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, threshold } => build_index(&input, &output, threshold),
        Commands::Search { index, keywords } => {
            let idx = load_index(&IndexPaths::new(&index))?;
            for url in idx.search(keywords.as_slice())? {
                println!("{url}");
            }
            Ok(())
        }
        Commands::Compare { index, a, b } => {
            let idx = load_index(&IndexPaths::new(&index))?;
            println!("{:.4}", idx.compare(a, b));
            Ok(())
        }
    }
}

fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn read_records(file: &Path, records: &mut Vec<CourseRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            let rec: CourseRecord = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}", file.display(), n + 1))?;
            records.push(rec);
        }
    } else {
        match serde_json::from_reader::<_, serde_json::Value>(reader)? {
            serde_json::Value::Array(arr) => {
                for v in arr {
                    records.push(serde_json::from_value(v)?);
                }
            }
            v @ serde_json::Value::Object(_) => records.push(serde_json::from_value(v)?),
            _ => tracing::warn!(file = %file.display(), "ignoring json that is neither object nor array"),
        }
    }
    Ok(())
}

fn build_index(input: &str, output: &str, threshold: u32) -> Result<()> {
    let mut records = Vec::new();
    for file in input_files(Path::new(input)) {
        read_records(&file, &mut records)?;
    }
    tracing::info!(num_records = records.len(), input, "ingested course records");

    let idx = build(&records, threshold)?;

    let paths = IndexPaths::new(output);
    save_tables(&paths, &idx)?;
    save_snapshot(&paths, &idx)?;
    let meta = MetaFile {
        num_courses: idx.num_courses() as u32,
        num_words: idx.num_words() as u32,
        threshold,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: 1,
    };
    save_meta(&paths, &meta)?;

    tracing::info!(output, "index build complete");
    Ok(())
}
