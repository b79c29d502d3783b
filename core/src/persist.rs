use crate::index::{check_consistency, words_by_course, CourseId, CourseIndex, CourseUrlMap, InvertedIndex};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const DELIMITER: char = '|';
const INDEX_HEADER: &str = "Course ID|Word";
const URLS_HEADER: &str = "Course ID|URL";

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_courses: u32,
    pub num_words: u32,
    pub threshold: u32,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn course_index(&self) -> PathBuf { self.root.join("course_index.csv") }
    pub fn course_urls(&self) -> PathBuf { self.root.join("course_urls.csv") }
    pub fn snapshot(&self) -> PathBuf { self.root.join("index.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn escape_url(url: &str) -> String {
    url.replace('%', "%25").replace('|', "%7C").replace('\r', "%0D").replace('\n', "%0A")
}

/// Inverse of [`escape_url`]. Any other percent sequence is left as written.
fn unescape_url(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let (decoded, len) = match tail.get(..3) {
            Some("%25") => ('%', 3),
            Some("%7C") => ('|', 3),
            Some("%0D") => ('\r', 3),
            Some("%0A") => ('\n', 3),
            _ => ('%', 1),
        };
        out.push(decoded);
        rest = &tail[len..];
    }
    out.push_str(rest);
    out
}

/// Write the (course, word) and (course, url) tables.
pub fn save_tables(paths: &IndexPaths, index: &CourseIndex) -> Result<()> {
    create_dir_all(&paths.root)?;

    let mut f = BufWriter::new(File::create(paths.course_index())?);
    writeln!(f, "{INDEX_HEADER}")?;
    for (id, words) in &index.words {
        for word in words {
            if word.contains([DELIMITER, '\r', '\n']) {
                bail!("word {word:?} of course {id} contains a row or column separator");
            }
            writeln!(f, "{id}{DELIMITER}{word}")?;
        }
    }
    f.flush()?;

    let mut f = BufWriter::new(File::create(paths.course_urls())?);
    writeln!(f, "{URLS_HEADER}")?;
    for (id, url) in &index.urls {
        writeln!(f, "{id}{DELIMITER}{}", escape_url(url))?;
    }
    f.flush()?;
    Ok(())
}

fn read_rows(path: &Path, header: &str) -> Result<Vec<(CourseId, String)>> {
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    let mut rows = Vec::new();
    let mut lines = reader.lines();
    let first = lines.next().transpose()?;
    if first.as_deref().map(str::trim_end) != Some(header) {
        bail!("{} does not start with header {header:?}", path.display());
    }
    for (n, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() { continue; }
        let (id, value) = line
            .split_once(DELIMITER)
            .ok_or_else(|| anyhow!("{}:{}: missing delimiter", path.display(), n + 2))?;
        let id: CourseId = id.trim().parse().with_context(|| format!("{}:{}: bad course id", path.display(), n + 2))?;
        rows.push((id, value.to_string()));
    }
    Ok(rows)
}

/// Rebuild a course index from the two tables. Fails if a posting refers to a
/// course that has no url row.
pub fn load_tables(paths: &IndexPaths) -> Result<CourseIndex> {
    let mut index = InvertedIndex::new();
    for (id, word) in read_rows(&paths.course_index(), INDEX_HEADER)? {
        index.entry(word).or_default().insert(id);
    }
    let urls: CourseUrlMap = read_rows(&paths.course_urls(), URLS_HEADER)?
        .into_iter()
        .map(|(id, url)| (id, unescape_url(&url)))
        .collect();
    check_consistency(&index, &urls)?;

    let mut words = words_by_course(&index);
    for id in urls.keys() {
        words.entry(*id).or_default();
    }
    let threshold = if paths.meta().exists() { load_meta(paths)?.threshold } else { 0 };
    Ok(CourseIndex { index, urls, words, threshold, ..CourseIndex::default() })
}

pub fn save_snapshot(paths: &IndexPaths, index: &CourseIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.snapshot())?;
    let bytes = bincode::serialize(index)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<CourseIndex> {
    let mut f = File::open(paths.snapshot())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let index: CourseIndex = bincode::deserialize(&buf)?;
    index.check_consistency()?;
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Load whatever the server needs: the snapshot when present, the tables otherwise.
pub fn load_index(paths: &IndexPaths) -> Result<CourseIndex> {
    if paths.snapshot().exists() {
        load_snapshot(paths)
    } else {
        tracing::info!(root = %paths.root.display(), "no snapshot, loading tables");
        load_tables(paths)
    }
}
