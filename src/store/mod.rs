//! Rotated log segment discovery and reads
//!
//! Segments are flat files produced by the external rotation policy: the
//! active `*.log` file plus rotated `*.log.gz` archives. This module only ever
//! reads them; rotation and retention happen elsewhere and can race with us,
//! so a file vanishing between listing and read surfaces as `NotFound`.

use chrono::{DateTime, Local};
use flate2::read::GzDecoder;
use serde::{Serialize, Serializer};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Suffix of plain (active or rotated, uncompressed) segments
const PLAIN_SUFFIX: &str = ".log";
/// Suffix of gzip-compressed rotated segments
const COMPRESSED_SUFFIX: &str = ".log.gz";

/// Store error types
#[derive(Debug)]
pub enum StoreError {
    /// Named segment does not exist (or vanished mid-request)
    NotFound(String),
    /// I/O error
    Io(io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(name) => write!(f, "log segment not found: {}", name),
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Format a byte count for human display, e.g. `"1.21 MB"`
pub fn human_size(size_in_bytes: u64) -> String {
    let mut size = size_in_bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} TB", size)
}

fn ser_ctime<S: Serializer>(time: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn ser_size<S: Serializer>(size: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&human_size(*size))
}

/// Metadata for one on-disk segment.
///
/// Serializes to the listing shape `{ctime, filename, size}` with a formatted
/// creation time and a humanized size.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentMeta {
    /// Full path on disk
    #[serde(skip)]
    pub path: PathBuf,
    /// File name within the log directory
    pub filename: String,
    /// Creation time (falls back to mtime on filesystems without ctime)
    #[serde(rename = "ctime", serialize_with = "ser_ctime")]
    pub created: DateTime<Local>,
    /// Size on disk in bytes
    #[serde(rename = "size", serialize_with = "ser_size")]
    pub size_bytes: u64,
    /// True for gzip-compressed segments
    #[serde(skip)]
    pub compressed: bool,
}

/// Read-only view over the log directory
#[derive(Debug, Clone)]
pub struct RotationStore {
    dir: PathBuf,
}

impl RotationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        RotationStore { dir: dir.into() }
    }

    /// Directory being scanned
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Enumerate segments, newest first.
    ///
    /// Zero-byte files are excluded: this listing feeds human display, and an
    /// empty active file right after rotation is noise there. They remain
    /// directly readable via [`read_segment_lines`](Self::read_segment_lines).
    pub fn list_segments(&self) -> Result<Vec<SegmentMeta>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.dir.display().to_string()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut segments = Vec::new();
        for entry in entries {
            let entry = entry?;
            let filename = entry.file_name().to_string_lossy().into_owned();
            let compressed = filename.ends_with(COMPRESSED_SUFFIX);
            if !compressed && !filename.ends_with(PLAIN_SUFFIX) {
                continue;
            }
            // The file can vanish between readdir and stat; skip it then.
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::Io(e)),
            };
            if !metadata.is_file() || metadata.len() == 0 {
                continue;
            }
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map(DateTime::<Local>::from)
                .unwrap_or_else(|_| Local::now());
            segments.push(SegmentMeta {
                path: entry.path(),
                filename,
                created,
                size_bytes: metadata.len(),
                compressed,
            });
        }

        segments.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(segments)
    }

    /// Read up to `count` lines starting at 0-based line `start`.
    ///
    /// Returns the selected lines and the total line count of the segment.
    /// Compressed segments are decompressed transparently; the whole stream is
    /// walked once so the total is exact.
    pub fn read_segment_lines(
        &self,
        name: &str,
        start: usize,
        count: usize,
    ) -> Result<(Vec<String>, usize), StoreError> {
        let path = self.resolve(name)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        if name.ends_with(COMPRESSED_SUFFIX) {
            self.collect_lines(BufReader::new(GzDecoder::new(file)), start, count)
        } else {
            self.collect_lines(BufReader::new(file), start, count)
        }
    }

    /// Read the page of `count` lines starting at 0-based line `start`,
    /// serving the final page instead when `start` is past the end.
    ///
    /// `start` must be a multiple of `count`. The window and the returned
    /// total come from one walk of the stream, so they cannot disagree even
    /// when rotation rewrites the file between requests.
    pub fn read_segment_page(
        &self,
        name: &str,
        start: usize,
        count: usize,
    ) -> Result<(Vec<String>, usize), StoreError> {
        let path = self.resolve(name)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        if name.ends_with(COMPRESSED_SUFFIX) {
            self.collect_page(BufReader::new(GzDecoder::new(file)), start, count)
        } else {
            self.collect_page(BufReader::new(file), start, count)
        }
    }

    fn collect_page<R: BufRead>(
        &self,
        reader: R,
        start: usize,
        count: usize,
    ) -> Result<(Vec<String>, usize), StoreError> {
        let count = count.max(1);
        let mut requested: Option<Vec<String>> = None;
        let mut page = Vec::new();
        let mut page_start = 0usize;
        let mut total = 0usize;
        for line in reader.lines() {
            let line = line?;
            if total > 0 && total % count == 0 {
                if page_start == start {
                    requested = Some(std::mem::take(&mut page));
                } else {
                    page.clear();
                }
                page_start = total;
            }
            if requested.is_none() {
                page.push(line);
            }
            total += 1;
        }
        // Past-the-end starts fall through to the last buffered page.
        Ok((requested.unwrap_or(page), total))
    }

    fn collect_lines<R: BufRead>(
        &self,
        reader: R,
        start: usize,
        count: usize,
    ) -> Result<(Vec<String>, usize), StoreError> {
        let end = start.saturating_add(count);
        let mut lines = Vec::new();
        let mut total = 0usize;
        for line in reader.lines() {
            let line = line?;
            if total >= start && total < end {
                lines.push(line);
            }
            total += 1;
        }
        Ok((lines, total))
    }

    /// Map a segment name to its path, rejecting anything that would escape
    /// the log directory.
    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}
