//! Media metadata, download requests, and output file naming.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Stem used when a title sanitizes to nothing.
pub const UNTITLED: &str = "untitled";

/// Metadata reported by the retrieval tool for a finished download.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MediaInfo {
    /// Stable identifier assigned by the hosting platform.
    pub id: String,
    /// Human-readable title.
    #[serde(default = "default_title")]
    pub title: String,
    /// Extension of the file on disk (after post-processing).
    #[serde(default)]
    pub ext: Option<String>,
    /// Final path of the file on disk (after post-processing).
    #[serde(default)]
    pub filepath: Option<PathBuf>,
}

fn default_title() -> String {
    UNTITLED.to_string()
}

impl MediaInfo {
    /// Title reduced to a filesystem-safe file stem.
    pub fn file_stem(&self) -> String {
        let sanitized = sanitize_title(&self.title);
        if sanitized.is_empty() {
            UNTITLED.to_string()
        } else {
            sanitized
        }
    }
}

/// Keep only alphanumerics, spaces and hyphens, then trim trailing whitespace.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// A start/end pair in `HH:MM:SS` form. Not validated; ffmpeg rejects bad input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Filename suffix with colons replaced, e.g. `_00-01-30_00-02-45`.
    pub fn file_suffix(&self) -> String {
        format!("_{}_{}", self.start.replace(':', "-"), self.end.replace(':', "-"))
    }
}

/// What to do with a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Full,
    Segment(TimeRange),
}

/// A single user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub kind: RequestKind,
}

impl DownloadRequest {
    pub fn full(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: RequestKind::Full,
        }
    }

    pub fn segment(url: impl Into<String>, range: TimeRange) -> Self {
        Self {
            url: url.into(),
            kind: RequestKind::Segment(range),
        }
    }
}

/// Final path for a full download: `<dir>/<stem>.<ext>`.
pub fn full_output_path(dir: &Path, info: &MediaInfo, ext: &str) -> PathBuf {
    dir.join(format!("{}.{}", info.file_stem(), ext))
}

/// Final path for a segment: `<dir>/<stem>_<start>_<end>.<ext>`.
pub fn segment_output_path(dir: &Path, info: &MediaInfo, range: &TimeRange, ext: &str) -> PathBuf {
    dir.join(format!("{}{}.{}", info.file_stem(), range.file_suffix(), ext))
}
