//! Audio retrieval abstraction.
//!
//! A [`Retriever`] downloads the best available audio for a URL, transcodes
//! it, and reports what it wrote. The production implementation drives
//! yt-dlp; tests substitute their own.

mod ytdlp;

pub use ytdlp::YtDlp;

use crate::error::Result;
use crate::media::MediaInfo;
use crate::progress::ProgressObserver;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Field the downloaded file is named after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKey {
    /// `<title>.<ext>`, used for full downloads.
    Title,
    /// `<id>.<ext>`, used for scratch files.
    Id,
}

impl FileKey {
    /// yt-dlp template field for this key.
    pub fn template_field(&self) -> &'static str {
        match self {
            FileKey::Title => "title",
            FileKey::Id => "id",
        }
    }
}

/// Parameters for one retrieval.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// Directory the file is written to.
    pub dir: PathBuf,
    pub key: FileKey,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, dir: &Path, key: FileKey) -> Self {
        Self {
            url: url.into(),
            dir: dir.to_path_buf(),
            key,
        }
    }

    /// Path the tool writes to when it does not report one, given the
    /// metadata and the post-processed extension.
    pub fn expected_path(&self, info: &MediaInfo, ext: &str) -> PathBuf {
        let stem = match self.key {
            FileKey::Title => &info.title,
            FileKey::Id => &info.id,
        };
        self.dir.join(format!("{stem}.{ext}"))
    }
}

/// Trait for audio retrieval backends.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Download and transcode the audio for `request.url`.
    ///
    /// Progress is reported to `observer`; the returned metadata carries the
    /// final file path when the backend knows it.
    async fn fetch(
        &self,
        request: &FetchRequest,
        observer: &mut dyn ProgressObserver,
    ) -> Result<MediaInfo>;

    /// Extension of the files this backend produces.
    fn output_ext(&self) -> &str;
}
