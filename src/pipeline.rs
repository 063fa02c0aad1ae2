//! Download pipelines.
//!
//! Coordinates retrieval, renaming, and trimming for the two request kinds.

use crate::config::Settings;
use crate::error::Result;
use crate::media::{self, DownloadRequest, MediaInfo, RequestKind, TimeRange};
use crate::progress::ProgressObserver;
use crate::retrieval::{FetchRequest, FileKey, Retriever, YtDlp};
use crate::toolchain::Toolchain;
use crate::trim::{Ffmpeg, Trimmer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Runs full-audio and segment downloads against the configured directories.
pub struct Pipeline {
    retriever: Arc<dyn Retriever>,
    trimmer: Arc<dyn Trimmer>,
    output_dir: PathBuf,
    temp_dir: PathBuf,
}

impl Pipeline {
    /// Create a pipeline backed by yt-dlp and ffmpeg.
    pub fn new(settings: &Settings, toolchain: Toolchain) -> Self {
        let retriever = Arc::new(YtDlp::new(toolchain.clone(), settings.audio.clone()));
        let trimmer = Arc::new(Ffmpeg::new(toolchain, settings.audio.quality.clone()));

        Self::with_components(retriever, trimmer, settings.output_dir(), settings.temp_dir())
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        retriever: Arc<dyn Retriever>,
        trimmer: Arc<dyn Trimmer>,
        output_dir: PathBuf,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            retriever,
            trimmer,
            output_dir,
            temp_dir,
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Run a request of either kind.
    pub async fn run(
        &self,
        request: &DownloadRequest,
        observer: &mut dyn ProgressObserver,
    ) -> Result<PathBuf> {
        match &request.kind {
            RequestKind::Full => self.download_full(&request.url, observer).await,
            RequestKind::Segment(range) => {
                self.download_segment(&request.url, range, observer).await
            }
        }
    }

    /// Download the whole audio track to `<output>/<sanitized title>.<ext>`.
    #[instrument(skip(self, observer))]
    pub async fn download_full(
        &self,
        url: &str,
        observer: &mut dyn ProgressObserver,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let request = FetchRequest::new(url, &self.output_dir, FileKey::Title);
        let info = self.retriever.fetch(&request, observer).await?;

        let ext = self.retriever.output_ext();
        let downloaded = self.downloaded_path(&request, &info);
        let target = media::full_output_path(&self.output_dir, &info, ext);

        if downloaded != target {
            debug!("Renaming {:?} to {:?}", downloaded, target);
            std::fs::rename(&downloaded, &target)?;
        }

        info!("Saved full audio to {:?}", target);
        Ok(target)
    }

    /// Download the audio to scratch space and cut `range` out of it into
    /// `<output>/<sanitized title>_<start>_<end>.<ext>`.
    ///
    /// The scratch file is removed only after a successful trim.
    #[instrument(skip(self, observer), fields(start = %range.start, end = %range.end))]
    pub async fn download_segment(
        &self,
        url: &str,
        range: &TimeRange,
        observer: &mut dyn ProgressObserver,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.temp_dir)?;

        let request = FetchRequest::new(url, &self.temp_dir, FileKey::Id);
        let info = self.retriever.fetch(&request, observer).await?;
        let scratch = self.downloaded_path(&request, &info);

        std::fs::create_dir_all(&self.output_dir)?;
        let target =
            media::segment_output_path(&self.output_dir, &info, range, self.retriever.output_ext());

        self.trimmer.trim(&scratch, range, &target).await?;

        if let Err(e) = std::fs::remove_file(&scratch) {
            warn!("Failed to remove temporary file {:?}: {}", scratch, e);
        }

        info!("Saved segment to {:?}", target);
        Ok(target)
    }

    /// Remove the scratch directory. Returns whether it existed.
    pub fn cleanup(&self) -> Result<bool> {
        if !self.temp_dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&self.temp_dir)?;
        debug!("Removed temp directory {:?}", self.temp_dir);
        Ok(true)
    }

    /// Reported path if the backend gave one, else the template path with
    /// the reported extension (or the backend's output extension).
    fn downloaded_path(&self, request: &FetchRequest, info: &MediaInfo) -> PathBuf {
        match &info.filepath {
            Some(path) => path.clone(),
            None => {
                let ext = info.ext.as_deref().unwrap_or(self.retriever.output_ext());
                request.expected_path(info, ext)
            }
        }
    }
}
