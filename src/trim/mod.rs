//! Audio trimming abstraction.

mod ffmpeg;

pub use ffmpeg::Ffmpeg;

use crate::error::Result;
use crate::media::TimeRange;
use async_trait::async_trait;
use std::path::Path;

/// Trait for media-editing backends that cut a time range out of a file.
#[async_trait]
pub trait Trimmer: Send + Sync {
    /// Write `range` of `input` to `output`, returning once the file is complete.
    async fn trim(&self, input: &Path, range: &TimeRange, output: &Path) -> Result<()>;
}
