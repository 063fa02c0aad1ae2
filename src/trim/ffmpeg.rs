//! ffmpeg trimming backend.

use super::Trimmer;
use crate::error::{AudiocutError, Result};
use crate::media::TimeRange;
use crate::toolchain::Toolchain;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tracing::{debug, instrument, warn};

/// Trims audio with ffmpeg, stream copy first and re-encode as fallback.
pub struct Ffmpeg {
    toolchain: Toolchain,
    /// Bitrate in kbit/s for the re-encode fallback.
    quality: String,
}

impl Ffmpeg {
    pub fn new(toolchain: Toolchain, quality: impl Into<String>) -> Self {
        Self {
            toolchain,
            quality: quality.into(),
        }
    }

    /// Seek options go before `-i` so both bounds refer to input timestamps.
    fn base_args(input: &Path, range: &TimeRange) -> Vec<OsString> {
        vec![
            "-hide_banner".into(),
            "-y".into(),
            "-ss".into(),
            range.start.clone().into(),
            "-to".into(),
            range.end.clone().into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-vn".into(),
        ]
    }

    fn copy_args(input: &Path, range: &TimeRange, output: &Path) -> Vec<OsString> {
        let mut args = Self::base_args(input, range);
        args.extend([
            "-c".into(),
            "copy".into(),
            "-loglevel".into(),
            "warning".into(),
            output.as_os_str().to_owned(),
        ]);
        args
    }

    fn encode_args(&self, input: &Path, range: &TimeRange, output: &Path) -> Vec<OsString> {
        let mut args = Self::base_args(input, range);
        args.extend([
            "-codec:a".into(),
            "libmp3lame".into(),
            "-b:a".into(),
            format!("{}k", self.quality).into(),
            "-loglevel".into(),
            "error".into(),
            output.as_os_str().to_owned(),
        ]);
        args
    }
}

#[async_trait]
impl Trimmer for Ffmpeg {
    #[instrument(skip(self), fields(start = %range.start, end = %range.end))]
    async fn trim(&self, input: &Path, range: &TimeRange, output: &Path) -> Result<()> {
        // First attempt: stream copy (fast, no quality loss)
        let copy_result = self
            .toolchain
            .command(self.toolchain.ffmpeg())
            .args(Self::copy_args(input, range, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match copy_result {
            Ok(out) if out.status.success() && output.exists() => return Ok(()),
            Ok(out) => debug!("Stream copy failed: {}", String::from_utf8_lossy(&out.stderr)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AudiocutError::ToolNotFound("ffmpeg".into()));
            }
            Err(e) => debug!("Stream copy failed: {e}"),
        }

        // Fallback: re-encode
        warn!("Stream copy failed, re-encoding segment");

        let encode_result = self
            .toolchain
            .command(self.toolchain.ffmpeg())
            .args(self.encode_args(input, range, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match encode_result {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                Err(AudiocutError::Trim(format!("ffmpeg failed: {}", err.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AudiocutError::ToolNotFound("ffmpeg".into()))
            }
            Err(e) => Err(AudiocutError::Trim(format!("ffmpeg error: {e}"))),
        }
    }
}
