//! Pre-flight checks before the session starts.
//!
//! Missing tools are reported up front but are not fatal: the affected
//! requests fail with their own error message.

use crate::error::AudiocutError;
use crate::toolchain::Toolchain;

/// Check that yt-dlp and ffmpeg resolve through the toolchain.
///
/// Returns one error per missing tool.
pub fn check(toolchain: &Toolchain) -> Vec<AudiocutError> {
    [("yt-dlp", toolchain.ytdlp()), ("ffmpeg", toolchain.ffmpeg())]
        .into_iter()
        .filter(|(_, path)| !path.is_file())
        .map(|(name, _)| AudiocutError::ToolNotFound(name.to_string()))
        .collect()
}
