//! External tool discovery.
//!
//! The toolchain owns the search path handed to every child process: the
//! inherited `PATH` followed by the bundled toolchain directory. It is built
//! once at startup and passed to the collaborators, so the process
//! environment itself is never modified.

use crate::config::Settings;
use crate::error::{AudiocutError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Resolved locations of yt-dlp and ffmpeg plus the search path used to find them.
#[derive(Debug, Clone)]
pub struct Toolchain {
    search_path: OsString,
    dirs: Vec<PathBuf>,
    bundled_dir: Option<PathBuf>,
    ytdlp: PathBuf,
    ffmpeg: PathBuf,
}

impl Toolchain {
    /// Build the toolchain from settings and the current `PATH`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            std::env::var_os("PATH"),
            settings.bundled_dir(),
            &settings.tools.ytdlp,
            &settings.tools.ffmpeg,
        )
    }

    /// Build a toolchain from an explicit base search path.
    pub fn new(
        inherited: Option<OsString>,
        bundled_dir: Option<PathBuf>,
        ytdlp: &str,
        ffmpeg: &str,
    ) -> Result<Self> {
        let mut dirs: Vec<PathBuf> = inherited
            .as_deref()
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default();

        if let Some(bundled) = &bundled_dir {
            if !dirs.contains(bundled) {
                dirs.push(bundled.clone());
            }
        }

        let search_path = std::env::join_paths(&dirs)
            .map_err(|e| AudiocutError::Config(format!("Invalid search path: {e}")))?;

        let mut toolchain = Self {
            search_path,
            dirs,
            bundled_dir,
            ytdlp: PathBuf::new(),
            ffmpeg: PathBuf::new(),
        };
        toolchain.ytdlp = toolchain.locate(ytdlp);
        toolchain.ffmpeg = toolchain.locate(ffmpeg);

        debug!(ytdlp = ?toolchain.ytdlp, ffmpeg = ?toolchain.ffmpeg, "Toolchain resolved");
        Ok(toolchain)
    }

    /// Find an executable on the search path.
    ///
    /// Names containing a directory separator are checked as given.
    pub fn resolve(&self, program: &str) -> Option<PathBuf> {
        let candidate = Path::new(program);
        if candidate.components().count() > 1 {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }

        self.dirs
            .iter()
            .flat_map(|dir| executable_names(program).into_iter().map(move |n| dir.join(n)))
            .find(|path| path.is_file())
    }

    /// Fall back to the bare name so spawning reports `NotFound`.
    fn locate(&self, program: &str) -> PathBuf {
        self.resolve(program).unwrap_or_else(|| PathBuf::from(program))
    }

    pub fn ytdlp(&self) -> &Path {
        &self.ytdlp
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Directory to pass to yt-dlp as `--ffmpeg-location` when ffmpeg
    /// came from the bundled directory.
    pub fn ffmpeg_location(&self) -> Option<&Path> {
        let bundled = self.bundled_dir.as_deref()?;
        if self.ffmpeg.starts_with(bundled) {
            self.ffmpeg.parent()
        } else {
            None
        }
    }

    /// Create a command for a resolved tool with the augmented search path.
    pub fn command(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.env("PATH", &self.search_path);
        cmd
    }
}

fn executable_names(program: &str) -> Vec<String> {
    if cfg!(windows) && Path::new(program).extension().is_none() {
        vec![format!("{program}.exe"), program.to_string()]
    } else {
        vec![program.to_string()]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    /// Write an executable `/bin/sh` script standing in for an external tool.
    ///
    /// Children get only the toolchain's search path, so scripts should stick
    /// to shell builtins.
    #[cfg(unix)]
    pub(crate) fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_bundled_dir_appended_last() {
        let system = tempfile::tempdir().unwrap();
        let bundled = tempfile::tempdir().unwrap();
        let inherited = std::env::join_paths([system.path()]).unwrap();

        let toolchain = Toolchain::new(
            Some(inherited),
            Some(bundled.path().to_path_buf()),
            "yt-dlp",
            "ffmpeg",
        )
        .unwrap();

        let dirs: Vec<PathBuf> = std::env::split_paths(&toolchain.search_path).collect();
        assert_eq!(dirs, vec![system.path().to_path_buf(), bundled.path().to_path_buf()]);
    }

    #[test]
    fn test_inherited_path_wins() {
        let system = tempfile::tempdir().unwrap();
        let bundled = tempfile::tempdir().unwrap();
        let system_ffmpeg = touch(system.path(), "audiocut-test-ffmpeg");
        touch(bundled.path(), "audiocut-test-ffmpeg");
        let inherited = std::env::join_paths([system.path()]).unwrap();

        let toolchain = Toolchain::new(
            Some(inherited),
            Some(bundled.path().to_path_buf()),
            "yt-dlp",
            "audiocut-test-ffmpeg",
        )
        .unwrap();

        assert_eq!(toolchain.ffmpeg(), system_ffmpeg.as_path());
        assert!(toolchain.ffmpeg_location().is_none());
    }

    #[test]
    fn test_bundled_fallback() {
        let bundled = tempfile::tempdir().unwrap();
        let bundled_ffmpeg = touch(bundled.path(), "audiocut-test-ffmpeg");

        let toolchain = Toolchain::new(
            None,
            Some(bundled.path().to_path_buf()),
            "yt-dlp",
            "audiocut-test-ffmpeg",
        )
        .unwrap();

        assert_eq!(toolchain.ffmpeg(), bundled_ffmpeg.as_path());
        assert_eq!(toolchain.ffmpeg_location(), Some(bundled.path()));
    }

    #[test]
    fn test_unresolved_keeps_bare_name() {
        let toolchain = Toolchain::new(None, None, "audiocut-missing-tool", "ffmpeg").unwrap();
        assert_eq!(toolchain.ytdlp(), Path::new("audiocut-missing-tool"));
        assert!(toolchain.resolve("audiocut-missing-tool").is_none());
    }

    #[test]
    fn test_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = touch(dir.path(), "my-ytdlp");
        let toolchain = Toolchain::new(None, None, tool.to_str().unwrap(), "ffmpeg").unwrap();
        assert_eq!(toolchain.ytdlp(), tool.as_path());
    }
}
