//! yt-dlp retrieval backend.
//!
//! Runs yt-dlp with a progress template and an `after_move` print template so
//! that progress and the final metadata arrive as tagged lines on its output.

use super::{FetchRequest, Retriever};
use crate::config::AudioSettings;
use crate::error::{AudiocutError, Result};
use crate::media::MediaInfo;
use crate::progress::ProgressObserver;
use crate::toolchain::Toolchain;
use async_trait::async_trait;
use regex::Regex;
use std::collections::VecDeque;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

const PROGRESS_TAG: &str = "[progress]";
const MEDIA_TAG: &str = "[media]";

/// Number of stderr lines kept for error messages.
const STDERR_TAIL: usize = 5;

/// A classified line of yt-dlp output.
#[derive(Debug, PartialEq)]
enum OutputLine {
    Progress {
        status: String,
        downloaded: Option<u64>,
        total: Option<u64>,
    },
    Media(MediaInfo),
    Other,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// yt-dlp retrieval backend.
pub struct YtDlp {
    toolchain: Toolchain,
    audio: AudioSettings,
    progress_regex: Regex,
}

impl YtDlp {
    pub fn new(toolchain: Toolchain, audio: AudioSettings) -> Self {
        let progress_regex = Regex::new(r"^\[progress\](\w+) (\S+) (\S+)$").expect("Invalid regex");

        Self {
            toolchain,
            audio,
            progress_regex,
        }
    }

    /// Build the yt-dlp argument list for a request.
    fn build_args(&self, request: &FetchRequest) -> Vec<String> {
        let template = request
            .dir
            .join(format!("%({})s.%(ext)s", request.key.template_field()));

        let mut args = vec![
            "--format".to_string(),
            self.audio.format.clone(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.audio.codec.clone(),
            "--audio-quality".to_string(),
            format!("{}K", self.audio.quality),
            "--output".to_string(),
            template.to_string_lossy().to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{PROGRESS_TAG}%(progress.status)s %(progress.downloaded_bytes)s \
                 %(progress.total_bytes,progress.total_bytes_estimate)s"
            ),
            "--print".to_string(),
            format!("after_move:{MEDIA_TAG}%(.{{id,title,ext,filepath}})j"),
        ];

        if let Some(location) = self.toolchain.ffmpeg_location() {
            args.push("--ffmpeg-location".to_string());
            args.push(location.to_string_lossy().to_string());
        }

        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }

    fn parse_line(&self, line: &str) -> Result<OutputLine> {
        let line = line.trim();

        if let Some(json) = line.strip_prefix(MEDIA_TAG) {
            let info: MediaInfo = serde_json::from_str(json)?;
            return Ok(OutputLine::Media(info));
        }

        if let Some(caps) = self.progress_regex.captures(line) {
            return Ok(OutputLine::Progress {
                status: caps[1].to_string(),
                downloaded: parse_bytes(&caps[2]),
                total: parse_bytes(&caps[3]),
            });
        }

        Ok(OutputLine::Other)
    }
}

/// Byte counts arrive as integers, floats (estimates) or `NA`.
fn parse_bytes(field: &str) -> Option<u64> {
    let value: f64 = field.parse().ok()?;
    (value.is_finite() && value >= 0.0).then(|| value as u64)
}

/// Forward lines of a child stream into the channel until it closes.
fn forward_lines<R>(reader: R, stream: Stream, tx: mpsc::UnboundedSender<(Stream, String)>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send((stream, line)).is_err() {
                break;
            }
        }
    });
}

#[async_trait]
impl Retriever for YtDlp {
    #[instrument(skip(self, observer), fields(url = %request.url))]
    async fn fetch(
        &self,
        request: &FetchRequest,
        observer: &mut dyn ProgressObserver,
    ) -> Result<MediaInfo> {
        info!("Downloading audio from {}", request.url);

        let spawned = self
            .toolchain
            .command(self.toolchain.ytdlp())
            .args(self.build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AudiocutError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(AudiocutError::Download(format!("yt-dlp execution failed: {e}")));
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, Stream::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, Stream::Stderr, tx);
        }

        let mut media = None;
        let mut stderr_tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);

        while let Some((stream, line)) = rx.recv().await {
            match self.parse_line(&line) {
                Ok(OutputLine::Progress {
                    status,
                    downloaded,
                    total,
                }) => match status.as_str() {
                    "downloading" => observer.advanced(downloaded.unwrap_or(0), total),
                    "finished" => observer.completed(),
                    _ => debug!("yt-dlp progress status {}", status),
                },
                Ok(OutputLine::Media(info)) => media = Some(info),
                Ok(OutputLine::Other) => {
                    debug!("yt-dlp: {}", line);
                    if matches!(stream, Stream::Stderr) && !line.trim().is_empty() {
                        if stderr_tail.len() == STDERR_TAIL {
                            stderr_tail.pop_front();
                        }
                        stderr_tail.push_back(line);
                    }
                }
                Err(e) => {
                    return Err(AudiocutError::Download(format!(
                        "Failed to parse yt-dlp output: {e}"
                    )));
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| AudiocutError::Download(format!("yt-dlp execution failed: {e}")))?;

        if !status.success() {
            return Err(AudiocutError::Download(format!(
                "yt-dlp failed: {}",
                Vec::from(stderr_tail).join("; ")
            )));
        }

        observer.completed();

        media.ok_or_else(|| {
            AudiocutError::Download("yt-dlp did not report the downloaded file".into())
        })
    }

    fn output_ext(&self) -> &str {
        &self.audio.codec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::FileKey;
    use std::path::{Path, PathBuf};

    fn backend() -> YtDlp {
        let toolchain = Toolchain::new(None, None, "yt-dlp", "ffmpeg").unwrap();
        YtDlp::new(toolchain, AudioSettings::default())
    }

    #[test]
    fn test_build_args() {
        let ytdlp = backend();
        let request = FetchRequest::new(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            Path::new("temp"),
            FileKey::Id,
        );
        let args = ytdlp.build_args(&request);

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("--format") + 1], "bestaudio/best");
        assert_eq!(args[pos("--audio-format") + 1], "mp3");
        assert_eq!(args[pos("--audio-quality") + 1], "192K");
        assert_eq!(
            PathBuf::from(&args[pos("--output") + 1]),
            Path::new("temp").join("%(id)s.%(ext)s")
        );
        assert_eq!(
            args[pos("--print") + 1],
            "after_move:[media]%(.{id,title,ext,filepath})j"
        );
        assert!(!args.contains(&"--ffmpeg-location".to_string()));

        // URL always comes last, after the option terminator.
        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args[args.len() - 1], request.url);
    }

    #[test]
    fn test_build_args_with_bundled_ffmpeg() {
        let bundled = tempfile::tempdir().unwrap();
        std::fs::write(bundled.path().join("audiocut-test-ffmpeg"), b"").unwrap();
        let toolchain = Toolchain::new(
            None,
            Some(bundled.path().to_path_buf()),
            "yt-dlp",
            "audiocut-test-ffmpeg",
        )
        .unwrap();

        let ytdlp = YtDlp::new(toolchain, AudioSettings::default());
        let request = FetchRequest::new("u", Path::new("output"), FileKey::Title);
        let args = ytdlp.build_args(&request);

        let pos = args.iter().position(|a| a == "--ffmpeg-location").unwrap();
        assert_eq!(PathBuf::from(&args[pos + 1]), bundled.path());
    }

    #[test]
    fn test_parse_progress_line() {
        let ytdlp = backend();

        assert_eq!(
            ytdlp.parse_line("[progress]downloading 1024 4096").unwrap(),
            OutputLine::Progress {
                status: "downloading".to_string(),
                downloaded: Some(1024),
                total: Some(4096),
            }
        );
        assert_eq!(
            ytdlp.parse_line("[progress]downloading 1024 4500.5").unwrap(),
            OutputLine::Progress {
                status: "downloading".to_string(),
                downloaded: Some(1024),
                total: Some(4500),
            }
        );
        assert_eq!(
            ytdlp.parse_line("[progress]finished 4096 NA").unwrap(),
            OutputLine::Progress {
                status: "finished".to_string(),
                downloaded: Some(4096),
                total: None,
            }
        );
    }

    #[test]
    fn test_parse_media_line() {
        let ytdlp = backend();
        let line = r#"[media]{"id": "dQw4w9WgXcQ", "title": "My Song: Live!", "ext": "mp3", "filepath": "output/My Song: Live!.mp3"}"#;

        match ytdlp.parse_line(line).unwrap() {
            OutputLine::Media(info) => {
                assert_eq!(info.id, "dQw4w9WgXcQ");
                assert_eq!(info.title, "My Song: Live!");
                assert_eq!(info.ext.as_deref(), Some("mp3"));
                assert_eq!(info.filepath, Some(PathBuf::from("output/My Song: Live!.mp3")));
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(ytdlp.parse_line("[media]{not json").is_err());
    }

    #[test]
    fn test_parse_other_lines() {
        let ytdlp = backend();
        assert_eq!(
            ytdlp.parse_line("[ExtractAudio] Destination: temp/abc.mp3").unwrap(),
            OutputLine::Other
        );
        assert_eq!(ytdlp.parse_line("").unwrap(), OutputLine::Other);
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes("NA"), None);
        assert_eq!(parse_bytes("12"), Some(12));
        assert_eq!(parse_bytes("12.9"), Some(12));
        assert_eq!(parse_bytes("-1"), None);
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use crate::toolchain::tests::fake_tool;

        #[derive(Debug, PartialEq)]
        enum Event {
            Advanced(u64, Option<u64>),
            Completed,
        }

        #[derive(Default)]
        struct Events(Vec<Event>);

        impl ProgressObserver for Events {
            fn advanced(&mut self, downloaded: u64, total: Option<u64>) {
                self.0.push(Event::Advanced(downloaded, total));
            }

            fn completed(&mut self) {
                self.0.push(Event::Completed);
            }
        }

        async fn fetch_with(script: &str) -> (Result<MediaInfo>, Vec<Event>) {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "yt-dlp", script);
            let toolchain = Toolchain::new(None, None, tool.to_str().unwrap(), "ffmpeg").unwrap();
            let ytdlp = YtDlp::new(toolchain, AudioSettings::default());
            let request = FetchRequest::new("https://example.com/v", dir.path(), FileKey::Id);

            let mut events = Events::default();
            let result = ytdlp.fetch(&request, &mut events).await;
            (result, events.0)
        }

        #[tokio::test]
        async fn test_fetch_reports_progress_and_media() {
            let (result, events) = fetch_with(
                r#"echo "[youtube] abc: Downloading webpage"
echo "[progress]downloading 1024 4096"
echo "[progress]downloading 2048 4096.0"
echo "[progress]finished 4096 4096"
echo '[media]{"id": "abc", "title": "Song", "ext": "mp3", "filepath": "/tmp/abc.mp3"}'
exit 0"#,
            )
            .await;

            let info = result.unwrap();
            assert_eq!(info.id, "abc");
            assert_eq!(info.filepath, Some(PathBuf::from("/tmp/abc.mp3")));

            assert_eq!(
                events[..3],
                [
                    Event::Advanced(1024, Some(4096)),
                    Event::Advanced(2048, Some(4096)),
                    Event::Completed,
                ]
            );
            assert_eq!(events.last(), Some(&Event::Completed));
        }

        #[tokio::test]
        async fn test_fetch_failure_carries_stderr() {
            let (result, events) = fetch_with(
                r#"echo "[youtube] abc: Downloading webpage"
echo "ERROR: [youtube] abc: Video unavailable" >&2
exit 1"#,
            )
            .await;

            match result {
                Err(AudiocutError::Download(msg)) => {
                    assert!(msg.starts_with("yt-dlp failed: "));
                    assert!(msg.contains("ERROR: [youtube] abc: Video unavailable"));
                }
                other => panic!("unexpected {other:?}"),
            }
            assert!(!events.contains(&Event::Completed));
        }

        #[tokio::test]
        async fn test_fetch_keeps_last_stderr_lines() {
            let (result, _) = fetch_with(
                r#"for n in 1 2 3 4 5 6 7; do echo "line $n" >&2; done
exit 1"#,
            )
            .await;

            let msg = result.unwrap_err().to_string();
            assert!(!msg.contains("line 2"));
            assert!(msg.contains("line 3; line 4; line 5; line 6; line 7"));
        }

        #[tokio::test]
        async fn test_fetch_without_media_line() {
            let (result, events) = fetch_with(
                r#"echo "[progress]finished 10 10"
exit 0"#,
            )
            .await;

            let msg = result.unwrap_err().to_string();
            assert!(msg.contains("did not report the downloaded file"));
            assert_eq!(events.last(), Some(&Event::Completed));
        }

        #[tokio::test]
        async fn test_fetch_bad_media_line() {
            let (result, _) = fetch_with(
                r#"echo '[media]{not json'
exit 0"#,
            )
            .await;

            match result {
                Err(AudiocutError::Download(msg)) => {
                    assert!(msg.starts_with("Failed to parse yt-dlp output"))
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }
}
