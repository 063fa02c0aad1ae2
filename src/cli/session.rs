//! Interactive menu session.
//!
//! Reads menu choices and request details line by line, runs one request at a
//! time, and reports each outcome as a single line. Pipeline errors never end
//! the session; only `3` or end of input does, after which the temp directory
//! is removed.

use crate::error::Result;
use crate::media::{DownloadRequest, RequestKind, TimeRange};
use crate::pipeline::Pipeline;
use crate::progress::TerminalProgress;
use console::style;
use std::io::{BufRead, Write};
use tracing::{info, warn};

/// A menu selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Full,
    Segment,
    Exit,
}

impl MenuChoice {
    /// Exact match only; no trimming or case folding.
    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "1" => Some(MenuChoice::Full),
            "2" => Some(MenuChoice::Segment),
            "3" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

/// Interactive session over any line-based input and output.
pub struct Session<'a, R, W> {
    pipeline: &'a Pipeline,
    input: R,
    out: W,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(pipeline: &'a Pipeline, input: R, out: W) -> Self {
        Self {
            pipeline,
            input,
            out,
        }
    }

    /// Run until the user exits or input ends, then clean up.
    ///
    /// Cleanup also runs when the loop stops on an I/O error; that error is
    /// returned afterwards.
    pub async fn run(&mut self) -> Result<()> {
        let served = self.serve().await;
        let cleaned = self.finish();
        served.and(cleaned)
    }

    async fn serve(&mut self) -> Result<()> {
        loop {
            self.print_menu()?;
            let Some(choice) = self.prompt("Enter your choice: ")? else {
                break;
            };

            let request = match MenuChoice::parse(&choice) {
                Some(MenuChoice::Full) => {
                    let Some(url) = self.prompt("Enter the YouTube URL: ")? else {
                        break;
                    };
                    DownloadRequest::full(url)
                }
                Some(MenuChoice::Segment) => {
                    let Some(url) = self.prompt("Enter the YouTube URL: ")? else {
                        break;
                    };
                    let Some(start) = self.prompt("Enter the start time (HH:MM:SS): ")? else {
                        break;
                    };
                    let Some(end) = self.prompt("Enter the end time (HH:MM:SS): ")? else {
                        break;
                    };
                    DownloadRequest::segment(url, TimeRange::new(start, end))
                }
                Some(MenuChoice::Exit) => break,
                None => {
                    warn!(input = %choice, "invalid choice");
                    writeln!(self.out, "Invalid choice. Please try again.")?;
                    continue;
                }
            };

            self.handle(&request).await?;
        }

        Ok(())
    }

    /// Run one request and print its outcome.
    async fn handle(&mut self, request: &DownloadRequest) -> Result<()> {
        let announce = match &request.kind {
            RequestKind::Full => format!("Downloading full audio from {}...", request.url),
            RequestKind::Segment(range) => format!(
                "Downloading audio segment from {} between {} and {}...",
                request.url, range.start, range.end
            ),
        };
        writeln!(self.out, "{} {}", style(">>").cyan().bold(), announce)?;

        let mut progress = TerminalProgress::new("Downloading");
        match self.pipeline.run(request, &mut progress).await {
            Ok(path) => {
                writeln!(
                    self.out,
                    "{} Successfully downloaded {}",
                    style(">>").green().bold(),
                    path.display()
                )?;
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "Request failed");
                writeln!(
                    self.out,
                    "{} Error downloading {}: {}",
                    style(">>").red().bold(),
                    request.url,
                    e
                )?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match self.pipeline.cleanup() {
            Ok(true) => info!("Temporary files removed"),
            Ok(false) => {}
            Err(e) => {
                writeln!(
                    self.out,
                    "{} Failed to remove {}: {}",
                    style(">>").yellow().bold(),
                    self.pipeline.temp_dir().display(),
                    e
                )?;
            }
        }
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.out, "{}", style("Choose an option:").bold())?;
        writeln!(self.out, "1. Download full video audio")?;
        writeln!(self.out, "2. Download video audio segment")?;
        writeln!(self.out, "3. Exit")?;
        Ok(())
    }

    /// Print a prompt and read one line. `None` at end of input.
    ///
    /// Input is taken as raw bytes; invalid UTF-8 is replaced rather than
    /// rejected.
    fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.out, "{}", prompt)?;
        self.out.flush()?;

        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.strip_suffix('\n').unwrap_or(&line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        Ok(Some(line.to_string()))
    }
}
