//! audiocut - grab audio from online videos
//!
//! An interactive CLI that downloads the audio of an online video, either the
//! whole track or a trimmed segment, and saves it as mp3.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `toolchain` - Locating yt-dlp and ffmpeg
//! - `media` - Media metadata, requests and file naming
//! - `progress` - Download progress tracking
//! - `retrieval` - Audio retrieval (yt-dlp)
//! - `trim` - Segment trimming (ffmpeg)
//! - `pipeline` - Full and segment download pipelines
//! - `cli` - Interactive session
//!
//! # Example
//!
//! ```rust,no_run
//! use audiocut::config::Settings;
//! use audiocut::pipeline::Pipeline;
//! use audiocut::progress::NoProgress;
//! use audiocut::toolchain::Toolchain;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let toolchain = Toolchain::from_settings(&settings)?;
//!     let pipeline = Pipeline::new(&settings, toolchain);
//!
//!     let path = pipeline
//!         .download_full("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &mut NoProgress)
//!         .await?;
//!     println!("Saved {}", path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod progress;
pub mod retrieval;
pub mod toolchain;
pub mod trim;

pub use error::{AudiocutError, Result};
