//! Configuration module for audiocut.

mod settings;

pub use settings::{AudioSettings, GeneralSettings, Settings, ToolSettings};
