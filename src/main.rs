//! audiocut CLI entry point.

use anyhow::Result;
use audiocut::cli::{preflight, Cli, Output, Session};
use audiocut::config::Settings;
use audiocut::pipeline::Pipeline;
use audiocut::toolchain::Toolchain;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    if cli.init_config {
        if config_path.exists() {
            Output::warning(&format!("Config file exists: {}", config_path.display()));
        } else {
            settings.save_to(&config_path)?;
            Output::success(&format!("Created config file: {}", config_path.display()));
        }
        return Ok(());
    }

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("audiocut={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let toolchain = Toolchain::from_settings(&settings)?;
    for missing in preflight::check(&toolchain) {
        Output::warning(&missing.to_string());
    }

    let pipeline = Pipeline::new(&settings, toolchain);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    if let Err(e) = Session::new(&pipeline, stdin.lock(), stdout.lock()).run().await {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    Ok(())
}
