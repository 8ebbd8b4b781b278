use std::path::PathBuf;

use ruleseer_core::config::{Config, Settings};

/// Logs go to stderr so stdout carries only results. `RUST_LOG` overrides the default `info`.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Layered settings for the current `RUST_ENV`, with optional path overrides from the command line.
pub fn load_settings(data_dir: Option<PathBuf>, index_dir: Option<PathBuf>) -> anyhow::Result<Settings> {
    let config = Config::load()?;
    let mut settings = config.settings()?;
    if let Some(dir) = data_dir {
        settings.paths.data_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(dir) = index_dir {
        settings.paths.index_dir = dir.to_string_lossy().into_owned();
    }
    tracing::debug!(env = config.env_name(), ?settings, "settings loaded");
    Ok(settings)
}
