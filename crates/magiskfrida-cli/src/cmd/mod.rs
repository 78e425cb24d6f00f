//! Command implementations

pub mod build;
pub mod clean;
pub mod platforms;
pub mod resolve;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use magiskfrida_core::BuildConfig;

/// Upstream endpoints given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct UpstreamOverrides {
    pub release_url: Option<String>,
    pub download_url: Option<String>,
}

/// Load the configuration for `base_dir` and apply command-line overrides.
pub fn load_config(
    base_dir: &Path,
    config: Option<&Path>,
    overrides: &UpstreamOverrides,
) -> Result<BuildConfig> {
    let base = absolute_base(base_dir)?;
    let mut config = BuildConfig::load(&base, config)?;

    if let Some(url) = &overrides.release_url {
        config.upstream.release_url.clone_from(url);
    }
    if let Some(url) = &overrides.download_url {
        config.upstream.download_url.clone_from(url);
    }
    config.validate()?;

    tracing::debug!("Base directory: {}", config.paths.base.display());
    Ok(config)
}

fn absolute_base(base_dir: &Path) -> Result<PathBuf> {
    if base_dir.is_absolute() {
        return Ok(base_dir.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    Ok(cwd.join(base_dir))
}

/// HTTP client shared by every network stage.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(magiskfrida_core::USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}
