//! Resolve command

use anyhow::{Context, Result};

use magiskfrida_core::{BuildConfig, ReleaseResolver};

/// Print the latest upstream release and its build code.
pub async fn resolve(config: &BuildConfig, client: reqwest::Client) -> Result<()> {
    let resolver = ReleaseResolver::new(client, config.upstream.release_url.clone());
    let release = resolver
        .resolve()
        .await
        .with_context(|| format!("Failed to resolve release from {}", resolver.endpoint()))?;

    println!("{} {}", release.tag(), release.build_code());
    Ok(())
}
