//! Build command

use anyhow::{Context, Result, bail};

use magiskfrida_core::{BuildConfig, BuildPipeline, FailurePolicy};
use magiskfrida_schema::{Platform, Release};

use crate::ui::Output;

/// Options for one `build` invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub platforms: Vec<Platform>,
    pub release: Option<String>,
    pub keep_going: bool,
    pub dry_run: bool,
}

/// Build an installer archive for each requested platform.
pub async fn build(
    config: BuildConfig,
    client: reqwest::Client,
    options: BuildOptions,
    output: &Output,
) -> Result<()> {
    let platforms = select_platforms(&options.platforms, &config.platforms);
    if !options.dry_run {
        config.paths.ensure_dirs().with_context(|| {
            format!(
                "Failed to create {} or {}",
                config.paths.downloads.display(),
                config.paths.builds.display()
            )
        })?;
    }
    let pipeline = BuildPipeline::new(config, client, output.clone());

    output.section("Resolving");
    let release = pipeline
        .resolve_release(options.release.as_deref())
        .await
        .context("Failed to resolve release")?;

    if options.dry_run {
        return print_plan(&pipeline, &release, &platforms, output);
    }

    let policy = if options.keep_going {
        FailurePolicy::KeepGoing
    } else {
        FailurePolicy::Abort
    };
    let summary = pipeline.build_all(&release, &platforms, policy).await;

    println!();
    if summary.is_success() {
        let count = summary.built.len();
        output.success(&format!(
            "{count} archive{} built for {release}",
            if count == 1 { "" } else { "s" }
        ));
        return Ok(());
    }

    if !summary.skipped.is_empty() {
        output.info("Use --keep-going to attempt the remaining platforms");
    }
    bail!(
        "{} of {} platforms failed ({} skipped)",
        summary.failed.len(),
        platforms.len(),
        summary.skipped.len()
    )
}

fn print_plan(
    pipeline: &BuildPipeline<Output>,
    release: &Release,
    platforms: &[Platform],
    output: &Output,
) -> Result<()> {
    output.section(&format!("Plan for {release}"));
    for planned in pipeline.dry_run_plan(release, platforms) {
        output.plan(&planned);
    }
    println!();
    output.info("Dry run: nothing downloaded or written");
    Ok(())
}

/// `requested` without duplicates, or the configured set when empty.
fn select_platforms(requested: &[Platform], configured: &[Platform]) -> Vec<Platform> {
    let source = if requested.is_empty() {
        configured
    } else {
        requested
    };

    let mut selected = Vec::with_capacity(source.len());
    for &platform in source {
        if !selected.contains(&platform) {
            selected.push(platform);
        }
    }
    selected
}
