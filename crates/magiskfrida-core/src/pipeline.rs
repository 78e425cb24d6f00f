//! End-to-end build orchestration.
//!
//! Platforms are built one after another: assemble, collect, package. By
//! default the first failure stops the run and the remaining platforms are
//! reported as skipped; [`FailurePolicy::KeepGoing`] attempts every one.

use std::path::PathBuf;

use reqwest::Client;
use thiserror::Error;

use magiskfrida_schema::{Platform, Release};

use crate::assembler::{AssemblyError, ModuleAssembler, StagingTree};
use crate::config::BuildConfig;
use crate::io::download::ArtifactCache;
use crate::manifest::ManifestCollector;
use crate::package::{PackageReport, Packager, PackagingError};
use crate::reporter::Reporter;
use crate::resolver::{ReleaseResolver, ResolveError};

/// A failed pipeline stage.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The release could not be determined.
    #[error("Could not resolve release: {0}")]
    Resolve(#[from] ResolveError),

    /// A staging tree could not be assembled.
    #[error("{platform}: assembly failed: {source}")]
    Assembly {
        /// Platform being built.
        platform: Platform,
        /// Cause.
        #[source]
        source: AssemblyError,
    },

    /// An archive could not be written.
    #[error("{platform}: packaging failed: {source}")]
    Packaging {
        /// Platform being built.
        platform: Platform,
        /// Cause.
        #[source]
        source: PackagingError,
    },

    /// The blocking packaging task panicked or was cancelled.
    #[error("{platform}: background task failed: {source}")]
    Task {
        /// Platform being built.
        platform: Platform,
        /// Cause.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl BuildError {
    /// Platform the error belongs to, if any.
    pub fn platform(&self) -> Option<Platform> {
        match self {
            Self::Resolve(_) => None,
            Self::Assembly { platform, .. }
            | Self::Packaging { platform, .. }
            | Self::Task { platform, .. } => Some(*platform),
        }
    }
}

/// What to do with the remaining platforms after one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop and skip the rest.
    #[default]
    Abort,
    /// Attempt every platform.
    KeepGoing,
}

/// A platform that was built.
#[derive(Debug, Clone)]
pub struct PlatformBuild {
    /// Platform built.
    pub platform: Platform,
    /// Output archive.
    pub archive: PathBuf,
    /// Packaging details.
    pub report: PackageReport,
    /// The staging tree the archive was made from.
    pub staging: StagingTree,
}

/// A platform that failed.
#[derive(Debug)]
pub struct PlatformFailure {
    /// Platform attempted.
    pub platform: Platform,
    /// Why it failed.
    pub error: BuildError,
}

/// Outcome of [`BuildPipeline::build_all`].
#[derive(Debug)]
pub struct BuildSummary {
    /// Release built.
    pub release: Release,
    /// Platforms that produced an archive, in build order.
    pub built: Vec<PlatformBuild>,
    /// Platforms that failed, in build order.
    pub failed: Vec<PlatformFailure>,
    /// Platforms not attempted because an earlier one failed.
    pub skipped: Vec<Platform>,
}

impl BuildSummary {
    /// Whether every requested platform was built.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// What a build would do for one platform, without doing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBuild {
    /// Platform.
    pub platform: Platform,
    /// Artifact download URL.
    pub url: String,
    /// Where the compressed artifact is cached.
    pub artifact: PathBuf,
    /// Staging directory that will be rebuilt.
    pub staging: PathBuf,
    /// Output archive.
    pub archive: PathBuf,
}

/// Resolves a release and builds installer archives for it.
#[derive(Debug)]
pub struct BuildPipeline<R: Reporter> {
    config: BuildConfig,
    resolver: ReleaseResolver,
    assembler: ModuleAssembler,
    collector: ManifestCollector,
    packager: Packager,
    reporter: R,
}

impl<R: Reporter> BuildPipeline<R> {
    /// Wire every stage from `config`, sharing `client` for network access.
    pub fn new(config: BuildConfig, client: Client, reporter: R) -> Self {
        let resolver = ReleaseResolver::new(client.clone(), config.upstream.release_url.clone());
        let assembler = ModuleAssembler::new(&config, ArtifactCache::new(client));
        let collector = ManifestCollector::from_layout(&config.layout);
        Self {
            config,
            resolver,
            assembler,
            collector,
            packager: Packager::new(),
            reporter,
        }
    }

    /// Use `packager` instead of the deflating default.
    #[must_use]
    pub fn with_packager(mut self, packager: Packager) -> Self {
        self.packager = packager;
        self
    }

    /// Use `pin` if given, otherwise ask upstream for the latest release.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Resolve`] if the pin is not a valid tag or the
    /// lookup fails.
    pub async fn resolve_release(&self, pin: Option<&str>) -> Result<Release, BuildError> {
        let release = match pin {
            Some(tag) => {
                let release = Release::new(tag).map_err(ResolveError::from)?;
                self.reporter.info(&format!(
                    "Using pinned release {release}, upstream not queried"
                ));
                release
            }
            None => self.resolver.resolve().await?,
        };
        self.reporter.resolved(&release);
        Ok(release)
    }

    /// Assemble, collect and package one platform.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] naming the stage that failed.
    pub async fn build_platform(
        &self,
        release: &Release,
        platform: Platform,
    ) -> Result<PlatformBuild, BuildError> {
        self.reporter.assembling(platform, release);
        let staging = self
            .assembler
            .assemble(platform, release)
            .await
            .map_err(|source| BuildError::Assembly { platform, source })?;

        let manifest = self.collector.collect(&staging.root);
        self.reporter.packaging(platform, manifest.len());

        let packager = self.packager;
        let root = staging.root.clone();
        let archive = self.config.archive_path(release, platform);
        let output = archive.clone();
        let report =
            tokio::task::spawn_blocking(move || packager.package(&manifest, &root, &output))
                .await
                .map_err(|source| BuildError::Task { platform, source })?
                .map_err(|source| BuildError::Packaging { platform, source })?;

        for entry in &report.missing {
            self.reporter
                .warning(&format!("{platform}: '{entry}' not found in staging tree"));
        }

        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.reporter.done(platform, &name, Some(report.size));

        Ok(PlatformBuild {
            platform,
            archive,
            report,
            staging,
        })
    }

    /// Build `platforms` in order under `policy`.
    pub async fn build_all(
        &self,
        release: &Release,
        platforms: &[Platform],
        policy: FailurePolicy,
    ) -> BuildSummary {
        self.reporter.section(&format!("Building {release}"));

        let mut summary = BuildSummary {
            release: release.clone(),
            built: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        };

        let mut remaining = platforms.iter().copied();
        for platform in remaining.by_ref() {
            match self.build_platform(release, platform).await {
                Ok(build) => summary.built.push(build),
                Err(error) => {
                    tracing::error!("{error}");
                    self.reporter.failed(platform, &error_chain(&error));
                    summary.failed.push(PlatformFailure { platform, error });
                    if policy == FailurePolicy::Abort {
                        break;
                    }
                }
            }
        }

        for platform in remaining {
            self.reporter.skipped(platform, "an earlier platform failed");
            summary.skipped.push(platform);
        }

        summary
    }

    /// Describe what [`build_all`](Self::build_all) would touch.
    pub fn dry_run_plan(&self, release: &Release, platforms: &[Platform]) -> Vec<PlannedBuild> {
        platforms
            .iter()
            .map(|&platform| PlannedBuild {
                platform,
                url: self.config.artifact_url(release, platform),
                artifact: self.config.artifact_path(release, platform),
                staging: self.config.staging_dir(platform),
                archive: self.config.archive_path(release, platform),
            })
            .collect()
    }
}

/// `error` followed by each of its sources, joined with `: `.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
