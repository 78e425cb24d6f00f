//! Core library for the MagiskFrida module builder.
//!
//! Turns an upstream frida-server release into one Magisk installer archive
//! per Android platform:
//!
//! 1. [`ReleaseResolver`] finds the release tag.
//! 2. [`ModuleAssembler`] copies the template, writes `module.prop`, and places
//!    the server binary fetched by [`ArtifactCache`] and decoded by
//!    [`extract_xz`](io::extract::extract_xz).
//! 3. [`ManifestCollector`] lists the files to ship.
//! 4. [`Packager`] writes the zip archive.
//!
//! [`BuildPipeline`] runs these in order for each platform.

pub mod assembler;
pub mod config;
pub mod io;
pub mod manifest;
pub mod package;
pub mod paths;
pub mod pipeline;
pub mod resolver;

pub mod reporter;

pub use assembler::{AssemblyError, ModuleAssembler, StagingTree};
pub use config::{BuildConfig, PackageLayout, Upstream};
pub use io::download::{ArtifactCache, FetchError, FetchOutcome};
pub use io::extract::{ExtractError, ExtractOutcome};
pub use manifest::{Manifest, ManifestCollector};
pub use package::{PackageReport, Packager, PackagingError};
pub use paths::BuildPaths;
pub use pipeline::{
    BuildError, BuildPipeline, BuildSummary, FailurePolicy, PlannedBuild, PlatformBuild,
    PlatformFailure,
};
pub use reporter::{NullReporter, Reporter};
pub use resolver::{ReleaseResolver, ResolveError};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("magiskfrida-core/", env!("CARGO_PKG_VERSION"));
