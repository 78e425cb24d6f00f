//! Reporter trait for dependency injection
//!
//! The pipeline reports progress through this trait so it is not coupled to
//! a particular console implementation.

use magiskfrida_schema::{Platform, Release};

/// Receives progress events from a [`BuildPipeline`](crate::pipeline::BuildPipeline).
pub trait Reporter: Send + Sync {
    /// A new phase has started (e.g. "Resolving", "Building").
    fn section(&self, title: &str);

    /// The release a run will build.
    fn resolved(&self, release: &Release);

    /// A platform's staging tree is being assembled.
    fn assembling(&self, platform: Platform, release: &Release);

    /// A platform's archive is being written.
    fn packaging(&self, platform: Platform, entries: usize);

    /// A platform finished successfully.
    fn done(&self, platform: Platform, detail: &str, size: Option<u64>);

    /// A platform failed.
    fn failed(&self, platform: Platform, reason: &str);

    /// A platform was not attempted.
    fn skipped(&self, platform: Platform, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn resolved(&self, release: &Release) {
        (**self).resolved(release);
    }
    fn assembling(&self, platform: Platform, release: &Release) {
        (**self).assembling(platform, release);
    }
    fn packaging(&self, platform: Platform, entries: usize) {
        (**self).packaging(platform, entries);
    }
    fn done(&self, platform: Platform, detail: &str, size: Option<u64>) {
        (**self).done(platform, detail, size);
    }
    fn failed(&self, platform: Platform, reason: &str) {
        (**self).failed(platform, reason);
    }
    fn skipped(&self, platform: Platform, reason: &str) {
        (**self).skipped(platform, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn resolved(&self, _: &Release) {}
    fn assembling(&self, _: Platform, _: &Release) {}
    fn packaging(&self, _: Platform, _: usize) {}
    fn done(&self, _: Platform, _: &str, _: Option<u64>) {}
    fn failed(&self, _: Platform, _: &str) {}
    fn skipped(&self, _: Platform, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
