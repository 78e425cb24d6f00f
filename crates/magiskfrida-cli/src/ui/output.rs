//! Unified UI output interface.
//!
//! Progress goes to stdout, one line per event. Warnings and errors are
//! always printed; `--quiet` drops everything else except per-platform
//! results.

use crossterm::style::{StyledContent, Stylize};

use magiskfrida_core::{PlannedBuild, Reporter};
use magiskfrida_schema::{Platform, Release};

use super::theme::{Theme, format_size};

/// A cloneable console handle.
#[derive(Debug, Clone, Default)]
pub struct Output {
    theme: Theme,
    quiet: bool,
}

impl Output {
    /// Create a new output handle.
    pub fn new(quiet: bool) -> Self {
        Self {
            theme: Theme::default(),
            quiet,
        }
    }

    /// Prints a visual section header for an operation phase.
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        println!();
        println!("{}", title.with(self.theme.colors.header).bold());
    }

    /// Prints an informational message to the console.
    pub fn info(&self, msg: &str) {
        if self.quiet {
            return;
        }
        println!("{} {msg}", self.theme.icons.info.with(self.theme.colors.secondary));
    }

    /// Prints a success message to the console.
    pub fn success(&self, msg: &str) {
        println!(
            "{} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            msg.with(self.theme.colors.success)
        );
    }

    /// Prints a warning message to the console.
    pub fn warning(&self, msg: &str) {
        println!(
            "{} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        );
    }

    /// Prints one row of a platform listing.
    pub fn platform_row(&self, platform: Platform, abi: &str, is_default: bool) {
        let marker = if is_default { "(default)" } else { "" };
        println!(
            "  {} {} {}",
            self.platform(platform),
            format!("{abi:<12}").with(self.theme.colors.secondary),
            marker.with(self.theme.colors.secondary)
        );
    }

    fn platform(&self, platform: Platform) -> StyledContent<String> {
        format!("{:<8}", platform.as_str()).with(self.theme.colors.platform)
    }

    /// Prints what a build would do for one platform.
    pub fn plan(&self, planned: &PlannedBuild) {
        println!(
            "{} {}",
            self.theme.icons.pending.with(self.theme.colors.secondary),
            self.platform(planned.platform)
        );
        println!("    download  {}", planned.url);
        println!("    cache     {}", planned.artifact.display());
        println!("    staging   {}", planned.staging.display());
        println!("    archive   {}", planned.archive.display());
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        self.section(title);
    }

    fn resolved(&self, release: &Release) {
        if self.quiet {
            return;
        }
        println!(
            "{} release {} (versionCode {})",
            self.theme.icons.info.with(self.theme.colors.secondary),
            release.tag().with(self.theme.colors.release).bold(),
            release.build_code()
        );
    }

    fn assembling(&self, platform: Platform, release: &Release) {
        if self.quiet {
            return;
        }
        println!(
            "{} {} assembling {}",
            self.theme.icons.active.with(self.theme.colors.secondary),
            self.platform(platform),
            release.tag()
        );
    }

    fn packaging(&self, platform: Platform, entries: usize) {
        if self.quiet {
            return;
        }
        println!(
            "{} {} packaging {entries} files",
            self.theme.icons.active.with(self.theme.colors.secondary),
            self.platform(platform)
        );
    }

    fn done(&self, platform: Platform, detail: &str, size: Option<u64>) {
        let size = size.map(format_size).unwrap_or_default();
        println!(
            "{} {} {} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            self.platform(platform),
            detail,
            size.with(self.theme.colors.secondary)
        );
    }

    fn failed(&self, platform: Platform, reason: &str) {
        eprintln!(
            "{} {} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            self.platform(platform),
            reason.with(self.theme.colors.error)
        );
    }

    fn skipped(&self, platform: Platform, reason: &str) {
        println!(
            "{} {} skipped: {}",
            self.theme.icons.pending.with(self.theme.colors.secondary),
            self.platform(platform),
            reason
        );
    }

    fn info(&self, msg: &str) {
        self.info(msg);
    }

    fn warning(&self, msg: &str) {
        self.warning(msg);
    }
}
