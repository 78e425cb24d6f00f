//! Clean command

use anyhow::{Context, Result};
use std::path::Path;

use magiskfrida_core::BuildConfig;

use crate::ui::Output;

/// Remove the builds directory, and the download cache with `downloads`.
pub fn clean(config: &BuildConfig, downloads: bool, dry_run: bool, output: &Output) -> Result<()> {
    remove(&config.paths.builds, dry_run, output)?;
    if downloads {
        remove(&config.paths.downloads, dry_run, output)?;
    }

    if !dry_run {
        output.success("Workspace is clean.");
    }
    Ok(())
}

fn remove(dir: &Path, dry_run: bool, output: &Output) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    if dry_run {
        output.info(&format!("Would remove {}", dir.display()));
        return Ok(());
    }

    output.info(&format!("Removing {}", dir.display()));
    std::fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_clean_keeps_downloads_by_default() {
        let dir = tempdir().unwrap();
        let config = BuildConfig::new(dir.path());
        std::fs::create_dir_all(config.paths.builds.join("arm")).unwrap();
        std::fs::create_dir_all(&config.paths.downloads).unwrap();

        clean(&config, false, false, &Output::new(true)).unwrap();

        assert!(!config.paths.builds.exists());
        assert!(config.paths.downloads.exists());
    }

    #[test]
    fn test_clean_dry_run_removes_nothing() {
        let dir = tempdir().unwrap();
        let config = BuildConfig::new(dir.path());
        std::fs::create_dir_all(&config.paths.builds).unwrap();
        std::fs::create_dir_all(&config.paths.downloads).unwrap();

        clean(&config, true, true, &Output::new(true)).unwrap();

        assert!(config.paths.builds.exists());
        assert!(config.paths.downloads.exists());
    }

    #[test]
    fn test_clean_with_downloads() {
        let dir = tempdir().unwrap();
        let config = BuildConfig::new(dir.path());
        std::fs::create_dir_all(&config.paths.downloads).unwrap();

        clean(&config, true, false, &Output::new(true)).unwrap();
        assert!(!config.paths.downloads.exists());
    }
}
