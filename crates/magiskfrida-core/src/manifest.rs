//! Archive manifest collection.
//!
//! A [`Manifest`] is the ordered list of staging-relative paths that go into
//! an archive. Order is deterministic: the explicit files first, as listed,
//! then each walk root depth-first. Inside a directory, files come before
//! subdirectories and each group is sorted by name. A path is listed once,
//! at its first position, even if an explicit entry also lies under a walk
//! root.

use std::collections::HashSet;
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::config::PackageLayout;

/// Ordered, `/`-separated paths relative to a staging root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<String>,
}

impl Manifest {
    /// Build a manifest from already-collected entries.
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// All entries, in archive order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in archive order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Decides which staging files end up in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestCollector {
    explicit: Vec<String>,
    roots: Vec<String>,
    sentinels: Vec<String>,
}

impl ManifestCollector {
    /// Create a collector.
    ///
    /// `explicit` entries are listed verbatim, `roots` are walked, and files
    /// named in `sentinels` are skipped during the walk.
    pub fn new(explicit: Vec<String>, roots: Vec<String>, sentinels: Vec<String>) -> Self {
        Self {
            explicit,
            roots,
            sentinels,
        }
    }

    /// Collector for a configured [`PackageLayout`].
    pub fn from_layout(layout: &PackageLayout) -> Self {
        Self::new(
            layout.files.clone(),
            layout.directories.clone(),
            layout.sentinels.clone(),
        )
    }

    /// List the files to package from `staging_root`.
    ///
    /// Explicit entries are not checked for existence. Walk roots that do not
    /// exist contribute nothing.
    pub fn collect(&self, staging_root: &Path) -> Manifest {
        let mut entries = Vec::with_capacity(self.explicit.len());
        let mut seen = HashSet::new();
        for name in &self.explicit {
            if seen.insert(name.clone()) {
                entries.push(name.clone());
            }
        }

        for root in &self.roots {
            let dir = staging_root.join(root);
            if !dir.exists() {
                tracing::debug!("Walk root {} does not exist, skipping", dir.display());
                continue;
            }

            let walker = WalkDir::new(&dir).sort_by(|a, b| {
                (a.file_type().is_dir(), a.file_name())
                    .cmp(&(b.file_type().is_dir(), b.file_name()))
            });

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable entry under {}: {e}", dir.display());
                        continue;
                    }
                };
                if entry.file_type().is_dir() || self.is_sentinel(&entry) {
                    continue;
                }
                if let Some(rel) = relative_name(staging_root, entry.path()) {
                    if seen.insert(rel.clone()) {
                        entries.push(rel);
                    }
                }
            }
        }

        Manifest::new(entries)
    }

    fn is_sentinel(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.sentinels.iter().any(|s| *s == name)
    }
}

/// `path` relative to `root`, joined with `/` regardless of platform.
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    fn default_collector() -> ManifestCollector {
        ManifestCollector::from_layout(&PackageLayout::default())
    }

    #[test]
    fn test_sentinels_are_excluded() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "common/service.sh");
        touch(dir.path(), "common/placeholder");
        touch(dir.path(), "system/xbin/.gitkeep");
        touch(dir.path(), "system/xbin/frida-server");

        let manifest = default_collector().collect(dir.path());

        assert_eq!(
            manifest.entries(),
            [
                "install.sh",
                "module.prop",
                "common/service.sh",
                "system/xbin/frida-server",
            ]
        );
    }

    #[test]
    fn test_each_file_appears_once() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "install.sh");
        touch(dir.path(), "module.prop");
        touch(dir.path(), "META-INF/com/google/android/update-binary");
        touch(dir.path(), "META-INF/com/google/android/updater-script");

        let manifest = default_collector().collect(dir.path());

        let mut seen = std::collections::HashSet::new();
        assert!(manifest.iter().all(|e| seen.insert(e.clone())));
        assert_eq!(manifest.len(), 4);
    }

    #[test]
    fn test_explicit_file_under_walk_root_is_listed_once() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "module.prop");
        touch(dir.path(), "system/xbin/frida-server");
        touch(dir.path(), "system/etc/hosts");

        let collector = ManifestCollector::new(
            vec!["module.prop".into(), "system/xbin/frida-server".into()],
            vec!["system".into()],
            vec![],
        );
        let manifest = collector.collect(dir.path());

        assert_eq!(
            manifest.entries(),
            [
                "module.prop",
                "system/xbin/frida-server",
                "system/etc/hosts",
            ]
        );
    }

    #[test]
    fn test_overlapping_roots_do_not_repeat_files() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "system/xbin/frida-server");

        let collector = ManifestCollector::new(
            vec![],
            vec!["system".into(), "system/xbin".into()],
            vec![],
        );
        assert_eq!(
            collector.collect(dir.path()).entries(),
            ["system/xbin/frida-server"]
        );
    }

    #[test]
    fn test_files_before_subdirectories() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "system/b/inner");
        touch(dir.path(), "system/z_file");
        touch(dir.path(), "system/a/inner");
        touch(dir.path(), "system/a_file");

        let collector = ManifestCollector::new(vec![], vec!["system".into()], vec![]);
        let manifest = collector.collect(dir.path());

        assert_eq!(
            manifest.entries(),
            [
                "system/a_file",
                "system/z_file",
                "system/a/inner",
                "system/b/inner",
            ]
        );
    }

    #[test]
    fn test_roots_keep_configured_order() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "system/x");
        touch(dir.path(), "common/y");

        let collector =
            ManifestCollector::new(vec![], vec!["system".into(), "common".into()], vec![]);
        assert_eq!(collector.collect(dir.path()).entries(), ["system/x", "common/y"]);
    }

    #[test]
    fn test_missing_roots_contribute_nothing() {
        let dir = tempdir().unwrap();
        let manifest = default_collector().collect(dir.path());
        assert_eq!(manifest.entries(), ["install.sh", "module.prop"]);
    }

    #[test]
    fn test_collect_is_deterministic() {
        let dir = tempdir().unwrap();
        for rel in ["system/c", "system/a", "common/q/r", "common/p", "META-INF/s"] {
            touch(dir.path(), rel);
        }
        let collector = default_collector();
        assert_eq!(collector.collect(dir.path()), collector.collect(dir.path()));
    }
}
