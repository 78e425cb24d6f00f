//! On-disk layout of a build workspace.
//!
//! ```text
//! <base>/
//! ├── base/        # Template tree, copied verbatim per platform
//! ├── downloads/   # Compressed upstream artifacts (kept across runs)
//! └── builds/
//!     ├── arm64/   # Staging tree (rebuilt every run)
//!     └── MagiskFrida-16.1.2-arm64.zip
//! ```

use std::path::{Path, PathBuf};

use magiskfrida_schema::Platform;

/// Absolute directories a build run reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    /// Root every relative path is resolved against.
    pub base: PathBuf,
    /// Template tree copied into each staging directory.
    pub template: PathBuf,
    /// Staging trees and output archives.
    pub builds: PathBuf,
    /// Download cache for compressed artifacts.
    pub downloads: PathBuf,
}

impl BuildPaths {
    /// Default layout under `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            template: base.join("base"),
            builds: base.join("builds"),
            downloads: base.join("downloads"),
            base,
        }
    }

    /// Staging directory for one platform: `<builds>/<platform>`.
    pub fn staging_dir(&self, platform: Platform) -> PathBuf {
        self.builds.join(platform.as_str())
    }

    /// Location of a cached download.
    pub fn download_path(&self, file_name: &str) -> PathBuf {
        self.downloads.join(file_name)
    }

    /// Location of an output archive.
    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.builds.join(file_name)
    }

    /// Create the downloads and builds directories if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.downloads)?;
        std::fs::create_dir_all(&self.builds)?;
        Ok(())
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.split('/').next_back().unwrap_or("")
}

/// Sibling path used while a file is being written: `<path>.part`.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
