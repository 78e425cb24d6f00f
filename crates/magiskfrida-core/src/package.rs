//! Installer archive writing.
//!
//! The archive is written to a temporary file next to the output and
//! persisted over it only once complete. Manifest entries whose source is
//! missing are warned about and skipped, never fatal.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::manifest::Manifest;

/// Why an archive could not be written.
#[derive(Error, Debug)]
pub enum PackagingError {
    /// The temporary archive could not be created next to the output.
    #[error("Failed to create archive in {path}: {source}")]
    Create {
        /// Directory the archive was to be created in.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An entry could not be added, or the archive could not be finalised.
    #[error("Failed to write '{entry}': {source}")]
    Write {
        /// Manifest entry being written (empty when finalising).
        entry: String,
        /// Underlying error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The finished archive could not be moved to its output path.
    #[error("Failed to move archive to {path}: {source}")]
    Persist {
        /// Output path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Result of a successful [`Packager::package`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    /// Path of the finished archive.
    pub archive: PathBuf,
    /// Entries stored, in archive order.
    pub written: Vec<String>,
    /// Manifest entries with no file in the staging tree.
    pub missing: Vec<String>,
    /// Archive size on disk.
    pub size: u64,
}

/// Writes a [`Manifest`] into a zip archive.
#[derive(Debug, Clone, Copy)]
pub struct Packager {
    compression: CompressionMethod,
}

impl Default for Packager {
    fn default() -> Self {
        Self::new()
    }
}

impl Packager {
    /// Deflate-compressed entries.
    pub fn new() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
        }
    }

    /// Uncompressed entries.
    pub fn stored() -> Self {
        Self {
            compression: CompressionMethod::Stored,
        }
    }

    /// Write every present manifest entry from `staging_root` into `output`.
    ///
    /// Entries are stored under their manifest name. On Unix, permission bits
    /// are copied from the source file.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError`] if the archive cannot be created, written or
    /// moved into place. `output` is left untouched in that case.
    pub fn package(
        &self,
        manifest: &Manifest,
        staging_root: &Path,
        output: &Path,
    ) -> Result<PackageReport, PackagingError> {
        tracing::info!("Writing archive {}", output.display());

        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(|source| PackagingError::Create {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(manifest.len());
        let mut missing = Vec::new();

        {
            let mut zip = ZipWriter::new(temp.as_file_mut());

            for entry in manifest {
                let src = staging_root.join(entry);
                if !src.is_file() {
                    tracing::warn!("Missing file {}, skipping", src.display());
                    missing.push(entry.clone());
                    continue;
                }

                self.add_file(&mut zip, entry, &src)
                    .map_err(|source| PackagingError::Write {
                        entry: entry.clone(),
                        source,
                    })?;
                written.push(entry.clone());
            }

            zip.finish().map_err(|source| PackagingError::Write {
                entry: String::new(),
                source,
            })?;
        }

        temp.persist(output)
            .map_err(|e| PackagingError::Persist {
                path: output.to_path_buf(),
                source: e.error,
            })?;

        let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        tracing::debug!(
            "Wrote {} entries ({} missing) to {}",
            written.len(),
            missing.len(),
            output.display()
        );

        Ok(PackageReport {
            archive: output.to_path_buf(),
            written,
            missing,
            size,
        })
    }

    fn add_file<W: std::io::Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        name: &str,
        src: &Path,
    ) -> zip::result::ZipResult<()> {
        let mut options = SimpleFileOptions::default().compression_method(self.compression);
        if let Some(mode) = unix_mode(src)? {
            options = options.unix_permissions(mode);
        }

        zip.start_file(name, options)?;
        let mut file = File::open(src)?;
        std::io::copy(&mut file, zip)?;
        Ok(())
    }
}

#[cfg(unix)]
fn unix_mode(path: &Path) -> std::io::Result<Option<u32>> {
    use std::os::unix::fs::PermissionsExt;
    Ok(Some(std::fs::metadata(path)?.permissions().mode() & 0o7777))
}

#[cfg(not(unix))]
fn unix_mode(_path: &Path) -> std::io::Result<Option<u32>> {
    Ok(None)
}
