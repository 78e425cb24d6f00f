//! Single-file xz decompression.
//!
//! Upstream ships each server binary as one xz stream, not an archive, so
//! extraction is "decode the whole stream to one path".

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;
use xz2::read::XzDecoder;

use crate::paths::partial_path;

/// Why an artifact could not be extracted.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The source is not a valid (or complete) xz stream.
    #[error("Failed to decompress {path}: {source}")]
    Decompress {
        /// Compressed source file.
        path: String,
        /// Decoder error.
        #[source]
        source: io::Error,
    },

    /// The source could not be opened or the destination written.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// What [`extract_xz`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The destination already existed and was left alone.
    Skipped,
    /// The stream was decoded.
    Extracted {
        /// Decompressed size.
        bytes: u64,
    },
}

/// Decompress the xz stream at `archive_path` into `dest_path`.
///
/// Does nothing if `dest_path` exists, even when the source has changed since;
/// callers wanting a fresh result remove the destination first. Output goes to
/// `<dest>.part` and is renamed on success, so a truncated source never leaves
/// a destination behind.
///
/// # Errors
///
/// Returns [`ExtractError::Decompress`] for malformed or truncated input and
/// [`ExtractError::Io`] if the source cannot be read or the destination
/// cannot be created.
pub fn extract_xz(archive_path: &Path, dest_path: &Path) -> Result<ExtractOutcome, ExtractError> {
    tracing::info!(
        "Extracting '{}' to '{}'",
        archive_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy(),
        dest_path.file_name().unwrap_or_default().to_string_lossy()
    );

    if dest_path.exists() {
        tracing::debug!("{} already exists, skipping", dest_path.display());
        return Ok(ExtractOutcome::Skipped);
    }

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let source = File::open(archive_path)?;
    let part = partial_path(dest_path);

    match decode_into(source, &part) {
        Ok(bytes) => {
            fs::rename(&part, dest_path)?;
            Ok(ExtractOutcome::Extracted { bytes })
        }
        Err(e) => {
            let _ = fs::remove_file(&part);
            Err(match e {
                DecodeFailure::Read(source) => ExtractError::Decompress {
                    path: archive_path.display().to_string(),
                    source,
                },
                DecodeFailure::Write(e) => ExtractError::Io(e),
            })
        }
    }
}

enum DecodeFailure {
    Read(io::Error),
    Write(io::Error),
}

fn decode_into(source: File, part: &Path) -> Result<u64, DecodeFailure> {
    let mut decoder = XzDecoder::new(BufReader::new(source));
    let out = File::create(part).map_err(DecodeFailure::Write)?;
    let mut writer = BufWriter::new(out);

    let mut buf = [0u8; 64 * 1024];
    let mut total: u64 = 0;
    loop {
        let n = io::Read::read(&mut decoder, &mut buf).map_err(DecodeFailure::Read)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).map_err(DecodeFailure::Write)?;
        total += n as u64;
    }

    let file = writer
        .into_inner()
        .map_err(|e| DecodeFailure::Write(e.into_error()))?;
    file.sync_all().map_err(DecodeFailure::Write)?;
    Ok(total)
}

/// Set mode `0755` on `path` so it runs on the device.
///
/// # Errors
///
/// Returns an error if the permissions cannot be read or changed.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
}

/// No execute bit outside Unix; the archive entry keeps the default mode.
///
/// # Errors
///
/// Never fails on this target.
#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
