//! Download cache for upstream artifacts.
//!
//! Artifacts are keyed by file name only: if the destination exists it is
//! trusted and no request is made. Bodies are streamed to `<dest>.part` and
//! renamed into place once complete, so an interrupted download is never
//! mistaken for a cached one.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::paths::{filename_from_url, partial_path};

/// Why an artifact could not be fetched.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request failed or the body stream broke off.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host answered with a non-success status.
    #[error("{url} returned {status}")]
    Status {
        /// URL that was requested.
        url: String,
        /// Status it answered with.
        status: reqwest::StatusCode,
    },

    /// The artifact could not be written to disk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What [`ArtifactCache::fetch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already existed; nothing was requested.
    Cached,
    /// The artifact was downloaded.
    Downloaded {
        /// Bytes written.
        bytes: u64,
    },
}

/// Fetches artifacts into a local directory unless already present.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    client: Client,
}

impl ArtifactCache {
    /// Create a cache that downloads with `client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Ensure `url` is available at `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on network failure, non-success status, or a
    /// write failure. `dest` does not exist afterwards in any of these cases.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome, FetchError> {
        let file_name = filename_from_url(url);
        tracing::info!("Downloading '{file_name}' to '{}'", dest.display());

        if dest.exists() {
            tracing::debug!("Using cached {}", dest.display());
            return Ok(FetchOutcome::Cached);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part = partial_path(dest);
        match self.download_to(url, &part).await {
            Ok(bytes) => {
                tokio::fs::rename(&part, dest).await?;
                tracing::debug!("Downloaded {bytes} bytes for {file_name}");
                Ok(FetchOutcome::Downloaded { bytes })
            }
            Err(e) => {
                tokio::fs::remove_file(&part).await.ok();
                Err(e)
            }
        }
    }

    async fn download_to(&self, url: &str, part: &Path) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let mut file = File::create(part).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fetch_downloads_missing_file() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/frida-server-16.1.2-android-arm64.xz")
            .with_status(200)
            .with_body("compressed bytes")
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("downloads/frida-server-16.1.2-android-arm64.xz");
        let url = format!("{}/frida-server-16.1.2-android-arm64.xz", server.url());

        let outcome = ArtifactCache::new(Client::new())
            .fetch(&url, &dest)
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Downloaded { bytes: 16 });
        assert_eq!(std::fs::read(&dest).unwrap(), b"compressed bytes");
        assert!(!partial_path(&dest).exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_existing_file_makes_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/artifact.xz")
            .with_status(200)
            .with_body("new bytes")
            .expect(0)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("artifact.xz");
        std::fs::write(&dest, b"old bytes").unwrap();

        let cache = ArtifactCache::new(Client::new());
        let url = format!("{}/artifact.xz", server.url());
        assert_eq!(cache.fetch(&url, &dest).await.unwrap(), FetchOutcome::Cached);
        assert_eq!(cache.fetch(&url, &dest).await.unwrap(), FetchOutcome::Cached);

        assert_eq!(std::fs::read(&dest).unwrap(), b"old bytes");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_second_call_is_cached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/artifact.xz")
            .with_status(200)
            .with_body("payload")
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("artifact.xz");
        let url = format!("{}/artifact.xz", server.url());
        let cache = ArtifactCache::new(Client::new());

        cache.fetch(&url, &dest).await.unwrap();
        let first = std::fs::read(&dest).unwrap();
        assert_eq!(cache.fetch(&url, &dest).await.unwrap(), FetchOutcome::Cached);

        assert_eq!(std::fs::read(&dest).unwrap(), first);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_error_status_leaves_no_file() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing.xz")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing.xz");
        let url = format!("{}/missing.xz", server.url());

        let err = ArtifactCache::new(Client::new())
            .fetch(&url, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 404));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_fetch_truncated_body_leaves_no_file() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/truncated.xz")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"first half of the artifact")?;
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "upstream went away",
                ))
            })
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("truncated.xz");
        let url = format!("{}/truncated.xz", server.url());

        let err = ArtifactCache::new(Client::new())
            .fetch(&url, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Http(_)));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_leaves_no_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("artifact.xz");

        let err = ArtifactCache::new(Client::new())
            .fetch("http://127.0.0.1:9/artifact.xz", &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Http(_)));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }
}
