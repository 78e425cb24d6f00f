//! Per-platform staging tree assembly.
//!
//! A staging tree is owned by the run that builds it: [`ModuleAssembler::assemble`]
//! deletes the platform's staging directory and its previous output archive
//! before copying the template back in. Nothing under `<builds>/<platform>`
//! survives from an earlier run.

use std::path::{Path, PathBuf};

use thiserror::Error;

use magiskfrida_schema::{ModuleProp, Platform, Release};

use crate::config::BuildConfig;
use crate::io::download::{ArtifactCache, FetchError};
use crate::io::extract::{self, ExtractError};

/// Why a staging tree could not be assembled.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// A previous staging directory or archive could not be removed.
    #[error("Failed to remove {path}: {source}")]
    Clean {
        /// Path that could not be removed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The template directory does not exist.
    #[error("Template directory {0} does not exist")]
    TemplateMissing(PathBuf),

    /// The template could not be copied into the staging directory.
    #[error("Failed to copy template into {path}: {source}")]
    Template {
        /// Staging directory being populated.
        path: PathBuf,
        /// Copy error.
        #[source]
        source: fs_extra::error::Error,
    },

    /// `module.prop` could not be written.
    #[error("Failed to write {path}: {source}")]
    Metadata {
        /// Destination of the metadata file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The compressed server binary could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The compressed server binary could not be extracted.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The extracted binary could not be marked executable.
    #[error("Failed to set permissions on {path}: {source}")]
    Permissions {
        /// The extracted binary.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A blocking filesystem task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A populated staging directory, ready to be collected and packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingTree {
    /// Platform the tree was built for.
    pub platform: Platform,
    /// Staging root (`<builds>/<platform>`).
    pub root: PathBuf,
    /// The decompressed, executable server binary.
    pub binary: PathBuf,
}

/// Builds one staging tree per platform from the template and upstream artifacts.
#[derive(Debug, Clone)]
pub struct ModuleAssembler {
    config: BuildConfig,
    cache: ArtifactCache,
}

impl ModuleAssembler {
    /// Create an assembler for `config`, downloading through `cache`.
    pub fn new(config: &BuildConfig, cache: ArtifactCache) -> Self {
        Self {
            config: config.clone(),
            cache,
        }
    }

    /// Rebuild the staging tree for `platform` at `release`.
    ///
    /// The staging directory and the archive this release would be written
    /// to are removed first. On failure the partial tree is left in place for
    /// inspection.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError`] naming the step that failed.
    pub async fn assemble(
        &self,
        platform: Platform,
        release: &Release,
    ) -> Result<StagingTree, AssemblyError> {
        let root = self.config.staging_dir(platform);
        let archive = self.config.archive_path(release, platform);
        let template = self.config.paths.template.clone();

        tracing::info!("Assembling {platform} staging tree for {release}");

        let staging = root.clone();
        tokio::task::spawn_blocking(move || {
            remove_dir_if_present(&staging)?;
            remove_file_if_present(&archive)?;
            copy_template(&template, &staging)
        })
        .await??;

        let prop_path = root.join(ModuleProp::FILE_NAME);
        let prop = ModuleProp::new(&self.config.module, release).render();
        tokio::fs::write(&prop_path, prop)
            .await
            .map_err(|source| AssemblyError::Metadata {
                path: prop_path.clone(),
                source,
            })?;

        let url = self.config.artifact_url(release, platform);
        let artifact = self.config.artifact_path(release, platform);
        self.cache.fetch(&url, &artifact).await?;

        let binary = self.config.binary_path(&root);
        let dest = binary.clone();
        tokio::task::spawn_blocking(move || extract::extract_xz(&artifact, &dest)).await??;

        extract::make_executable(&binary).map_err(|source| AssemblyError::Permissions {
            path: binary.clone(),
            source,
        })?;

        Ok(StagingTree {
            platform,
            root,
            binary,
        })
    }
}

fn remove_dir_if_present(path: &Path) -> Result<(), AssemblyError> {
    if path.exists() {
        tracing::debug!("Removing stale staging directory {}", path.display());
        std::fs::remove_dir_all(path).map_err(|source| AssemblyError::Clean {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn remove_file_if_present(path: &Path) -> Result<(), AssemblyError> {
    if path.exists() {
        tracing::debug!("Removing previous archive {}", path.display());
        std::fs::remove_file(path).map_err(|source| AssemblyError::Clean {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn copy_template(template: &Path, staging: &Path) -> Result<(), AssemblyError> {
    if !template.is_dir() {
        return Err(AssemblyError::TemplateMissing(template.to_path_buf()));
    }

    std::fs::create_dir_all(staging).map_err(|source| AssemblyError::Clean {
        path: staging.to_path_buf(),
        source,
    })?;

    copy_dir_all(template, staging).map_err(|source| AssemblyError::Template {
        path: staging.to_path_buf(),
        source,
    })
}

/// Recursively copy the contents of `src` into the existing directory `dst`.
///
/// # Errors
///
/// Returns an error if any file or directory cannot be copied.
pub fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> fs_extra::error::Result<()> {
    fs_extra::dir::copy(
        src,
        dst,
        &fs_extra::dir::CopyOptions::new()
            .content_only(true)
            .overwrite(true),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Server, ServerGuard};
    use reqwest::Client;
    use std::fs;
    use std::io::Write;
    use tempfile::{TempDir, tempdir};

    fn xz(data: &[u8]) -> Vec<u8> {
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn workspace(server: &ServerGuard) -> (TempDir, BuildConfig) {
        let dir = tempdir().unwrap();
        let template = dir.path().join("base");
        fs::create_dir_all(template.join("common")).unwrap();
        fs::create_dir_all(template.join("system/xbin")).unwrap();
        fs::write(template.join("install.sh"), "#!/sbin/sh\n").unwrap();
        fs::write(template.join("common/service.sh"), "#!/system/bin/sh\n").unwrap();
        fs::write(template.join("system/xbin/.gitkeep"), "").unwrap();

        let mut config = BuildConfig::new(dir.path());
        config.upstream.download_url = format!(
            "{}/download/{{release}}/frida-server-{{release}}-android-{{platform}}.xz",
            server.url()
        );
        (dir, config)
    }

    #[tokio::test]
    async fn test_assemble_populates_staging_tree() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/download/16.1.2/frida-server-16.1.2-android-arm64.xz")
            .with_status(200)
            .with_body(xz(b"frida-server payload"))
            .expect(1)
            .create_async()
            .await;
        let (_dir, config) = workspace(&server);
        let release = Release::new("16.1.2").unwrap();

        let assembler = ModuleAssembler::new(&config, ArtifactCache::new(Client::new()));
        let tree = assembler.assemble(Platform::Arm64, &release).await.unwrap();

        assert_eq!(tree.root, config.staging_dir(Platform::Arm64));
        assert_eq!(fs::read(&tree.binary).unwrap(), b"frida-server payload");
        assert!(tree.root.join("install.sh").exists());
        assert!(tree.root.join("common/service.sh").exists());
        assert!(tree.root.join("system/xbin/.gitkeep").exists());

        let prop = fs::read_to_string(tree.root.join("module.prop")).unwrap();
        assert!(prop.contains("version=v16.1.2\n"));
        assert!(prop.contains("versionCode=1612\n"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&tree.binary).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_assemble_discards_previous_run() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/download/16.1.2/frida-server-16.1.2-android-arm.xz")
            .with_status(200)
            .with_body(xz(b"payload"))
            .create_async()
            .await;
        let (_dir, config) = workspace(&server);
        let release = Release::new("16.1.2").unwrap();

        let staging = config.staging_dir(Platform::Arm);
        fs::create_dir_all(staging.join("system/xbin")).unwrap();
        fs::write(staging.join("stale.txt"), "left over").unwrap();
        fs::write(staging.join("system/xbin/frida-server"), "old binary").unwrap();
        let archive = config.archive_path(&release, Platform::Arm);
        fs::write(&archive, "old archive").unwrap();

        let assembler = ModuleAssembler::new(&config, ArtifactCache::new(Client::new()));
        let tree = assembler.assemble(Platform::Arm, &release).await.unwrap();

        assert!(!staging.join("stale.txt").exists());
        assert!(!archive.exists());
        assert_eq!(fs::read(&tree.binary).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_missing_template_is_reported() {
        let server = Server::new_async().await;
        let (dir, config) = workspace(&server);
        fs::remove_dir_all(dir.path().join("base")).unwrap();

        let assembler = ModuleAssembler::new(&config, ArtifactCache::new(Client::new()));
        let err = assembler
            .assemble(Platform::X86, &Release::new("16.1.2").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, AssemblyError::TemplateMissing(_)));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_reported() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/download/16.1.2/frida-server-16.1.2-android-x86.xz")
            .with_status(404)
            .create_async()
            .await;
        let (_dir, config) = workspace(&server);

        let assembler = ModuleAssembler::new(&config, ArtifactCache::new(Client::new()));
        let err = assembler
            .assemble(Platform::X86, &Release::new("16.1.2").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, AssemblyError::Fetch(FetchError::Status { .. })));
        // The partial tree stays on disk.
        assert!(config.staging_dir(Platform::X86).join("module.prop").exists());
    }
}
