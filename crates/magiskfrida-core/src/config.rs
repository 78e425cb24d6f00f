//! Build configuration.
//!
//! A [`BuildConfig`] is assembled once per run and handed to every component
//! constructor. Values come from built-in defaults, then an optional
//! `magiskfrida.toml`, then whatever the caller overrides on the struct.
//!
//! ```toml
//! platforms = ["arm", "arm64", "x86_64"]
//!
//! [paths]
//! downloads = "/var/cache/magiskfrida"
//!
//! [upstream]
//! release_url = "https://api.github.com/repos/frida/frida/releases/latest"
//!
//! [module]
//! author = "me"
//!
//! [layout]
//! directories = ["common", "system", "META-INF"]
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use magiskfrida_schema::{ModuleInfo, Platform, Release};

use crate::paths::{BuildPaths, filename_from_url, resolve_against};

/// Name of the optional config file looked up in the base directory.
pub const CONFIG_FILE_NAME: &str = "magiskfrida.toml";

/// Default release-metadata endpoint.
pub const DEFAULT_RELEASE_URL: &str = "https://api.github.com/repos/frida/frida/releases/latest";

/// Default artifact URL pattern.
pub const DEFAULT_DOWNLOAD_URL: &str = "https://github.com/frida/frida/releases/download/{release}/frida-server-{release}-android-{platform}.xz";

/// Where releases are discovered and artifacts downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Upstream {
    /// JSON endpoint whose `tag_name` field names the latest release.
    pub release_url: String,
    /// Artifact URL with `{release}` and `{platform}` placeholders.
    pub download_url: String,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            release_url: DEFAULT_RELEASE_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
        }
    }
}

impl Upstream {
    /// Expand the download pattern for one release and platform.
    pub fn artifact_url(&self, release: &Release, platform: Platform) -> String {
        self.download_url
            .replace("{release}", release.tag())
            .replace("{platform}", platform.as_str())
    }
}

/// Which staging files end up in the archive, and where the binary goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageLayout {
    /// Files at the staging root that are always listed first.
    pub files: Vec<String>,
    /// Directories walked recursively, in order.
    pub directories: Vec<String>,
    /// File names skipped during the walk.
    pub sentinels: Vec<String>,
    /// Staging-relative path the decompressed server binary is written to.
    pub binary: String,
}

impl Default for PackageLayout {
    fn default() -> Self {
        Self {
            files: vec!["install.sh".to_string(), "module.prop".to_string()],
            directories: vec![
                "common".to_string(),
                "system".to_string(),
                "META-INF".to_string(),
            ],
            sentinels: vec!["placeholder".to_string(), ".gitkeep".to_string()],
            binary: "system/xbin/frida-server".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PathsSection {
    template: Option<PathBuf>,
    builds: Option<PathBuf>,
    downloads: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    platforms: Option<Vec<Platform>>,
    paths: PathsSection,
    upstream: Upstream,
    module: ModuleInfo,
    layout: PackageLayout,
}

/// Everything a build run needs to know, resolved to absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Directory layout.
    pub paths: BuildPaths,
    /// Remote endpoints.
    pub upstream: Upstream,
    /// Fixed `module.prop` fields.
    pub module: ModuleInfo,
    /// Archive contents.
    pub layout: PackageLayout,
    /// Platforms built when the caller does not pick any.
    pub platforms: Vec<Platform>,
}

impl BuildConfig {
    /// Defaults rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            paths: BuildPaths::new(base),
            upstream: Upstream::default(),
            module: ModuleInfo::default(),
            layout: PackageLayout::default(),
            platforms: Platform::DEFAULT.to_vec(),
        }
    }

    /// Load configuration for `base`.
    ///
    /// With `config_path` set, that file must exist. Otherwise
    /// `<base>/magiskfrida.toml` is read when present and defaults are used
    /// when it is not.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// result fails [`validate`](Self::validate).
    pub fn load(base: &Path, config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => Some(resolve_against(base, p)),
            None => Some(base.join(CONFIG_FILE_NAME)).filter(|p| p.exists()),
        };

        let Some(path) = path else {
            tracing::debug!("No {CONFIG_FILE_NAME} in {}, using defaults", base.display());
            return Ok(Self::new(base));
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml_str(base, &content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a TOML document, resolving relative paths against `base`.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid TOML, unknown keys, or failed validation.
    pub fn from_toml_str(base: &Path, content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;

        let mut paths = BuildPaths::new(base);
        if let Some(template) = file.paths.template {
            paths.template = resolve_against(base, &template);
        }
        if let Some(builds) = file.paths.builds {
            paths.builds = resolve_against(base, &builds);
        }
        if let Some(downloads) = file.paths.downloads {
            paths.downloads = resolve_against(base, &downloads);
        }

        let config = Self {
            paths,
            upstream: file.upstream,
            module: file.module,
            layout: file.layout,
            platforms: file
                .platforms
                .unwrap_or_else(|| Platform::DEFAULT.to_vec()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a correct build.
    ///
    /// # Errors
    ///
    /// Returns an error if the download pattern lacks a placeholder, no
    /// platform is configured, the module name is empty, or the binary path
    /// would land outside the staging tree.
    pub fn validate(&self) -> Result<()> {
        for placeholder in ["{release}", "{platform}"] {
            if !self.upstream.download_url.contains(placeholder) {
                bail!(
                    "download_url '{}' must contain {placeholder}",
                    self.upstream.download_url
                );
            }
        }

        if self.platforms.is_empty() {
            bail!("At least one platform must be configured");
        }

        if self.module.name.trim().is_empty() {
            bail!("module.name must not be empty");
        }

        let binary = Path::new(&self.layout.binary);
        let escapes = binary
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if self.layout.binary.is_empty() || escapes {
            bail!(
                "layout.binary '{}' must be a relative path inside the staging tree",
                self.layout.binary
            );
        }

        Ok(())
    }

    /// Staging directory for `platform`.
    pub fn staging_dir(&self, platform: Platform) -> PathBuf {
        self.paths.staging_dir(platform)
    }

    /// Remote URL of the compressed server binary.
    pub fn artifact_url(&self, release: &Release, platform: Platform) -> String {
        self.upstream.artifact_url(release, platform)
    }

    /// Cache location of the compressed server binary, keyed by file name.
    pub fn artifact_path(&self, release: &Release, platform: Platform) -> PathBuf {
        let url = self.artifact_url(release, platform);
        self.paths.download_path(filename_from_url(&url))
    }

    /// File name of the output archive: `<name>-<tag>-<platform>.zip`.
    pub fn archive_name(&self, release: &Release, platform: Platform) -> String {
        format!("{}-{}-{}.zip", self.module.name, release.tag(), platform)
    }

    /// Full path of the output archive.
    pub fn archive_path(&self, release: &Release, platform: Platform) -> PathBuf {
        self.paths.archive_path(&self.archive_name(release, platform))
    }

    /// Where the server binary lives inside a staging tree.
    pub fn binary_path(&self, staging_root: &Path) -> PathBuf {
        staging_root.join(&self.layout.binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn release() -> Release {
        Release::new("16.1.2").unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = BuildConfig::new("/work");
        assert_eq!(config.platforms, vec![Platform::Arm, Platform::Arm64]);
        assert_eq!(config.layout.files, vec!["install.sh", "module.prop"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_artifact_url_and_path() {
        let config = BuildConfig::new("/work");
        assert_eq!(
            config.artifact_url(&release(), Platform::Arm64),
            "https://github.com/frida/frida/releases/download/16.1.2/frida-server-16.1.2-android-arm64.xz"
        );
        assert_eq!(
            config.artifact_path(&release(), Platform::Arm64),
            PathBuf::from("/work/downloads/frida-server-16.1.2-android-arm64.xz")
        );
    }

    #[test]
    fn test_archive_path_embeds_release_and_platform() {
        let config = BuildConfig::new("/work");
        assert_eq!(
            config.archive_path(&release(), Platform::Arm),
            PathBuf::from("/work/builds/MagiskFrida-16.1.2-arm.zip")
        );
    }

    #[test]
    fn test_from_toml_overrides() {
        let toml = r#"
            platforms = ["arm64", "x86_64"]

            [paths]
            downloads = "/var/cache/mf"
            builds = "out"

            [upstream]
            release_url = "http://localhost/latest"

            [module]
            name = "FridaServer"

            [layout]
            directories = ["system"]
        "#;
        let config = BuildConfig::from_toml_str(Path::new("/work"), toml).unwrap();

        assert_eq!(config.platforms, vec![Platform::Arm64, Platform::X86_64]);
        assert_eq!(config.paths.downloads, PathBuf::from("/var/cache/mf"));
        assert_eq!(config.paths.builds, PathBuf::from("/work/out"));
        assert_eq!(config.paths.template, PathBuf::from("/work/base"));
        assert_eq!(config.upstream.release_url, "http://localhost/latest");
        assert_eq!(config.upstream.download_url, DEFAULT_DOWNLOAD_URL);
        assert_eq!(config.module.name, "FridaServer");
        assert_eq!(config.module.id, "magiskfrida");
        assert_eq!(config.layout.directories, vec!["system"]);
        assert_eq!(config.layout.files, vec!["install.sh", "module.prop"]);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = BuildConfig::from_toml_str(Path::new("/work"), "[paths]\ncache = \"x\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_download_url_needs_placeholders() {
        let toml = "[upstream]\ndownload_url = \"https://example.com/{release}/server.xz\"\n";
        let err = BuildConfig::from_toml_str(Path::new("/work"), toml).unwrap_err();
        assert!(err.to_string().contains("{platform}"));
    }

    #[test]
    fn test_binary_must_stay_inside_staging() {
        let mut config = BuildConfig::new("/work");
        config.layout.binary = "../escape".to_string();
        assert!(config.validate().is_err());

        config.layout.binary = "/system/xbin/frida-server".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_platforms_rejected() {
        let err = BuildConfig::from_toml_str(Path::new("/work"), "platforms = []\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = BuildConfig::load(dir.path(), None).unwrap();
        assert_eq!(config, BuildConfig::new(dir.path()));
    }

    #[test]
    fn test_load_reads_base_config_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "platforms = [\"x86\"]\n").unwrap();

        let config = BuildConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.platforms, vec![Platform::X86]);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(BuildConfig::load(dir.path(), Some(&missing)).is_err());
    }
}
