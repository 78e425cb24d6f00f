//! Magisk `module.prop` generation.

use serde::{Deserialize, Serialize};

use crate::Release;

/// Fixed identity of the module, independent of the upstream release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleInfo {
    /// Module id, also the directory name Magisk installs into.
    pub id: String,
    /// Human-readable module name; prefixes the output archive name.
    pub name: String,
    /// Author shown in the Magisk manager.
    pub author: String,
    /// One-line description shown in the Magisk manager.
    pub description: String,
    /// Issue tracker or support URL.
    pub support: String,
    /// Minimum Magisk version code able to install the module.
    pub min_magisk: u32,
}

impl Default for ModuleInfo {
    fn default() -> Self {
        Self {
            id: "magiskfrida".to_string(),
            name: "MagiskFrida".to_string(),
            author: "AeonLucid".to_string(),
            description: "Runs frida-server on boot as root with magisk.".to_string(),
            support: "https://github.com/AeonLucid/MagiskFrida/issues".to_string(),
            min_magisk: 1530,
        }
    }
}

/// The `module.prop` document for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProp<'a> {
    info: &'a ModuleInfo,
    release: &'a Release,
}

impl<'a> ModuleProp<'a> {
    /// File name Magisk expects at the module root.
    pub const FILE_NAME: &'static str = "module.prop";

    /// Bind module identity to a release.
    pub fn new(info: &'a ModuleInfo, release: &'a Release) -> Self {
        Self { info, release }
    }

    /// Ordered `key=value` pairs.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.info.id.clone()),
            ("name", self.info.name.clone()),
            ("version", format!("v{}", self.release.display_version())),
            ("versionCode", self.release.build_code().to_string()),
            ("author", self.info.author.clone()),
            ("description", self.info.description.clone()),
            ("support", self.info.support.clone()),
            ("minMagisk", self.info.min_magisk.to_string()),
        ]
    }

    /// Render the document. Every line, including the last, ends in `\n`.
    pub fn render(&self) -> String {
        self.entries()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect()
    }
}

impl std::fmt::Display for ModuleProp<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_version_lines() {
        let info = ModuleInfo::default();
        let release = Release::new("16.1.2").unwrap();
        let rendered = ModuleProp::new(&info, &release).render();

        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines.contains(&"version=v16.1.2"));
        assert!(lines.contains(&"versionCode=1612"));
        assert!(lines.contains(&"id=magiskfrida"));
        assert!(lines.contains(&"minMagisk=1530"));
    }

    #[test]
    fn test_render_uses_lf_only() {
        let info = ModuleInfo::default();
        let release = Release::new("16.1.2").unwrap();
        let rendered = ModuleProp::new(&info, &release).render();

        assert!(!rendered.contains('\r'));
        assert!(rendered.ends_with('\n'));
        assert_eq!(rendered.matches('\n').count(), 8);
        // No indentation may leak into keys.
        assert!(rendered.lines().all(|l| !l.starts_with(' ')));
    }

    #[test]
    fn test_v_prefixed_tag_is_not_doubled() {
        let info = ModuleInfo::default();
        let release = Release::new("v16.1.2").unwrap();
        let rendered = ModuleProp::new(&info, &release).render();
        assert!(rendered.contains("version=v16.1.2\n"));
    }

    #[test]
    fn test_custom_info() {
        let info = ModuleInfo {
            id: "fridaserver".to_string(),
            min_magisk: 20400,
            ..ModuleInfo::default()
        };
        let release = Release::new("16.0.0").unwrap();
        let rendered = ModuleProp::new(&info, &release).to_string();
        assert!(rendered.starts_with("id=fridaserver\n"));
        assert!(rendered.contains("minMagisk=20400\n"));
    }
}
