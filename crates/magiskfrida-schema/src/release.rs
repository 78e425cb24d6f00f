//! Upstream release identifiers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when turning an upstream tag into a [`Release`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReleaseError {
    /// The tag is empty or only whitespace.
    #[error("Release tag is empty")]
    Empty,

    /// The tag contains no digits, so no build code can be derived.
    #[error("Release tag '{0}' contains no digits")]
    NoDigits(String),

    /// The tag contains a path separator, so it cannot name a file.
    #[error("Release tag '{0}' contains a path separator")]
    PathSeparator(String),

    /// The digits of the tag do not fit in a `u64`.
    #[error("Build code derived from '{0}' is too large")]
    BuildCodeOverflow(String),
}

/// An upstream release: the opaque tag plus its derived numeric build code.
///
/// The build code is the tag with every non-digit character stripped
/// (`16.1.2` becomes `1612`). It only grows as long as the upstream keeps the
/// same number of digits per component, which matches how Magisk compares
/// `versionCode` values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Release {
    tag: String,
    build_code: u64,
}

impl Release {
    /// Parse an upstream tag.
    ///
    /// Surrounding whitespace is trimmed; the tag is otherwise kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError`] if the tag is empty, contains `/` or `\`,
    /// has no digits, or its digits overflow a `u64`.
    pub fn new(tag: &str) -> Result<Self, ReleaseError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ReleaseError::Empty);
        }
        // The tag ends up in archive and download file names.
        if tag.contains(['/', '\\']) {
            return Err(ReleaseError::PathSeparator(tag.to_string()));
        }

        let digits: String = tag.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(ReleaseError::NoDigits(tag.to_string()));
        }

        let build_code = digits
            .parse::<u64>()
            .map_err(|_| ReleaseError::BuildCodeOverflow(tag.to_string()))?;

        Ok(Self {
            tag: tag.to_string(),
            build_code,
        })
    }

    /// The tag exactly as published upstream.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Numeric build code derived from the tag.
    pub fn build_code(&self) -> u64 {
        self.build_code
    }

    /// The tag without a leading `v`, for `version=v...` style fields.
    pub fn display_version(&self) -> &str {
        self.tag.strip_prefix('v').unwrap_or(&self.tag)
    }
}

impl std::fmt::Display for Release {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag)
    }
}

impl std::str::FromStr for Release {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Release {
    type Error = ReleaseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Release> for String {
    fn from(release: Release) -> Self {
        release.tag
    }
}
