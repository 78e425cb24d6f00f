//! Target platforms.

/// Android CPU architecture a module is built for.
///
/// The token returned by [`as_str()`](Self::as_str) is the one the upstream
/// uses in its artifact names (`frida-server-<release>-android-<token>.xz`),
/// and it also names the staging directory and the output archive.
///
/// # Example
///
/// ```
/// use magiskfrida_schema::Platform;
///
/// let platform: Platform = "aarch64".parse().unwrap();
/// assert_eq!(platform, Platform::Arm64);
/// assert_eq!(platform.to_string(), "arm64");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum Platform {
    /// 32-bit ARM (`armeabi-v7a`)
    #[serde(rename = "arm")]
    Arm,
    /// 64-bit ARM (`arm64-v8a`)
    #[serde(rename = "arm64")]
    Arm64,
    /// 32-bit Intel
    #[serde(rename = "x86")]
    X86,
    /// 64-bit Intel
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Platform {
    /// Every platform the upstream publishes a server binary for.
    pub const ALL: [Self; 4] = [Self::Arm, Self::Arm64, Self::X86, Self::X86_64];

    /// Platforms built when nothing else is configured.
    pub const DEFAULT: [Self; 2] = [Self::Arm, Self::Arm64];

    /// Upstream token for this platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
        }
    }

    /// Android ABI name (`ro.product.cpu.abi`) for this platform.
    pub fn android_abi(&self) -> &'static str {
        match self {
            Self::Arm => "armeabi-v7a",
            Self::Arm64 => "arm64-v8a",
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm" | "armv7" | "armeabi-v7a" => Ok(Self::Arm),
            "arm64" | "aarch64" | "arm64-v8a" => Ok(Self::Arm64),
            "x86" | "i686" => Ok(Self::X86),
            "x86_64" | "x86-64" | "amd64" => Ok(Self::X86_64),
            _ => Err(format!("Unknown platform: {s}")),
        }
    }
}
