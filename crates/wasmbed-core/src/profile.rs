//! Build profiles and the cross-compilation target.

use std::fmt;
use std::str::FromStr;

/// Compiler flag set for one run. Fixed at invocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// No optimization flags, debug info retained.
    Debug,
    /// Optimized, panics trap, debug info stripped.
    #[default]
    Release,
    /// `Release` with the leaking garbage collector pinned.
    /// Only suitable for short-lived instantiations.
    ReleaseLeaking,
}

const RELEASE_FLAGS: &[&str] = &["-no-debug", "-panic", "trap", "-opt", "2"];
const RELEASE_LEAKING_FLAGS: &[&str] = &[
    "-no-debug", "-panic", "trap", "-gc", "leaking", "-opt", "2",
];

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Debug, Profile::Release, Profile::ReleaseLeaking];

    /// Flags appended after `build -o <path>`.
    pub fn compiler_flags(self) -> &'static [&'static str] {
        match self {
            Profile::Debug => &[],
            Profile::Release => RELEASE_FLAGS,
            Profile::ReleaseLeaking => RELEASE_LEAKING_FLAGS,
        }
    }

    pub fn is_release(self) -> bool {
        !matches!(self, Profile::Debug)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Debug => "debug",
            Profile::Release => "release",
            Profile::ReleaseLeaking => "release-leaking",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profile::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown build profile `{}`", s))
    }
}

/// Name of the variable selecting the target operating system.
pub const TARGET_OS_VAR: &str = "GOOS";
/// Name of the variable selecting the target architecture.
pub const TARGET_ARCH_VAR: &str = "GOARCH";

/// (OS, architecture) pair passed to the compiler through the environment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TargetDescriptor {
    pub os: String,
    pub arch: String,
}

impl Default for TargetDescriptor {
    fn default() -> Self {
        TargetDescriptor {
            os: "wasip1".into(),
            arch: "wasm".into(),
        }
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
