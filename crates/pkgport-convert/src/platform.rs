//! Platform targets and families.

use crate::ConvertError;
use std::fmt;
use std::str::FromStr;

/// Coarse platform grouping that decides which path rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformFamily {
    /// `osx` and `linux`: `bin/`, `lib/pythonX.Y/`, shebang scripts.
    Unix,
    /// `win`: `Scripts/`, `Lib/`, native launcher stubs.
    Windows,
}

impl PlatformFamily {
    /// Classify a manifest platform string.
    ///
    /// Only `osx` and `linux` are unix; everything else is treated as windows.
    #[must_use]
    pub fn from_platform_str(platform: &str) -> Self {
        match platform {
            "osx" | "linux" => Self::Unix,
            _ => Self::Windows,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unix => "unix",
            Self::Windows => "windows",
        }
    }

    /// Top-level directory holding entry point launchers.
    #[must_use]
    pub fn bin_dir(&self) -> &'static str {
        match self {
            Self::Unix => "bin",
            Self::Windows => "Scripts",
        }
    }

    /// Top-level directory holding the python library tree.
    ///
    /// On unix the runtime version segment follows (`lib/python3.3`).
    #[must_use]
    pub fn lib_dir(&self) -> &'static str {
        match self {
            Self::Unix => "lib",
            Self::Windows => "Lib",
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Concrete conversion targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlatformTarget {
    /// macOS, 64-bit.
    Osx64,
    /// Linux, 32-bit.
    Linux32,
    /// Linux, 64-bit.
    Linux64,
    /// Windows, 32-bit.
    Win32,
    /// Windows, 64-bit.
    Win64,
}

impl PlatformTarget {
    /// Get the platform token (e.g., "win-64").
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Osx64 => "osx-64",
            Self::Linux32 => "linux-32",
            Self::Linux64 => "linux-64",
            Self::Win32 => "win-32",
            Self::Win64 => "win-64",
        }
    }

    /// Parse a platform token.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "osx-64" => Some(Self::Osx64),
            "linux-32" => Some(Self::Linux32),
            "linux-64" => Some(Self::Linux64),
            "win-32" => Some(Self::Win32),
            "win-64" => Some(Self::Win64),
            _ => None,
        }
    }

    /// The value written to the manifest `platform` field.
    #[must_use]
    pub fn declared_platform(&self) -> &'static str {
        match self {
            Self::Osx64 => "osx",
            Self::Linux32 | Self::Linux64 => "linux",
            Self::Win32 | Self::Win64 => "win",
        }
    }

    #[must_use]
    pub fn family(&self) -> PlatformFamily {
        PlatformFamily::from_platform_str(self.declared_platform())
    }

    /// Get all concrete targets in declaration order.
    #[must_use]
    pub fn all() -> &'static [PlatformTarget] {
        &[
            Self::Osx64,
            Self::Linux32,
            Self::Linux64,
            Self::Win32,
            Self::Win64,
        ]
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A platform argument as given by the user: one target or the `all` alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSelection {
    Target(PlatformTarget),
    All,
}

impl PlatformSelection {
    /// Accepted tokens, in the order they are shown to users.
    pub const TOKENS: &'static [&'static str] =
        &["osx-64", "linux-32", "linux-64", "win-32", "win-64", "all"];

    /// Expand selections into concrete targets.
    ///
    /// Each target appears once, at the position it was first selected.
    #[must_use]
    pub fn expand(selections: &[PlatformSelection]) -> Vec<PlatformTarget> {
        let mut targets: Vec<PlatformTarget> = Vec::new();
        for selection in selections {
            let candidates: &[PlatformTarget] = match selection {
                Self::Target(target) => std::slice::from_ref(target),
                Self::All => PlatformTarget::all(),
            };
            for candidate in candidates {
                if !targets.contains(candidate) {
                    targets.push(*candidate);
                }
            }
        }
        targets
    }
}

impl FromStr for PlatformSelection {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self::All);
        }
        PlatformTarget::parse(s)
            .map(Self::Target)
            .ok_or_else(|| ConvertError::UnknownPlatform(s.to_string()))
    }
}
