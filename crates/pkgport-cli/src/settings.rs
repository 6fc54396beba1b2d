//! Process-wide settings.
//!
//! Read once from the environment at startup and passed down by reference.

use anyhow::{Context, Result};
use pkgport_convert::RuntimeVersion;
use std::fmt;
use std::path::PathBuf;

/// Python version variable, `"34"` or `"3.4"`.
pub const RUNTIME_VERSION_VAR: &str = "CONDA_PY";

/// Build root variable.
pub const BUILD_ROOT_VAR: &str = "CONDA_BLD_PATH";

const DEFAULT_RUNTIME_VERSION: &str = "3.5";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Embedded in unix library paths when a package does not pin python.
    pub runtime_version: RuntimeVersion,
    pub build_root: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let runtime_version = match var(RUNTIME_VERSION_VAR) {
            Some(value) => RuntimeVersion::parse(&value)
                .with_context(|| format!("Invalid {RUNTIME_VERSION_VAR}: {value}"))?,
            None => RuntimeVersion::parse(DEFAULT_RUNTIME_VERSION)?,
        };

        let build_root = match var(BUILD_ROOT_VAR) {
            Some(value) => PathBuf::from(value),
            None => var("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join("conda-bld"),
        };

        Ok(Self {
            runtime_version,
            build_root,
        })
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "runtime version: {}", self.runtime_version)?;
        write!(f, "build root:      {}", self.build_root.display())
    }
}
