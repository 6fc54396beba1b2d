//! Package manifest (`info/index.json`).
//!
//! The manifest is kept as a raw JSON object so that fields this crate does
//! not know about survive a conversion untouched. Only `platform` is ever
//! rewritten.

use crate::mapping::RuntimeVersion;
use crate::{ConvertError, ConvertResult, MANIFEST_FILE, PlatformFamily};
use serde_json::{Map, Value};

/// Parsed package manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    fields: Map<String, Value>,
}

impl PackageManifest {
    /// Parse a manifest from JSON bytes.
    ///
    /// Fails with [`ConvertError::ManifestMissing`] unless the document is an
    /// object with a string `platform` field.
    pub fn from_json(bytes: &[u8]) -> ConvertResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ConvertError::ManifestMissing(format!("{MANIFEST_FILE}: {e}")))?;

        let Value::Object(fields) = value else {
            return Err(ConvertError::ManifestMissing(format!(
                "{MANIFEST_FILE} is not a JSON object"
            )));
        };

        match fields.get("platform") {
            Some(Value::String(_)) => Ok(Self { fields }),
            Some(_) => Err(ConvertError::ManifestMissing(format!(
                "{MANIFEST_FILE}: platform must be a string"
            ))),
            None => Err(ConvertError::ManifestMissing(format!(
                "{MANIFEST_FILE}: platform is required"
            ))),
        }
    }

    /// Serialize the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> ConvertResult<String> {
        Ok(serde_json::to_string_pretty(&self.fields)?)
    }

    /// The declared platform string (e.g., "osx", "linux", "win").
    #[must_use]
    pub fn platform(&self) -> &str {
        self.fields
            .get("platform")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn family(&self) -> PlatformFamily {
        PlatformFamily::from_platform_str(self.platform())
    }

    /// The platform token the package was built for, if recorded (e.g., "osx-64").
    #[must_use]
    pub fn subdir(&self) -> Option<&str> {
        self.fields.get("subdir").and_then(Value::as_str)
    }

    /// Get a raw field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Copy of this manifest with `platform` replaced.
    #[must_use]
    pub fn with_platform(&self, platform: &str) -> Self {
        let mut fields = self.fields.clone();
        fields.insert("platform".to_string(), Value::String(platform.to_string()));
        Self { fields }
    }

    /// Python version pinned in `depends`, if any.
    ///
    /// Entries look like `"python 3.3*"` or `"python 2.7.9 0"`; only the
    /// major and minor components are kept. A package depending on more than
    /// one python is rejected.
    pub fn runtime_version(&self) -> ConvertResult<Option<RuntimeVersion>> {
        let Some(depends) = self.fields.get("depends").and_then(Value::as_array) else {
            return Ok(None);
        };

        let mut found: Vec<RuntimeVersion> = depends
            .iter()
            .filter_map(Value::as_str)
            .filter_map(parse_python_dependency)
            .collect();

        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            _ => Err(ConvertError::ManifestMissing(format!(
                "found more than one python dependency in {MANIFEST_FILE}"
            ))),
        }
    }
}

fn parse_python_dependency(spec: &str) -> Option<RuntimeVersion> {
    let rest = spec.strip_prefix("python")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();

    let mut parts = rest.splitn(3, '.');
    let major = parts.next()?;
    let minor: String = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if major.is_empty() || !major.chars().all(|c| c.is_ascii_digit()) || minor.is_empty() {
        return None;
    }

    RuntimeVersion::parse(&format!("{major}.{minor}")).ok()
}
