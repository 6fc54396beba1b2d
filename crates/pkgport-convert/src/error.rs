//! Error types for conversion operations.

use thiserror::Error;

/// Errors that can occur while converting a package.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// I/O error while reading the source or writing the destination.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input does not carry a recognized package extension.
    #[error("{0} does not appear to be a conda package")]
    InputFormat(String),

    /// The manifest is absent or cannot be interpreted.
    #[error("Invalid or missing manifest: {0}")]
    ManifestMissing(String),

    /// Two source members were mapped onto the same destination path.
    #[error("Mapping collision: {first} and {second} both map to {destination}")]
    MappingCollision {
        first: String,
        second: String,
        destination: String,
    },

    /// A member name that is not valid UTF-8 or is otherwise unusable.
    #[error("Invalid member path: {0}")]
    InvalidMemberPath(String),

    /// Unknown platform token.
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    /// Malformed runtime version string.
    #[error("Invalid runtime version: {0}")]
    InvalidRuntimeVersion(String),
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn ConvertError___io___displays_message() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ConvertError = io_err.into();

        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn ConvertError___input_format___names_file() {
        let err = ConvertError::InputFormat("pkg.zip".to_string());

        assert_eq!(err.to_string(), "pkg.zip does not appear to be a conda package");
    }

    #[test]
    fn ConvertError___mapping_collision___displays_all_fields() {
        let err = ConvertError::MappingCollision {
            first: "bin/run".to_string(),
            second: "Scripts/run".to_string(),
            destination: "Scripts/run".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("bin/run"));
        assert!(msg.contains("both map to Scripts/run"));
    }

    #[test]
    fn ConvertError___manifest_missing___displays_reason() {
        let err = ConvertError::ManifestMissing("info/index.json not found".to_string());

        assert_eq!(
            err.to_string(),
            "Invalid or missing manifest: info/index.json not found"
        );
    }

    #[test]
    fn ConvertError___from_json_error___converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err: ConvertError = json_err.into();

        assert!(matches!(err, ConvertError::Json(_)));
    }
}
