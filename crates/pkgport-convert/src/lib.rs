//! Conversion engine for pure-python conda packages
//!
//! This crate retargets a package archive built for one platform into
//! archives for other platforms. Conversion is path rewriting only: the
//! engine refuses (unless forced) packages whose content cannot survive a
//! rename, such as compiled extensions or native launcher stubs.
//!
//! # Package Structure
//!
//! ```text
//! mypkg-1.0-py33_0.tar.bz2
//! ├── info/
//! │   ├── index.json          # manifest, carries the `platform` field
//! │   ├── files               # list of installed paths
//! │   └── has_prefix          # unix only
//! ├── bin/                    # `Scripts/` on windows
//! │   └── mytool
//! └── lib/python3.3/          # `Lib/` on windows
//!     └── site-packages/
//!         └── mypkg/__init__.py
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pkgport_convert::{ConvertOptions, PlatformTarget, RuntimeVersion, convert_batch};
//!
//! let options = ConvertOptions::new("out", RuntimeVersion::parse("3.5")?);
//! let report = convert_batch(
//!     &["mypkg-1.0-py33_0.tar.bz2"],
//!     &[PlatformTarget::Win64, PlatformTarget::Linux32],
//!     &options,
//! );
//!
//! for record in report.records() {
//!     println!("{record}");
//! }
//! # Ok::<(), pkgport_convert::ConvertError>(())
//! ```

mod error;
mod manifest;
mod platform;

#[cfg(test)]
mod fixtures;

pub mod archive;
pub mod compat;
pub mod convert;
pub mod mapping;
pub mod rewrite;

pub use archive::{Compression, Member, MemberKind, PackageArchive};
pub use compat::{CompatibilityReport, LinkedLibraries};
pub use convert::{BatchReport, ConversionRecord, ConvertOptions, Outcome, convert_batch};
pub use error::ConvertError;
pub use manifest::PackageManifest;
pub use mapping::{Disposition, FileMapping, MappingEntry, PathLayout, RuntimeVersion};
pub use platform::{PlatformFamily, PlatformSelection, PlatformTarget};
pub use rewrite::RewriteSummary;

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Manifest member within a package.
pub const MANIFEST_FILE: &str = "info/index.json";

/// Installed-files listing within a package.
pub const FILE_LIST: &str = "info/files";

/// Prefix-replacement listing, only meaningful on unix.
pub const HAS_PREFIX_FILE: &str = "info/has_prefix";
