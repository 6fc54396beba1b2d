//! Package inspection.
//!
//! [`PackageArchive`] opens a compressed package, reads its manifest and
//! records every member in stream order. The file handle stays open for the
//! lifetime of the archive and is rewound for each later pass, so a package
//! is decompressed once per conversion target but never opened for writing.

mod compression;

pub use compression::Compression;

use crate::{ConvertError, ConvertResult, MANIFEST_FILE, PackageManifest, PlatformFamily};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Longest interpreter line read from an entry point script.
///
/// Build prefixes padded with placeholders make shebangs far longer than a
/// typical path. A line hitting the cap is kept as read so far.
const MAX_INTERPRETER_LINE: u64 = 4096;

/// Kind of archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    /// Regular file.
    File,
    /// Directory entry.
    Directory,
    /// Symbolic link; the target is stored as written in the archive.
    Symlink { target: String },
    /// Hard link; the target is another member's path.
    HardLink { target: String },
    /// Anything else (fifos, devices, global pax headers). Copied verbatim.
    Other,
}

/// A single member of a package archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Slash-separated path relative to the package root.
    pub path: String,
    /// Size in bytes of the member's data.
    pub size: u64,
    /// Permission bits.
    pub mode: u32,
    /// Modification time (seconds since the epoch).
    pub mtime: u64,
    pub kind: MemberKind,
    /// First line of an entry point script, when it starts with `#!`.
    ///
    /// Only captured for regular files directly under `bin/` or `Scripts/`.
    pub interpreter: Option<String>,
}

impl Member {
    /// Regular file with default metadata.
    #[must_use]
    pub fn file(path: &str) -> Self {
        Self::new(path, MemberKind::File, 0o644)
    }

    #[must_use]
    pub fn directory(path: &str) -> Self {
        Self::new(path, MemberKind::Directory, 0o755)
    }

    #[must_use]
    pub fn symlink(path: &str, target: &str) -> Self {
        Self::new(
            path,
            MemberKind::Symlink {
                target: target.to_string(),
            },
            0o777,
        )
    }

    #[must_use]
    pub fn hard_link(path: &str, target: &str) -> Self {
        Self::new(
            path,
            MemberKind::HardLink {
                target: target.to_string(),
            },
            0o644,
        )
    }

    /// Attach an interpreter line.
    #[must_use]
    pub fn with_interpreter(mut self, line: &str) -> Self {
        self.interpreter = Some(line.to_string());
        self
    }

    fn new(path: &str, kind: MemberKind, mode: u32) -> Self {
        Self {
            path: path.to_string(),
            size: 0,
            mode,
            mtime: 0,
            kind,
            interpreter: None,
        }
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == MemberKind::File
    }

    /// Whether this member sits directly inside the top-level directory `dir`.
    #[must_use]
    pub fn is_directly_in(&self, dir: &str) -> bool {
        self.path
            .strip_prefix(dir)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| !name.is_empty() && !name.contains('/'))
    }

    /// Read member metadata from a tar entry.
    ///
    /// Returns `None` for the archive root (`./`), which is never carried over.
    pub(crate) fn from_entry<R: Read>(entry: &tar::Entry<'_, R>) -> ConvertResult<Option<Self>> {
        let path = normalize_member_path(&entry.path_bytes())?;
        if path.is_empty() {
            return Ok(None);
        }

        let header = entry.header();
        let entry_type = header.entry_type();
        let kind = if entry_type.is_symlink() {
            MemberKind::Symlink {
                target: link_target(entry, &path)?,
            }
        } else if entry_type.is_hard_link() {
            MemberKind::HardLink {
                target: normalize_member_path(link_target(entry, &path)?.as_bytes())?,
            }
        } else if entry_type.is_dir() {
            MemberKind::Directory
        } else if entry_type.is_file() || entry_type.is_contiguous() {
            MemberKind::File
        } else {
            MemberKind::Other
        };

        Ok(Some(Self {
            path,
            size: entry.size(),
            mode: header.mode()?,
            mtime: header.mtime()?,
            kind,
            interpreter: None,
        }))
    }
}

fn link_target<R: Read>(entry: &tar::Entry<'_, R>, path: &str) -> ConvertResult<String> {
    let bytes = entry
        .link_name_bytes()
        .ok_or_else(|| ConvertError::InvalidMemberPath(format!("{path}: link without target")))?;
    String::from_utf8(bytes.into_owned())
        .map_err(|e| ConvertError::InvalidMemberPath(format!("{path}: link target {e}")))
}

/// Canonical form of a member name: UTF-8, relative, no `./` prefix, no
/// trailing slash.
pub(crate) fn normalize_member_path(raw: &[u8]) -> ConvertResult<String> {
    let path = std::str::from_utf8(raw).map_err(|_| {
        ConvertError::InvalidMemberPath(format!(
            "{} is not valid UTF-8",
            String::from_utf8_lossy(raw)
        ))
    })?;

    let mut path = path;
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    let path = path.trim_end_matches('/');
    if path == "." {
        return Ok(String::new());
    }

    if path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
        return Err(ConvertError::InvalidMemberPath(format!(
            "{path} escapes the package root"
        )));
    }

    Ok(path.to_string())
}

/// An opened package: manifest, member list and a read handle.
#[derive(Debug)]
pub struct PackageArchive {
    path: PathBuf,
    file: File,
    compression: Compression,
    manifest: PackageManifest,
    members: Vec<Member>,
}

impl PackageArchive {
    /// Open a package for reading.
    ///
    /// The extension is checked before the filesystem is touched.
    pub fn open<P: AsRef<Path>>(path: P) -> ConvertResult<Self> {
        let path = path.as_ref();
        let compression = Compression::from_path(path)
            .ok_or_else(|| ConvertError::InputFormat(path.display().to_string()))?;

        let file = File::open(path)?;
        let (members, manifest_bytes) = scan(&file, compression)?;

        let manifest_bytes = manifest_bytes.ok_or_else(|| {
            ConvertError::ManifestMissing(format!(
                "{MANIFEST_FILE} not found in {}",
                path.display()
            ))
        })?;
        let manifest = PackageManifest::from_json(&manifest_bytes)?;

        debug!(
            "Opened {} ({}, {} members, platform {})",
            path.display(),
            compression.as_str(),
            members.len(),
            manifest.platform()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            compression,
            manifest,
            members,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The package file name, used as the output file name.
    #[must_use]
    pub fn file_name(&self) -> &std::ffi::OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }

    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    #[must_use]
    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    /// Declared platform string from the manifest.
    #[must_use]
    pub fn declared_platform(&self) -> &str {
        self.manifest.platform()
    }

    #[must_use]
    pub fn source_family(&self) -> PlatformFamily {
        self.manifest.family()
    }

    /// Members in archive order.
    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Read the contents of the named members in one pass.
    ///
    /// Members larger than `max_size` are skipped. Names that are not present
    /// are simply absent from the result.
    pub fn read_members(
        &self,
        paths: &[&str],
        max_size: u64,
    ) -> ConvertResult<HashMap<String, Vec<u8>>> {
        let wanted: HashSet<&str> = paths.iter().copied().collect();
        let mut found = HashMap::new();

        let mut archive = self.stream()?;
        for entry in archive.entries()? {
            let mut entry = entry?;
            let Some(member) = Member::from_entry(&entry)? else {
                continue;
            };
            if !wanted.contains(member.path.as_str()) || member.size > max_size {
                continue;
            }

            let mut contents = Vec::with_capacity(usize::try_from(member.size).unwrap_or(0));
            entry.read_to_end(&mut contents)?;
            found.insert(member.path, contents);

            if found.len() == wanted.len() {
                break;
            }
        }

        Ok(found)
    }

    /// Rewind the handle and start a fresh tar stream over it.
    pub(crate) fn stream(&self) -> ConvertResult<tar::Archive<Box<dyn Read + '_>>> {
        let mut handle = &self.file;
        handle.seek(SeekFrom::Start(0))?;
        Ok(tar::Archive::new(self.compression.decoder(handle)))
    }
}

/// First pass: collect members, the manifest bytes and entry point interpreters.
fn scan(file: &File, compression: Compression) -> ConvertResult<(Vec<Member>, Option<Vec<u8>>)> {
    let mut archive = tar::Archive::new(compression.decoder(file));
    let mut members = Vec::new();
    let mut manifest = None;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let Some(mut member) = Member::from_entry(&entry)? else {
            continue;
        };

        if member.path == MANIFEST_FILE {
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            manifest = Some(contents);
        } else if member.is_file()
            && [PlatformFamily::Unix, PlatformFamily::Windows]
                .iter()
                .any(|family| member.is_directly_in(family.bin_dir()))
        {
            member.interpreter = read_interpreter(&mut entry)?;
        }

        members.push(member);
    }

    Ok((members, manifest))
}

fn read_interpreter<R: Read>(entry: &mut R) -> ConvertResult<Option<String>> {
    let mut line = Vec::new();
    BufReader::new(entry.take(MAX_INTERPRETER_LINE)).read_until(b'\n', &mut line)?;

    if !line.starts_with(b"#!") {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&line).trim_end().to_string()))
}
