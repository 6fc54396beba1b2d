//! Package fixtures for unit tests.

use crate::{Compression, MANIFEST_FILE};
use std::fs::File;
use std::path::{Path, PathBuf};

pub(crate) const MTIME: u64 = 1_400_000_000;

enum FixtureEntry {
    File {
        path: String,
        contents: Vec<u8>,
        mode: u32,
    },
    Dir(String),
    Symlink(String, String),
    HardLink(String, String),
}

/// Builds small package archives on disk.
pub(crate) struct PackageFixture {
    compression: Compression,
    entries: Vec<FixtureEntry>,
}

impl PackageFixture {
    /// Package with a manifest declaring `platform` and a python 3.3 dependency.
    pub(crate) fn new(platform: &str) -> Self {
        let subdir = match platform {
            "osx" => "osx-64",
            "linux" => "linux-64",
            _ => "win-64",
        };
        Self::bare().manifest(&format!(
            r#"{{"name": "demo", "version": "1.0", "platform": "{platform}", "subdir": "{subdir}", "depends": ["python 3.3*"], "build": "py33_0"}}"#
        ))
    }

    /// Package without any manifest.
    pub(crate) fn bare() -> Self {
        Self {
            compression: Compression::Bzip2,
            entries: Vec::new(),
        }
    }

    pub(crate) fn manifest(self, json: &str) -> Self {
        self.file(MANIFEST_FILE, json.as_bytes())
    }

    pub(crate) fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub(crate) fn file(self, path: &str, contents: &[u8]) -> Self {
        self.file_with_mode(path, contents, 0o644)
    }

    pub(crate) fn file_with_mode(mut self, path: &str, contents: &[u8], mode: u32) -> Self {
        self.entries.push(FixtureEntry::File {
            path: path.to_string(),
            contents: contents.to_vec(),
            mode,
        });
        self
    }

    pub(crate) fn dir(mut self, path: &str) -> Self {
        self.entries.push(FixtureEntry::Dir(path.to_string()));
        self
    }

    pub(crate) fn symlink(mut self, path: &str, target: &str) -> Self {
        self.entries
            .push(FixtureEntry::Symlink(path.to_string(), target.to_string()));
        self
    }

    pub(crate) fn hard_link(mut self, path: &str, target: &str) -> Self {
        self.entries
            .push(FixtureEntry::HardLink(path.to_string(), target.to_string()));
        self
    }

    pub(crate) fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut builder = tar::Builder::new(self.compression.encoder(file));

        for entry in &self.entries {
            let mut header = tar::Header::new_gnu();
            header.set_mtime(MTIME);
            match entry {
                FixtureEntry::File {
                    path,
                    contents,
                    mode,
                } => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_mode(*mode);
                    header.set_size(contents.len() as u64);
                    builder
                        .append_data(&mut header, path, contents.as_slice())
                        .unwrap();
                }
                FixtureEntry::Dir(path) => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_mode(0o755);
                    header.set_size(0);
                    builder
                        .append_data(&mut header, path, std::io::empty())
                        .unwrap();
                }
                FixtureEntry::Symlink(path, target) => {
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_mode(0o777);
                    header.set_size(0);
                    builder.append_link(&mut header, path, target).unwrap();
                }
                FixtureEntry::HardLink(path, target) => {
                    header.set_entry_type(tar::EntryType::Link);
                    header.set_mode(0o644);
                    header.set_size(0);
                    builder.append_link(&mut header, path, target).unwrap();
                }
            }
        }

        builder.into_inner().unwrap().finish().unwrap();
        path
    }
}
