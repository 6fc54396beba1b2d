//! Writing converted packages.
//!
//! [`rewrite`] streams the source package member by member into a new
//! archive, applying a [`FileMapping`]. File contents are copied straight
//! from the decompressor to the compressor, so memory use does not grow
//! with package size. Output goes to a temporary file next to the
//! destination and is renamed into place only once complete.

use crate::archive::{Member, MemberKind};
use crate::{
    ConvertError, ConvertResult, FILE_LIST, FileMapping, MANIFEST_FILE, PackageArchive,
    PlatformTarget,
};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a finished rewrite produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Final location of the converted package.
    pub output: PathBuf,
    /// Members written, renamed or not.
    pub written: usize,
    /// Members written under a new path.
    pub renamed: usize,
    /// Members left out.
    pub excluded: usize,
}

/// Write a converted copy of `archive` for `target` at `destination`.
///
/// The manifest's `platform` field is set to the target's declared platform
/// and `info/files` is translated through the mapping. Every other member
/// keeps its type, mode and modification time.
pub fn rewrite(
    archive: &PackageArchive,
    mapping: &FileMapping,
    target: PlatformTarget,
    destination: &Path,
) -> ConvertResult<RewriteSummary> {
    let out_dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(out_dir)?;

    let manifest_json = archive
        .manifest()
        .with_platform(target.declared_platform())
        .to_json()?;

    let temp = tempfile::Builder::new()
        .prefix(".pkgport-")
        .suffix(".partial")
        .tempfile_in(out_dir)?;

    let mut summary = RewriteSummary {
        output: destination.to_path_buf(),
        written: 0,
        renamed: 0,
        excluded: 0,
    };

    {
        let mut builder = tar::Builder::new(archive.compression().encoder(temp.as_file()));
        let mut source = archive.stream()?;

        for entry in source.entries()? {
            let mut entry = entry?;
            let Some(member) = Member::from_entry(&entry)? else {
                continue;
            };
            let mapped = mapping.get(&member.path).ok_or_else(|| {
                ConvertError::InvalidMemberPath(format!(
                    "{} changed while converting {}",
                    member.path,
                    archive.path().display()
                ))
            })?;
            let Some(dest_path) = mapped.destination() else {
                debug!("Excluding {}", member.path);
                summary.excluded += 1;
                continue;
            };

            let mut header = entry.header().clone();
            if member.path == MANIFEST_FILE {
                header.set_size(manifest_json.len() as u64);
                builder.append_data(&mut header, dest_path, manifest_json.as_bytes())?;
            } else if member.path == FILE_LIST && member.is_file() {
                let mut listing = String::new();
                entry.read_to_string(&mut listing)?;
                let listing = translate_file_list(&listing, mapping);
                header.set_size(listing.len() as u64);
                builder.append_data(&mut header, dest_path, listing.as_bytes())?;
            } else {
                match &member.kind {
                    MemberKind::Symlink { target } | MemberKind::HardLink { target } => {
                        let link = mapped.link_target.as_deref().unwrap_or(target);
                        header.set_size(0);
                        builder.append_link(&mut header, dest_path, link)?;
                    }
                    _ => builder.append_data(&mut header, dest_path, &mut entry)?,
                }
            }

            summary.written += 1;
            if dest_path != member.path {
                summary.renamed += 1;
            }
        }

        builder.into_inner()?.finish()?;
    }

    temp.as_file().sync_all()?;
    temp.persist(destination).map_err(|e| ConvertError::Io(e.error))?;

    info!(
        "Wrote {} ({} members, {} renamed, {} excluded)",
        destination.display(),
        summary.written,
        summary.renamed,
        summary.excluded
    );

    Ok(summary)
}

/// Translate a newline-separated path listing through the mapping.
///
/// Excluded paths are dropped; paths that are not members are kept.
pub(crate) fn translate_file_list(listing: &str, mapping: &FileMapping) -> String {
    let mut translated = String::with_capacity(listing.len());
    for path in listing.lines().filter(|line| !line.is_empty()) {
        if let Some(destination) = mapping.translate(path) {
            translated.push_str(destination);
            translated.push('\n');
        }
    }
    translated
}
