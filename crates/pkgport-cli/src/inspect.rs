//! Package inspection command.
//!
//! Prints what the converter sees in a package: its declared platform, the
//! python version it pins and the compatibility verdict for each family.

use crate::settings::Settings;
use anyhow::{Context, Result};
use pkgport_convert::{CompatibilityReport, MemberKind, PackageArchive, PlatformFamily};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct PackageView {
    file: String,
    platform: String,
    subdir: Option<String>,
    compression: &'static str,
    runtime_version: String,
    /// True when the version came from settings rather than the manifest.
    runtime_version_default: bool,
    member_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    members: Vec<MemberView>,
    compatibility: Vec<CompatibilityView>,
}

#[derive(Debug, Serialize)]
struct MemberView {
    path: String,
    kind: &'static str,
    size: u64,
    mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_target: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompatibilityView {
    to: &'static str,
    blocked: bool,
    compiled_extensions: Vec<String>,
    foreign_entry_points: Vec<String>,
}

impl From<&CompatibilityReport> for CompatibilityView {
    fn from(report: &CompatibilityReport) -> Self {
        Self {
            to: report.dest_family.as_str(),
            blocked: report.is_blocked(),
            compiled_extensions: report.compiled_extensions.clone(),
            foreign_entry_points: report.foreign_entry_points.clone(),
        }
    }
}

/// Run the inspect command.
pub fn run(file: &Path, settings: &Settings, verbose: bool, json: bool) -> Result<()> {
    let archive = PackageArchive::open(file)
        .with_context(|| format!("Failed to open package: {}", file.display()))?;
    let pinned = archive
        .manifest()
        .runtime_version()
        .with_context(|| format!("Failed to read manifest of {}", file.display()))?;

    let compatibility: Vec<CompatibilityView> = [PlatformFamily::Unix, PlatformFamily::Windows]
        .into_iter()
        .map(|dest| CompatibilityReport::check(archive.members(), archive.source_family(), dest))
        .map(|report| CompatibilityView::from(&report))
        .collect();

    let members = if verbose || json {
        archive.members().iter().map(member_view).collect()
    } else {
        Vec::new()
    };

    let view = PackageView {
        file: file.display().to_string(),
        platform: archive.declared_platform().to_string(),
        subdir: archive.manifest().subdir().map(str::to_string),
        compression: archive.compression().as_str(),
        runtime_version_default: pinned.is_none(),
        runtime_version: pinned
            .unwrap_or_else(|| settings.runtime_version.clone())
            .to_string(),
        member_count: archive.members().len(),
        members,
        compatibility,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view);
    }
    Ok(())
}

fn member_view(member: &pkgport_convert::Member) -> MemberView {
    let (kind, link_target) = match &member.kind {
        MemberKind::File => ("file", None),
        MemberKind::Directory => ("dir", None),
        MemberKind::Symlink { target } => ("symlink", Some(target.clone())),
        MemberKind::HardLink { target } => ("hardlink", Some(target.clone())),
        MemberKind::Other => ("other", None),
    };
    MemberView {
        path: member.path.clone(),
        kind,
        size: member.size,
        mode: format!("{:o}", member.mode),
        link_target,
    }
}

fn print_view(view: &PackageView) {
    println!("Package: {}", view.file);
    println!("  Platform:    {}", view.platform);
    if let Some(subdir) = &view.subdir {
        println!("  Subdir:      {subdir}");
    }
    println!("  Compression: {}", view.compression);
    println!(
        "  Python:      {}{}",
        view.runtime_version,
        if view.runtime_version_default {
            " (not pinned, using default)"
        } else {
            ""
        }
    );
    println!("  Members:     {}", view.member_count);

    for member in &view.members {
        match &member.link_target {
            Some(target) => println!("    {:>8} {} -> {target}", member.kind, member.path),
            None => println!("    {:>8} {} ({} bytes)", member.kind, member.path, member.size),
        }
    }

    for compat in &view.compatibility {
        if !compat.blocked {
            println!("  To {}: convertible", compat.to);
            continue;
        }
        println!("  To {}: blocked", compat.to);
        for path in &compat.compiled_extensions {
            println!("    compiled: {path}");
        }
        for path in &compat.foreign_entry_points {
            println!("    entry point: {path}");
        }
    }
}
