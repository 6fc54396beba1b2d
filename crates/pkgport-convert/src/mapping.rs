//! Path mapping between platform layouts.
//!
//! Unix and windows packages lay out the same python files differently:
//!
//! ```text
//! unix                                   windows
//! bin/mytool                      <->    Scripts/mytool
//! lib/python3.3/site-packages/x   <->    Lib/site-packages/x
//! ```
//!
//! The unix side embeds the runtime version, so converting from windows
//! needs the caller to say which version to embed. [`build_mapping`] turns a
//! member list into a [`FileMapping`] without touching the archive.

use crate::archive::{Member, MemberKind};
use crate::{ConvertError, ConvertResult, HAS_PREFIX_FILE, PlatformFamily};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// A python runtime version, normalized to `major.minor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuntimeVersion(String);

impl RuntimeVersion {
    /// Parse `"3.4"` or the compact numeric form `"34"`.
    ///
    /// In the compact form the first digit is the major version and the rest
    /// is the minor version (`"310"` is 3.10).
    pub fn parse(s: &str) -> ConvertResult<Self> {
        let invalid = || ConvertError::InvalidRuntimeVersion(s.to_string());
        let is_number = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());

        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, minor),
            None if s.len() >= 2 && s.is_ascii() => s.split_at(1),
            None => return Err(invalid()),
        };
        if !is_number(major) || !is_number(minor) {
            return Err(invalid());
        }

        Ok(Self(format!("{major}.{minor}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the unix library directory spells the runtime version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathLayout {
    /// `lib/python3.3/...`, as found in conda packages.
    #[default]
    Conda,
    /// `lib/3.3/...`, the version segment alone.
    Bare,
}

impl PathLayout {
    /// The directory name embedding `version` under `lib/`.
    #[must_use]
    pub fn version_segment(&self, version: &RuntimeVersion) -> String {
        match self {
            Self::Conda => format!("python{version}"),
            Self::Bare => version.to_string(),
        }
    }

    /// Full library prefix for a family (`lib/python3.3` or `Lib`).
    #[must_use]
    pub fn lib_prefix(&self, family: PlatformFamily, version: &RuntimeVersion) -> String {
        match family {
            PlatformFamily::Unix => format!(
                "{}/{}",
                family.lib_dir(),
                self.version_segment(version)
            ),
            PlatformFamily::Windows => family.lib_dir().to_string(),
        }
    }

    /// The layout a unix package's members use for `version`, if either
    /// library prefix appears among them. Conda wins when both do.
    #[must_use]
    pub fn detect(members: &[Member], version: &RuntimeVersion) -> Option<Self> {
        [Self::Conda, Self::Bare].into_iter().find(|layout| {
            let prefix = layout.lib_prefix(PlatformFamily::Unix, version);
            members.iter().any(|member| {
                member
                    .path
                    .strip_prefix(&prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
        })
    }
}

/// What happens to one source member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Written under its original path.
    Passthrough,
    /// Written under a new path.
    Rename(String),
    /// Left out of the converted package.
    Exclude,
}

/// Mapping decision for a single member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Path in the source package.
    pub source: String,
    pub disposition: Disposition,
    /// Replacement link target, for links whose target moved.
    pub link_target: Option<String>,
}

impl MappingEntry {
    /// Path in the converted package, or `None` when excluded.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        match &self.disposition {
            Disposition::Passthrough => Some(&self.source),
            Disposition::Rename(path) => Some(path),
            Disposition::Exclude => None,
        }
    }

    /// Whether this entry leaves the member exactly as it was.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.disposition == Disposition::Passthrough && self.link_target.is_none()
    }
}

/// Ordered per-member mapping for one conversion.
#[derive(Debug, Clone, Default)]
pub struct FileMapping {
    entries: Vec<MappingEntry>,
    index: HashMap<String, usize>,
}

impl FileMapping {
    /// Entries in member order.
    #[must_use]
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Look up the entry for a source path.
    #[must_use]
    pub fn get(&self, source: &str) -> Option<&MappingEntry> {
        self.index.get(source).map(|&i| &self.entries[i])
    }

    /// Translate a source path through the mapping.
    ///
    /// Paths that are not members are returned unchanged; excluded members
    /// yield `None`.
    #[must_use]
    pub fn translate<'a>(&'a self, path: &'a str) -> Option<&'a str> {
        match self.get(path) {
            Some(entry) => entry.destination(),
            None => Some(path),
        }
    }

    /// Entries that change something.
    pub fn changes(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter().filter(|entry| !entry.is_identity())
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.changes().next().is_none()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: MappingEntry) -> ConvertResult<()> {
        if let Some(&existing) = self.index.get(&entry.source) {
            return Err(ConvertError::MappingCollision {
                first: self.entries[existing].source.clone(),
                second: entry.source,
                destination: self.entries[existing]
                    .destination()
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        self.index.insert(entry.source.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }
}

/// A directory prefix moved from one place to another.
#[derive(Debug, Clone)]
struct PrefixRule {
    from: String,
    to: String,
}

impl PrefixRule {
    fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    fn apply(&self, path: &str) -> Option<String> {
        if path == self.from {
            return Some(self.to.clone());
        }
        let rest = path.strip_prefix(&self.from)?.strip_prefix('/')?;
        Some(format!("{}/{rest}", self.to))
    }
}

fn prefix_rules(
    source: PlatformFamily,
    dest: PlatformFamily,
    version: &RuntimeVersion,
    layout: PathLayout,
) -> Vec<PrefixRule> {
    if source == dest {
        return Vec::new();
    }
    vec![
        PrefixRule::new(source.bin_dir(), dest.bin_dir()),
        PrefixRule::new(
            layout.lib_prefix(source, version),
            layout.lib_prefix(dest, version),
        ),
    ]
}

fn apply_rules(rules: &[PrefixRule], path: &str) -> Option<String> {
    rules.iter().find_map(|rule| rule.apply(path))
}

/// Build the mapping for converting `members` from `source` to `dest`.
///
/// `version` is the version embedded in unix library paths: the version
/// found in the source paths when converting to windows, and the version to
/// embed when converting from windows.
///
/// Fails with [`ConvertError::MappingCollision`] when two members would be
/// written to the same path.
pub fn build_mapping(
    members: &[Member],
    source: PlatformFamily,
    dest: PlatformFamily,
    version: &RuntimeVersion,
    layout: PathLayout,
) -> ConvertResult<FileMapping> {
    let rules = prefix_rules(source, dest, version, layout);
    let mut mapping = FileMapping::default();
    let mut destinations: HashMap<String, String> = HashMap::new();

    for member in members {
        let disposition = if is_excluded(&member.path, source, dest) {
            Disposition::Exclude
        } else {
            match apply_rules(&rules, &member.path) {
                Some(new_path) => Disposition::Rename(new_path),
                None => Disposition::Passthrough,
            }
        };

        let entry = MappingEntry {
            link_target: remap_link(member, &disposition, &rules),
            source: member.path.clone(),
            disposition,
        };

        if let Some(destination) = entry.destination().map(str::to_string) {
            if let Some(first) = destinations.insert(destination.clone(), entry.source.clone()) {
                return Err(ConvertError::MappingCollision {
                    first,
                    second: entry.source,
                    destination,
                });
            }
        }

        if !entry.is_identity() {
            debug!("{} -> {:?}", entry.source, entry.destination());
        }
        mapping.push(entry)?;
    }

    Ok(mapping)
}

/// Members dropped for a given conversion direction.
fn is_excluded(path: &str, source: PlatformFamily, dest: PlatformFamily) -> bool {
    source == PlatformFamily::Unix && dest == PlatformFamily::Windows && path == HAS_PREFIX_FILE
}

/// New target for a link member, if its location or its target moved.
fn remap_link(member: &Member, disposition: &Disposition, rules: &[PrefixRule]) -> Option<String> {
    match &member.kind {
        MemberKind::HardLink { target } => apply_rules(rules, target),
        MemberKind::Symlink { target } => {
            let new_path = match disposition {
                Disposition::Passthrough => &member.path,
                Disposition::Rename(path) => path,
                Disposition::Exclude => return None,
            };
            remap_symlink(&member.path, new_path, target, rules)
        }
        _ => None,
    }
}

fn remap_symlink(
    link_path: &str,
    new_link_path: &str,
    target: &str,
    rules: &[PrefixRule],
) -> Option<String> {
    if target.starts_with('/') {
        return None;
    }

    let old_parent = parent_dir(link_path);
    let new_parent = parent_dir(new_link_path);
    let resolved = resolve(old_parent, target)?;
    let moved_target = apply_rules(rules, &resolved);

    if moved_target.is_none() && old_parent == new_parent {
        return None;
    }
    let new_target = moved_target.unwrap_or(resolved);
    Some(relative_to(new_parent, &new_target))
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Resolve `target` against `dir`, or `None` if it escapes the package root.
fn resolve(dir: &str, target: &str) -> Option<String> {
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            name => segments.push(name),
        }
    }
    Some(segments.join("/"))
}

/// Relative path from directory `dir` to package path `path`.
fn relative_to(dir: &str, path: &str) -> String {
    let from: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
