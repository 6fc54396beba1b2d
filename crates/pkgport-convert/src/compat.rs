//! Compatibility checks.
//!
//! A package can be converted by renaming paths only if it carries no
//! native code and no launchers tied to the source platform. The checks here
//! are pure functions over the member list; the tables they use live in
//! [`policy`].

pub mod policy;

use crate::{Member, PackageArchive, PlatformFamily};
use goblin::Object;
use goblin::mach::Mach;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Largest member read when resolving linked libraries.
const MAX_INSPECTED_BINARY: u64 = 64 * 1024 * 1024;

/// Native libraries a compiled member links against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkedLibraries {
    Resolved(Vec<String>),
    /// The member could not be read or parsed.
    Unknown,
}

impl fmt::Display for LinkedLibraries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(libs) if libs.is_empty() => write!(f, "(none)"),
            Self::Resolved(libs) => write!(f, "{}", libs.join(", ")),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of both checks for one (package, destination family) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityReport {
    pub source_family: PlatformFamily,
    pub dest_family: PlatformFamily,
    /// Members holding native code.
    pub compiled_extensions: Vec<String>,
    /// Entry points with no equivalent on the destination family.
    pub foreign_entry_points: Vec<String>,
    /// Linked libraries per compiled member, filled in on request.
    pub linked_libraries: BTreeMap<String, LinkedLibraries>,
}

impl CompatibilityReport {
    /// Run both checks.
    #[must_use]
    pub fn check(members: &[Member], source: PlatformFamily, dest: PlatformFamily) -> Self {
        let (_, compiled_extensions) = has_compiled_extension(members, source);
        let (_, foreign_entry_points) = has_foreign_entry_point(members, source, dest);

        Self {
            source_family: source,
            dest_family: dest,
            compiled_extensions,
            foreign_entry_points,
            linked_libraries: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn has_compiled_extension(&self) -> bool {
        !self.compiled_extensions.is_empty()
    }

    #[must_use]
    pub fn has_foreign_entry_point(&self) -> bool {
        !self.foreign_entry_points.is_empty()
    }

    /// Whether conversion must be refused unless forced.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.has_compiled_extension() || self.has_foreign_entry_point()
    }

    /// Resolve linked libraries for every compiled member.
    ///
    /// Best-effort: members that cannot be read or parsed are reported as
    /// [`LinkedLibraries::Unknown`].
    #[must_use]
    pub fn with_linked_libraries(mut self, archive: &PackageArchive) -> Self {
        if self.compiled_extensions.is_empty() {
            return self;
        }

        let paths: Vec<&str> = self.compiled_extensions.iter().map(String::as_str).collect();
        let contents = archive
            .read_members(&paths, MAX_INSPECTED_BINARY)
            .unwrap_or_else(|e| {
                debug!("Could not read compiled members: {e}");
                Default::default()
            });

        for path in &self.compiled_extensions {
            let libs = contents
                .get(path)
                .map_or(LinkedLibraries::Unknown, |bytes| linked_libraries(bytes));
            self.linked_libraries.insert(path.clone(), libs);
        }
        self
    }

    /// Human-readable reasons for a block, one per failed check.
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if self.has_compiled_extension() {
            reasons.push(format!(
                "compiled extensions ({})",
                self.compiled_extensions.join(", ")
            ));
        }
        if self.has_foreign_entry_point() {
            let kind = match self.source_family {
                PlatformFamily::Unix => "non-python entry points",
                PlatformFamily::Windows => "native entry point launchers",
            };
            reasons.push(format!("{kind} ({})", self.foreign_entry_points.join(", ")));
        }
        reasons
    }
}

/// Check for members holding native code for the source family.
///
/// Returns whether any were found, and their paths.
#[must_use]
pub fn has_compiled_extension(members: &[Member], source: PlatformFamily) -> (bool, Vec<String>) {
    let found: Vec<String> = members
        .iter()
        .filter(|member| policy::is_native_binary(&member.path, source))
        .map(|member| member.path.clone())
        .collect();
    (!found.is_empty(), found)
}

/// Check for entry points that only work on the source family.
///
/// Always false when both families are the same.
#[must_use]
pub fn has_foreign_entry_point(
    members: &[Member],
    source: PlatformFamily,
    dest: PlatformFamily,
) -> (bool, Vec<String>) {
    let found: Vec<String> = members
        .iter()
        .filter(|member| policy::is_foreign_entry_point(member, source, dest))
        .map(|member| member.path.clone())
        .collect();
    (!found.is_empty(), found)
}

/// Libraries a native binary links against.
#[must_use]
pub fn linked_libraries(bytes: &[u8]) -> LinkedLibraries {
    let libs: Vec<&str> = match Object::parse(bytes) {
        Ok(Object::Elf(elf)) => elf.libraries,
        Ok(Object::PE(pe)) => pe.libraries,
        // The first entry of a Mach-O library list is the binary itself.
        Ok(Object::Mach(Mach::Binary(macho))) => macho.libs.into_iter().skip(1).collect(),
        Ok(_) => return LinkedLibraries::Unknown,
        Err(e) => {
            debug!("Not a parseable binary: {e}");
            return LinkedLibraries::Unknown;
        }
    };
    LinkedLibraries::Resolved(libs.into_iter().map(str::to_string).collect())
}
