//! Classification tables for compatibility checks.
//!
//! Everything the checker considers "native" or "foreign" is decided here,
//! so the rules can be read, tested and extended in one place.

use crate::{Member, PlatformFamily};

/// File name suffixes of native code on unix.
pub const UNIX_NATIVE_SUFFIXES: &[&str] = &[".so", ".dylib"];

/// Marker for versioned shared objects (`libfoo.so.1.2`).
pub const UNIX_VERSIONED_SO_MARKER: &str = ".so.";

/// File name suffixes of native code on windows.
pub const WINDOWS_NATIVE_SUFFIXES: &[&str] = &[".pyd", ".dll"];

/// Launcher stubs in `Scripts/` with no unix counterpart.
pub const WINDOWS_LAUNCHER_SUFFIXES: &[&str] = &[".exe"];

/// Entry points in `bin/` that are python sources regardless of a shebang.
pub const PYTHON_SCRIPT_SUFFIXES: &[&str] = &[".py"];

/// Word an interpreter line must contain to count as a python entry point.
pub const PYTHON_INTERPRETER: &str = "python";

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether `path` names native code for `family`.
#[must_use]
pub fn is_native_binary(path: &str, family: PlatformFamily) -> bool {
    let name = file_name(path);
    match family {
        PlatformFamily::Unix => {
            UNIX_NATIVE_SUFFIXES.iter().any(|s| name.ends_with(s))
                || name
                    .split_once(UNIX_VERSIONED_SO_MARKER)
                    .is_some_and(|(_, version)| {
                        !version.is_empty()
                            && version.chars().all(|c| c.is_ascii_digit() || c == '.')
                    })
        }
        PlatformFamily::Windows => WINDOWS_NATIVE_SUFFIXES
            .iter()
            .any(|s| name.to_ascii_lowercase().ends_with(s)),
    }
}

/// Whether an interpreter line launches python.
#[must_use]
pub fn is_python_shebang(line: &str) -> bool {
    line.starts_with("#!") && line.contains(PYTHON_INTERPRETER)
}

/// Whether `member` is an entry point that cannot be carried from `source`
/// to `dest` by renaming alone.
#[must_use]
pub fn is_foreign_entry_point(member: &Member, source: PlatformFamily, dest: PlatformFamily) -> bool {
    if source == dest || !member.is_file() || !member.is_directly_in(source.bin_dir()) {
        return false;
    }

    let name = file_name(&member.path);
    match source {
        // Shell scripts and native executables have no windows equivalent.
        PlatformFamily::Unix => {
            let is_python_source = PYTHON_SCRIPT_SUFFIXES.iter().any(|s| name.ends_with(s));
            let is_python_script = member
                .interpreter
                .as_deref()
                .is_some_and(is_python_shebang);
            !is_python_source && !is_python_script
        }
        PlatformFamily::Windows => WINDOWS_LAUNCHER_SUFFIXES
            .iter()
            .any(|s| name.to_ascii_lowercase().ends_with(s)),
    }
}
