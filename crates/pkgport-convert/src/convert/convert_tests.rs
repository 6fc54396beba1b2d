#![allow(non_snake_case)]

use super::*;
use crate::fixtures::PackageFixture;
use tempfile::TempDir;

const SPEEDUPS: &[u8] = b"\x7fELF not really a shared object";
const PACKAGE: &str = "mypkg-1.0-py33_0.tar.bz2";

fn options(out: &Path) -> ConvertOptions {
    ConvertOptions::new(out, RuntimeVersion::parse("3.5").unwrap())
}

fn pure_osx_package(dir: &Path) -> PathBuf {
    PackageFixture::new("osx")
        .file_with_mode("bin/mytool", b"#!/usr/bin/env python\nimport mypkg\n", 0o755)
        .file("lib/python3.3/site-packages/mypkg/__init__.py", b"")
        .write(dir, PACKAGE)
}

fn compiled_linux_package(dir: &Path) -> PathBuf {
    PackageFixture::new("linux")
        .file("lib/python3.3/site-packages/mypkg/__init__.py", b"")
        .file("lib/python3.3/site-packages/mypkg/_speedups.so", SPEEDUPS)
        .write(dir, PACKAGE)
}

fn outcomes(report: &BatchReport) -> Vec<(PlatformTarget, &'static str)> {
    report
        .records()
        .iter()
        .map(|record| (record.target, record.outcome.label()))
        .collect()
}

#[test]
fn convert_batch___pure_package___converts_all_other_targets() {
    let temp_dir = TempDir::new().unwrap();
    let package = pure_osx_package(temp_dir.path());
    let out = temp_dir.path().join("out");

    let report = convert_batch(&[&package], PlatformTarget::all(), &options(&out));

    assert_eq!(
        outcomes(&report),
        vec![
            (PlatformTarget::Osx64, "skipped"),
            (PlatformTarget::Linux32, "converted"),
            (PlatformTarget::Linux64, "converted"),
            (PlatformTarget::Win32, "converted"),
            (PlatformTarget::Win64, "converted"),
        ]
    );
    assert!(!report.has_failures());
    assert!(!out.join("osx-64").exists());
    for token in ["linux-32", "linux-64", "win-32", "win-64"] {
        assert!(out.join(token).join(PACKAGE).is_file(), "{token}");
    }

    let windows = PackageArchive::open(out.join("win-64").join(PACKAGE)).unwrap();
    assert_eq!(windows.declared_platform(), "win");
    assert!(windows.members().iter().any(|m| m.path == "Scripts/mytool"));
}

#[test]
fn convert_batch___dry_run___creates_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let package = pure_osx_package(temp_dir.path());
    let out = temp_dir.path().join("out");

    let report = convert_batch(
        &[&package],
        &[PlatformTarget::Win64, PlatformTarget::Linux64],
        &options(&out).dry_run(true),
    );

    assert!(!out.exists());
    match &report.records()[0].outcome {
        Outcome::Planned {
            destination,
            mapping,
            ..
        } => {
            assert_eq!(*destination, out.join("win-64").join(PACKAGE));
            assert_eq!(mapping.translate("bin/mytool"), Some("Scripts/mytool"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    match &report.records()[1].outcome {
        Outcome::Planned { mapping, .. } => assert!(mapping.is_identity()),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn convert_batch___compiled_extension___blocked_without_force() {
    let temp_dir = TempDir::new().unwrap();
    let package = compiled_linux_package(temp_dir.path());
    let out = temp_dir.path().join("out");

    let report = convert_batch(&[&package], &[PlatformTarget::Win64], &options(&out));

    let record = &report.records()[0];
    match &record.outcome {
        Outcome::SkippedBlocked { report } => {
            assert_eq!(
                report.compiled_extensions,
                vec!["lib/python3.3/site-packages/mypkg/_speedups.so"]
            );
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!report.has_failures());
    assert!(!out.join("win-64").join(PACKAGE).exists());

    let message = record.to_string();
    assert!(message.contains(PACKAGE));
    assert!(message.contains("(linux)"));
    assert!(message.contains("win-64"));
    assert!(message.contains("compiled extensions"));
}

#[test]
fn convert_batch___compiled_extension_forced___copied_verbatim() {
    let temp_dir = TempDir::new().unwrap();
    let package = compiled_linux_package(temp_dir.path());
    let out = temp_dir.path().join("out");

    let report = convert_batch(
        &[&package],
        &[PlatformTarget::Win64],
        &options(&out).force(true),
    );

    match &report.records()[0].outcome {
        Outcome::Converted {
            forced: Some(report),
            ..
        } => assert!(report.has_compiled_extension()),
        other => panic!("unexpected outcome: {other:?}"),
    }
    let converted = PackageArchive::open(out.join("win-64").join(PACKAGE)).unwrap();
    let contents = converted
        .read_members(&["Lib/site-packages/mypkg/_speedups.so"], 1024)
        .unwrap();
    assert_eq!(contents["Lib/site-packages/mypkg/_speedups.so"], SPEEDUPS);
}

#[test]
fn convert_batch___shell_entry_point___blocked_for_windows_only() {
    let temp_dir = TempDir::new().unwrap();
    let package = PackageFixture::new("linux")
        .file_with_mode("bin/run.sh", b"#!/bin/sh\nexec python -m mypkg\n", 0o755)
        .write(temp_dir.path(), PACKAGE);
    let out = temp_dir.path().join("out");

    let report = convert_batch(
        &[&package],
        &[PlatformTarget::Win32, PlatformTarget::Osx64],
        &options(&out),
    );

    assert_eq!(
        outcomes(&report),
        vec![
            (PlatformTarget::Win32, "skipped"),
            (PlatformTarget::Osx64, "converted"),
        ]
    );
    assert!(matches!(
        &report.records()[0].outcome,
        Outcome::SkippedBlocked { report } if report.foreign_entry_points == vec!["bin/run.sh"]
    ));
}

#[test]
fn convert_batch___collision___fails_that_pair_only() {
    let temp_dir = TempDir::new().unwrap();
    let package = PackageFixture::new("win")
        .file("Scripts/run", b"print('a')\n")
        .file("bin/run", b"print('b')\n")
        .write(temp_dir.path(), PACKAGE);
    let out = temp_dir.path().join("out");

    let report = convert_batch(
        &[&package],
        &[PlatformTarget::Linux64, PlatformTarget::Win32],
        &options(&out),
    );

    assert_eq!(
        outcomes(&report),
        vec![
            (PlatformTarget::Linux64, "failed"),
            (PlatformTarget::Win32, "converted"),
        ]
    );
    assert!(matches!(
        &report.records()[0].outcome,
        Outcome::Failed { error } if matches!(**error, ConvertError::MappingCollision { .. })
    ));
    assert!(!out.join("linux-64").join(PACKAGE).exists());
    assert!(out.join("win-32").join(PACKAGE).exists());
}

#[test]
fn convert_batch___bad_input___fails_only_that_file() {
    let temp_dir = TempDir::new().unwrap();
    let good = pure_osx_package(temp_dir.path());
    let bad = temp_dir.path().join("mypkg-1.0.zip");
    let missing = temp_dir.path().join("missing-1.0-0.tar.bz2");
    let out = temp_dir.path().join("out");

    let report = convert_batch(
        &[bad.clone(), missing.clone(), good],
        &[PlatformTarget::Win64, PlatformTarget::Linux64],
        &options(&out),
    );

    assert_eq!(report.records().len(), 6);
    assert_eq!(report.failures().count(), 4);
    for record in &report.records()[..2] {
        assert_eq!(record.source, bad);
        assert!(record.source_platform.is_none());
        assert!(matches!(
            &record.outcome,
            Outcome::Failed { error } if matches!(**error, ConvertError::InputFormat(_))
        ));
    }
    for record in &report.records()[2..4] {
        assert_eq!(record.source, missing);
        assert!(matches!(
            &record.outcome,
            Outcome::Failed { error } if matches!(**error, ConvertError::Io(_))
        ));
    }
    assert!(
        report.records()[4..]
            .iter()
            .all(|record| record.outcome.label() == "converted")
    );
}

#[test]
fn convert_batch___ambiguous_python_dependency___fails_file() {
    let temp_dir = TempDir::new().unwrap();
    let package = PackageFixture::bare()
        .manifest(r#"{"platform": "win", "depends": ["python 2.7*", "python 3.4*"]}"#)
        .write(temp_dir.path(), PACKAGE);

    let report = convert_batch(
        &[&package],
        &[PlatformTarget::Osx64],
        &options(&temp_dir.path().join("out")),
    );

    assert!(matches!(
        &report.records()[0].outcome,
        Outcome::Failed { error } if matches!(**error, ConvertError::ManifestMissing(_))
    ));
}

#[test]
fn convert_batch___windows_to_unix___uses_pinned_python() {
    let temp_dir = TempDir::new().unwrap();
    let package = PackageFixture::bare()
        .manifest(r#"{"platform": "win", "subdir": "win-64", "depends": ["python 2.7*"]}"#)
        .file("Lib/site-packages/mypkg/__init__.py", b"")
        .write(temp_dir.path(), PACKAGE);

    let report = convert_batch(
        &[&package],
        &[PlatformTarget::Linux64],
        &options(&temp_dir.path().join("out")).dry_run(true),
    );

    match &report.records()[0].outcome {
        Outcome::Planned { mapping, .. } => assert_eq!(
            mapping.translate("Lib/site-packages/mypkg/__init__.py"),
            Some("lib/python2.7/site-packages/mypkg/__init__.py")
        ),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn convert_batch___windows_to_unix___falls_back_to_configured_python() {
    let temp_dir = TempDir::new().unwrap();
    let package = PackageFixture::bare()
        .manifest(r#"{"platform": "win", "depends": []}"#)
        .file("Lib/mypkg.py", b"")
        .write(temp_dir.path(), PACKAGE);

    let report = convert_batch(
        &[&package],
        &[PlatformTarget::Osx64],
        &options(&temp_dir.path().join("out"))
            .layout(PathLayout::Bare)
            .dry_run(true),
    );

    match &report.records()[0].outcome {
        Outcome::Planned { mapping, .. } => {
            assert_eq!(mapping.translate("Lib/mypkg.py"), Some("lib/3.5/mypkg.py"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn ConvertOptions___destination___nests_platform_directory() {
    let options = options(Path::new("build"));

    assert_eq!(
        options.destination(PlatformTarget::Linux32, std::ffi::OsStr::new(PACKAGE)),
        Path::new("build").join("linux-32").join(PACKAGE)
    );
}

#[test]
fn convert_batch___long_python_shebang___not_blocked() {
    let temp_dir = TempDir::new().unwrap();
    let script = format!(
        "#!/home/b/conda-bld/pkg_1/_h_env_{}/bin/python\nimport mypkg\n",
        "placehold_".repeat(24)
    );
    let package = PackageFixture::new("linux")
        .file_with_mode("bin/tool", script.as_bytes(), 0o755)
        .write(temp_dir.path(), PACKAGE);
    let out = temp_dir.path().join("out");

    let report = convert_batch(&[&package], &[PlatformTarget::Win64], &options(&out));

    assert_eq!(outcomes(&report), vec![(PlatformTarget::Win64, "converted")]);
    assert!(out.join("win-64").join(PACKAGE).is_file());
}

#[test]
fn convert_batch___bare_unix_layout___detected_from_members() {
    let temp_dir = TempDir::new().unwrap();
    let package = PackageFixture::new("linux")
        .file("lib/3.3/pkg/mod.py", b"")
        .write(temp_dir.path(), PACKAGE);

    let report = convert_batch(
        &[&package],
        &[PlatformTarget::Win64],
        &options(&temp_dir.path().join("out")).dry_run(true),
    );

    match &report.records()[0].outcome {
        Outcome::Planned { mapping, .. } => {
            assert_eq!(mapping.translate("lib/3.3/pkg/mod.py"), Some("Lib/pkg/mod.py"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
