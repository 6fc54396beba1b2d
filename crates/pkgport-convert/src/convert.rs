//! Batch conversion.
//!
//! [`convert_batch`] attempts every (file, target) combination and records
//! one [`Outcome`] for each. A failure never stops the batch: it is recorded
//! against the combinations it affects and the next one is attempted.

use crate::mapping::build_mapping;
use crate::rewrite::rewrite;
use crate::{
    CompatibilityReport, ConvertError, ConvertResult, FileMapping, PackageArchive, PathLayout,
    PlatformFamily, PlatformTarget, RewriteSummary, RuntimeVersion,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Settings shared by every conversion in a batch.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Converted packages go to `<output_dir>/<platform>/<file name>`.
    pub output_dir: PathBuf,
    /// Used when a package does not pin a python version.
    pub runtime_version: RuntimeVersion,
    /// Layout for unix packages whose members show neither layout, and for
    /// every conversion from windows.
    pub layout: PathLayout,
    /// Convert even when the compatibility checks object.
    pub force: bool,
    pub verbose: bool,
    /// Resolve the libraries each compiled member links against.
    pub show_imports: bool,
    /// Compute mappings without writing anything.
    pub dry_run: bool,
}

impl ConvertOptions {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, runtime_version: RuntimeVersion) -> Self {
        Self {
            output_dir: output_dir.into(),
            runtime_version,
            layout: PathLayout::default(),
            force: false,
            verbose: false,
            show_imports: false,
            dry_run: false,
        }
    }

    #[must_use]
    pub fn layout(mut self, layout: PathLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn show_imports(mut self, show_imports: bool) -> Self {
        self.show_imports = show_imports;
        self
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Where a package named `file_name` is written for `target`.
    #[must_use]
    pub fn destination(&self, target: PlatformTarget, file_name: &std::ffi::OsStr) -> PathBuf {
        self.output_dir.join(target.as_str()).join(file_name)
    }
}

/// What happened to one (file, target) combination.
#[derive(Debug)]
pub enum Outcome {
    /// A converted package was written.
    Converted {
        summary: RewriteSummary,
        /// The report that was overridden with `force`, if any.
        forced: Option<CompatibilityReport>,
    },
    /// Dry run: the package would have been written to `destination`.
    Planned {
        destination: PathBuf,
        mapping: FileMapping,
        report: CompatibilityReport,
    },
    /// The compatibility checks refused the conversion.
    SkippedBlocked { report: CompatibilityReport },
    /// The target needs no conversion.
    SkippedExclusion { reason: String },
    /// The conversion failed. Shared when one error fails several targets.
    Failed { error: Arc<ConvertError> },
}

impl Outcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Short name of the outcome kind.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Converted { forced: None, .. } => "converted",
            Self::Converted { forced: Some(_), .. } => "converted (forced)",
            Self::Planned { .. } => "planned",
            Self::SkippedBlocked { .. } => "skipped",
            Self::SkippedExclusion { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// One attempted conversion.
#[derive(Debug)]
pub struct ConversionRecord {
    pub source: PathBuf,
    /// Declared platform of the source, when the package could be read.
    pub source_platform: Option<String>,
    pub target: PlatformTarget,
    pub outcome: Outcome,
}

impl fmt::Display for ConversionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) -> {}: {}",
            self.source.display(),
            self.source_platform.as_deref().unwrap_or("unknown platform"),
            self.target,
            self.outcome.label()
        )?;

        match &self.outcome {
            Outcome::Converted { summary, forced } => {
                write!(f, ", wrote {}", summary.output.display())?;
                if let Some(report) = forced {
                    write!(f, " despite {}", report.reasons().join("; "))?;
                }
                Ok(())
            }
            Outcome::Planned {
                destination,
                mapping,
                ..
            } => write!(
                f,
                ", would write {} ({} of {} paths changed)",
                destination.display(),
                mapping.changes().count(),
                mapping.len()
            ),
            Outcome::SkippedBlocked { report } => {
                write!(f, ", found {}", report.reasons().join("; "))
            }
            Outcome::SkippedExclusion { reason } => write!(f, ", {reason}"),
            Outcome::Failed { error } => write!(f, ", {error}"),
        }
    }
}

/// Every record of a batch, in attempt order.
#[derive(Debug, Default)]
pub struct BatchReport {
    records: Vec<ConversionRecord>,
}

impl BatchReport {
    #[must_use]
    pub fn records(&self) -> &[ConversionRecord] {
        &self.records
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionRecord> {
        self.records.iter().filter(|record| record.outcome.is_failure())
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    fn push(&mut self, record: ConversionRecord) {
        match &record.outcome {
            Outcome::Failed { .. } | Outcome::SkippedBlocked { .. } => warn!("{record}"),
            _ => debug!("{record}"),
        }
        self.records.push(record);
    }
}

/// Convert each file to each target.
///
/// Files are processed in order; each source package is opened once and
/// closed after all of its targets have been attempted.
pub fn convert_batch<P: AsRef<Path>>(
    files: &[P],
    targets: &[PlatformTarget],
    options: &ConvertOptions,
) -> BatchReport {
    let mut report = BatchReport::default();

    for file in files {
        let file = file.as_ref();
        info!("Converting {}", file.display());

        let opened = PackageArchive::open(file).and_then(|archive| {
            let version = archive
                .manifest()
                .runtime_version()?
                .unwrap_or_else(|| options.runtime_version.clone());
            Ok((archive, version))
        });

        let (archive, version) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                let error = Arc::new(e);
                for &target in targets {
                    report.push(ConversionRecord {
                        source: file.to_path_buf(),
                        source_platform: None,
                        target,
                        outcome: Outcome::Failed {
                            error: Arc::clone(&error),
                        },
                    });
                }
                continue;
            }
        };

        for &target in targets {
            let outcome = convert_one(&archive, target, &version, options).unwrap_or_else(|e| {
                Outcome::Failed { error: Arc::new(e) }
            });
            report.push(ConversionRecord {
                source: file.to_path_buf(),
                source_platform: Some(archive.declared_platform().to_string()),
                target,
                outcome,
            });
        }
    }

    report
}

fn convert_one(
    archive: &PackageArchive,
    target: PlatformTarget,
    version: &RuntimeVersion,
    options: &ConvertOptions,
) -> ConvertResult<Outcome> {
    if archive.manifest().subdir() == Some(target.as_str()) {
        return Ok(Outcome::SkippedExclusion {
            reason: format!("package is already built for {target}"),
        });
    }

    let source = archive.source_family();
    let dest = target.family();

    let mut report = CompatibilityReport::check(archive.members(), source, dest);
    if options.show_imports {
        report = report.with_linked_libraries(archive);
    }

    let forced = if report.is_blocked() {
        if !options.force {
            return Ok(Outcome::SkippedBlocked { report });
        }
        warn!(
            "Forcing conversion of {} to {} despite {}",
            archive.path().display(),
            target,
            report.reasons().join("; ")
        );
        true
    } else {
        false
    };

    let layout = match source {
        PlatformFamily::Unix => {
            PathLayout::detect(archive.members(), version).unwrap_or(options.layout)
        }
        PlatformFamily::Windows => options.layout,
    };
    let mapping = build_mapping(archive.members(), source, dest, version, layout)?;
    let destination = options.destination(target, archive.file_name());

    if options.dry_run {
        return Ok(Outcome::Planned {
            destination,
            mapping,
            report,
        });
    }

    let summary = rewrite(archive, &mapping, target, &destination)?;
    Ok(Outcome::Converted {
        summary,
        forced: forced.then_some(report),
    })
}

#[cfg(test)]
#[path = "convert/convert_tests.rs"]
mod convert_tests;
