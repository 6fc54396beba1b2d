//! Package conversion command.

use anyhow::Result;
use pkgport_convert::{
    BatchReport, CompatibilityReport, ConvertOptions, Outcome, PlatformSelection, convert_batch,
};
use std::path::PathBuf;

/// Run the convert command.
pub fn run(
    files: &[PathBuf],
    platforms: &[PlatformSelection],
    options: &ConvertOptions,
) -> Result<()> {
    let targets = PlatformSelection::expand(platforms);
    let report = convert_batch(files, &targets, options);

    print_report(&report, options);

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} conversions failed", report.records().len());
    }
    Ok(())
}

fn print_report(report: &BatchReport, options: &ConvertOptions) {
    for record in report.records() {
        println!("{record}");

        match &record.outcome {
            Outcome::Planned {
                mapping, report, ..
            } => {
                if options.verbose {
                    for entry in mapping.changes() {
                        match entry.destination() {
                            Some(destination) => println!("  {} -> {destination}", entry.source),
                            None => println!("  {} (excluded)", entry.source),
                        }
                        if let Some(target) = &entry.link_target {
                            println!("    link target -> {target}");
                        }
                    }
                }
                print_imports(report, options);
            }
            Outcome::SkippedBlocked { report } => {
                print_imports(report, options);
                println!("  Use --force to convert anyway.");
            }
            Outcome::Converted {
                forced: Some(report),
                ..
            } => print_imports(report, options),
            _ => {}
        }
    }
}

fn print_imports(report: &CompatibilityReport, options: &ConvertOptions) {
    if !options.show_imports {
        return;
    }
    for (path, libraries) in &report.linked_libraries {
        println!("  {path} links against {libraries}");
    }
}
