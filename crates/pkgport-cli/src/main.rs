//! pkgport CLI - Convert pure-python conda packages between platforms
//!
//! Commands:
//! - `pkgport convert` - Convert packages to other platforms
//! - `pkgport inspect` - Show what a package contains and whether it converts
//! - `pkgport config` - Show the settings read from the environment

use clap::{Parser, Subcommand};
use pkgport_convert::{ConvertOptions, PlatformSelection};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod convert;
mod inspect;
mod settings;

use settings::Settings;

#[derive(Parser)]
#[command(name = "pkgport")]
#[command(author, version, about = "Convert pure-python conda packages between platforms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert packages to other platforms
    Convert {
        /// Package files to convert
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target platform (osx-64, linux-32, linux-64, win-32, win-64 or all)
        #[arg(short, long = "platform", required = true)]
        platforms: Vec<PlatformSelection>,

        /// Show the libraries compiled members link against
        #[arg(long)]
        show_imports: bool,

        /// Verbose output; with --dry-run, print every renamed path
        #[arg(short, long)]
        verbose: bool,

        /// Convert even when the package is not pure python
        #[arg(short, long)]
        force: bool,

        /// Directory that receives one subdirectory per platform
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Only show what would be done
        #[arg(long)]
        dry_run: bool,
    },

    /// Show a package's platform, contents and compatibility
    Inspect {
        /// Package file to inspect
        file: PathBuf,

        /// List every member
        #[arg(short, long)]
        verbose: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the settings read from the environment
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Convert { verbose, .. } | Commands::Inspect { verbose, .. } => *verbose,
        Commands::Config => false,
    };
    init_logging(verbose);

    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Convert {
            files,
            platforms,
            show_imports,
            verbose,
            force,
            output_dir,
            dry_run,
        } => {
            let options = ConvertOptions::new(output_dir, settings.runtime_version.clone())
                .force(force)
                .verbose(verbose)
                .show_imports(show_imports)
                .dry_run(dry_run);
            convert::run(&files, &platforms, &options)?;
        }
        Commands::Inspect {
            file,
            verbose,
            json,
        } => {
            inspect::run(&file, &settings, verbose, json)?;
        }
        Commands::Config => {
            println!("{settings}");
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over the default level.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
