#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use oryx_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oryx")]
#[command(author, version, about = "Generate Bazel build manifests from npm package descriptors", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Scan the repository and write WORKSPACE, third-party and per-package BUILD files
    Generate {
        /// Registry base URL (overrides ORYX_NPM_REGISTRY and the public default)
        #[arg(long, value_name = "URL")]
        registry: Option<String>,

        /// Cap on simultaneous registry connections
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// List local packages discovered in the repository
    Packages,

    /// Evaluate semver queries from stdin, one per line
    Semver,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    // Build config
    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    // Commands that handle their own output (JSON to stdout, no logging)
    if matches!(cli.command, Some(Commands::Semver)) {
        return commands::semver::run();
    }

    if matches!(cli.command, Some(Commands::Packages)) {
        return commands::packages::run(&cwd, cli.json);
    }

    // Initialize logging for other commands
    logging::init(config.verbosity, config.json_logs);

    // Dispatch to command
    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Generate {
            registry,
            concurrency,
        }) => {
            let span = tracing::info_span!("generate", cwd = %cwd.display());
            let _guard = span.enter();
            commands::generate::run(&config, registry, concurrency, cli.json)
        }
        Some(Commands::Packages | Commands::Semver) => {
            unreachable!() // Handled above
        }
    }
}
