//! relsync CLI - keep a game directory in sync with its release catalog.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;
use relsync::catalog::DEFAULT_MAX_COUNT;

mod commands;
mod error;

use commands::common::{CliContext, ReleaseTypeArg};
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "relsync", version, about = "Resolve, download and clean up game releases")]
struct Cli {
    /// Configuration file to use instead of the per-user config.ini
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Game directory, overriding the configured one
    #[arg(long, global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List installed and available releases
    List {
        /// Only show these release types
        #[arg(long = "type", value_enum)]
        types: Vec<ReleaseTypeArg>,

        /// Remote-only releases shown per type
        #[arg(long, default_value_t = DEFAULT_MAX_COUNT)]
        max: usize,
    },

    /// Download everything a release needs to launch
    Install {
        /// Release id, e.g. 1.20.1
        id: String,
    },

    /// Remove an installed release
    Uninstall { id: String },

    /// Check that every required file of a release is present
    Verify { id: String },

    /// Delete files no installed release needs
    Cleanup,

    /// View or change the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("error:").red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Config { command } = cli.command {
        return commands::config::run(command, cli.config.as_deref());
    }

    let context = CliContext::new(cli.config.as_deref(), cli.base_dir, cli.verbose)?;
    match cli.command {
        Commands::List { types, max } => commands::list::run(&context, &types, max),
        Commands::Install { id } => commands::install::run(&context, &id),
        Commands::Uninstall { id } => commands::uninstall::run(&context, &id),
        Commands::Verify { id } => commands::verify::run(&context, &id),
        Commands::Cleanup => commands::cleanup::run(&context),
        Commands::Config { .. } => Ok(()),
    }
}
