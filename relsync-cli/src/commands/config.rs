//! Configuration management commands.
//!
//! `config init`, `config show`, `config get`, `config set` and
//! `config path` operate on the INI file without touching the game
//! directory.

use std::path::Path;

use clap::Subcommand;
use relsync::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a config file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print every setting
    Show,

    /// Print one setting
    Get {
        /// Key in section.key form, e.g. download.max_workers
        key: String,
    },

    /// Change one setting
    Set {
        /// Key in section.key form, e.g. download.max_workers
        key: String,

        /// New value; empty clears optional settings
        value: String,
    },

    /// Print the config file location
    Path,
}

pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    match command {
        ConfigCommands::Init { force } => run_init(&path, force),
        ConfigCommands::Show => run_show(&path),
        ConfigCommands::Get { key } => run_get(&path, &key),
        ConfigCommands::Set { key, value } => run_set(&path, &key, &value),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{key}'. Use 'relsync config show' to see available keys."
        ))
    })
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.is_file() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }
    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;

    let mut current_section = "";
    for key in ConfigKey::ALL {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{section}]");
            current_section = section;
        }

        let value = key.get(&config);
        if value.is_empty() {
            println!("  {} = (not set)", key.name());
        } else {
            println!("  {} = {}", key.name(), value);
        }
    }
    Ok(())
}

fn run_get(path: &Path, key: &str) -> Result<(), CliError> {
    let key = parse_key(key)?;
    let value = key.get(&ConfigFile::load_from(path)?);
    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{value}");
    }
    Ok(())
}

fn run_set(path: &Path, key: &str, value: &str) -> Result<(), CliError> {
    let key = parse_key(key)?;
    let mut config = ConfigFile::load_from(path)?;
    key.set(&mut config, value)?;
    config.save_to(path)?;
    println!("Set {key} = {value}");
    Ok(())
}
