//! `relsync verify` - report missing files of an installed release.

use console::style;
use relsync::SyncError;

use super::common::CliContext;
use crate::error::CliError;

pub fn run(context: &CliContext, id: &str) -> Result<(), CliError> {
    let manager = context.manager();
    if !manager.sync_info(id).installed {
        return Err(SyncError::NotInstalled(id.to_string()).into());
    }

    let release = manager.resolve(id)?;
    let required = manager.required_files(&release)?;
    let missing = manager.missing_files(&release)?;

    if missing.is_empty() {
        println!("{} {id}: all {} required files present", style("✓").green().bold(), required.len());
        return Ok(());
    }

    println!(
        "{} {id}: {} of {} required files missing",
        style("✗").red().bold(),
        missing.len(),
        required.len()
    );
    for file in &missing {
        println!("  {}", file.display());
    }
    Err(SyncError::MissingFiles {
        id: id.to_string(),
        missing: missing.len(),
    }
    .into())
}
