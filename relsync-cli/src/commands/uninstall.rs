//! `relsync uninstall`

use super::common::CliContext;
use crate::error::CliError;

pub fn run(context: &CliContext, id: &str) -> Result<(), CliError> {
    context.manager().uninstall(id)?;
    println!("Uninstalled {id}. Run 'relsync cleanup' to remove files it no longer shares.");
    Ok(())
}
