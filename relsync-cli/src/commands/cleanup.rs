//! `relsync cleanup`

use super::common::CliContext;
use crate::error::CliError;

pub fn run(context: &CliContext) -> Result<(), CliError> {
    let report = context.manager().perform_cleanups();
    if report.total() == 0 {
        println!("Nothing to clean up.");
        return Ok(());
    }

    println!("Removed:");
    println!("  Asset objects:       {}", report.objects);
    println!("  Virtual asset trees: {}", report.virtual_roots);
    println!("  Libraries:           {}", report.libraries);
    println!("  Empty directories:   {}", report.directories);
    Ok(())
}
