//! `relsync list`

use console::style;
use relsync::catalog::{ReleaseSource, SyncInfo, VersionFilter};
use relsync::version::ReleaseType;

use super::common::{CliContext, ReleaseTypeArg};
use crate::error::CliError;

pub fn run(context: &CliContext, types: &[ReleaseTypeArg], max: usize) -> Result<(), CliError> {
    let mut filter = VersionFilter::new().with_max_count(max);
    if !types.is_empty() {
        filter = filter.only_types(types.iter().copied().map(ReleaseType::from));
    }

    let releases = context.manager().release_list(&filter);
    if releases.is_empty() {
        println!("No releases found.");
        return Ok(());
    }

    for info in &releases {
        let released = info
            .latest()
            .and_then(|latest| latest.release_time().or(latest.updated_time()))
            .map(|time| time.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let release_type = info.release_type().map_or("?", |t| t.name());
        println!("{:<24} {:<10} {:<10} {}", info.id(), release_type, released, status_label(info));
    }
    Ok(())
}

fn status_label(info: &SyncInfo) -> String {
    match (info.installed, info.up_to_date) {
        (true, true) => style("installed").green().to_string(),
        (true, false) if info.latest_source() == ReleaseSource::Remote => style("update available").yellow().to_string(),
        (true, false) => style("incomplete").yellow().to_string(),
        (false, _) => style("available").dim().to_string(),
    }
}
