//! `relsync install` - full sync with a progress bar.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use relsync::download::{DownloadProgress, ProgressListener};

use super::common::CliContext;
use crate::error::CliError;

/// How long running downloads may drain after Ctrl+C.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub fn run(context: &CliContext, id: &str) -> Result<(), CliError> {
    let manager = Arc::clone(context.manager());

    let interrupted = Arc::clone(&manager);
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Interrupted, letting running downloads finish...");
        interrupted.shutdown(SHUTDOWN_TIMEOUT);
        process::exit(130);
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {e}")))?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let listener_bar = bar.clone();
    let listener: Arc<dyn ProgressListener> = Arc::new(move |progress: &DownloadProgress| {
        listener_bar.set_length(progress.total);
        listener_bar.set_position(progress.current);
        listener_bar.set_message(progress.status.clone());
    });

    let reporter = manager.watch_progress(listener);
    let result = manager.prepare_launch(id);
    drop(reporter);
    bar.finish_and_clear();

    let plan = result?;
    println!("{} {} is ready", style("✓").green().bold(), plan.descriptor.id);
    if let Some(main_class) = &plan.descriptor.main_class {
        println!("  Main class:  {main_class}");
    }
    println!("  Class path:  {} entries", plan.classpath.len());
    println!("  Assets:      {}", plan.asset_root.display());
    Ok(())
}
