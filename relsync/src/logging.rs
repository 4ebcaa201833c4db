//! Logging setup for binaries embedding the library.
//!
//! The library itself only emits `tracing` events. Call [`init_logging`]
//! once at startup to print them to stderr and, optionally, to a daily
//! rolling `relsync.log`.

use std::path::PathBuf;
use std::sync::Once;

use time::format_description::well_known::Rfc3339;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use tracing_appender::non_blocking::WorkerGuard;

static INIT: Once = Once::new();

/// File name prefix of the rolling log.
pub const LOG_FILE_NAME: &str = "relsync.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directive used when `RUST_LOG` is not set.
    pub default_filter: Option<String>,
    /// Directory for the rolling log file.
    pub log_dir: Option<PathBuf>,
    /// Use ANSI colors on the console.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: None,
            log_dir: None,
            ansi: true,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = Some(filter.into());
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// Install the global subscriber.
///
/// Returns the file writer's guard, which must stay alive for buffered
/// lines to be flushed. Later calls do nothing and return `None`.
pub fn init_logging(config: LogConfig) -> Option<WorkerGuard> {
    let mut guard = None;

    INIT.call_once(|| {
        let default = config.default_filter.as_deref().unwrap_or("info");
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .with_timer(LocalTime::new(Rfc3339))
            .with_target(false);

        let file = config.log_dir.as_ref().map(|dir| {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::new(Rfc3339))
                .boxed()
        });

        // Another subscriber may already be installed, e.g. by a test harness
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(console)
            .with(file)
            .try_init();
    });

    guard
}
