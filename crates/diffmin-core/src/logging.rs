use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSettings;

/// Initialize logging to stderr, plus a log file when a directory is
/// configured. Stdout is left alone: it carries the rendered program.
/// The returned guard must be held for the lifetime of the application so
/// that buffered file output is flushed.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    let (file_layer, guard) = match &settings.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = rolling::never(dir, "diffmin.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(guard)
}
