use crate::config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE: &str = "studydeck.log";

/// Keeps the background log writer alive; logs are flushed when dropped
pub struct LogGuard {
    _guard: WorkerGuard,
}

fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_env("STUDYDECK_LOG")
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to a file, since the terminal belongs to the UI
pub fn init_tracing(config: &Config) -> LogGuard {
    let file_appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(file_layer)
        .init();

    LogGuard { _guard: guard }
}
