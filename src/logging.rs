//! Tracing subscriber setup

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber, writing to `log_path` when its directory is usable
///
/// Falls back to stderr otherwise. Keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init(log_path: &Path, json: bool) -> WorkerGuard {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (writer, guard) = match log_path
        .parent()
        .map(std::fs::create_dir_all)
        .transpose()
    {
        Ok(_) => {
            let directory = log_path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = log_path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| "release-gateway.log".into());
            tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name))
        }
        Err(_) => tracing_appender::non_blocking(std::io::stderr()),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    guard
}

/// Shorten a credential for log output, keeping at most four leading characters
pub fn redact(secret: &str) -> String {
    match secret.char_indices().nth(4) {
        Some((cut, _)) if secret.chars().count() > 8 => format!("{}***", &secret[..cut]),
        _ => "***".to_string(),
    }
}
