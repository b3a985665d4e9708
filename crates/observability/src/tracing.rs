//! Tracing/logging initialization.
//!
//! Level filter, first match wins:
//! 1. `RUST_LOG` (full `EnvFilter` directives)
//! 2. `LOG_LEVEL` (a bare level such as `debug`)
//! 3. `info`
//!
//! Output is JSON lines with timestamps unless `LOG_FORMAT=text`.

use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Pick the filter directive from the raw `RUST_LOG` / `LOG_LEVEL` values.
///
/// `RUST_LOG` is passed through untouched (targets and span field values are
/// case-sensitive); only the bare `LOG_LEVEL` is normalized.
pub fn filter_directive(rust_log: Option<&str>, log_level: Option<&str>) -> String {
    fn non_blank(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }
    if let Some(directives) = non_blank(rust_log) {
        return directives.to_string();
    }
    non_blank(log_level)
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

pub fn log_format(raw: Option<&str>) -> LogFormat {
    match raw.map(|v| v.trim().to_lowercase()).as_deref() {
        Some("text") | Some("pretty") => LogFormat::Text,
        _ => LogFormat::Json,
    }
}

/// Initialize tracing/logging for the process.
pub fn init() {
    let rust_log = std::env::var("RUST_LOG").ok();
    let log_level = std::env::var("LOG_LEVEL").ok();
    let directive = filter_directive(rust_log.as_deref(), log_level.as_deref());

    // An unparseable level must not take the service down.
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match log_format(std::env::var("LOG_FORMAT").ok().as_deref()) {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}
