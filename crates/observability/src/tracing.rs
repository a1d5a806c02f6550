//! Tracing/logging initialization.
//!
//! JSON lines on stdout. The filter comes from `RUST_LOG`, then `LOG_LEVEL`,
//! then `info`.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = resolve_filter(
        std::env::var("RUST_LOG").ok(),
        std::env::var("LOG_LEVEL").ok(),
    );

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_current_span(true)
        .try_init();
}

/// Pick the first usable directive: `rust_log`, then `log_level`, then `info`.
///
/// `log_level` accepts plain level names in any case (`DEBUG`, `warning`).
pub fn resolve_filter(rust_log: Option<String>, log_level: Option<String>) -> EnvFilter {
    if let Some(filter) = rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
    {
        return filter;
    }

    log_level
        .map(|level| normalize_level(&level))
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_wins() {
        let f = resolve_filter(Some("debug".into()), Some("error".into()));
        assert_eq!(f.to_string(), "debug");
    }

    #[test]
    fn log_level_is_fallback_and_case_insensitive() {
        let f = resolve_filter(None, Some("WARNING".into()));
        assert_eq!(f.to_string(), "warn");
    }

    #[test]
    fn garbage_falls_back_to_info() {
        let f = resolve_filter(Some("   ".into()), Some("usageql=notalevel".into()));
        assert_eq!(f.to_string(), "info");
    }
}
