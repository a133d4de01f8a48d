//! Logging initialization.
//!
//! Uses the `tracing` ecosystem with human-readable or JSON output. Logs go to
//! stderr; stdout carries the import report.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// # Arguments
///
/// * `verbose` - If true, enables DEBUG level logging; otherwise INFO level.
/// * `json_format` - If true, outputs structured JSON logs; otherwise pretty-printed.
///
/// # Notes
///
/// - Log output goes to stderr (stdout carries the import report)
/// - The RUST_LOG environment variable can override the log level
pub fn init(verbose: bool, json_format: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` section, with CLI flags taking precedence.
pub fn init_from_config(
    config: &lychee_ingest_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let (verbose, json_format) = resolve(config, verbose_override, json_logs_override);
    init(verbose, json_format);
}

fn resolve(
    config: &lychee_ingest_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) -> (bool, bool) {
    let verbose =
        verbose_override || config.logging.level == "debug" || config.logging.level == "trace";
    let json_format = json_logs_override || config.logging.format == "json";
    (verbose, json_format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lychee_ingest_core::Config;

    #[test]
    fn test_defaults_are_quiet_and_pretty() {
        assert_eq!(resolve(&Config::default(), false, false), (false, false));
    }

    #[test]
    fn test_flags_override_config() {
        assert_eq!(resolve(&Config::default(), true, true), (true, true));
    }

    #[test]
    fn test_config_levels() {
        let mut config = Config::default();
        config.logging.level = "trace".to_string();
        config.logging.format = "json".to_string();
        assert_eq!(resolve(&config, false, false), (true, true));
    }
}
