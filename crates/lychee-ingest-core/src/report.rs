//! Sink for non-fatal failures.
//!
//! Graceful-degradation paths (failed conversion, failed cleanup, a derived
//! variant that could not be rendered) hand their error here and carry on.
//! Reporting never fails and never blocks.

use std::error::Error;
use std::sync::Mutex;

pub trait ErrorReporter: Send + Sync {
    /// Record a recovered failure. `context` names the operation that failed.
    fn report(&self, context: &str, error: &(dyn Error + 'static));
}

/// Reports through `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, error: &(dyn Error + 'static)) {
        tracing::warn!(context, error = %error, "Recovered from failure");
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<(String, String)>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(context, message)` pairs, in report order.
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn contexts(&self) -> Vec<String> {
        self.reports().into_iter().map(|(c, _)| c).collect()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, context: &str, error: &(dyn Error + 'static)) {
        tracing::debug!(context, error = %error, "Collected failure report");
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((context.to_string(), error.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::new();
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        reporter.report("delete_raw_source", &err);
        TracingReporter.report("delete_raw_source", &err);

        assert_eq!(
            reporter.reports(),
            vec![("delete_raw_source".to_string(), "nope".to_string())]
        );
    }
}
