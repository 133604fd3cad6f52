//! Diagnostics port used for non-fatal precision checks.
//!
//! Models never log directly. They receive an `Arc<dyn Diagnostics>` through the
//! [`PricerContext`](crate::market::PricerContext) and report through it, so a
//! host application decides where messages go and tests can assert on them.

use std::fmt;
use std::sync::Mutex;

/// Severity attached to a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
        };
        f.write_str(s)
    }
}

pub trait Diagnostics: Send + Sync + fmt::Debug {
    fn report(&self, severity: Severity, message: &str);

    fn warn(&self, message: &str) {
        self.report(Severity::Warn, message);
    }

    fn debug(&self, message: &str) {
        self.report(Severity::Debug, message);
    }
}

/// Forwards every message to the `tracing` subscriber installed by the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(target: "cdx_option", "{message}"),
            Severity::Info => tracing::info!(target: "cdx_option", "{message}"),
            Severity::Warn => tracing::warn!(target: "cdx_option", "{message}"),
        }
    }
}

/// Keeps every message in memory. Handy in tests and batch jobs that want to
/// attach warnings to their results.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Severity, String)> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, severity: Severity, message: &str) {
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((severity, message.to_string()));
    }
}
