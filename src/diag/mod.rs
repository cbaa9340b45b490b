//! Pluggable diagnostics
//!
//! The transport never logs directly; everything goes through an optional
//! [`DiagnosticsSink`]. An absent sink suppresses output entirely, so
//! embedding the transport never requires a logging setup.

use std::sync::Arc;

/// Receiver for transport diagnostics
///
/// Implementations must be cheap and non-blocking; loop tasks call these
/// inline on their hot path during failure handling.
pub trait DiagnosticsSink: Send + Sync {
    /// Informational event (connection lifecycle, clean peer close)
    fn info(&self, message: &str);

    /// Degraded but recoverable condition
    fn warn(&self, message: &str);

    /// Failure that terminated a loop or direction
    fn error(&self, message: &str);
}

/// Sink that forwards to the `tracing` macros
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn info(&self, message: &str) {
        tracing::info!(target: "message_transport", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "message_transport", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "message_transport", "{}", message);
    }
}

/// Internal handle treating an absent sink as a no-op at every call site
#[derive(Clone, Default)]
pub(crate) struct Diag(Option<Arc<dyn DiagnosticsSink>>);

impl Diag {
    pub(crate) fn new(sink: Option<Arc<dyn DiagnosticsSink>>) -> Self {
        Self(sink)
    }

    pub(crate) fn info(&self, message: &str) {
        if let Some(sink) = &self.0 {
            sink.info(message);
        }
    }

    pub(crate) fn warn(&self, message: &str) {
        if let Some(sink) = &self.0 {
            sink.warn(message);
        }
    }

    pub(crate) fn error(&self, message: &str) {
        if let Some(sink) = &self.0 {
            sink.error(message);
        }
    }
}
