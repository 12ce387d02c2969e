//! Typed engine errors and the persistent error log surfaced by `ESC+E`.

use thiserror::Error;

/// Every failure mode the pipeline can hit. Only [`EngineError::Driver`]
/// ever reaches a caller as `Err`; the rest are recorded through
/// [`ErrorLog::record`] and the event that triggered them is dropped or
/// ignored in place, per the propagation policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The capture/inject primitive reported a failure. Ends the loop.
    #[error("capture driver error: {0}")]
    Driver(String),

    /// An unexpected raw event: code 0, code > 0x7F, or an unrecognized E1
    /// sequence.
    #[error("protocol anomaly: {0}")]
    ProtocolAnomaly(String),

    /// Duplicate rewire, duplicate combo with a different output, or an
    /// out-of-range macro slot in a loaded config.
    #[error("config conflict: {0}")]
    ConfigConflict(String),

    /// Second tap-hold while one is active, TEMPRELEASE without a matching
    /// RESTORE, down-counter drift, or a release of a never-pressed key.
    #[error("state violation: {0}")]
    StateViolation(String),

    /// A command or opcode was invoked with no valid target, e.g. playing
    /// an unrecorded macro slot.
    #[error("command failed: {0}")]
    CommandFailure(String),
}

impl EngineError {
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Driver(_))
    }
}

/// Append-only log of recovered (non-fatal) errors, surfaced verbatim by
/// the `ESC+E` command.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    lines: Vec<String>,
}

impl ErrorLog {
    #[must_use]
    pub fn new() -> Self {
        ErrorLog::default()
    }

    /// Records a non-fatal error: appends to the log and emits a
    /// `tracing` event at a severity matching the error kind.
    pub fn record(&mut self, err: &EngineError) {
        match err {
            EngineError::Driver(_) => tracing::error!(%err, "fatal driver error"),
            EngineError::ConfigConflict(_) | EngineError::StateViolation(_) => {
                tracing::warn!(%err, "recovered engine error");
            }
            EngineError::ProtocolAnomaly(_) | EngineError::CommandFailure(_) => {
                tracing::info!(%err, "recovered engine error");
            }
        }
        self.lines.push(err.to_string());
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.lines.join("\n")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_driver_is_fatal() {
        assert!(EngineError::Driver("x".into()).is_fatal());
        assert!(!EngineError::CommandFailure("x".into()).is_fatal());
    }

    #[test]
    fn log_accumulates_recovered_errors() {
        let mut log = ErrorLog::new();
        log.record(&EngineError::StateViolation("second tap-hold".into()));
        log.record(&EngineError::ProtocolAnomaly("code 0".into()));
        assert!(log.as_str().contains("second tap-hold"));
        assert!(log.as_str().contains("code 0"));
        assert!(!log.is_empty());
    }
}
