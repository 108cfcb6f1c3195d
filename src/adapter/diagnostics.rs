//! Per-operation diagnostics and the connection error log
//!
//! Every failure an operation meets is recorded twice: into the operation's
//! own [`Outcome`], and, best effort, into an [`ErrorRecorder`] keyed by
//! connection so a host can report the accumulated errors later.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::error::AdapterError;

/// One recorded, human-readable diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// When the diagnostic was recorded
    pub at: DateTime<Utc>,
    /// Message text
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic stamped with the current time.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            message: message.into(),
        }
    }
}

/// Sink for errors recorded against a connection.
///
/// Recording must never fail the operation that records.
pub trait ErrorRecorder: Send + Sync {
    /// Record `message` against `connection`.
    fn record(&self, connection: &str, message: &str);
}

/// Messages kept per connection by [`ErrorLog::new`]
pub const DEFAULT_LOG_CAPACITY: usize = 256;

/// In-memory [`ErrorRecorder`] keeping recent messages per connection
///
/// Each connection keeps at most `capacity` entries; recording past that
/// drops the oldest. Hosts drain a connection's entries with [`ErrorLog::take`].
#[derive(Debug)]
pub struct ErrorLog {
    capacity: usize,
    entries: Mutex<HashMap<String, VecDeque<Diagnostic>>>,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl ErrorLog {
    /// Create an empty log holding [`DEFAULT_LOG_CAPACITY`] entries per connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty log holding `capacity` entries per connection (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Copy of the diagnostics recorded for a connection, oldest first.
    pub fn errors(&self, connection: &str) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .get(connection)
            .map(|kept| kept.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove and return the diagnostics recorded for a connection.
    pub fn take(&self, connection: &str) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .remove(connection)
            .map(|kept| kept.into_iter().collect())
            .unwrap_or_default()
    }

    /// Connections with at least one recorded diagnostic
    pub fn connections(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl ErrorRecorder for ErrorLog {
    fn record(&self, connection: &str, message: &str) {
        let mut entries = self.entries.lock();
        let kept = entries.entry(connection.to_owned()).or_default();
        if kept.len() == self.capacity {
            kept.pop_front();
        }
        kept.push_back(Diagnostic::now(message));
    }
}

/// Collector for the diagnostics of one operation.
pub struct Diagnostics {
    connection: String,
    recorder: Option<Arc<dyn ErrorRecorder>>,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Start collecting for `connection`, forwarding to `recorder` if set.
    pub fn new(connection: impl Into<String>, recorder: Option<Arc<dyn ErrorRecorder>>) -> Self {
        Self {
            connection: connection.into(),
            recorder,
            entries: Vec::new(),
        }
    }

    /// Collector that only keeps diagnostics locally.
    pub fn detached(connection: impl Into<String>) -> Self {
        Self::new(connection, None)
    }

    /// Record a diagnostic.
    pub fn record(&mut self, message: impl Into<String>) {
        let diagnostic = Diagnostic::now(message);
        tracing::warn!(connection = %self.connection, "{}", diagnostic.message);
        if let Some(recorder) = &self.recorder {
            recorder.record(&self.connection, &diagnostic.message);
        }
        self.entries.push(diagnostic);
    }

    /// Diagnostics recorded so far
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Finish collecting.
    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

/// Result of one domain operation, retries included
#[derive(Debug)]
pub struct Outcome {
    /// Domain value on success; the failure description otherwise
    pub value: String,
    /// Final error, if the operation did not succeed
    pub error: Option<AdapterError>,
    /// Number of attempts made (0 when nothing was sent)
    pub attempts: u32,
    /// Everything recorded along the way, including failed attempts that were retried
    pub diagnostics: Vec<Diagnostic>,
}

impl Outcome {
    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Diagnostic messages without timestamps
    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    /// Convert into the value or the final error.
    pub fn into_result(self) -> Result<String, AdapterError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}
