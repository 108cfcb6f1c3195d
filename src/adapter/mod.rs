//! QRC adapter and public API
//!
//! This module provides the [`Adapter`] that turns get/set parameter requests
//! into QRC exchanges over one connection, and the configuration it is built
//! from.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// Submodules
pub mod codec;
pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod exchange;
pub mod mappers;
pub mod retry;

use codec::{Codec, IdGenerator};
use connection::{LineConnection, SocketTimeouts};
use diagnostics::{Diagnostics, ErrorRecorder, Outcome};
use exchange::Exchanger;
use retry::{RetryPolicy, Sleeper, Success, ThreadSleeper};

/// Configuration for talking to one core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Core host name or address
    pub host: String,

    /// QRC port on the core
    pub port: u16,

    /// Attempts per operation, the first one included
    pub max_attempts: u32,

    /// Pause between attempts, in milliseconds
    pub retry_backoff_ms: u64,

    /// Notification method discarded while waiting for a response
    pub heartbeat_method: String,

    /// Bound on establishing the TCP connection, in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Bound on a single blocking read, in milliseconds
    pub read_timeout_ms: Option<u64>,

    /// Bound on a single write, in milliseconds
    pub write_timeout_ms: Option<u64>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: crate::DEFAULT_PORT,
            max_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: retry::DEFAULT_BACKOFF.as_millis() as u64,
            heartbeat_method: codec::DEFAULT_HEARTBEAT_METHOD.to_string(),
            connect_timeout_ms: None,
            read_timeout_ms: None,
            write_timeout_ms: None,
        }
    }
}

impl AdapterConfig {
    /// Retry limits described by this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Socket timeouts described by this configuration
    pub fn socket_timeouts(&self) -> SocketTimeouts {
        SocketTimeouts {
            connect: self.connect_timeout_ms.map(Duration::from_millis),
            read: self.read_timeout_ms.map(Duration::from_millis),
            write: self.write_timeout_ms.map(Duration::from_millis),
        }
    }

    /// `host:port`, used as the connection key
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Get/set parameter adapter bound to one connection
///
/// Every operation runs to completion, retries and backoff included, before
/// it returns. Operations take `&mut self`, so one adapter never has more than
/// one request in flight.
pub struct Adapter<C> {
    key: String,
    exchanger: Exchanger<C>,
    retry: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
    recorder: Option<Arc<dyn ErrorRecorder>>,
}

impl<C: LineConnection> Adapter<C> {
    /// Create an adapter for the connection identified by `key`.
    pub fn new(key: impl Into<String>, connection: C, config: &AdapterConfig) -> Self {
        Self {
            key: key.into(),
            exchanger: Exchanger::new(connection, Codec::new(config.heartbeat_method.clone())),
            retry: config.retry_policy(),
            sleeper: Box::new(ThreadSleeper),
            recorder: None,
        }
    }

    /// Replace how the adapter waits between attempts.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Replace the request id source.
    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.exchanger = self.exchanger.with_ids(ids);
        self
    }

    /// Also record every diagnostic into `recorder`.
    pub fn with_recorder(mut self, recorder: Arc<dyn ErrorRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Connection key used for diagnostics
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Retry limits in effect
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// The underlying connection
    pub fn connection(&self) -> &C {
        self.exchanger.connection()
    }

    /// The underlying connection, mutably
    pub fn connection_mut(&mut self) -> &mut C {
        self.exchanger.connection_mut()
    }

    /// Give the connection back.
    pub fn into_connection(self) -> C {
        self.exchanger.into_connection()
    }

    fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new(self.key.clone(), self.recorder.clone())
    }

    /// Run one logical operation under the retry policy.
    fn run<F>(&mut self, operation: &str, success: Success, mut attempt: F) -> Outcome
    where
        F: FnMut(&mut Exchanger<C>, &mut Diagnostics) -> Result<String, AdapterError>,
    {
        let mut diagnostics = self.diagnostics();
        let Self {
            exchanger,
            retry,
            sleeper,
            ..
        } = self;

        let settled = retry.run(
            operation,
            success,
            &mut **sleeper,
            &mut diagnostics,
            |diagnostics| attempt(&mut *exchanger, diagnostics),
        );

        Outcome {
            value: settled.value,
            error: settled.error,
            attempts: settled.attempts,
            diagnostics: diagnostics.into_entries(),
        }
    }

    /// Fail without touching the connection.
    fn reject(&self, error: AdapterError, value: impl Into<String>) -> Outcome {
        let mut diagnostics = self.diagnostics();
        diagnostics.record(error.to_string());
        Outcome {
            value: value.into(),
            error: Some(error),
            attempts: 0,
            diagnostics: diagnostics.into_entries(),
        }
    }
}

// Re-export commonly used types
pub use connection::{StreamConnection, TcpConnection};
pub use dispatch::Handler;
pub use error::{AdapterError, ErrorKind};
