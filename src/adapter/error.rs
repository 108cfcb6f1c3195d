//! Error types for the QRC adapter
//!
//! Errors are layered the same way the adapter is: the codec knows about
//! framing and JSON, the exchange adds transport failures, and the adapter
//! adds input validation, response-shape checks and dispatch failures.

use serde_json::{Number, Value};
use std::io;
use thiserror::Error;

/// Error object reported by the device in a response's `error` member.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Error Code: {code}, Error Message: {message}")]
pub struct ProtocolError {
    /// Numeric error code as sent by the device
    pub code: Number,
    /// Human-readable message as sent by the device
    pub message: String,
}

impl ProtocolError {
    /// Extract a protocol error from a response's `error` member.
    pub fn from_value(error: &Value) -> std::result::Result<Self, CodecError> {
        let code = match error.get("code") {
            Some(Value::Number(code)) => integral(code),
            _ => return Err(CodecError::MalformedError(error.to_string())),
        };
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| CodecError::MalformedError(error.to_string()))?
            .to_owned();

        Ok(Self { code, message })
    }
}

/// `2.0` becomes `2`; anything else is kept as sent.
fn integral(code: &Number) -> Number {
    match code.as_f64() {
        Some(f) if code.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Number::from(f as i64)
        }
        _ => code.clone(),
    }
}

/// Wire codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// A request identifier could not be produced
    #[error("error generating a unique request id: {0}")]
    Identifier(String),

    /// The request could not be serialized
    #[error("error encoding request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The device sent an empty frame
    #[error("response was blank")]
    BlankResponse,

    /// The frame was not a JSON object
    #[error("error decoding the json response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The response carried an `error` member without `code`/`message`
    #[error("malformed error object in response: {0}")]
    MalformedError(String),

    /// The device reported an error
    #[error(transparent)]
    Protocol(ProtocolError),
}

/// Errors from a single request/response round trip
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Writing the request frame failed
    #[error("error sending {method} command: {source}")]
    Send {
        /// QRC method that was being sent
        method: String,
        /// Underlying transport error
        #[source]
        source: io::Error,
    },

    /// Reading the response frame failed
    #[error("error reading response: {0}")]
    Read(#[source] io::Error),

    /// Encoding the request or decoding the response failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Two heartbeat notifications arrived where a response was expected
    #[error("received consecutive {0} notifications instead of a response")]
    RepeatedHeartbeat(String),
}

/// Top-level adapter error
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The round trip with the device failed
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// A domain argument could not be converted to its wire form
    #[error("invalid {what} {value:?}: {reason}")]
    InvalidInput {
        /// What kind of argument was rejected
        what: &'static str,
        /// The argument as received
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The response did not have the expected shape or values
    #[error("{0}")]
    Semantic(String),

    /// The setting name is not in the dispatch table
    #[error("unrecognized setting: {0}")]
    UnrecognizedSetting(String),

    /// Every attempt came back with the failure sentinel
    #[error("{operation} - max retries reached after {attempts} attempts")]
    RetriesExhausted {
        /// Operation that was retried
        operation: String,
        /// Number of attempts made
        attempts: u32,
    },
}

impl AdapterError {
    /// Construct an [`AdapterError::InvalidInput`].
    pub fn invalid_input(
        what: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            what,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::Exchange(err) => err.kind(),
            AdapterError::InvalidInput { .. } => ErrorKind::InvalidInput,
            AdapterError::Semantic(_) => ErrorKind::Semantic,
            AdapterError::UnrecognizedSetting(_) => ErrorKind::UnrecognizedOperation,
            AdapterError::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
        }
    }

    /// The device-reported error, if that is what this is.
    pub fn protocol_error(&self) -> Option<&ProtocolError> {
        match self {
            AdapterError::Exchange(ExchangeError::Codec(CodecError::Protocol(err))) => Some(err),
            _ => None,
        }
    }
}

impl ExchangeError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::Send { .. } => ErrorKind::Send,
            ExchangeError::Read(_) => ErrorKind::Receive,
            ExchangeError::Codec(err) => err.kind(),
            ExchangeError::RepeatedHeartbeat(_) => ErrorKind::Semantic,
        }
    }
}

impl CodecError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Identifier(_) => ErrorKind::IdentifierGeneration,
            CodecError::Encode(_) => ErrorKind::Encode,
            CodecError::BlankResponse => ErrorKind::BlankResponse,
            CodecError::Decode(_) | CodecError::MalformedError(_) => ErrorKind::Decode,
            CodecError::Protocol(_) => ErrorKind::Protocol,
        }
    }
}

/// Flat classification of every adapter failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request id generation failed
    IdentifierGeneration,
    /// Request serialization failed
    Encode,
    /// Writing to the connection failed
    Send,
    /// Reading from the connection failed
    Receive,
    /// Empty response frame
    BlankResponse,
    /// Unparseable response frame
    Decode,
    /// Device-reported error object
    Protocol,
    /// Unexpected or missing response content
    Semantic,
    /// Domain argument rejected before sending
    InvalidInput,
    /// Unknown setting name
    UnrecognizedOperation,
    /// Retry budget spent
    RetriesExhausted,
}

/// Result type using AdapterError
pub type Result<T> = std::result::Result<T, AdapterError>;
