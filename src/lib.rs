//! QRC Bridge – get/set control parameters on a Q-SYS core over QRC
//!
//! This crate implements a small adapter that speaks the QRC JSON-RPC
//! protocol:
//! - NUL-terminated JSON-RPC 2.0 frames with heartbeat filtering
//! - One request in flight per connection, with reply id checking
//! - Volume, toggle and video-route mappers between router values and QRC controls
//! - Bounded retry with a fixed backoff
//! - Structured diagnostics per operation, plus a shared per-connection error log

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Adapter, wire codec and supporting modules
pub mod adapter;

// Re-export key types for convenience
pub use adapter::diagnostics::{Diagnostic, ErrorLog, ErrorRecorder, Outcome};
pub use adapter::{Adapter, AdapterConfig, AdapterError, ErrorKind};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default QRC port on a core
pub const DEFAULT_PORT: u16 = 1710;
