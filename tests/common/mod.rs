//! Shared fixtures for adapter integration tests

#![allow(dead_code)]

use qrc_bridge::adapter::connection::LineConnection;
use qrc_bridge::adapter::retry::Sleeper;
use qrc_bridge::{Adapter, AdapterConfig};
use serde_json::Value;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Connection that replays canned frames and records every request.
#[derive(Default)]
pub struct ScriptedConnection {
    replies: VecDeque<String>,
    sent: Vec<Value>,
    fail_writes: bool,
}

impl ScriptedConnection {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A connection whose writes always fail.
    pub fn broken() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Queue another reply frame.
    pub fn push_reply(&mut self, frame: impl Into<String>) {
        self.replies.push_back(frame.into());
    }

    /// Requests written so far, decoded
    pub fn sent(&self) -> &[Value] {
        &self.sent
    }

    /// Reply frames not yet consumed
    pub fn pending(&self) -> usize {
        self.replies.len()
    }
}

impl LineConnection for ScriptedConnection {
    fn write_line(&mut self, frame: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection reset"));
        }

        assert_eq!(frame.last(), Some(&0), "request frame must end in NUL");
        let request: Value = serde_json::from_slice(&frame[..frame.len() - 1])
            .expect("request frame must be valid JSON");
        self.sent.push(request);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        match self.replies.pop_front() {
            Some(reply) => {
                let mut frame = reply.into_bytes();
                frame.push(0);
                Ok(frame)
            }
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "script exhausted",
            )),
        }
    }
}

/// Sleeper that only records what it was asked to wait.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// Adapter over a scripted connection with default configuration.
pub fn adapter(connection: ScriptedConnection) -> (Adapter<ScriptedConnection>, RecordingSleeper) {
    let sleeper = RecordingSleeper::default();
    let adapter = Adapter::new("core-test:1710", connection, &AdapterConfig::default())
        .with_sleeper(sleeper.clone());
    (adapter, sleeper)
}

/// A successful `Control.Set`/`Component.Set` reply
pub fn ack() -> String {
    r#"{"jsonrpc":"2.0","result":true}"#.to_string()
}

/// A `Control.Get` reply carrying one control
pub fn control(control: Value) -> String {
    serde_json::json!({"jsonrpc": "2.0", "result": [control]}).to_string()
}

/// An `EngineStatus` heartbeat
pub fn heartbeat() -> String {
    r#"{"jsonrpc":"2.0","method":"EngineStatus","params":{"State":"Active","DesignName":"Room","IsRedundant":false}}"#.to_string()
}
