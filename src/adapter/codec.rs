//! QRC wire codec
//!
//! Requests are JSON-RPC 2.0 objects followed by a single NUL byte. The core
//! answers with one object per frame, and interleaves heartbeat notifications
//! (`EngineStatus` by default) that carry a `method` but no `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::{CodecError, ProtocolError};

/// JSON-RPC protocol version sent with every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Byte terminating every frame in both directions
pub const FRAME_TERMINATOR: u8 = 0;

/// Notification method the core uses for its periodic status frames
pub const DEFAULT_HEARTBEAT_METHOD: &str = "EngineStatus";

/// Outgoing request envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request<'a> {
    /// Always [`JSONRPC_VERSION`]
    pub jsonrpc: &'static str,
    /// Fresh identifier for this request
    pub id: Uuid,
    /// QRC method name, e.g. `Control.Set`
    pub method: &'a str,
    /// Method parameters
    pub params: &'a Value,
}

/// Decoded response frame
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Response {
    /// Identifier echoed by the core
    #[serde(default)]
    pub id: Option<Value>,
    /// Present on notifications only
    #[serde(default)]
    pub method: Option<String>,
    /// Method result
    #[serde(default)]
    pub result: Option<Value>,
    /// Device-reported error object
    #[serde(default)]
    pub error: Option<Value>,
}

impl Response {
    /// Whether the echoed `id` names the given request.
    ///
    /// Responses without an `id` are not considered mismatched.
    pub fn answers(&self, request: Uuid) -> bool {
        match &self.id {
            None | Some(Value::Null) => true,
            Some(Value::String(id)) => Uuid::parse_str(id).is_ok_and(|id| id == request),
            Some(_) => false,
        }
    }
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Heartbeat notification, to be discarded
    Heartbeat,
    /// Anything else
    Reply(Response),
}

/// Source of request identifiers
pub trait IdGenerator: Send {
    /// Produce the id for the next request.
    fn next_id(&mut self) -> Result<Uuid, CodecError>;
}

/// Random (v4) request identifiers
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self) -> Result<Uuid, CodecError> {
        Ok(Uuid::new_v4())
    }
}

/// Frame encoder/decoder
#[derive(Debug, Clone)]
pub struct Codec {
    heartbeat_method: String,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_METHOD)
    }
}

impl Codec {
    /// Create a codec that treats `heartbeat_method` notifications as heartbeats.
    pub fn new(heartbeat_method: impl Into<String>) -> Self {
        Self {
            heartbeat_method: heartbeat_method.into(),
        }
    }

    /// The notification method treated as a heartbeat
    pub fn heartbeat_method(&self) -> &str {
        &self.heartbeat_method
    }

    /// Serialize a request and append the frame terminator.
    pub fn encode(&self, id: Uuid, method: &str, params: &Value) -> Result<Vec<u8>, CodecError> {
        let request = Request {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        };

        let mut frame = serde_json::to_vec(&request).map_err(CodecError::Encode)?;
        frame.push(FRAME_TERMINATOR);
        Ok(frame)
    }

    /// Decode one raw frame as read from the connection.
    pub fn decode(&self, raw: &[u8]) -> Result<Frame, CodecError> {
        let payload = trim_frame(raw);
        if payload.is_empty() {
            return Err(CodecError::BlankResponse);
        }

        let response: Response = serde_json::from_slice(payload).map_err(CodecError::Decode)?;

        if response.method.as_deref() == Some(self.heartbeat_method.as_str()) {
            return Ok(Frame::Heartbeat);
        }

        if let Some(error) = &response.error {
            return Err(CodecError::Protocol(ProtocolError::from_value(error)?));
        }

        Ok(Frame::Reply(response))
    }
}

/// Strip NUL padding and surrounding whitespace.
fn trim_frame(raw: &[u8]) -> &[u8] {
    let is_padding = |byte: &u8| *byte == FRAME_TERMINATOR || byte.is_ascii_whitespace();
    let start = raw.iter().position(|b| !is_padding(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !is_padding(b)).map_or(start, |i| i + 1);
    &raw[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_encode_appends_terminator() {
        let codec = Codec::default();
        let id = Uuid::new_v4();
        let params = json!({"Name": "gain", "Position": 0.5});

        let frame = codec.encode(id, "Control.Set", &params).unwrap();

        assert_eq!(frame.last(), Some(&FRAME_TERMINATOR));
        assert_eq!(frame.iter().filter(|b| **b == FRAME_TERMINATOR).count(), 1);

        let body: Value = serde_json::from_slice(&frame[..frame.len() - 1]).unwrap();
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["id"], id.to_string());
        assert_eq!(body["method"], "Control.Set");
        assert_eq!(body["params"], params);
    }

    #[test]
    fn test_decode_strips_padding() {
        let codec = Codec::default();
        let frame = codec
            .decode(b"\0\0{\"jsonrpc\":\"2.0\",\"id\":\"x\",\"result\":true}\0")
            .unwrap();

        match frame {
            Frame::Reply(response) => assert_eq!(response.result, Some(Value::Bool(true))),
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_blank() {
        let codec = Codec::default();
        assert!(matches!(codec.decode(b"\0\0"), Err(CodecError::BlankResponse)));
        assert!(matches!(codec.decode(b""), Err(CodecError::BlankResponse)));
    }

    #[test]
    fn test_decode_malformed() {
        let codec = Codec::default();
        let err = codec.decode(b"{\"result\":").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err = codec.decode(b"[1, 2, 3]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_decode_heartbeat() {
        let codec = Codec::default();
        let frame = codec
            .decode(br#"{"jsonrpc":"2.0","method":"EngineStatus","params":{"State":"Active"}}"#)
            .unwrap();
        assert_eq!(frame, Frame::Heartbeat);

        // Other notifications are not heartbeats.
        let frame = codec
            .decode(br#"{"jsonrpc":"2.0","method":"ChangeGroup.Poll","params":{}}"#)
            .unwrap();
        assert!(matches!(frame, Frame::Reply(_)));
    }

    #[test]
    fn test_decode_custom_heartbeat() {
        let codec = Codec::new("Status.Tick");
        let frame = codec.decode(br#"{"method":"Status.Tick"}"#).unwrap();
        assert_eq!(frame, Frame::Heartbeat);
    }

    #[test]
    fn test_decode_protocol_error() {
        let codec = Codec::default();
        let err = codec
            .decode(br#"{"jsonrpc":"2.0","id":"1","error":{"code":8,"message":"Invalid Page Request ID"}}"#)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(
            err.to_string(),
            "Error Code: 8, Error Message: Invalid Page Request ID"
        );
    }

    #[test]
    fn test_decode_protocol_error_float_code() {
        let err = Codec::default()
            .decode(br#"{"error":{"code":2.0,"message":"x"}}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Error Code: 2, Error Message: x");
    }

    #[test]
    fn test_response_answers() {
        let id = Uuid::new_v4();
        let matching = Response {
            id: Some(Value::String(id.to_string())),
            ..Default::default()
        };
        let other = Response {
            id: Some(Value::String(Uuid::new_v4().to_string())),
            ..Default::default()
        };
        let numeric = Response {
            id: Some(json!(7)),
            ..Default::default()
        };

        assert!(matching.answers(id));
        assert!(Response::default().answers(id));
        assert!(!other.answers(id));
        assert!(!numeric.answers(id));
    }
}
