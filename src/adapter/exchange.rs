//! Request/response round trips
//!
//! One request is outstanding at a time: [`Exchanger::exchange`] takes
//! `&mut self`, and the id of the request in flight is held in a single
//! `awaiting` slot until its response has been consumed. Responses are taken
//! in arrival order; a reply whose `id` names some other request is accepted
//! but recorded.

use serde_json::Value;
use uuid::Uuid;

use super::codec::{Codec, Frame, IdGenerator, RandomIds, Response};
use super::connection::LineConnection;
use super::diagnostics::Diagnostics;
use super::error::ExchangeError;

/// Performs single request/response round trips over a connection.
pub struct Exchanger<C> {
    connection: C,
    codec: Codec,
    ids: Box<dyn IdGenerator>,
    awaiting: Option<Uuid>,
}

impl<C: LineConnection> Exchanger<C> {
    /// Create an exchanger with random request ids.
    pub fn new(connection: C, codec: Codec) -> Self {
        Self {
            connection,
            codec,
            ids: Box::new(RandomIds),
            awaiting: None,
        }
    }

    /// Replace the request id source.
    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// The request currently waiting for its response, if any
    pub fn awaiting(&self) -> Option<Uuid> {
        self.awaiting
    }

    /// The underlying connection
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// The underlying connection, mutably
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Give the connection back.
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Send one request and block until its response has been read.
    pub fn exchange(
        &mut self,
        method: &str,
        params: &Value,
        diagnostics: &mut Diagnostics,
    ) -> Result<Response, ExchangeError> {
        let id = self.ids.next_id()?;
        let frame = self.codec.encode(id, method, params)?;

        tracing::debug!(%id, method, %params, "sending QRC request");
        if let Err(source) = self.connection.write_line(&frame) {
            return Err(ExchangeError::Send {
                method: method.to_owned(),
                source,
            });
        }

        self.awaiting = Some(id);
        let reply = self.await_reply(id, diagnostics);
        self.awaiting = None;
        reply
    }

    fn await_reply(
        &mut self,
        id: Uuid,
        diagnostics: &mut Diagnostics,
    ) -> Result<Response, ExchangeError> {
        let response = match self.read_frame()? {
            Frame::Reply(response) => response,
            Frame::Heartbeat => {
                tracing::trace!(%id, "skipping heartbeat notification");
                match self.read_frame()? {
                    Frame::Reply(response) => response,
                    Frame::Heartbeat => {
                        return Err(ExchangeError::RepeatedHeartbeat(
                            self.codec.heartbeat_method().to_owned(),
                        ));
                    }
                }
            }
        };

        if !response.answers(id) {
            let echoed = response.id.as_ref().map(Value::to_string).unwrap_or_default();
            diagnostics.record(format!(
                "response id {echoed} does not match request id {id}"
            ));
        }

        tracing::debug!(%id, result = ?response.result, "received QRC response");
        Ok(response)
    }

    fn read_frame(&mut self) -> Result<Frame, ExchangeError> {
        let line = self.connection.read_line().map_err(ExchangeError::Read)?;
        Ok(self.codec.decode(&line)?)
    }
}
