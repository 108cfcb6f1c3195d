//! Line-framed connections to a core
//!
//! The adapter only needs two primitives from its host: write one frame and
//! block until one frame has been read. Connecting, reconnecting and keep-alive
//! belong to whoever constructs the connection.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::codec::FRAME_TERMINATOR;

/// A connection that exchanges whole frames.
pub trait LineConnection {
    /// Write one complete frame, terminator included.
    fn write_line(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Block until one frame has been read. The terminator may be included.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;
}

impl<T: LineConnection + ?Sized> LineConnection for &mut T {
    fn write_line(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).write_line(frame)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_line()
    }
}

impl<T: LineConnection + ?Sized> LineConnection for Box<T> {
    fn write_line(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).write_line(frame)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_line()
    }
}

/// Connection over any buffered reader/writer pair, split on NUL bytes.
///
/// Bytes of a frame read before a failed read (a timeout, say) are kept and
/// the next [`LineConnection::read_line`] continues that frame.
#[derive(Debug)]
pub struct StreamConnection<R, W> {
    reader: R,
    writer: W,
    partial: Vec<u8>,
}

/// TCP connection to a core's QRC port
pub type TcpConnection = StreamConnection<BufReader<TcpStream>, BufWriter<TcpStream>>;

impl<R: BufRead, W: Write> StreamConnection<R, W> {
    /// Wrap a reader/writer pair.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            partial: Vec::new(),
        }
    }

    /// Take the reader/writer pair back.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> LineConnection for StreamConnection<R, W> {
    fn write_line(&mut self, frame: &[u8]) -> io::Result<()> {
        self.writer.write_all(frame)?;
        self.writer.flush()
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        // On error, read_until leaves whatever it consumed in `partial`.
        self.reader.read_until(FRAME_TERMINATOR, &mut self.partial)?;

        if self.partial.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by core",
            ));
        }
        Ok(std::mem::take(&mut self.partial))
    }
}

/// Socket options applied by [`TcpConnection::connect`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketTimeouts {
    /// Bound on establishing the connection
    pub connect: Option<Duration>,
    /// Bound on a single blocking read
    pub read: Option<Duration>,
    /// Bound on a single write
    pub write: Option<Duration>,
}

impl TcpConnection {
    /// Connect to the first reachable address.
    pub fn connect<A>(addr: A, timeouts: SocketTimeouts) -> io::Result<Self>
    where
        A: ToSocketAddrs,
    {
        let mut last_err = None;
        for candidate in addr.to_socket_addrs()? {
            let attempt = match timeouts.connect {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };

            match attempt {
                Ok(stream) => {
                    stream.set_nodelay(true).ok();
                    stream.set_read_timeout(timeouts.read)?;
                    stream.set_write_timeout(timeouts.write)?;
                    tracing::debug!(peer = %candidate, "connected to core");
                    let reader = BufReader::new(stream.try_clone()?);
                    let writer = BufWriter::new(stream);
                    return Ok(Self::new(reader, writer));
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address resolved")))
    }
}
