use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::net::Shutdown;
use std::net::TcpStream;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::client::BusConnection;
use crate::client::BusConnector;
use crate::client::Message;
use crate::client::TopicId;
use crate::errors::BusError;
use crate::errors::Result;
use crate::frame::FRAME_HEADER_SIZE;
use crate::frame::Frame;

/// Connects framed TCP clients to an external broker at `addr`
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl BusConnector for TcpConnector {
    type Connection = TcpConnection;

    fn connect(&self) -> Result<Self::Connection> {
        let stream =
            TcpStream::connect(&self.addr).map_err(|e| BusError::ConnectFailed { endpoint: self.addr.clone(), source: e })?;

        // Signal frames are tiny; Nagle would batch them
        stream.set_nodelay(true).ok();
        debug!(addr = %self.addr, "tcp bus connection opened");

        Ok(TcpConnection { stream, connected: true, header_buf: [0u8; FRAME_HEADER_SIZE], header_filled: 0 })
    }
}

/// Framed TCP connection to an external broker.
///
/// Subscribe is an in-band control frame; the broker is trusted to route
/// and fan out. A timed receive that expires mid-header leaves the bytes
/// read so far buffered in the connection and resumes on the next call,
/// so repeated short polls never desynchronise the stream. Once a full
/// header has arrived the payload read runs unbounded.
pub struct TcpConnection {
    stream: TcpStream,
    connected: bool,
    // Header bytes consumed before a timed wait expired; the next
    // receive picks up where this one stopped
    header_buf: [u8; FRAME_HEADER_SIZE],
    header_filled: usize,
}

impl TcpConnection {
    fn read_frame(&mut self, timeout: Option<Duration>) -> Result<Option<Frame>> {
        self.stream.set_read_timeout(timeout).map_err(BusError::ReceiveFailed)?;

        while self.header_filled < FRAME_HEADER_SIZE {
            match self.stream.read(&mut self.header_buf[self.header_filled..]) {
                Ok(0) => return Err(BusError::Disconnected),
                Ok(n) => self.header_filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if timeout.is_some() && matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(None);
                }
                Err(e) => return Err(BusError::ReceiveFailed(e)),
            }
        }

        let (topic, dest, len) = Frame::parse_header(&self.header_buf);
        self.header_filled = 0;

        // The header committed us to a payload; finish the read unbounded
        self.stream.set_read_timeout(None).map_err(BusError::ReceiveFailed)?;
        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => BusError::Disconnected,
            _ => BusError::ReceiveFailed(e),
        })?;

        Ok(Some(Frame::new(topic, dest, Bytes::from(payload))))
    }
}

impl BusConnection for TcpConnection {
    fn subscribe(&mut self, topic: TopicId) -> Result<()> {
        if !self.connected {
            return Err(BusError::NotConnected);
        }

        self.stream.write_all(&Frame::subscribe(topic).encode()).map_err(BusError::SendFailed)?;
        Ok(())
    }

    fn publish(&mut self, topic: TopicId, dest: u32, payload: &[u8]) -> Result<usize> {
        if !self.connected {
            return Err(BusError::NotConnected);
        }

        let frame = Frame::new(topic, dest, Bytes::copy_from_slice(payload));
        self.stream.write_all(&frame.encode()).map_err(BusError::SendFailed)?;

        // Fan-out happens broker-side; one frame was handed over
        Ok(1)
    }

    fn receive(&mut self, timeout: Option<Duration>) -> Result<Option<Message>> {
        if !self.connected {
            return Err(BusError::NotConnected);
        }

        match self.read_frame(timeout)? {
            Some(frame) => Ok(Some(Message::new(frame.topic, frame.payload))),
            None => Ok(None),
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.connected {
            self.stream.shutdown(Shutdown::Both).ok();
            self.connected = false;
            debug!("tcp bus connection closed");
        }
        Ok(())
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}
