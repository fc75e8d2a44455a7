use std::time::Duration;

use bytes::Bytes;

use crate::errors::Result;

/// Wire-level topic identifier
pub type TopicId = u16;

/// A message as delivered by the bus: topic id plus opaque payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: TopicId,
    pub payload: Bytes,
}

impl Message {
    pub fn new(topic: TopicId, payload: Bytes) -> Self {
        Self { topic, payload }
    }
}

/// The capability set the benchmark requires from a live bus connection.
///
/// Reliability and ordering are whatever the transport gives; the harness
/// assumes nothing beyond "a published message reaches currently
/// subscribed peers, eventually".
pub trait BusConnection {
    /// Registers interest in a topic; only subscribed topics are delivered
    fn subscribe(&mut self, topic: TopicId) -> Result<()>;

    /// Publishes a payload. `dest == 0` broadcasts to every subscribed
    /// peer; a non-zero `dest` addresses a single connection id. Returns
    /// the number of peers the message was handed to.
    fn publish(&mut self, topic: TopicId, dest: u32, payload: &[u8]) -> Result<usize>;

    /// Receives the next message. `None` timeout blocks forever;
    /// `Ok(None)` means the timed wait elapsed without a message.
    fn receive(&mut self, timeout: Option<Duration>) -> Result<Option<Message>>;

    /// Tears the connection down. Idempotent.
    fn disconnect(&mut self) -> Result<()>;
}

/// Factory for bus connections. Each role opens its own connection, so
/// the connector is what gets cloned across threads.
pub trait BusConnector {
    type Connection: BusConnection + Send;

    fn connect(&self) -> Result<Self::Connection>;
}
