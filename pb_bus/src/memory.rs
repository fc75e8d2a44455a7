use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::Sender;
use crossbeam_channel::unbounded;
use parking_lot::RwLock;
use tracing::debug;

use crate::client::BusConnection;
use crate::client::BusConnector;
use crate::client::Message;
use crate::client::TopicId;
use crate::errors::BusError;
use crate::errors::Result;

struct Peer {
    tx: Sender<Message>,
    topics: HashSet<TopicId>,
}

struct Inner {
    peers: RwLock<HashMap<u32, Peer>>,
    dropped_topics: RwLock<HashSet<TopicId>>,
    next_id: AtomicU32,
}

/// In-process broker: every connection gets an unbounded inbox, publish
/// fans out to every peer subscribed to the topic. Cloning the bus clones
/// a handle to the same broker.
#[derive(Clone)]
pub struct MemoryBus {
    inner: Arc<Inner>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                peers: RwLock::new(HashMap::new()),
                dropped_topics: RwLock::new(HashSet::new()),
                // Connection ids start at 1; 0 is the broadcast address
                next_id: AtomicU32::new(1),
            }),
        }
    }

    /// Fault injection: silently discard every publish on this topic.
    /// Simulates a stalled or lossy broker for abort-path testing.
    pub fn drop_topic(&self, topic: TopicId) {
        self.inner.dropped_topics.write().insert(topic);
    }

    /// Undoes [`MemoryBus::drop_topic`]
    pub fn restore_topic(&self, topic: TopicId) {
        self.inner.dropped_topics.write().remove(&topic);
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.inner.peers.read().len()
    }

    fn route(&self, from: u32, topic: TopicId, dest: u32, payload: &[u8]) -> usize {
        if self.inner.dropped_topics.read().contains(&topic) {
            return 0;
        }

        let peers = self.inner.peers.read();
        let mut delivered = 0;

        for (id, peer) in peers.iter() {
            if dest != 0 && *id != dest {
                continue;
            }
            if !peer.topics.contains(&topic) {
                continue;
            }
            // A peer that disconnected between the read lock and the send
            // just drops the message
            if peer.tx.send(Message::new(topic, Bytes::copy_from_slice(payload))).is_ok() {
                delivered += 1;
            }
        }

        debug!(from, topic, dest, delivered, "routed message");
        delivered
    }

    fn remove(&self, id: u32) {
        self.inner.peers.write().remove(&id);
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusConnector for MemoryBus {
    type Connection = MemoryConnection;

    fn connect(&self) -> Result<Self::Connection> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded();

        self.inner.peers.write().insert(id, Peer { tx, topics: HashSet::new() });
        debug!(id, "memory bus connection opened");

        Ok(MemoryConnection { id, rx, bus: self.clone(), connected: true })
    }
}

/// One peer's view of the in-process bus
pub struct MemoryConnection {
    id: u32,
    rx: Receiver<Message>,
    bus: MemoryBus,
    connected: bool,
}

impl MemoryConnection {
    /// The connection id other peers can address messages to
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl BusConnection for MemoryConnection {
    fn subscribe(&mut self, topic: TopicId) -> Result<()> {
        if !self.connected {
            return Err(BusError::NotConnected);
        }

        let mut peers = self.bus.inner.peers.write();
        let peer = peers.get_mut(&self.id).ok_or(BusError::NotConnected)?;
        peer.topics.insert(topic);
        Ok(())
    }

    fn publish(&mut self, topic: TopicId, dest: u32, payload: &[u8]) -> Result<usize> {
        if !self.connected {
            return Err(BusError::NotConnected);
        }

        Ok(self.bus.route(self.id, topic, dest, payload))
    }

    fn receive(&mut self, timeout: Option<Duration>) -> Result<Option<Message>> {
        if !self.connected {
            return Err(BusError::NotConnected);
        }

        match timeout {
            None => self.rx.recv().map(Some).map_err(|_| BusError::Disconnected),
            Some(wait) => match self.rx.recv_timeout(wait) {
                Ok(msg) => Ok(Some(msg)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(BusError::Disconnected),
            },
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.connected {
            self.bus.remove(self.id);
            self.connected = false;
            debug!(id = self.id, "memory bus connection closed");
        }
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_assigns_ids() {
        let bus = MemoryBus::new();

        let a = bus.connect().unwrap();
        let b = bus.connect().unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(bus.connection_count(), 2);
    }

    #[test]
    fn test_publish_subscribe_roundtrip() {
        let bus = MemoryBus::new();
        let mut tx = bus.connect().unwrap();
        let mut rx = bus.connect().unwrap();

        rx.subscribe(10).unwrap();

        let delivered = tx.publish(10, 0, b"payload").unwrap();
        assert_eq!(delivered, 1);

        let msg = rx.receive(Some(Duration::from_millis(100))).unwrap().unwrap();
        assert_eq!(msg.topic, 10);
        assert_eq!(msg.payload.as_ref(), b"payload");
    }

    #[test]
    fn test_topic_filtering() {
        let bus = MemoryBus::new();
        let mut tx = bus.connect().unwrap();
        let mut rx = bus.connect().unwrap();

        rx.subscribe(10).unwrap();

        let delivered = tx.publish(11, 0, b"other").unwrap();
        assert_eq!(delivered, 0);

        assert!(rx.receive(Some(Duration::from_millis(20))).unwrap().is_none());
    }

    #[test]
    fn test_broadcast_fan_out() {
        let bus = MemoryBus::new();
        let mut tx = bus.connect().unwrap();
        let mut rx1 = bus.connect().unwrap();
        let mut rx2 = bus.connect().unwrap();
        let mut rx3 = bus.connect().unwrap();

        rx1.subscribe(5).unwrap();
        rx2.subscribe(5).unwrap();
        rx3.subscribe(6).unwrap();

        let delivered = tx.publish(5, 0, b"fan").unwrap();
        assert_eq!(delivered, 2);

        assert!(rx1.receive(Some(Duration::from_millis(100))).unwrap().is_some());
        assert!(rx2.receive(Some(Duration::from_millis(100))).unwrap().is_some());
        assert!(rx3.receive(Some(Duration::from_millis(20))).unwrap().is_none());
    }

    #[test]
    fn test_addressed_publish() {
        let bus = MemoryBus::new();
        let mut tx = bus.connect().unwrap();
        let mut rx1 = bus.connect().unwrap();
        let mut rx2 = bus.connect().unwrap();

        rx1.subscribe(5).unwrap();
        rx2.subscribe(5).unwrap();

        let delivered = tx.publish(5, rx2.id(), b"direct").unwrap();
        assert_eq!(delivered, 1);

        assert!(rx1.receive(Some(Duration::from_millis(20))).unwrap().is_none());
        assert!(rx2.receive(Some(Duration::from_millis(100))).unwrap().is_some());
    }

    #[test]
    fn test_sender_receives_own_broadcast_when_subscribed() {
        let bus = MemoryBus::new();
        let mut conn = bus.connect().unwrap();

        conn.subscribe(9).unwrap();
        let delivered = conn.publish(9, 0, b"self").unwrap();

        assert_eq!(delivered, 1);
        assert!(conn.receive(Some(Duration::from_millis(100))).unwrap().is_some());
    }

    #[test]
    fn test_drop_topic_discards() {
        let bus = MemoryBus::new();
        let mut tx = bus.connect().unwrap();
        let mut rx = bus.connect().unwrap();

        rx.subscribe(10).unwrap();
        bus.drop_topic(10);

        assert_eq!(tx.publish(10, 0, b"lost").unwrap(), 0);
        assert!(rx.receive(Some(Duration::from_millis(20))).unwrap().is_none());

        bus.restore_topic(10);
        assert_eq!(tx.publish(10, 0, b"found").unwrap(), 1);
    }

    #[test]
    fn test_receive_timeout_elapses() {
        let bus = MemoryBus::new();
        let mut conn = bus.connect().unwrap();
        conn.subscribe(1).unwrap();

        let got = conn.receive(Some(Duration::from_millis(30))).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let bus = MemoryBus::new();
        let mut conn = bus.connect().unwrap();

        conn.disconnect().unwrap();
        conn.disconnect().unwrap();

        assert_eq!(bus.connection_count(), 0);
        assert!(matches!(conn.publish(1, 0, b"x"), Err(BusError::NotConnected)));
    }

    #[test]
    fn test_disconnected_peer_not_counted() {
        let bus = MemoryBus::new();
        let mut tx = bus.connect().unwrap();
        let mut rx = bus.connect().unwrap();

        rx.subscribe(3).unwrap();
        rx.disconnect().unwrap();

        assert_eq!(tx.publish(3, 0, b"gone").unwrap(), 0);
    }
}
