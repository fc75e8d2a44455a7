//! # pb_bus
//!
//! Bus client facade for the pub/sub benchmark harness.
//!
//! The benchmark core only needs a small capability set from the bus:
//! connect, subscribe to a topic id, publish bytes, blocking or timed
//! receive, disconnect. That set is the [`BusConnection`] trait; how the
//! bytes actually move is this crate's problem. Two transports are
//! provided: an in-process broker ([`MemoryBus`]) and a framed TCP client
//! ([`TcpConnector`]) for an external broker.

pub mod client;
pub mod errors;
pub mod frame;
pub mod memory;
pub mod tcp;

pub use client::BusConnection;
pub use client::BusConnector;
pub use client::Message;
pub use client::TopicId;
pub use errors::BusError;
pub use errors::Result;
pub use frame::FRAME_HEADER_SIZE;
pub use memory::MemoryBus;
pub use tcp::TcpConnector;

/// Default broker endpoint (host:port)
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:7111";

/// Endpoint scheme prefixes
pub mod addresses {
    /// TCP endpoint prefix (external broker)
    pub const TCP_PREFIX: &str = "tcp://";

    /// In-process bus prefix (no broker required)
    pub const INPROC_PREFIX: &str = "inproc://";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_constants() {
        assert_eq!(addresses::TCP_PREFIX, "tcp://");
        assert_eq!(addresses::INPROC_PREFIX, "inproc://");
        assert_eq!(DEFAULT_ENDPOINT, "127.0.0.1:7111");
    }
}
