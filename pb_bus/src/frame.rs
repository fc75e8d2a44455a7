use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::client::TopicId;
use crate::errors::BusError;
use crate::errors::Result;

/// Wire header size: topic (u16) + dest (u32) + payload length (u32).
/// Byte-rate reporting counts this as the per-message transfer overhead.
pub const FRAME_HEADER_SIZE: usize = 10;

/// Reserved topic id carrying an in-band subscribe command to the broker
pub const CTRL_SUBSCRIBE: TopicId = 0xFFFF;

/// One framed bus message: fixed little-endian header, then the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub topic: TopicId,
    pub dest: u32,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(topic: TopicId, dest: u32, payload: Bytes) -> Self {
        Self { topic, dest, payload }
    }

    /// Builds the subscribe control frame for a topic
    pub fn subscribe(topic: TopicId) -> Self {
        Self { topic: CTRL_SUBSCRIBE, dest: 0, payload: Bytes::copy_from_slice(&topic.to_le_bytes()) }
    }

    /// Encodes header + payload into a single buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.payload.len());
        buf.put_u16_le(self.topic);
        buf.put_u32_le(self.dest);
        buf.put_u32_le(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Parses a header, returning (topic, dest, payload_len)
    pub fn parse_header(header: &[u8; FRAME_HEADER_SIZE]) -> (TopicId, u32, usize) {
        let topic = u16::from_le_bytes([header[0], header[1]]);
        let dest = u32::from_le_bytes([header[2], header[3], header[4], header[5]]);
        let len = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;
        (topic, dest, len)
    }

    /// Decodes a complete frame from a contiguous buffer
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(BusError::TruncatedFrame { needed: FRAME_HEADER_SIZE, got: data.len() });
        }

        let mut header = [0u8; FRAME_HEADER_SIZE];
        header.copy_from_slice(&data[..FRAME_HEADER_SIZE]);
        let (topic, dest, len) = Self::parse_header(&header);

        if data.len() < FRAME_HEADER_SIZE + len {
            return Err(BusError::TruncatedFrame { needed: FRAME_HEADER_SIZE + len, got: data.len() });
        }

        Ok(Self { topic, dest, payload: Bytes::copy_from_slice(&data[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + len]) })
    }
}
