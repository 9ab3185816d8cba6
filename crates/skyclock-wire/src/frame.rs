//! Message frames exchanged between roles
//!
//! Layout (little-endian):
//! - Bytes 0-3: Magic `SKY1`
//! - Bytes 4-5: Path length
//! - Path bytes (UTF-8)
//! - 4 bytes: Payload length (0 = no payload)
//! - Payload bytes (JSON record)

use skyclock_core::{Record, SkyError, SkyResult};

/// Frame magic
pub const FRAME_MAGIC: [u8; 4] = *b"SKY1";

/// Maximum frame size (fits one UDP datagram)
pub const MAX_FRAME_SIZE: usize = 60_000;

/// Minimum frame size (magic + both length fields)
pub const MIN_FRAME_SIZE: usize = 4 + 2 + 4;

/// A path-addressed message with an optional record payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Logical path, e.g. `/request/fetch`
    pub path: String,
    /// Record payload (absent for bare requests)
    pub payload: Option<Record>,
}

impl Message {
    /// Message without payload
    pub fn empty(path: impl Into<String>) -> Self {
        Message {
            path: path.into(),
            payload: None,
        }
    }

    /// Message carrying a record
    pub fn with_record(path: impl Into<String>, record: Record) -> Self {
        Message {
            path: path.into(),
            payload: Some(record),
        }
    }

    /// Payload record, or an empty record when none was carried
    pub fn record(&self) -> Record {
        self.payload.clone().unwrap_or_default()
    }

    /// Serialize to bytes
    pub fn serialize(&self) -> SkyResult<Vec<u8>> {
        let path = self.path.as_bytes();
        if path.len() > u16::MAX as usize {
            return Err(SkyError::InvalidWireFormat(format!(
                "Path too long: {} bytes",
                path.len()
            )));
        }

        let payload = match &self.payload {
            Some(record) => record.to_bytes()?,
            None => Vec::new(),
        };

        let total_size = MIN_FRAME_SIZE + path.len() + payload.len();
        if total_size > MAX_FRAME_SIZE {
            return Err(SkyError::InvalidWireFormat(format!(
                "Frame too large: {} > {}",
                total_size, MAX_FRAME_SIZE
            )));
        }

        let mut buf = Vec::with_capacity(total_size);
        buf.extend_from_slice(&FRAME_MAGIC);
        buf.extend_from_slice(&(path.len() as u16).to_le_bytes());
        buf.extend_from_slice(path);
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Parse from bytes
    pub fn parse(buf: &[u8]) -> SkyResult<Self> {
        if buf.len() < MIN_FRAME_SIZE {
            return Err(SkyError::BufferTooShort {
                expected: MIN_FRAME_SIZE,
                actual: buf.len(),
            });
        }

        if buf[0..4] != FRAME_MAGIC {
            return Err(SkyError::InvalidWireFormat("Bad frame magic".into()));
        }

        let path_len = u16::from_le_bytes([buf[4], buf[5]]) as usize;
        let path_end = 6 + path_len;
        let len_end = path_end + 4;
        if buf.len() < len_end {
            return Err(SkyError::BufferTooShort {
                expected: len_end,
                actual: buf.len(),
            });
        }

        let path = std::str::from_utf8(&buf[6..path_end])
            .map_err(|_| SkyError::InvalidWireFormat("Path is not UTF-8".into()))?
            .to_string();

        let payload_len = u32::from_le_bytes([
            buf[path_end],
            buf[path_end + 1],
            buf[path_end + 2],
            buf[path_end + 3],
        ]) as usize;

        let payload_end = len_end + payload_len;
        if buf.len() < payload_end {
            return Err(SkyError::BufferTooShort {
                expected: payload_end,
                actual: buf.len(),
            });
        }
        if buf.len() > payload_end {
            return Err(SkyError::InvalidWireFormat("Trailing bytes after payload".into()));
        }

        let payload = if payload_len == 0 {
            None
        } else {
            Some(Record::from_bytes(&buf[len_end..payload_end])?)
        };

        Ok(Message { path, payload })
    }
}
