//! Send plans: JSON documents describing a [`SendRequest`].

use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::{Deserialize, Serialize};

use crate::descriptor::SendDescriptor;
use crate::request::{SendFlags, SendRequest};

/// Serializable description of one scatter-gather send.
///
/// ```json
/// {
///   "packets": [
///     { "text": "HEADER\n" },
///     { "file": "/var/data/blob.bin", "offset": 0, "length": 4096 },
///     { "bytes": [13, 10] }
///   ],
///   "disconnect": true,
///   "chunk_size": 65536
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct SendPlan {
    /// Packets in wire order.
    pub packets: Vec<PlanPacket>,
    /// Disconnect after a successful send.
    #[serde(default)]
    pub disconnect: bool,
    /// Keep the socket reusable after disconnecting.
    #[serde(default)]
    pub reuse: bool,
    /// Advisory chunk size (`0` = transport default).
    #[serde(default)]
    pub chunk_size: usize,
}

/// One packet of a [`SendPlan`].
///
/// A packet object has exactly one of `text`, `bytes` or `file`; `offset`
/// and `length` are only accepted next to `file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, try_from = "RawPacket")]
#[non_exhaustive]
pub enum PlanPacket {
    /// UTF-8 text sent verbatim.
    Text {
        /// The text.
        text: String,
    },
    /// Raw bytes.
    Bytes {
        /// The bytes.
        bytes: Vec<u8>,
    },
    /// A file region; omitted offset and length send the whole file.
    File {
        /// Path of the file.
        file: PathBuf,
        /// First byte to send.
        offset: u64,
        /// Number of bytes.
        length: u64,
    },
}

/// Every key a packet object may carry.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPacket {
    /// Text payload.
    text: Option<String>,
    /// Byte payload.
    bytes: Option<Vec<u8>>,
    /// File payload.
    file: Option<PathBuf>,
    /// File offset.
    offset: Option<u64>,
    /// File length.
    length: Option<u64>,
}

impl TryFrom<RawPacket> for PlanPacket {
    type Error = String;

    fn try_from(raw: RawPacket) -> Result<Self, Self::Error> {
        match raw {
            RawPacket {
                text: Some(text),
                bytes: None,
                file: None,
                offset: None,
                length: None,
            } => Ok(Self::Text { text }),
            RawPacket {
                text: None,
                bytes: Some(bytes),
                file: None,
                offset: None,
                length: None,
            } => Ok(Self::Bytes { bytes }),
            RawPacket {
                text: None,
                bytes: None,
                file: Some(file),
                offset,
                length,
            } => Ok(Self::File {
                file,
                offset: offset.unwrap_or(0),
                length: length.unwrap_or(0),
            }),
            _ => Err("a packet needs exactly one of `text`, `bytes` or `file`, \
                      and `offset`/`length` only go with `file`"
                .to_owned()),
        }
    }
}

impl SendPlan {
    /// Loads a plan from a JSON file.
    pub fn load(path: &Path) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Persists the plan as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self).map_err(io::Error::other)
    }

    /// Lifecycle flags selected by the plan.
    pub fn flags(&self) -> SendFlags {
        let mut flags = SendFlags::NONE;
        if self.disconnect {
            flags |= SendFlags::DISCONNECT;
        }
        if self.reuse {
            flags |= SendFlags::REUSE_SOCKET;
        }
        flags
    }

    /// Converts the plan into a request.
    pub fn into_request(self) -> SendRequest {
        let flags = self.flags();
        let mut builder = SendRequest::builder()
            .flags(flags)
            .chunk_size(self.chunk_size);
        for packet in self.packets {
            builder = builder.push(packet.into());
        }
        builder.build()
    }
}

impl From<PlanPacket> for SendDescriptor {
    fn from(packet: PlanPacket) -> Self {
        match packet {
            PlanPacket::Text { text } => Self::memory(text.into_bytes()),
            PlanPacket::Bytes { bytes } => Self::memory(bytes),
            PlanPacket::File {
                file,
                offset,
                length,
            } => Self::file_range(file, offset, length),
        }
    }
}
