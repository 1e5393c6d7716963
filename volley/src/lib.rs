//! Scatter-gather packet sends over a connected socket.
//!
//! A [`SendRequest`] holds an ordered list of [`SendDescriptor`]s: memory
//! slices, file regions, regions of caller-owned streams, or null entries.
//! [`send_packets`] drops the entries that contribute nothing, transmits
//! the rest as one logical write, and reports a single [`SendResult`].
//! It can then disconnect the socket, optionally keeping it reusable.
//!
//! # Quick start
//!
//! ```no_run
//! use volley::{SendFlags, SendPacketsExt, SendRequest, Socket};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut socket = Socket::connect("127.0.0.1:9000").await?;
//! let request = SendRequest::builder()
//!     .memory(b"HEADER\r\n".to_vec())
//!     .file("/var/data/payload.bin")
//!     .flags(SendFlags::DISCONNECT)
//!     .build();
//!
//! let result = socket.send_packets(&request).await?;
//! println!("{}: {} bytes", result.status, result.bytes_transferred);
//! # Ok(())
//! # }
//! ```

mod descriptor;
mod error;
mod operation;
mod plan;
mod request;
mod socket;
mod status;
mod stream;
mod transmit;
mod transport;

pub use descriptor::{Packet, Region, SendDescriptor};
pub use error::{Error, Result};
pub use operation::{SendPacketsExt, send_packets};
pub use plan::{PlanPacket, SendPlan};
pub use request::{SendFlags, SendRequest, SendRequestBuilder};
pub use socket::{PacketSocket, Socket, SocketState};
pub use status::{SendResult, TransportStatus};
pub use stream::{SourceStream, StreamHandle};
pub use transmit::DEFAULT_CHUNK_SIZE;
pub use transport::Transport;
