//! Transport status codes and the per-call send result.

use std::fmt;
use std::io;

/// Outcome reported by the transport for one scatter-gather send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportStatus {
    /// Every effective packet was transmitted (includes the 0-byte no-op).
    Success,
    /// A file or stream region lies outside its resource.
    InvalidArgument,
    /// The socket's send side has been shut down.
    Shutdown,
    /// The socket is not connected.
    NotConnected,
    /// The peer reset the connection.
    ConnectionReset,
    /// The connection was aborted locally.
    ConnectionAborted,
    /// The transport timed out.
    TimedOut,
    /// Any other transport failure, passed through by kind.
    Other(io::ErrorKind),
}

impl TransportStatus {
    /// Returns `true` for [`TransportStatus::Success`].
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<&io::Error> for TransportStatus {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => Self::InvalidArgument,
            io::ErrorKind::BrokenPipe => Self::Shutdown,
            io::ErrorKind::NotConnected => Self::NotConnected,
            io::ErrorKind::ConnectionReset => Self::ConnectionReset,
            io::ErrorKind::ConnectionAborted => Self::ConnectionAborted,
            io::ErrorKind::TimedOut => Self::TimedOut,
            kind => Self::Other(kind),
        }
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::InvalidArgument => f.write_str("invalid argument"),
            Self::Shutdown => f.write_str("socket shut down"),
            Self::NotConnected => f.write_str("not connected"),
            Self::ConnectionReset => f.write_str("connection reset"),
            Self::ConnectionAborted => f.write_str("connection aborted"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Other(kind) => write!(f, "{kind}"),
        }
    }
}

/// Result of a completed [`send_packets`](crate::send_packets) call.
///
/// There is no partial success: a failed send always reports zero bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct SendResult {
    /// Terminal status reported by the transport.
    pub status: TransportStatus,
    /// Total bytes transmitted across all effective packets.
    pub bytes_transferred: u64,
    /// `true` when the result was available without engaging the transport.
    pub completed_synchronously: bool,
}

impl SendResult {
    /// A successful send of `bytes` bytes through the transport.
    pub(crate) const fn transmitted(bytes: u64) -> Self {
        Self {
            status: TransportStatus::Success,
            bytes_transferred: bytes,
            completed_synchronously: false,
        }
    }

    /// The 0-byte no-op: nothing left to send after elision.
    pub(crate) const fn nothing_to_send() -> Self {
        Self {
            status: TransportStatus::Success,
            bytes_transferred: 0,
            completed_synchronously: true,
        }
    }

    /// A transport failure; reports zero bytes.
    pub(crate) fn failed(err: &io::Error) -> Self {
        Self {
            status: TransportStatus::from(err),
            bytes_transferred: 0,
            completed_synchronously: false,
        }
    }

    /// Returns `true` if the send succeeded.
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
