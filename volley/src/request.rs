//! Send requests, flags, and the request builder.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;

use bytes::Bytes;

use crate::descriptor::SendDescriptor;
use crate::stream::StreamHandle;

/// Post-send socket lifecycle flags.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SendFlags(u8);

impl SendFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Disconnect the socket after a successful send.
    pub const DISCONNECT: Self = Self(1);
    /// Leave a disconnected socket ready to connect again.
    ///
    /// Only meaningful together with [`SendFlags::DISCONNECT`].
    pub const REUSE_SOCKET: Self = Self(1 << 1);

    /// Returns `true` if every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if a post-send disconnect was requested.
    pub const fn disconnect(self) -> bool {
        self.contains(Self::DISCONNECT)
    }

    /// Returns `true` if the socket should stay reusable after disconnecting.
    pub const fn reuse(self) -> bool {
        self.contains(Self::DISCONNECT) && self.contains(Self::REUSE_SOCKET)
    }

    /// Returns `true` for `REUSE_SOCKET` without `DISCONNECT`, which has no effect.
    pub const fn is_ambiguous(self) -> bool {
        self.contains(Self::REUSE_SOCKET) && !self.contains(Self::DISCONNECT)
    }
}

impl BitOr for SendFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SendFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for SendFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        if self.contains(Self::DISCONNECT) {
            set.entry(&"DISCONNECT");
        }
        if self.contains(Self::REUSE_SOCKET) {
            set.entry(&"REUSE_SOCKET");
        }
        set.finish()
    }
}

/// One scatter-gather send: an ordered descriptor list plus options.
///
/// `descriptors == None` is the "null list" and is rejected by
/// [`send_packets`](crate::send_packets); `Some(vec![])` is a valid no-op.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct SendRequest {
    /// Packets to send, in wire order.
    pub descriptors: Option<Vec<SendDescriptor>>,
    /// Post-send lifecycle flags.
    pub flags: SendFlags,
    /// Advisory chunk size in bytes; `0` leaves it to the transport.
    pub chunk_size: usize,
}

impl SendRequest {
    /// A request over `descriptors` with default options.
    pub fn new(descriptors: Vec<SendDescriptor>) -> Self {
        Self {
            descriptors: Some(descriptors),
            ..Self::default()
        }
    }

    /// Starts a [`SendRequestBuilder`].
    pub fn builder() -> SendRequestBuilder {
        SendRequestBuilder::default()
    }

    /// Replaces the flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: SendFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Replaces the chunk-size hint.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Fluent builder for [`SendRequest`].
#[derive(Debug, Default)]
pub struct SendRequestBuilder {
    /// Descriptors accumulated so far.
    descriptors: Vec<SendDescriptor>,
    /// Flags to apply.
    flags: SendFlags,
    /// Chunk-size hint.
    chunk_size: usize,
}

impl SendRequestBuilder {
    /// Appends an arbitrary descriptor.
    #[must_use]
    pub fn push(mut self, descriptor: SendDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Appends a whole buffer.
    #[must_use]
    pub fn memory(self, buffer: impl Into<Bytes>) -> Self {
        self.push(SendDescriptor::memory(buffer))
    }

    /// Appends part of a buffer.
    #[must_use]
    pub fn memory_range(self, buffer: impl Into<Bytes>, offset: usize, length: usize) -> Self {
        self.push(SendDescriptor::memory_range(buffer, offset, length))
    }

    /// Appends a whole file.
    #[must_use]
    pub fn file(self, path: impl Into<PathBuf>) -> Self {
        self.push(SendDescriptor::file(path))
    }

    /// Appends part of a file.
    #[must_use]
    pub fn file_range(self, path: impl Into<PathBuf>, offset: u64, length: u64) -> Self {
        self.push(SendDescriptor::file_range(path, offset, length))
    }

    /// Appends the rest of a stream.
    #[must_use]
    pub fn stream(self, stream: StreamHandle) -> Self {
        self.push(SendDescriptor::stream(stream))
    }

    /// Appends part of a stream.
    #[must_use]
    pub fn stream_range(self, stream: StreamHandle, offset: u64, length: u64) -> Self {
        self.push(SendDescriptor::stream_range(stream, offset, length))
    }

    /// Appends a null element.
    #[must_use]
    pub fn empty(self) -> Self {
        self.push(SendDescriptor::Empty)
    }

    /// Adds lifecycle flags.
    #[must_use]
    pub fn flags(mut self, flags: SendFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Sets the chunk-size hint.
    #[must_use]
    pub const fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Finishes the request.
    pub fn build(self) -> SendRequest {
        if self.flags.is_ambiguous() {
            tracing::warn!(
                flags = ?self.flags,
                "REUSE_SOCKET without DISCONNECT has no effect"
            );
        }
        SendRequest {
            descriptors: Some(self.descriptors),
            flags: self.flags,
            chunk_size: self.chunk_size,
        }
    }
}
