//! Send descriptors: one entry in a scatter-gather send list.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::stream::StreamHandle;

/// One element of a scatter-gather send.
///
/// Descriptors are validated when they are sent, not when they are built,
/// so a file region may name a file that does not exist yet.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SendDescriptor {
    /// A slice of an in-memory buffer.
    Memory {
        /// Backing buffer.
        buffer: Bytes,
        /// First byte to send.
        offset: usize,
        /// Number of bytes; `0` elides the descriptor.
        length: usize,
    },
    /// A region of a file, opened for the duration of the send.
    File {
        /// Path of the file.
        path: PathBuf,
        /// First byte to send.
        offset: u64,
        /// Number of bytes; `0` with offset `0` sends the whole file.
        length: u64,
    },
    /// A region of a caller-owned stream.
    Stream {
        /// Shared handle to the stream.
        stream: StreamHandle,
        /// Absolute start position.
        offset: u64,
        /// Number of bytes; `0` with offset `0` sends from the current
        /// position to the end.
        length: u64,
    },
    /// A null element; contributes nothing.
    Empty,
}

impl SendDescriptor {
    /// The whole of `buffer`.
    pub fn memory(buffer: impl Into<Bytes>) -> Self {
        let buffer = buffer.into();
        let length = buffer.len();
        Self::Memory {
            buffer,
            offset: 0,
            length,
        }
    }

    /// `length` bytes of `buffer` starting at `offset`.
    pub fn memory_range(buffer: impl Into<Bytes>, offset: usize, length: usize) -> Self {
        Self::Memory {
            buffer: buffer.into(),
            offset,
            length,
        }
    }

    /// The whole file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::file_range(path, 0, 0)
    }

    /// `length` bytes of the file at `path` starting at `offset`.
    pub fn file_range(path: impl Into<PathBuf>, offset: u64, length: u64) -> Self {
        Self::File {
            path: path.into(),
            offset,
            length,
        }
    }

    /// Everything from the stream's current position to its end.
    pub fn stream(stream: StreamHandle) -> Self {
        Self::stream_range(stream, 0, 0)
    }

    /// `length` bytes of the stream starting at absolute position `offset`.
    pub fn stream_range(stream: StreamHandle, offset: u64, length: u64) -> Self {
        Self::Stream {
            stream,
            offset,
            length,
        }
    }

    /// Returns `true` if this descriptor contributes nothing to a send.
    ///
    /// Zero-length memory regions and zero-length file/stream regions with
    /// a non-zero offset are elided. A zero/zero file or stream region
    /// means "to the end" and is kept.
    pub fn is_elided(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Memory { length, .. } => *length == 0,
            Self::File { offset, length, .. } | Self::Stream { offset, length, .. } => {
                *length == 0 && *offset != 0
            }
        }
    }

    /// Borrows this descriptor as a transport packet, or `None` if elided.
    pub(crate) fn as_packet(&self) -> Option<Packet<'_>> {
        if self.is_elided() {
            return None;
        }
        Some(match self {
            Self::Memory {
                buffer,
                offset,
                length,
            } => Packet::Memory(&buffer[*offset..*offset + *length]),
            Self::File {
                path,
                offset,
                length,
            } => Packet::File {
                path,
                region: Region::new(*offset, *length),
            },
            Self::Stream {
                stream,
                offset,
                length,
            } => Packet::Stream {
                stream,
                region: Region::new(*offset, *length),
            },
            Self::Empty => return None,
        })
    }
}

/// Offset and length of a file or stream region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Region {
    /// From the source's current position (files: the start) to its end.
    ToEnd,
    /// An explicit `[offset, offset + length)` range.
    Range {
        /// Absolute start position.
        offset: u64,
        /// Number of bytes.
        length: u64,
    },
}

impl Region {
    /// Interprets a descriptor's `(offset, length)` pair.
    const fn new(offset: u64, length: u64) -> Self {
        if offset == 0 && length == 0 {
            Self::ToEnd
        } else {
            Self::Range { offset, length }
        }
    }
}

/// A non-elided descriptor as handed to [`PacketSocket::transmit`].
///
/// Memory slices are already bounds-checked. File and stream regions are
/// checked by the transport once the resource is opened.
///
/// [`PacketSocket::transmit`]: crate::PacketSocket::transmit
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum Packet<'a> {
    /// Bytes to copy onto the wire.
    Memory(&'a [u8]),
    /// A file region.
    File {
        /// Path of the file.
        path: &'a Path,
        /// Region to send.
        region: Region,
    },
    /// A stream region.
    Stream {
        /// Shared handle to the stream.
        stream: &'a StreamHandle,
        /// Region to send.
        region: Region,
    },
}
