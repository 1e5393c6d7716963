//! The transmit primitive: stages packets, then writes them in order.
//!
//! Staging opens every file and positions every stream before the first
//! byte is written, so a region that lies outside its resource fails the
//! whole send with `InvalidInput` instead of producing a partial write.

use std::fs::File;
use std::io::{self, SeekFrom};

use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::descriptor::{Packet, Region};
use crate::stream::{StreamHandle, stream_len};
use crate::transport::Transport;

/// Chunk size used when the request leaves it at `0`.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A packet whose region has been resolved against its resource.
enum Staged<'a> {
    /// In-memory bytes.
    Memory(&'a [u8]),
    /// An open file and the absolute range to send.
    File {
        /// Open handle, closed when the send finishes.
        file: File,
        /// Absolute start.
        offset: u64,
        /// Byte count.
        length: u64,
    },
    /// A caller-owned stream and the absolute range to send.
    Stream {
        /// Shared handle.
        stream: &'a StreamHandle,
        /// Absolute start.
        offset: u64,
        /// Byte count.
        length: u64,
    },
}

impl Staged<'_> {
    /// Bytes this packet puts on the wire.
    fn len(&self) -> u64 {
        match self {
            Self::Memory(bytes) => bytes.len() as u64,
            Self::File { length, .. } | Self::Stream { length, .. } => *length,
        }
    }
}

/// Sends `packets` over `io` in order and returns the total byte count.
pub(crate) async fn transmit<T: Transport>(
    io: &mut T,
    packets: &[Packet<'_>],
    chunk_size: usize,
) -> io::Result<u64> {
    let chunk = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };

    let mut staged = Vec::with_capacity(packets.len());
    let mut cursors = Vec::new();
    for (index, packet) in packets.iter().enumerate() {
        let s = stage(packet, &mut cursors).await.map_err(|e| {
            tracing::debug!(index, error = %e, "staging failed");
            e
        })?;
        staged.push(s);
    }

    let mut total = 0u64;
    for s in staged {
        let len = s.len();
        match s {
            Staged::Memory(bytes) => {
                for part in bytes.chunks(chunk) {
                    io.write_all(part).await?;
                }
            }
            Staged::File {
                file,
                offset,
                length,
            } => {
                if !io.send_file(&file, offset, length).await? {
                    let mut file = tokio::fs::File::from_std(file);
                    file.seek(SeekFrom::Start(offset)).await?;
                    copy_exact(&mut file, io, length, chunk).await?;
                }
            }
            Staged::Stream {
                stream,
                offset,
                length,
            } => {
                let mut src = stream.lock().await;
                src.seek(SeekFrom::Start(offset)).await?;
                copy_exact(&mut **src, io, length, chunk).await?;
            }
        }
        total += len;
    }
    io.flush().await?;
    Ok(total)
}

/// Where a stream will be positioned once the packets staged so far are sent.
struct StreamCursor<'a> {
    /// The stream.
    stream: &'a StreamHandle,
    /// Position after the last staged region of this stream.
    pos: u64,
    /// Stream length at staging time.
    size: u64,
}

/// Opens or positions the resource behind `packet` and checks its bounds.
///
/// A stream that appears more than once is resolved against its position
/// after the earlier regions, tracked in `cursors`.
async fn stage<'a>(
    packet: &Packet<'a>,
    cursors: &mut Vec<StreamCursor<'a>>,
) -> io::Result<Staged<'a>> {
    match *packet {
        Packet::Memory(bytes) => Ok(Staged::Memory(bytes)),
        Packet::File { path, region } => {
            let file = tokio::fs::File::open(path).await?;
            let size = file.metadata().await?.len();
            let (offset, length) = resolve(region, 0, size)?;
            Ok(Staged::File {
                file: file.into_std().await,
                offset,
                length,
            })
        }
        Packet::Stream { stream, region } => {
            let cursor = match cursors.iter().position(|c| c.stream.same_stream(stream)) {
                Some(i) => &mut cursors[i],
                None => {
                    let mut src = stream.lock().await;
                    let pos = src.stream_position().await?;
                    let size = stream_len(&mut **src).await?;
                    drop(src);
                    cursors.push(StreamCursor { stream, pos, size });
                    let last = cursors.len() - 1;
                    &mut cursors[last]
                }
            };
            let (offset, length) = resolve(region, cursor.pos, cursor.size)?;
            cursor.pos = offset + length;
            Ok(Staged::Stream {
                stream,
                offset,
                length,
            })
        }
    }
}

/// Resolves `region` against a resource of `size` bytes read from `pos`.
fn resolve(region: Region, pos: u64, size: u64) -> io::Result<(u64, u64)> {
    match region {
        Region::ToEnd => Ok((pos, size.saturating_sub(pos))),
        Region::Range { offset, length } => match offset.checked_add(length) {
            Some(end) if end <= size => Ok((offset, length)),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("region {offset}+{length} exceeds resource size {size}"),
            )),
        },
    }
}

/// Copies exactly `len` bytes from `src` to `dst` in `chunk`-sized pieces.
async fn copy_exact<R, W>(src: &mut R, dst: &mut W, len: u64, chunk: usize) -> io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin + ?Sized,
    W: tokio::io::AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; usize::try_from(len).unwrap_or(usize::MAX).min(chunk)];
    let mut remaining = len;
    while remaining > 0 {
        let want = usize::try_from(remaining).unwrap_or(usize::MAX).min(buf.len());
        let n = src.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "source ended before the requested region",
            ));
        }
        dst.write_all(&buf[..n]).await?;
        tracing::trace!(n, remaining, "chunk");
        remaining -= n as u64;
    }
    Ok(())
}
