//! Caller-owned seekable streams used as packet sources.

use std::fmt;
use std::io::{self, SeekFrom};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt};
use tokio::sync::{Mutex, MutexGuard};

/// A readable, seekable byte source that can back a stream region.
///
/// Implemented for every `AsyncRead + AsyncSeek` type that can move across
/// tasks, e.g. [`tokio::fs::File`] or `std::io::Cursor<Vec<u8>>`.
pub trait SourceStream: AsyncRead + AsyncSeek + Send + Sync + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Sync + Unpin> SourceStream for T {}

/// Shared handle to a caller-owned stream.
///
/// Cloning the handle does not clone the stream. Sends never close the
/// stream, but they do move its position: after a stream region is sent
/// the position rests at the end of the sent region.
#[derive(Clone)]
pub struct StreamHandle {
    /// The shared stream.
    inner: Arc<Mutex<Box<dyn SourceStream>>>,
}

impl StreamHandle {
    /// Wraps `stream` in a shareable handle.
    pub fn new(stream: impl SourceStream + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(stream))),
        }
    }

    /// Returns the current read position.
    pub async fn position(&self) -> io::Result<u64> {
        self.inner.lock().await.stream_position().await
    }

    /// Moves the read position to `pos` bytes from the start.
    pub async fn set_position(&self, pos: u64) -> io::Result<()> {
        self.inner.lock().await.seek(SeekFrom::Start(pos)).await?;
        Ok(())
    }

    /// Returns the total addressable length; the position is left unchanged.
    pub async fn len(&self) -> io::Result<u64> {
        let mut stream = self.inner.lock().await;
        stream_len(&mut **stream).await
    }

    /// Locks the stream for exclusive use by one send.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Box<dyn SourceStream>> {
        self.inner.lock().await
    }

    /// Returns `true` if both handles refer to the same stream.
    pub fn same_stream(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish_non_exhaustive()
    }
}

/// Measures a stream by seeking to its end and back.
pub(crate) async fn stream_len(stream: &mut (dyn SourceStream + '_)) -> io::Result<u64> {
    let pos = stream.stream_position().await?;
    let len = stream.seek(SeekFrom::End(0)).await?;
    if len != pos {
        stream.seek(SeekFrom::Start(pos)).await?;
    }
    Ok(len)
}
