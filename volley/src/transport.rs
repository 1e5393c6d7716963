//! Byte transports that can carry a scatter-gather send.
//!
//! Any `AsyncWrite` stream works; transports backed by a kernel socket can
//! additionally hand file regions to `sendfile(2)` so the bytes never pass
//! through user space.

use std::fs::File;
use std::future::Future;
use std::io;

use tokio::io::AsyncWrite;

/// A connected byte stream usable as the wire side of a [`Socket`](crate::Socket).
pub trait Transport: AsyncWrite + Unpin + Send {
    /// Sends `len` bytes of `file` starting at `offset` without copying
    /// through user space.
    ///
    /// Returns `Ok(false)` if the transport has no zero-copy path; the
    /// caller then falls back to a buffered copy. Returning `Ok(true)`
    /// means exactly `len` bytes were written.
    fn send_file<'a>(
        &'a mut self,
        file: &'a File,
        offset: u64,
        len: u64,
    ) -> impl Future<Output = io::Result<bool>> + Send + 'a {
        let _ = (file, offset, len);
        async { Ok(false) }
    }
}

impl Transport for tokio::io::DuplexStream {}

impl Transport for tokio::net::TcpStream {
    #[cfg(target_os = "linux")]
    fn send_file<'a>(
        &'a mut self,
        file: &'a File,
        offset: u64,
        len: u64,
    ) -> impl Future<Output = io::Result<bool>> + Send + 'a {
        async move {
            linux::sendfile_all(self, file, offset, len).await?;
            Ok(true)
        }
    }
}

#[cfg(unix)]
impl Transport for tokio::net::UnixStream {
    #[cfg(target_os = "linux")]
    fn send_file<'a>(
        &'a mut self,
        file: &'a File,
        offset: u64,
        len: u64,
    ) -> impl Future<Output = io::Result<bool>> + Send + 'a {
        async move {
            linux::sendfile_all(self, file, offset, len).await?;
            Ok(true)
        }
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::fs::File;
    use std::future::Future;
    use std::io;
    use std::os::fd::AsFd;

    use tokio::io::Interest;

    /// Largest count passed to a single `sendfile(2)` call.
    const MAX_SENDFILE: usize = 0x7fff_f000;

    /// Readiness-driven socket that `sendfile(2)` can write to.
    pub(super) trait ReadySocket: AsFd + Sync {
        /// Waits until the socket is writable.
        fn writable(&self) -> impl Future<Output = io::Result<()>> + Send;

        /// Runs `f` if the socket is ready for `interest`, clearing
        /// readiness on `WouldBlock`.
        fn try_io<R>(&self, interest: Interest, f: impl FnOnce() -> io::Result<R>)
        -> io::Result<R>;
    }

    impl ReadySocket for tokio::net::TcpStream {
        fn writable(&self) -> impl Future<Output = io::Result<()>> + Send {
            Self::writable(self)
        }

        fn try_io<R>(
            &self,
            interest: Interest,
            f: impl FnOnce() -> io::Result<R>,
        ) -> io::Result<R> {
            Self::try_io(self, interest, f)
        }
    }

    impl ReadySocket for tokio::net::UnixStream {
        fn writable(&self) -> impl Future<Output = io::Result<()>> + Send {
            Self::writable(self)
        }

        fn try_io<R>(
            &self,
            interest: Interest,
            f: impl FnOnce() -> io::Result<R>,
        ) -> io::Result<R> {
            Self::try_io(self, interest, f)
        }
    }

    /// Writes `len` bytes of `file` from `offset` with `sendfile(2)`.
    pub(super) async fn sendfile_all<S: ReadySocket>(
        sock: &S,
        file: &File,
        offset: u64,
        len: u64,
    ) -> io::Result<()> {
        let mut off = libc::off_t::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds off_t"))?;
        let mut remaining = len;
        while remaining > 0 {
            sock.writable().await?;
            let count = usize::try_from(remaining).unwrap_or(usize::MAX).min(MAX_SENDFILE);
            let sent = match sock.try_io(Interest::WRITABLE, || {
                nix::sys::sendfile::sendfile(sock.as_fd(), file.as_fd(), Some(&mut off), count)
                    .map_err(io::Error::from)
            }) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            };
            if sent == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "file ended before the requested region",
                ));
            }
            tracing::trace!(sent, remaining, "sendfile");
            remaining -= sent as u64;
        }
        Ok(())
    }
}
