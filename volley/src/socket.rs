//! Socket abstraction and the stream-backed [`Socket`] implementation.

use std::future::Future;
use std::io;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::descriptor::Packet;
use crate::transmit;
use crate::transport::Transport;

/// Connection lifecycle of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SocketState {
    /// Not connected; ready for a fresh connect.
    Idle,
    /// Connected and able to send.
    Connected,
    /// Disconnected without reuse; every further send fails.
    ShutDown,
    /// Closed for good.
    Disposed,
}

/// What a scatter-gather send needs from a socket.
pub trait PacketSocket: Send {
    /// Returns the current lifecycle state.
    fn state(&self) -> SocketState;

    /// Transmits `packets` in order as one logical send.
    ///
    /// Returns the total byte count. On error no byte count is reported,
    /// even if some bytes reached the wire. `chunk_size == 0` lets the
    /// socket pick its own chunking.
    fn transmit<'a>(
        &'a mut self,
        packets: &'a [Packet<'a>],
        chunk_size: usize,
    ) -> impl Future<Output = io::Result<u64>> + Send + 'a;

    /// Disconnects after a send. With `reuse` the socket returns to
    /// [`SocketState::Idle`]; otherwise it ends in [`SocketState::ShutDown`].
    fn disconnect(&mut self, reuse: bool) -> impl Future<Output = io::Result<()>> + Send + '_;
}

/// Inner state of a [`Socket`], holding the transport while connected.
#[derive(Debug)]
enum Conn<T> {
    /// No transport attached.
    Idle,
    /// Attached transport.
    Connected(T),
    /// Shut down without reuse.
    ShutDown,
    /// Closed.
    Disposed,
}

/// A socket over any [`Transport`].
#[derive(Debug)]
pub struct Socket<T> {
    /// Current connection.
    conn: Conn<T>,
}

impl<T: Transport> Socket<T> {
    /// An unconnected socket.
    pub const fn new() -> Self {
        Self { conn: Conn::Idle }
    }

    /// A socket already connected over `stream`.
    pub const fn from_stream(stream: T) -> Self {
        Self {
            conn: Conn::Connected(stream),
        }
    }

    /// Attaches a freshly connected `stream` to an idle socket.
    pub fn attach(&mut self, stream: T) -> io::Result<()> {
        self.ensure_idle()?;
        self.conn = Conn::Connected(stream);
        Ok(())
    }

    /// Fails unless the socket can accept a new connection.
    fn ensure_idle(&self) -> io::Result<()> {
        match self.conn {
            Conn::Idle => Ok(()),
            Conn::Connected(_) => Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "socket is already connected",
            )),
            Conn::ShutDown => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "socket was shut down without reuse",
            )),
            Conn::Disposed => Err(disposed()),
        }
    }

    /// Returns `true` while a transport is attached.
    pub const fn is_connected(&self) -> bool {
        matches!(self.conn, Conn::Connected(_))
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub const fn is_disposed(&self) -> bool {
        matches!(self.conn, Conn::Disposed)
    }

    /// Borrows the attached transport.
    pub const fn get_ref(&self) -> Option<&T> {
        match &self.conn {
            Conn::Connected(s) => Some(s),
            _ => None,
        }
    }

    /// Closes the socket, dropping any transport. Idempotent.
    pub fn close(&mut self) {
        if !self.is_disposed() {
            tracing::debug!("socket disposed");
        }
        self.conn = Conn::Disposed;
    }

    /// Shuts down the write side and detaches the transport.
    async fn shut(&mut self, next: Conn<T>) -> io::Result<()> {
        let prev = std::mem::replace(&mut self.conn, next);
        match prev {
            Conn::Connected(mut stream) => stream.shutdown().await,
            Conn::Disposed => {
                self.conn = Conn::Disposed;
                Err(disposed())
            }
            _ => Ok(()),
        }
    }
}

impl<T: Transport> Default for Socket<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Socket<TcpStream> {
    /// Connects a new TCP socket to `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self::from_stream(TcpStream::connect(addr).await?))
    }

    /// Connects an idle (reused) socket to `addr`.
    pub async fn reconnect(&mut self, addr: impl ToSocketAddrs) -> io::Result<()> {
        self.ensure_idle()?;
        let stream = TcpStream::connect(addr).await?;
        self.attach(stream)
    }
}

impl<T: Transport> PacketSocket for Socket<T> {
    fn state(&self) -> SocketState {
        match self.conn {
            Conn::Idle => SocketState::Idle,
            Conn::Connected(_) => SocketState::Connected,
            Conn::ShutDown => SocketState::ShutDown,
            Conn::Disposed => SocketState::Disposed,
        }
    }

    fn transmit<'a>(
        &'a mut self,
        packets: &'a [Packet<'a>],
        chunk_size: usize,
    ) -> impl Future<Output = io::Result<u64>> + Send + 'a {
        async move {
            match &mut self.conn {
                Conn::Connected(stream) => transmit::transmit(stream, packets, chunk_size).await,
                Conn::ShutDown => Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "cannot send after the socket has been shut down",
                )),
                Conn::Idle => Err(io::Error::from(io::ErrorKind::NotConnected)),
                Conn::Disposed => Err(disposed()),
            }
        }
    }

    fn disconnect(&mut self, reuse: bool) -> impl Future<Output = io::Result<()>> + Send + '_ {
        async move {
            let next = if reuse { Conn::Idle } else { Conn::ShutDown };
            self.shut(next).await?;
            tracing::debug!(reuse, "socket disconnected");
            Ok(())
        }
    }
}

/// The error for operations on a closed socket.
fn disposed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket has been disposed")
}
