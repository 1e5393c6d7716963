//! The scatter-gather send operation.
//!
//! Validation is split in two. Caller mistakes (missing arguments, a
//! disposed or unconnected socket, malformed memory ranges, missing files)
//! are returned as [`Error`] before any I/O. Everything the transport
//! discovers while sending, including file and stream regions that run
//! past the end of their resource, comes back as a [`TransportStatus`] in
//! the [`SendResult`].
//!
//! [`TransportStatus`]: crate::TransportStatus

use std::future::Future;
use std::io;
use std::path::Path;

use crate::descriptor::SendDescriptor;
use crate::request::SendRequest;
use crate::socket::{PacketSocket, SocketState};
use crate::status::SendResult;
use crate::{Error, Result};

/// Sends every descriptor of `request` over `socket` as one logical write.
///
/// Elided descriptors (null entries and zero-length regions, see
/// [`SendDescriptor::is_elided`]) are skipped; the rest are transmitted in
/// list order. If nothing is left, the call succeeds with 0 bytes without
/// touching the transport.
///
/// On success with [`SendFlags::DISCONNECT`](crate::SendFlags::DISCONNECT)
/// the socket is disconnected afterwards, and left reusable if
/// [`SendFlags::REUSE_SOCKET`](crate::SendFlags::REUSE_SOCKET) is also set.
///
/// # Errors
///
/// - [`Error::ObjectDisposed`] if the socket is closed, checked first.
/// - [`Error::InvalidArgument`] for a `None` request, a `None` descriptor
///   list, a memory range outside its buffer, or an unusable file path.
/// - [`Error::InvalidOperation`] if the socket was never connected.
/// - [`Error::DirectoryNotFound`] / [`Error::FileNotFound`] for file
///   regions whose directory or file is missing.
/// - [`Error::Io`] if a file region's path cannot be looked up for any
///   other reason, such as a name longer than the filesystem allows.
pub async fn send_packets<S: PacketSocket>(
    socket: &mut S,
    request: Option<&SendRequest>,
) -> Result<SendResult> {
    if socket.state() == SocketState::Disposed {
        return Err(Error::ObjectDisposed);
    }
    let request = request.ok_or_else(|| Error::invalid_argument("request", "must not be null"))?;
    let descriptors = request
        .descriptors
        .as_deref()
        .ok_or_else(|| Error::invalid_argument("descriptors", "must not be null"))?;
    if socket.state() == SocketState::Idle {
        return Err(Error::InvalidOperation(
            "operation requires a connected socket",
        ));
    }
    if request.flags.is_ambiguous() {
        tracing::warn!(flags = ?request.flags, "REUSE_SOCKET without DISCONNECT is ignored");
    }

    let mut packets = Vec::with_capacity(descriptors.len());
    for (index, descriptor) in descriptors.iter().enumerate() {
        if descriptor.is_elided() {
            continue;
        }
        check_local(index, descriptor).await?;
        if let Some(packet) = descriptor.as_packet() {
            packets.push(packet);
        }
    }
    tracing::debug!(
        descriptors = descriptors.len(),
        effective = packets.len(),
        chunk_size = request.chunk_size,
        "sending packets"
    );

    if packets.is_empty() {
        return Ok(SendResult::nothing_to_send());
    }

    let bytes = match socket.transmit(&packets, request.chunk_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "transmit failed");
            return Ok(SendResult::failed(&e));
        }
    };

    if request.flags.disconnect()
        && let Err(e) = socket.disconnect(request.flags.reuse()).await
    {
        tracing::debug!(error = %e, "disconnect after send failed");
        return Ok(SendResult::failed(&e));
    }

    tracing::debug!(bytes, "send complete");
    Ok(SendResult::transmitted(bytes))
}

/// Checks what can be decided without the transport.
async fn check_local(index: usize, descriptor: &SendDescriptor) -> Result<()> {
    match descriptor {
        SendDescriptor::Memory {
            buffer,
            offset,
            length,
        } => match offset.checked_add(*length) {
            Some(end) if end <= buffer.len() => Ok(()),
            _ => Err(Error::invalid_argument(
                format!("descriptors[{index}]"),
                format!(
                    "range {offset}+{length} exceeds buffer of {} bytes",
                    buffer.len()
                ),
            )),
        },
        SendDescriptor::File { path, .. } => check_path(index, path).await,
        SendDescriptor::Stream { .. } | SendDescriptor::Empty => Ok(()),
    }
}

/// Validates a file region's path syntax and existence.
///
/// Only a missing entry maps to the not-found errors; any other lookup
/// failure is returned as [`Error::Io`].
async fn check_path(index: usize, path: &Path) -> Result<()> {
    let param = || format!("descriptors[{index}]");
    let raw = path.as_os_str();
    if raw.is_empty() {
        return Err(Error::invalid_argument(param(), "file path is empty"));
    }
    if raw.as_encoded_bytes().contains(&0) {
        return Err(Error::invalid_argument(param(), "file path contains NUL"));
    }
    // Whitespace-only names are legal file names on Unix.
    if cfg!(windows) && raw.to_string_lossy().trim().is_empty() {
        return Err(Error::invalid_argument(
            param(),
            "file path is whitespace only",
        ));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        match tokio::fs::metadata(parent).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(Error::DirectoryNotFound(parent.to_path_buf())),
            Err(e) if is_missing(&e) => {
                return Err(Error::DirectoryNotFound(parent.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }
    }
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(Error::FileNotFound(path.to_path_buf())),
        Err(e) if is_missing(&e) => Err(Error::FileNotFound(path.to_path_buf())),
        Err(e) => Err(e.into()),
    }
}

/// Returns `true` if `e` means a path component does not exist.
fn is_missing(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Convenience methods for sending on any [`PacketSocket`].
pub trait SendPacketsExt: PacketSocket {
    /// Shorthand for [`send_packets`] with a present request.
    fn send_packets<'a>(
        &'a mut self,
        request: &'a SendRequest,
    ) -> impl Future<Output = Result<SendResult>> + Send + 'a
    where
        Self: Sized,
    {
        send_packets(self, Some(request))
    }
}

impl<S: PacketSocket> SendPacketsExt for S {}
