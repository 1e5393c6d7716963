//! End-to-end scatter-gather sends over loopback TCP and in-memory pipes.

#![allow(clippy::unwrap_used, clippy::missing_docs_in_private_items)]

use std::io::{Cursor, Write};
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, DuplexStream, duplex};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use volley::{
    Error, PacketSocket, SendDescriptor, SendFlags, SendPacketsExt, SendRequest, Socket,
    SocketState, StreamHandle, TransportStatus, send_packets,
};

/// Accepts `conns` connections in turn and returns what each one received.
async fn sink(conns: usize) -> (SocketAddr, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let mut received = Vec::new();
        for _ in 0..conns {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).await.unwrap();
            received.push(buf);
        }
        received
    });
    (addr, task)
}

fn pipe() -> (Socket<DuplexStream>, DuplexStream) {
    let (a, b) = duplex(1 << 20);
    (Socket::from_stream(a), b)
}

async fn drain(mut sock: Socket<DuplexStream>, mut peer: DuplexStream) -> Vec<u8> {
    sock.close();
    let mut out = Vec::new();
    peer.read_to_end(&mut out).await.unwrap();
    out
}

fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(contents).unwrap();
    f.flush().unwrap();
    f
}

#[tokio::test]
async fn zero_length_buffers_send_nothing() {
    let (mut sock, peer) = pipe();
    let req = SendRequest::new(vec![
        SendDescriptor::memory_range(vec![1u8; 10], 0, 0),
        SendDescriptor::memory_range(vec![1u8; 10], 4, 0),
    ]);
    let r = sock.send_packets(&req).await.unwrap();
    assert_eq!(r.status, TransportStatus::Success);
    assert_eq!(r.bytes_transferred, 0);
    assert!(r.completed_synchronously);
    assert!(drain(sock, peer).await.is_empty());
}

#[tokio::test]
async fn empty_list_is_a_noop() {
    let (mut sock, _peer) = pipe();
    let r = sock.send_packets(&SendRequest::new(Vec::new())).await.unwrap();
    assert!(r.is_success());
    assert_eq!(r.bytes_transferred, 0);
}

#[tokio::test]
async fn buffer_slice() {
    let (mut sock, peer) = pipe();
    let req = SendRequest::new(vec![SendDescriptor::memory_range(
        b"0123456789".to_vec(),
        5,
        5,
    )]);
    let r = sock.send_packets(&req).await.unwrap();
    assert!(r.is_success());
    assert_eq!(r.bytes_transferred, 5);
    assert!(!r.completed_synchronously);
    assert_eq!(drain(sock, peer).await, b"56789");
}

#[tokio::test]
async fn zero_length_entry_is_skipped_in_order() {
    let (mut sock, peer) = pipe();
    let req = SendRequest::builder()
        .memory(b"AAAA".to_vec())
        .memory_range(b"ZZZZ".to_vec(), 0, 0)
        .empty()
        .memory(b"BBBB".to_vec())
        .build();
    let r = sock.send_packets(&req).await.unwrap();
    assert_eq!(r.bytes_transferred, 8);
    assert_eq!(drain(sock, peer).await, b"AAAABBBB");
}

#[tokio::test]
async fn mixed_packets_over_tcp() {
    let file = temp_file(b"--file-contents--");
    let stream = StreamHandle::new(Cursor::new(b"xxSTREAM".to_vec()));
    stream.set_position(2).await.unwrap();

    let (addr, task) = sink(1).await;
    let mut sock = Socket::connect(addr).await.unwrap();
    let req = SendRequest::builder()
        .memory(b"<".to_vec())
        .file(file.path())
        .file_range(file.path(), 2, 4)
        .stream(stream.clone())
        .memory(b">".to_vec())
        .flags(SendFlags::DISCONNECT)
        .chunk_size(3)
        .build();
    let r = sock.send_packets(&req).await.unwrap();
    assert!(r.is_success());
    assert_eq!(r.bytes_transferred, 1 + 17 + 4 + 6 + 1);

    let received = task.await.unwrap();
    assert_eq!(received[0], b"<--file-contents--fileSTREAM>");
    assert_eq!(stream.position().await.unwrap(), 8);
}

#[tokio::test]
async fn large_file_is_sent_whole() {
    let data: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    let file = temp_file(&data);

    let (addr, task) = sink(1).await;
    let mut sock = Socket::connect(addr).await.unwrap();
    let req = SendRequest::new(vec![SendDescriptor::file(file.path())])
        .with_flags(SendFlags::DISCONNECT);
    let r = sock.send_packets(&req).await.unwrap();
    assert_eq!(r.bytes_transferred, data.len() as u64);
    assert_eq!(task.await.unwrap()[0], data);
}

#[tokio::test]
async fn file_region_past_end_is_a_transport_status() {
    let file = temp_file(b"tiny");
    let (mut sock, peer) = pipe();
    let req = SendRequest::new(vec![
        SendDescriptor::memory(b"prefix".to_vec()),
        SendDescriptor::file_range(file.path(), 2, 10),
    ]);
    let r = sock.send_packets(&req).await.unwrap();
    assert_eq!(r.status, TransportStatus::InvalidArgument);
    assert_eq!(r.bytes_transferred, 0);
    assert!(drain(sock, peer).await.is_empty());
}

#[tokio::test]
async fn stream_region_past_end_is_a_transport_status() {
    let stream = StreamHandle::new(Cursor::new(vec![7u8; 16]));
    let (mut sock, _peer) = pipe();
    for (offset, length) in [(17, 1), (8, 9)] {
        let req = SendRequest::new(vec![SendDescriptor::stream_range(
            stream.clone(),
            offset,
            length,
        )]);
        let r = sock.send_packets(&req).await.unwrap();
        assert_eq!(r.status, TransportStatus::InvalidArgument);
        assert_eq!(r.bytes_transferred, 0);
    }
}

#[tokio::test]
async fn missing_directory_fails_before_sending() {
    let dir = tempfile::tempdir().unwrap();
    let (mut sock, peer) = pipe();
    let req = SendRequest::new(vec![
        SendDescriptor::memory(b"never".to_vec()),
        SendDescriptor::file(dir.path().join("missing").join("file.bin")),
    ]);
    let err = sock.send_packets(&req).await.unwrap_err();
    assert!(matches!(err, Error::DirectoryNotFound(ref p) if p.ends_with("missing")));
    assert!(drain(sock, peer).await.is_empty());
}

#[tokio::test]
async fn missing_file_fails_before_sending() {
    let dir = tempfile::tempdir().unwrap();
    let (mut sock, _peer) = pipe();
    let req = SendRequest::new(vec![SendDescriptor::file(dir.path().join("file.bin"))]);
    assert!(matches!(
        sock.send_packets(&req).await,
        Err(Error::FileNotFound(_))
    ));
}

#[tokio::test]
async fn unreadable_path_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let long = "n".repeat(300);
    let (mut sock, peer) = pipe();
    let req = SendRequest::new(vec![
        SendDescriptor::memory(b"never".to_vec()),
        SendDescriptor::file(dir.path().join(long).join("file.bin")),
    ]);
    let err = sock.send_packets(&req).await.unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err:?}");
    assert!(drain(sock, peer).await.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn whitespace_file_name_is_only_looked_up() {
    let dir = tempfile::tempdir().unwrap();
    let (mut sock, _peer) = pipe();
    let req = SendRequest::new(vec![SendDescriptor::file(dir.path().join("   "))]);
    assert!(matches!(
        sock.send_packets(&req).await,
        Err(Error::FileNotFound(_))
    ));

    std::fs::write(dir.path().join("   "), b"spaced").unwrap();
    let r = sock.send_packets(&req).await.unwrap();
    assert_eq!(r.bytes_transferred, 6);
}

#[tokio::test]
async fn nul_in_path_names_the_descriptor() {
    let (mut sock, _peer) = pipe();
    let req = SendRequest::new(vec![
        SendDescriptor::memory(b"ok".to_vec()),
        SendDescriptor::file("bad\0name.bin"),
    ]);
    let err = sock.send_packets(&req).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(err.param(), Some("descriptors[1]"));
}

#[tokio::test]
async fn disposed_socket_always_rejects() {
    let (mut sock, _peer) = pipe();
    sock.close();
    assert!(matches!(
        send_packets(&mut sock, None).await,
        Err(Error::ObjectDisposed)
    ));
    assert!(matches!(
        send_packets(&mut sock, Some(&SendRequest::default())).await,
        Err(Error::ObjectDisposed)
    ));
    let ok = SendRequest::new(vec![SendDescriptor::memory(b"x".to_vec())]);
    assert!(matches!(
        send_packets(&mut sock, Some(&ok)).await,
        Err(Error::ObjectDisposed)
    ));
}

#[tokio::test]
async fn null_arguments_are_named() {
    let (mut sock, _peer) = pipe();
    let err = send_packets(&mut sock, None).await.unwrap_err();
    assert_eq!(err.param(), Some("request"));
    let err = send_packets(&mut sock, Some(&SendRequest::default()))
        .await
        .unwrap_err();
    assert_eq!(err.param(), Some("descriptors"));
}

#[tokio::test]
async fn unconnected_socket_is_an_invalid_operation() {
    let mut sock = Socket::<TcpStream>::new();
    let req = SendRequest::new(vec![SendDescriptor::memory(b"x".to_vec())]);
    assert!(matches!(
        sock.send_packets(&req).await,
        Err(Error::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn disconnect_shuts_the_socket_down() {
    let (addr, task) = sink(1).await;
    let mut sock = Socket::connect(addr).await.unwrap();
    let req = SendRequest::new(vec![SendDescriptor::memory(b"bye".to_vec())])
        .with_flags(SendFlags::DISCONNECT);
    assert!(sock.send_packets(&req).await.unwrap().is_success());
    assert_eq!(sock.state(), SocketState::ShutDown);
    assert_eq!(task.await.unwrap()[0], b"bye");

    let again = SendRequest::new(vec![SendDescriptor::memory(b"more".to_vec())]);
    let r = sock.send_packets(&again).await.unwrap();
    assert_eq!(r.status, TransportStatus::Shutdown);
    assert_eq!(r.bytes_transferred, 0);
    assert!(sock.reconnect(addr).await.is_err());
}

#[tokio::test]
async fn disconnect_with_reuse_allows_another_send() {
    let (addr, task) = sink(2).await;
    let mut sock = Socket::connect(addr).await.unwrap();
    let req = SendRequest::new(vec![SendDescriptor::memory(b"first".to_vec())])
        .with_flags(SendFlags::DISCONNECT | SendFlags::REUSE_SOCKET);
    assert!(sock.send_packets(&req).await.unwrap().is_success());
    assert_eq!(sock.state(), SocketState::Idle);

    sock.reconnect(addr).await.unwrap();
    let req = SendRequest::new(vec![SendDescriptor::memory(b"second".to_vec())])
        .with_flags(SendFlags::DISCONNECT);
    let r = sock.send_packets(&req).await.unwrap();
    assert!(r.is_success());
    assert_eq!(r.bytes_transferred, 6);

    let received = task.await.unwrap();
    assert_eq!(received, vec![b"first".to_vec(), b"second".to_vec()]);
}

#[tokio::test]
async fn repeated_request_follows_stream_position() {
    let stream = StreamHandle::new(Cursor::new(b"abcdefgh".to_vec()));
    stream.set_position(4).await.unwrap();
    let req = SendRequest::new(vec![SendDescriptor::stream(stream.clone())]);

    let (mut sock, peer) = pipe();
    let first = sock.send_packets(&req).await.unwrap();
    assert_eq!(first.bytes_transferred, 4);
    assert_eq!(stream.position().await.unwrap(), 8);

    // The stream is exhausted now; the same request sends nothing.
    let second = sock.send_packets(&req).await.unwrap();
    assert!(second.is_success());
    assert_eq!(second.bytes_transferred, 0);

    stream.set_position(6).await.unwrap();
    let third = sock.send_packets(&req).await.unwrap();
    assert_eq!(third.bytes_transferred, 2);

    assert_eq!(drain(sock, peer).await, b"efghgh");
}

#[tokio::test]
async fn whole_stream_entry_follows_an_earlier_range() {
    let stream = StreamHandle::new(Cursor::new(b"abcdefgh".to_vec()));
    let (mut sock, peer) = pipe();
    let req = SendRequest::builder()
        .stream_range(stream.clone(), 0, 4)
        .stream(stream.clone())
        .build();
    let r = sock.send_packets(&req).await.unwrap();
    assert_eq!(r.bytes_transferred, 8);
    assert_eq!(stream.position().await.unwrap(), 8);
    assert_eq!(drain(sock, peer).await, b"abcdefgh");
}

#[tokio::test]
async fn explicit_stream_range_moves_position_to_its_end() {
    let stream = StreamHandle::new(Cursor::new(b"0123456789".to_vec()));
    let (mut sock, peer) = pipe();
    let req = SendRequest::new(vec![SendDescriptor::stream_range(stream.clone(), 3, 4)]);
    let r = sock.send_packets(&req).await.unwrap();
    assert_eq!(r.bytes_transferred, 4);
    assert_eq!(stream.position().await.unwrap(), 7);
    assert_eq!(drain(sock, peer).await, b"3456");
}
