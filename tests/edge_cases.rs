#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Misbehaving peers: raw bytes on the socket, malformed frames, and
//! servers that hang up without answering.

mod common;

use auth_rpc::core::packet::{Packet, HEADER_SIZE};
use auth_rpc::core::serialization::{decode_with_format, encode, encode_with, SerializationFormat};
use auth_rpc::directory::{Role, User};
use auth_rpc::error::{ErrorKind, RpcError};
use auth_rpc::protocol::message::{Request, Response, Value};
use auth_rpc::service::{ClientStub, RemoteUserDirectory};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Write `bytes` in one go, then read until the server closes
async fn raw_exchange(address: &str, bytes: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(address).await.expect("connect");
    stream.write_all(bytes).await.expect("write");
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.expect("read");
    reply
}

fn single_response(reply: &[u8]) -> (Response, SerializationFormat) {
    let packet = Packet::from_bytes(reply).expect("framed reply");
    assert_eq!(
        reply.len(),
        HEADER_SIZE + packet.payload.len(),
        "server sent more than one message"
    );
    let (value, format) = decode_with_format(&packet.payload).expect("decodable reply");
    (Response::try_from(value).expect("response"), format)
}

fn failure_kind(response: Response) -> ErrorKind {
    match response {
        Response::Err(failure) => failure.kind,
        Response::Ok(value) => panic!("expected a failure, got {value:?}"),
    }
}

#[tokio::test]
async fn test_unframed_bytes_get_protocol_error() {
    let server = common::spawn_server().await;

    let reply = raw_exchange(&server.address, b"GET / HTTP/1.1\r\n\r\n").await;
    let (response, _) = single_response(&reply);
    assert_eq!(failure_kind(response), ErrorKind::ProtocolError);

    assert_eq!(server.dispatcher.metrics().snapshot().protocol_errors, 1);
    server.stop().await;
}

#[tokio::test]
async fn test_oversized_frame_is_refused() {
    let server = common::spawn_server().await;

    let mut header = Packet::new(vec![]).to_bytes();
    header[5..HEADER_SIZE].copy_from_slice(&u32::MAX.to_be_bytes());
    let reply = raw_exchange(&server.address, &header).await;
    let (response, _) = single_response(&reply);
    assert_eq!(failure_kind(response), ErrorKind::ProtocolError);
    server.stop().await;
}

#[tokio::test]
async fn test_undecodable_payload() {
    let server = common::spawn_server().await;

    let frame = Packet::new(vec![0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).to_bytes();
    let (response, _) = single_response(&raw_exchange(&server.address, &frame).await);
    assert_eq!(failure_kind(response), ErrorKind::ProtocolError);

    let frame = Packet::new(vec![0x7F, 0x00]).to_bytes();
    let (response, _) = single_response(&raw_exchange(&server.address, &frame).await);
    assert_eq!(failure_kind(response), ErrorKind::ProtocolError);
    server.stop().await;
}

#[tokio::test]
async fn test_deeply_nested_payload_is_refused() {
    let server = common::spawn_server().await;

    // bincode body: 20_000 single-element lists around a null
    let mut payload = vec![SerializationFormat::Bincode.format_byte()];
    for _ in 0..20_000 {
        payload.extend_from_slice(&6u32.to_le_bytes());
        payload.extend_from_slice(&1u64.to_le_bytes());
    }
    payload.extend_from_slice(&0u32.to_le_bytes());

    let reply = raw_exchange(&server.address, &Packet::new(payload).to_bytes()).await;
    let (response, _) = single_response(&reply);
    assert_eq!(failure_kind(response), ErrorKind::ProtocolError);

    let users = RemoteUserDirectory::connect(server.address.clone());
    users
        .add_user(&User::new("erin", "Erin", Role::User, "pw"))
        .await
        .expect("server still serves");
    server.stop().await;
}

#[tokio::test]
async fn test_short_garbage_then_eof_gets_protocol_error() {
    let server = common::spawn_server().await;

    for bytes in [&b"xyz"[..], &Packet::new(vec![1; 32]).to_bytes()[..20]] {
        let mut stream = TcpStream::connect(&server.address).await.expect("connect");
        stream.write_all(bytes).await.expect("write");
        stream.shutdown().await.expect("half close");
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.expect("read");

        let (response, _) = single_response(&reply);
        assert_eq!(failure_kind(response), ErrorKind::ProtocolError);
    }

    assert_eq!(server.dispatcher.metrics().snapshot().protocol_errors, 2);
    server.stop().await;
}

#[tokio::test]
async fn test_non_request_value_answered_in_its_format() {
    let server = common::spawn_server().await;

    let payload = encode_with(&Value::from("hello"), SerializationFormat::Json).expect("encode");
    let reply = raw_exchange(&server.address, &Packet::new(payload).to_bytes()).await;
    let (response, format) = single_response(&reply);
    assert_eq!(format, SerializationFormat::Json);
    assert_eq!(failure_kind(response), ErrorKind::ProtocolError);
    server.stop().await;
}

#[tokio::test]
async fn test_json_request_gets_json_response() {
    let server = common::spawn_server().await;

    let user = User::new("carol", "Carol", Role::User, "pw");
    let request = Request::new("add_user", vec![user.into()]);
    let payload = encode_with(&Value::from(request), SerializationFormat::Json).expect("encode");
    let reply = raw_exchange(&server.address, &Packet::new(payload).to_bytes()).await;

    let (response, format) = single_response(&reply);
    assert_eq!(format, SerializationFormat::Json);
    assert_eq!(response, Response::Ok(Value::Null));
    server.stop().await;
}

#[tokio::test]
async fn test_one_request_per_connection() {
    let server = common::spawn_server().await;

    let first = Request::new("check_password", vec![]);
    let second = Request::new("drop_tables", vec![]);
    let mut bytes = Packet::new(encode(&first.into()).expect("encode")).to_bytes();
    bytes.extend(Packet::new(encode(&second.into()).expect("encode")).to_bytes());

    let reply = raw_exchange(&server.address, &bytes).await;
    let (response, _) = single_response(&reply);
    // arity failure of the first request, not OperationNotFound of the second
    assert_eq!(failure_kind(response), ErrorKind::ProtocolError);

    server.stop().await;
}

#[tokio::test]
async fn test_silent_peer_does_not_disturb_server() {
    let server = common::spawn_server().await;

    drop(TcpStream::connect(&server.address).await.expect("connect"));

    let users = RemoteUserDirectory::connect(server.address.clone());
    users
        .add_user(&User::new("dave", "Dave", Role::User, "pw"))
        .await
        .expect("server still serves");
    server.stop().await;
}

#[tokio::test]
async fn test_hangup_is_no_response() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("addr").to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf).await;
    });

    let stub = ClientStub::new(address);
    let err = stub.rpc("get_user", vec!["x".into()], None).await.expect_err("no reply");
    assert!(matches!(err, RpcError::NoResponse(_)), "got {err:?}");
    assert_eq!(err.kind(), ErrorKind::NoResponse);
}

#[tokio::test]
async fn test_connection_refused_is_io() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("addr").to_string();
    drop(listener);

    let err = ClientStub::new(address)
        .rpc("get_user", vec![], None)
        .await
        .expect_err("nobody listening");
    assert!(matches!(err, RpcError::Io(_)), "got {err:?}");
}
