mod forge_common;

use forge_common::*;

use tlsforge::message::{ClientHello, Extension, ExtensionData, HandshakeBody, ServerHello};
use tlsforge::record::RecordCompressor;
use tlsforge::types::{CompressionMethod, ExtensionType, ProtocolVersion};
use tlsforge::{receive_messages, send_messages, TlsContext};

fn exchange_hellos(client: &mut TlsContext, server: &mut TlsContext, hello: ClientHello) {
    let (mut client_io, mut server_io) = transports();

    send_messages(
        client,
        &mut client_io,
        &mut [handshake(HandshakeBody::ClientHello(hello))],
    )
    .unwrap();
    deliver(&mut client_io, &mut server_io);
    receive_messages(server, &mut server_io).unwrap();

    send_messages(
        server,
        &mut server_io,
        &mut [handshake(HandshakeBody::ServerHello(
            ServerHello::with_supported_versions(),
        ))],
    )
    .unwrap();
    deliver(&mut server_io, &mut client_io);
    receive_messages(client, &mut client_io).unwrap();
}

#[test]
fn tls13_selected_through_supported_versions() {
    let _ = env_logger::try_init();

    let client_config = client_builder(ProtocolVersion::TLS1_2)
        .highest_protocol_version(ProtocolVersion::TLS1_3)
        .default_selected_compression_method(CompressionMethod::Deflate)
        .build()
        .unwrap();
    let server_config = server_builder(ProtocolVersion::TLS1_3).build().unwrap();
    let mut client = TlsContext::new(client_config);
    let mut server = TlsContext::new(server_config);

    exchange_hellos(&mut client, &mut server, ClientHello::with_supported_versions());

    assert_eq!(server.selected_protocol_version(), ProtocolVersion::TLS1_3);
    assert_eq!(client.selected_protocol_version(), ProtocolVersion::TLS1_3);
    assert_eq!(
        server.client_supported_versions(),
        &[ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_2]
    );
    assert!(client.warnings().is_empty());

    // TLS 1.3 never compresses records
    let compressor = RecordCompressor::new(&client).unwrap();
    assert_eq!(compressor.method(), CompressionMethod::Null);
}

#[test]
fn server_limit_caps_selection() {
    let client_config = client_builder(ProtocolVersion::TLS1_2)
        .highest_protocol_version(ProtocolVersion::TLS1_3)
        .build()
        .unwrap();
    let server_config = server_builder(ProtocolVersion::TLS1_2).build().unwrap();
    let mut client = TlsContext::new(client_config);
    let mut server = TlsContext::new(server_config);

    exchange_hellos(&mut client, &mut server, ClientHello::with_supported_versions());

    assert_eq!(server.selected_protocol_version(), ProtocolVersion::TLS1_2);
    assert_eq!(client.selected_protocol_version(), ProtocolVersion::TLS1_2);
}

#[test]
fn no_common_version_falls_back_with_warning() {
    let client_config = client_builder(ProtocolVersion::TLS1_2)
        .highest_protocol_version(ProtocolVersion::TLS1_3)
        .supported_versions(vec![ProtocolVersion::TLS1_3])
        .build()
        .unwrap();
    let server_config = server_builder(ProtocolVersion::TLS1_2)
        .default_selected_protocol_version(ProtocolVersion::TLS1_1)
        .build()
        .unwrap();
    let mut client = TlsContext::new(client_config);
    let mut server = TlsContext::new(server_config);
    let (mut client_io, mut server_io) = transports();

    send_messages(
        &mut client,
        &mut client_io,
        &mut [handshake(HandshakeBody::ClientHello(
            ClientHello::with_supported_versions(),
        ))],
    )
    .unwrap();
    deliver(&mut client_io, &mut server_io);
    receive_messages(&mut server, &mut server_io).unwrap();

    assert_eq!(server.warnings().len(), 1);
    assert_eq!(server.selected_protocol_version(), ProtocolVersion::TLS1_1);
    assert_eq!(server.highest_client_protocol_version(), ProtocolVersion::TLS1_3);
}

#[test]
fn malformed_extension_recovers_to_default() {
    let server_config = server_builder(ProtocolVersion::TLS1_3)
        .default_selected_protocol_version(ProtocolVersion::TLS1_0)
        .build()
        .unwrap();
    let mut client = TlsContext::new(client_builder(ProtocolVersion::TLS1_2).build().unwrap());
    let mut server = TlsContext::new(server_config);
    let (mut client_io, mut server_io) = transports();

    let mut hello = ClientHello::with_supported_versions();
    if let Some(ExtensionData::SupportedVersions(ext)) = hello.extensions[0].content.fields_mut() {
        ext.versions.set_override(vec![0x03]);
    }
    send_messages(
        &mut client,
        &mut client_io,
        &mut [handshake(HandshakeBody::ClientHello(hello))],
    )
    .unwrap();
    deliver(&mut client_io, &mut server_io);
    let received = receive_messages(&mut server, &mut server_io).unwrap();

    assert_eq!(received.len(), 1);
    assert_eq!(server.warnings().len(), 1);
    assert!(server.warnings()[0].contains("protocol versions"));
    assert_eq!(server.selected_protocol_version(), ProtocolVersion::TLS1_0);
}

#[test]
fn truncated_versions_list_recovers_to_default() {
    let server_config = server_builder(ProtocolVersion::TLS1_3)
        .default_selected_protocol_version(ProtocolVersion::TLS1_1)
        .build()
        .unwrap();
    let mut client = TlsContext::new(client_builder(ProtocolVersion::TLS1_2).build().unwrap());
    let mut server = TlsContext::new(server_config);
    let (mut client_io, mut server_io) = transports();

    // List length claims 5 bytes, 2 follow
    let mut hello = ClientHello::with_supported_versions();
    hello.extensions[0] = Extension::raw(ExtensionType::SupportedVersions, vec![0x05, 0x03, 0x04]);
    send_messages(
        &mut client,
        &mut client_io,
        &mut [handshake(HandshakeBody::ClientHello(hello))],
    )
    .unwrap();
    deliver(&mut client_io, &mut server_io);
    receive_messages(&mut server, &mut server_io).unwrap();

    assert_eq!(server.warnings().len(), 1);
    assert_eq!(server.selected_protocol_version(), ProtocolVersion::TLS1_1);
}
