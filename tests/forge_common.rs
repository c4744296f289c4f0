//! Shared helpers for tlsforge integration tests.
//!
//! This file has no `#[test]` functions; Cargo compiles it as a no-op binary.
//! Import it from other test files via `mod forge_common;`.

#![allow(unused)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use rsa::RsaPrivateKey;

use tlsforge::message::{HandshakeBody, HandshakeMessage, ProtocolMessage};
use tlsforge::transport::{MemoryTransport, TransportHandler};
use tlsforge::types::{ConnectionEnd, ProtocolVersion};
use tlsforge::{ConfigBuilder, Config};

/// Builder for a client with a seeded random source.
pub fn client_builder(version: ProtocolVersion) -> ConfigBuilder {
    Config::builder()
        .connection_end(ConnectionEnd::Client)
        .highest_protocol_version(version)
        .default_highest_client_protocol_version(version)
        .default_selected_protocol_version(version)
        .rng_seed(11)
}

/// Builder for a server with a seeded random source.
pub fn server_builder(version: ProtocolVersion) -> ConfigBuilder {
    Config::builder()
        .connection_end(ConnectionEnd::Server)
        .highest_protocol_version(version)
        .default_selected_protocol_version(version)
        .rng_seed(22)
}

pub fn handshake(body: HandshakeBody) -> ProtocolMessage {
    HandshakeMessage::new(body).into()
}

/// Move everything `from` sent into `to`'s incoming queue.
pub fn deliver(from: &mut MemoryTransport, to: &mut MemoryTransport) {
    for datagram in from.take_sent() {
        to.push_incoming(datagram);
    }
}

/// Connected pair of in-memory transports.
pub fn transports() -> (MemoryTransport, MemoryTransport) {
    let mut client = MemoryTransport::new();
    let mut server = MemoryTransport::new();
    client.initialize("127.0.0.1", 4433).unwrap();
    server.initialize("127.0.0.1", 54321).unwrap();
    (client, server)
}

pub fn rsa_key() -> RsaPrivateKey {
    let mut rng = StdRng::seed_from_u64(1);
    RsaPrivateKey::new(&mut rng, 1024).unwrap()
}

pub fn p256_key() -> p256::ecdsa::SigningKey {
    let mut rng = StdRng::seed_from_u64(2);
    p256::ecdsa::SigningKey::random(&mut rng)
}

pub fn p384_key() -> p384::ecdsa::SigningKey {
    let mut rng = StdRng::seed_from_u64(3);
    p384::ecdsa::SigningKey::random(&mut rng)
}

#[allow(deprecated)]
pub fn dsa_key() -> dsa::SigningKey {
    let mut rng = StdRng::seed_from_u64(4);
    let components = dsa::Components::generate(&mut rng, dsa::KeySize::DSA_1024_160);
    dsa::SigningKey::generate(&mut rng, components)
}

/// Uncompressed P-256 point to send as the server's ECDHE share.
pub fn ec_share() -> Vec<u8> {
    let key = p256_key();
    key.verifying_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec()
}
