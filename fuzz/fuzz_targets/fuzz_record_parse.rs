#![no_main]

//! Fuzz target for the record layer receive path.
//!
//! Arbitrary bytes are fed as fetched transport data to a TLS and a DTLS
//! context, once with the input as is and once behind a well-formed
//! record header, so the message parsers behind the header are reached.

use libfuzzer_sys::fuzz_target;

use tlsforge::transport::MemoryTransport;
use tlsforge::types::{ConnectionEnd, ProtocolVersion};
use tlsforge::{receive_messages, Config, TlsContext};

/// TLS record header length
const TLS_HEADER_LEN: usize = 5;
/// DTLS record header length
const DTLS_HEADER_LEN: usize = 13;
/// Maximum plaintext record size
const MAX_FRAGMENT_SIZE: usize = 16384;

fn context(version: ProtocolVersion) -> TlsContext {
    let config = Config::builder()
        .connection_end(ConnectionEnd::Server)
        .highest_protocol_version(version)
        .default_selected_protocol_version(version)
        .rng_seed(0)
        .build();
    match config {
        Ok(config) => TlsContext::new(config),
        Err(_) => TlsContext::new(Config::default()),
    }
}

fn feed(version: ProtocolVersion, data: &[u8]) {
    let mut ctx = context(version);
    let mut transport = MemoryTransport::new();
    transport.push_incoming(data.to_vec());
    // Errors are expected, panics are not
    let _ = receive_messages(&mut ctx, &mut transport);
}

fuzz_target!(|data: &[u8]| {
    feed(ProtocolVersion::TLS1_2, data);
    feed(ProtocolVersion::DTLS1_2, data);

    if data.is_empty() {
        return;
    }
    let frag_len = data.len().min(MAX_FRAGMENT_SIZE);

    let mut record = Vec::with_capacity(TLS_HEADER_LEN + frag_len);
    record.push(22u8); // ContentType::Handshake
    record.extend_from_slice(&[0x03, 0x03]); // TLS 1.2
    record.extend_from_slice(&(frag_len as u16).to_be_bytes());
    record.extend_from_slice(&data[..frag_len]);
    feed(ProtocolVersion::TLS1_2, &record);

    let mut record = Vec::with_capacity(DTLS_HEADER_LEN + frag_len);
    record.push(22u8); // ContentType::Handshake
    record.extend_from_slice(&[0xFE, 0xFD]); // DTLS 1.2
    record.extend_from_slice(&[0, 0]); // epoch 0
    record.extend_from_slice(&[0, 0, 0, 0, 0, 1]); // sequence 1
    record.extend_from_slice(&(frag_len as u16).to_be_bytes());
    record.extend_from_slice(&data[..frag_len]);
    feed(ProtocolVersion::DTLS1_2, &record);
});
