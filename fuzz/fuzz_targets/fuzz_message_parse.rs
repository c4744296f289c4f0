#![no_main]

//! Fuzz target for message parsing and reserialization.
//!
//! Whatever parses must serialize back to the exact bytes consumed.

use libfuzzer_sys::fuzz_target;

use tlsforge::message::{ParseContext, ProtocolMessage};
use tlsforge::types::{ConnectionEnd, ContentType, ProtocolVersion};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let content_type = match data[0] % 3 {
        0 => ContentType::Handshake,
        1 => ContentType::Alert,
        _ => ContentType::ChangeCipherSpec,
    };
    let input = &data[1..];

    for version in [ProtocolVersion::TLS1_2, ProtocolVersion::DTLS1_2] {
        for end in [ConnectionEnd::Client, ConnectionEnd::Server] {
            let ctx = ParseContext::new(version, end);
            if let Ok((rest, msg)) = ProtocolMessage::parse(content_type, input, &ctx) {
                let mut out = Vec::new();
                if msg.serialize(&mut out).is_ok() {
                    assert_eq!(out, &input[..input.len() - rest.len()]);
                }
            }
        }
    }
});
