//! Moves protocol messages through records and a transport.
//!
//! Each outgoing message becomes one record, except DTLS handshake
//! messages, which become one record per fragment. Compression applies to
//! a direction only after its ChangeCipherSpec.

use std::collections::BTreeMap;

use crate::context::TlsContext;
use crate::fragment::defragment;
use crate::handler::{parse_fragments, process_incoming, process_incoming_dtls};
use crate::handler::{process_outgoing, process_outgoing_dtls};
use crate::message::{DtlsFragment, Field, Message, ParseError, ProtocolMessage};
use crate::record::{Record, RecordCompressor, RecordDecompressor};
use crate::transport::TransportHandler;
use crate::types::ContentType;
use crate::Error;

fn seal_record(
    ctx: &mut TlsContext,
    record: &mut Record,
    compress: bool,
) -> Result<Vec<u8>, Error> {
    if compress {
        RecordCompressor::new(ctx)?.compress(record)?;
    } else {
        record.payload = record.clean_bytes.clone();
    }
    record.prepare(ctx)?;

    let mut output = Vec::new();
    record.serialize(&mut output)?;
    Ok(output)
}

/// Send `messages` in order, one `send_data` per record.
pub fn send_messages(
    ctx: &mut TlsContext,
    transport: &mut dyn TransportHandler,
    messages: &mut [ProtocolMessage],
) -> Result<(), Error> {
    for msg in messages.iter_mut() {
        let compress = ctx.write_compression_active();
        let dtls = ctx.selected_protocol_version().is_dtls();

        let mut records = Vec::new();
        match msg {
            ProtocolMessage::Handshake(handshake) if dtls => {
                let fragments = process_outgoing_dtls(ctx, handshake)?;
                for fragment in &fragments {
                    let mut clean = Vec::new();
                    fragment.serialize(&mut clean)?;
                    records.push(Record::new(ContentType::Handshake, clean));
                }
            }
            _ => {
                // Header values are taken before the message runs, since a
                // ChangeCipherSpec moves the write epoch.
                let mut record = Record::new(msg.content_type(), Vec::new());
                if dtls {
                    record.epoch = Field::Value(ctx.write_epoch());
                    record.sequence_number = Field::Value(ctx.next_write_record_seq());
                }
                record.clean_bytes = process_outgoing(ctx, msg)?;
                records.push(record);
            }
        }

        for record in records.iter_mut() {
            let bytes = seal_record(ctx, record, compress)?;
            transport.send_data(&bytes)?;
        }
    }
    Ok(())
}

/// Fetch from `transport` and process every complete message received.
///
/// DTLS handshake fragments are collected per message sequence and the
/// message is processed once its fragments reassemble.
pub fn receive_messages(
    ctx: &mut TlsContext,
    transport: &mut dyn TransportHandler,
) -> Result<Vec<ProtocolMessage>, Error> {
    let data = transport.fetch_data()?;
    let mut input = data.as_slice();
    let mut messages = Vec::new();
    let mut pending: BTreeMap<u16, Vec<DtlsFragment>> = BTreeMap::new();

    while !input.is_empty() {
        let (rest, mut record) =
            Record::parse(input).map_err(|e| ParseError::from_nom(input, e, "record"))?;
        input = rest;

        if ctx.read_compression_active() {
            RecordDecompressor::new(ctx)?.decompress(&mut record)?;
        } else {
            record.clean_bytes = std::mem::take(&mut record.payload);
        }
        trace!(
            "Record {:?} with {} clean bytes",
            record.content_type,
            record.clean_bytes.len()
        );

        if record.is_dtls() && record.content_type == ContentType::Handshake {
            for fragment in parse_fragments(&record.clean_bytes)? {
                let seq = fragment.message_seq.value().unwrap_or(fragment.slice.message_seq);
                pending.entry(seq).or_default().push(fragment);
            }
            let complete: Vec<u16> = pending
                .iter()
                .filter(|(_, fragments)| defragment(fragments).is_ok())
                .map(|(seq, _)| *seq)
                .collect();
            for seq in complete {
                if let Some(fragments) = pending.remove(&seq) {
                    let msg = process_incoming_dtls(ctx, &fragments)?;
                    messages.push(msg.into());
                }
            }
            continue;
        }

        let mut clean = record.clean_bytes.as_slice();
        while !clean.is_empty() {
            let (msg, consumed) = process_incoming(ctx, record.content_type, clean)?;
            messages.push(msg);
            clean = &clean[consumed..];
        }
    }

    if let Some((_, fragments)) = pending.iter().next() {
        defragment(fragments)?;
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChangeCipherSpecMessage, ClientHello, HandshakeBody, HandshakeMessage};
    use crate::transport::MemoryTransport;
    use crate::types::{CompressionMethod, ConnectionEnd, ProtocolVersion};
    use crate::Config;

    fn pair(version: ProtocolVersion) -> (TlsContext, TlsContext) {
        let client = Config::builder()
            .highest_protocol_version(version)
            .default_selected_protocol_version(version)
            .default_selected_compression_method(CompressionMethod::Deflate)
            .dtls_maximum_fragment_length(32)
            .rng_seed(7)
            .build()
            .unwrap();
        let server = Config::builder()
            .connection_end(ConnectionEnd::Server)
            .highest_protocol_version(version)
            .default_selected_protocol_version(version)
            .default_selected_compression_method(CompressionMethod::Deflate)
            .build()
            .unwrap();
        (TlsContext::new(client), TlsContext::new(server))
    }

    fn client_hello() -> ProtocolMessage {
        HandshakeMessage::new(HandshakeBody::ClientHello(ClientHello::new())).into()
    }

    #[test]
    fn tls_flight_roundtrip() {
        let _ = env_logger::try_init();

        let (mut client, mut server) = pair(ProtocolVersion::TLS1_2);
        let mut transport = MemoryTransport::new();
        let mut flight = vec![client_hello()];
        send_messages(&mut client, &mut transport, &mut flight).unwrap();
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.sent()[0][0], 0x16);

        for chunk in transport.take_sent() {
            transport.push_incoming(chunk);
        }
        let received = receive_messages(&mut server, &mut transport).unwrap();
        assert_eq!(received, flight);
        assert_eq!(server.client_random(), client.client_random());
    }

    #[test]
    fn dtls_handshake_goes_out_in_fragments() {
        let (mut client, mut server) = pair(ProtocolVersion::DTLS1_2);
        let mut transport = MemoryTransport::new();
        let mut flight = vec![client_hello()];
        send_messages(&mut client, &mut transport, &mut flight).unwrap();
        assert!(transport.sent().len() > 1);

        // Deliver in reverse order
        let mut sent = transport.take_sent();
        sent.reverse();
        for chunk in sent {
            transport.push_incoming(chunk);
        }
        let received = receive_messages(&mut server, &mut transport).unwrap();
        assert_eq!(received, flight);
        assert_eq!(server.read_message_seq(), 1);
    }

    #[test]
    fn compression_starts_after_change_cipher_spec() {
        let (mut client, mut server) = pair(ProtocolVersion::TLS1_2);
        let mut transport = MemoryTransport::new();
        let mut flight = vec![
            ChangeCipherSpecMessage::default().into(),
            ProtocolMessage::Raw {
                content_type: ContentType::ApplicationData,
                data: b"hello hello hello hello".to_vec(),
            },
        ];
        send_messages(&mut client, &mut transport, &mut flight).unwrap();

        let sent = transport.take_sent();
        // ChangeCipherSpec is sent in the clear
        assert_eq!(sent[0], [0x14, 0x03, 0x03, 0x00, 0x01, 0x01]);
        assert_ne!(&sent[1][5..], b"hello hello hello hello");

        for chunk in sent {
            transport.push_incoming(chunk);
        }
        let received = receive_messages(&mut server, &mut transport).unwrap();
        assert_eq!(received, flight);
        assert!(server.read_compression_active());
    }

    #[test]
    fn missing_fragment_fails() {
        let (mut client, mut server) = pair(ProtocolVersion::DTLS1_2);
        let mut transport = MemoryTransport::new();
        send_messages(&mut client, &mut transport, &mut [client_hello()]).unwrap();

        let mut sent = transport.take_sent();
        sent.remove(0);
        for chunk in sent {
            transport.push_incoming(chunk);
        }
        assert!(matches!(
            receive_messages(&mut server, &mut transport),
            Err(Error::Reassembly(_))
        ));
    }
}
