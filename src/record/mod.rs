//! Record layer framing.

use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

use crate::context::TlsContext;
use crate::message::Field;
use crate::types::{ContentType, ProtocolVersion};
use crate::util::len_u16;
use crate::Error;

mod compressor;
pub use compressor::{
    algorithm_for, CompressionAlgorithm, DeflateCompression, NullCompression, RecordCompressor,
    RecordDecompressor,
};

const SEQUENCE_MASK: u64 = 0xFFFF_FFFF_FFFF;

/// A TLS or DTLS record.
///
/// `clean_bytes` holds the protocol message bytes, `payload` the bytes on
/// the wire after compression.
///
/// ```text
/// type(1) | version(2) | [epoch(2) | seq(6)] | length(2) | payload
/// ```
///
/// The bracketed part is present only for DTLS versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub content_type: ContentType,
    pub protocol_version: Field<ProtocolVersion>,
    pub epoch: Field<u16>,
    pub sequence_number: Field<u64>,
    pub length: Field<u16>,
    pub clean_bytes: Vec<u8>,
    pub payload: Vec<u8>,
}

fn be_u48(input: &[u8]) -> IResult<&[u8], u64> {
    let (input, bytes) = take(6_usize)(input)?;
    let value = bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
    Ok((input, value))
}

impl Record {
    pub fn new(content_type: ContentType, clean_bytes: Vec<u8>) -> Self {
        Record {
            content_type,
            clean_bytes,
            ..Default::default()
        }
    }

    /// Whether the header carries epoch and sequence number.
    pub fn is_dtls(&self) -> bool {
        self.protocol_version
            .value()
            .map(|v| v.is_dtls())
            .unwrap_or(false)
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Record> {
        let (input, content_type) = ContentType::parse(input)?;
        let (input, protocol_version) = ProtocolVersion::parse(input)?;

        let (input, epoch, sequence_number) = if protocol_version.is_dtls() {
            let (input, epoch) = be_u16(input)?;
            let (input, seq) = be_u48(input)?;
            (input, Field::Value(epoch), Field::Value(seq))
        } else {
            (input, Field::Unset, Field::Unset)
        };

        let (input, length) = be_u16(input)?;
        let (input, payload) = take(length as usize)(input)?;

        Ok((
            input,
            Record {
                content_type,
                protocol_version: Field::Value(protocol_version),
                epoch,
                sequence_number,
                length: Field::Value(length),
                clean_bytes: Vec::new(),
                payload: payload.to_vec(),
            },
        ))
    }

    /// Fill unset header fields. Takes the next write sequence number for
    /// DTLS records unless one is overridden.
    pub fn prepare(&mut self, ctx: &mut TlsContext) -> Result<(), Error> {
        self.protocol_version
            .prepare_with(|| ctx.selected_protocol_version().legacy_version());

        if self.is_dtls() {
            self.epoch.prepare_with(|| ctx.write_epoch());
            if !self.sequence_number.is_set() {
                self.sequence_number = Field::Value(ctx.next_write_record_seq());
            }
        }

        let payload_len = self.payload.len();
        self.length
            .try_prepare_with(|| len_u16("record length", payload_len))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        output.push(self.content_type.as_u8());
        let version = self.protocol_version.require("record version")?;
        version.serialize(output);

        if version.is_dtls() {
            output.extend_from_slice(&self.epoch.require("record epoch")?.to_be_bytes());
            let seq = *self.sequence_number.require("record sequence number")? & SEQUENCE_MASK;
            output.extend_from_slice(&seq.to_be_bytes()[2..]);
        }

        output.extend_from_slice(&self.length.require("record length")?.to_be_bytes());
        output.extend_from_slice(&self.payload);
        Ok(())
    }
}
