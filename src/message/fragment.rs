use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u24};
use nom::IResult;

use super::{Field, Message, ParseContext};
use crate::context::TlsContext;
use crate::types::HandshakeType;
use crate::util::{len_u24, put_u24};
use crate::Error;

/// The part of a handshake message a fragment carries, as decided by the
/// fragmenter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentSlice {
    pub message_type: HandshakeType,
    pub message_seq: u16,
    pub offset: u32,
    pub total_length: u32,
    pub payload: Vec<u8>,
}

/// DTLS handshake fragment (RFC 6347 4.2.2):
///
/// `type(1) | length(3) | message_seq(2) | fragment_offset(3) |
/// fragment_length(3) | content`
///
/// Preparation copies the slice into the wire fields that are unset, so a
/// fragment can claim any offset or length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DtlsFragment {
    pub slice: FragmentSlice,
    /// Largest payload when re-fragmenting this fragment. `None` uses the
    /// configured DTLS maximum.
    pub max_fragment_length: Option<usize>,

    pub msg_type: Field<HandshakeType>,
    pub length: Field<u32>,
    pub message_seq: Field<u16>,
    pub fragment_offset: Field<u32>,
    pub fragment_length: Field<u32>,
    pub content: Field<Vec<u8>>,
}

impl DtlsFragment {
    pub fn new(slice: FragmentSlice) -> Self {
        DtlsFragment {
            slice,
            ..Default::default()
        }
    }

    pub fn with_max_fragment_length(mut self, max: usize) -> Self {
        self.max_fragment_length = Some(max);
        self
    }

    /// Wire offset, falling back to the configured slice.
    pub fn offset(&self) -> u32 {
        self.fragment_offset.value().unwrap_or(self.slice.offset)
    }

    pub fn payload(&self) -> &[u8] {
        self.content.get().map(|c| c.as_slice()).unwrap_or(&self.slice.payload)
    }
}

impl Message for DtlsFragment {
    fn parse<'a>(input: &'a [u8], _ctx: &ParseContext) -> IResult<&'a [u8], DtlsFragment> {
        let (input, msg_type) = HandshakeType::parse(input)?;
        let (input, length) = be_u24(input)?;
        let (input, message_seq) = be_u16(input)?;
        let (input, fragment_offset) = be_u24(input)?;
        let (input, fragment_length) = be_u24(input)?;
        let (input, content) = take(fragment_length as usize)(input)?;

        Ok((
            input,
            DtlsFragment {
                slice: FragmentSlice {
                    message_type: msg_type,
                    message_seq,
                    offset: fragment_offset,
                    total_length: length,
                    payload: content.to_vec(),
                },
                max_fragment_length: None,
                msg_type: Field::Value(msg_type),
                length: Field::Value(length),
                message_seq: Field::Value(message_seq),
                fragment_offset: Field::Value(fragment_offset),
                fragment_length: Field::Value(fragment_length),
                content: Field::Value(content.to_vec()),
            },
        ))
    }

    fn prepare(&mut self, _ctx: &TlsContext) -> Result<(), Error> {
        let slice = &self.slice;
        self.msg_type.prepare_with(|| slice.message_type);
        self.length.prepare_with(|| slice.total_length);
        self.message_seq.prepare_with(|| slice.message_seq);
        self.fragment_offset.prepare_with(|| slice.offset);
        self.content.prepare_with(|| slice.payload.clone());
        let content = self.content.require("fragment content")?;
        self.fragment_length
            .try_prepare_with(|| len_u24("fragment length", content.len()))
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        output.push(self.msg_type.require("fragment type")?.as_u8());
        put_u24(output, *self.length.require("fragment message length")?);
        output.extend_from_slice(&self.message_seq.require("message seq")?.to_be_bytes());
        put_u24(output, *self.fragment_offset.require("fragment offset")?);
        put_u24(output, *self.fragment_length.require("fragment length")?);
        output.extend_from_slice(self.content.require("fragment content")?);
        Ok(())
    }

    fn adjust_context(&self, _ctx: &mut TlsContext) -> Result<(), Error> {
        // The reassembled message carries the state transition.
        Ok(())
    }

    fn reset(&mut self) {
        self.msg_type.reset();
        self.length.reset();
        self.message_seq.reset();
        self.fragment_offset.reset();
        self.fragment_length.reset();
        self.content.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    const MESSAGE: &[u8] = &[
        0x02, // HandshakeType::ServerHello
        0x00, 0x00, 0x0A, // Length
        0x00, 0x01, // Message seq
        0x00, 0x00, 0x04, // Fragment offset
        0x00, 0x00, 0x03, // Fragment length
        0xAA, 0xBB, 0xCC, // Content
    ];

    #[test]
    fn roundtrip() {
        let (rest, parsed) = DtlsFragment::parse(MESSAGE, &ParseContext::default()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.slice.offset, 4);
        assert_eq!(parsed.slice.total_length, 10);

        let mut serialized = Vec::new();
        parsed.serialize(&mut serialized).unwrap();
        assert_eq!(serialized, MESSAGE);
    }

    #[test]
    fn prepare_keeps_overrides() {
        let ctx = TlsContext::new(Config::default());
        let mut fragment = DtlsFragment::new(FragmentSlice {
            message_type: HandshakeType::ServerHello,
            message_seq: 1,
            offset: 4,
            total_length: 10,
            payload: vec![0xAA, 0xBB, 0xCC],
        });
        fragment.fragment_offset.set_override(0);
        fragment.prepare(&ctx).unwrap();

        let mut serialized = Vec::new();
        fragment.serialize(&mut serialized).unwrap();
        assert_eq!(&serialized[6..9], &[0, 0, 0]);
        assert_eq!(&serialized[9..12], &[0, 0, 3]);
    }
}
