use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::IResult;

use super::{Field, Message, ParseContext};
use crate::context::TlsContext;
use crate::types::ProtocolVersion;
use crate::util::len_u8;
use crate::Error;

const GENERATED_COOKIE_LENGTH: usize = 20;

/// DTLS HelloVerifyRequest (RFC 6347 4.2.1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloVerifyRequest {
    pub protocol_version: Field<ProtocolVersion>,
    pub cookie_length: Field<u8>,
    pub cookie: Field<Vec<u8>>,
}

impl HelloVerifyRequest {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Message for HelloVerifyRequest {
    fn parse<'a>(input: &'a [u8], _ctx: &ParseContext) -> IResult<&'a [u8], HelloVerifyRequest> {
        let (input, protocol_version) = ProtocolVersion::parse(input)?;
        let (input, cookie_length) = be_u8(input)?;
        let (input, cookie) = take(cookie_length)(input)?;

        Ok((
            input,
            HelloVerifyRequest {
                protocol_version: Field::Value(protocol_version),
                cookie_length: Field::Value(cookie_length),
                cookie: Field::Value(cookie.to_vec()),
            },
        ))
    }

    fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error> {
        self.protocol_version
            .prepare_with(|| ctx.selected_protocol_version().legacy_version());
        self.cookie.prepare_with(|| {
            let cookie = ctx.dtls_cookie();
            if cookie.is_empty() {
                ctx.rng().random_bytes(GENERATED_COOKIE_LENGTH)
            } else {
                cookie.to_vec()
            }
        });
        let cookie = self.cookie.require("cookie")?;
        self.cookie_length
            .try_prepare_with(|| len_u8("cookie length", cookie.len()))
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        self.protocol_version
            .require("server version")?
            .serialize(output);
        output.push(*self.cookie_length.require("cookie length")?);
        output.extend_from_slice(self.cookie.require("cookie")?);
        Ok(())
    }

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        ctx.set_dtls_cookie(self.cookie.require("cookie")?.clone());
        Ok(())
    }

    fn reset(&mut self) {
        self.protocol_version.reset();
        self.cookie_length.reset();
        self.cookie.reset();
    }
}
