use nom::bytes::complete::take;
use nom::error::{Error as NomError, ErrorKind};
use nom::number::complete::be_u24;
use nom::IResult;

use super::{
    ClientHello, Content, EcdheServerKeyExchange, Field, HelloVerifyRequest, Message,
    ParseContext, PskClientKeyExchange, ServerHello,
};
use crate::context::TlsContext;
use crate::types::{HandshakeType, KeyExchangeAlgorithm};
use crate::util::{len_u24, put_u24};
use crate::Error;

/// A handshake message: `type(1) | length(3) | body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessage {
    pub msg_type: Field<HandshakeType>,
    pub length: Field<u32>,
    pub body: Content<HandshakeBody>,
    /// Run the state transition when this message is handled.
    pub adjust_context: bool,
}

impl HandshakeMessage {
    pub fn new(body: HandshakeBody) -> Self {
        HandshakeMessage {
            msg_type: Field::Unset,
            length: Field::Unset,
            body: Content::Fields(body),
            adjust_context: true,
        }
    }

    /// A message whose body is emitted verbatim.
    pub fn passthrough(msg_type: HandshakeType, body: Vec<u8>) -> Self {
        HandshakeMessage {
            msg_type: Field::Value(msg_type),
            length: Field::Unset,
            body: Content::Passthrough(body),
            adjust_context: true,
        }
    }

    /// Decode a body whose type and extent are already known, as after DTLS
    /// reassembly.
    pub fn from_body<'a>(
        msg_type: HandshakeType,
        body: &'a [u8],
        ctx: &ParseContext,
    ) -> IResult<&'a [u8], HandshakeMessage> {
        let length = body.len() as u32;
        let (rest, body) = HandshakeBody::parse(msg_type, body, ctx)?;
        Ok((
            rest,
            HandshakeMessage {
                msg_type: Field::Value(msg_type),
                length: Field::Value(length),
                body,
                adjust_context: true,
            },
        ))
    }

    pub fn handshake_type(&self) -> Option<HandshakeType> {
        self.msg_type.value().or_else(|| match &self.body {
            Content::Fields(b) => Some(b.msg_type()),
            Content::Passthrough(_) => None,
        })
    }

    /// Body bytes without the handshake header.
    pub fn serialize_body(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        match &self.body {
            Content::Passthrough(bytes) => {
                output.extend_from_slice(bytes);
                Ok(())
            }
            Content::Fields(body) => body.serialize(output),
        }
    }
}

impl Message for HandshakeMessage {
    fn parse<'a>(input: &'a [u8], ctx: &ParseContext) -> IResult<&'a [u8], HandshakeMessage> {
        let (input, msg_type) = HandshakeType::parse(input)?;
        let (input, length) = be_u24(input)?;
        let (input, body) = take(length as usize)(input)?;
        let (_, body) = HandshakeBody::parse(msg_type, body, ctx)?;

        Ok((
            input,
            HandshakeMessage {
                msg_type: Field::Value(msg_type),
                length: Field::Value(length),
                body,
                adjust_context: true,
            },
        ))
    }

    fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error> {
        if let Content::Fields(body) = &mut self.body {
            body.prepare(ctx)?;
            let msg_type = body.msg_type();
            self.msg_type.prepare_with(|| msg_type);
        }
        if !self.length.is_set() {
            let mut body = Vec::new();
            self.serialize_body(&mut body)?;
            self.length = Field::Value(len_u24("handshake length", body.len())?);
        }
        Ok(())
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        let msg_type = self.msg_type.require("handshake type")?;
        let length = self.length.require("handshake length")?;
        output.push(msg_type.as_u8());
        put_u24(output, *length);
        self.serialize_body(output)
    }

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        match &self.body {
            Content::Fields(body) => body.adjust_context(ctx),
            Content::Passthrough(_) => {
                debug!("No state transition for passthrough {:?}", self.msg_type);
                Ok(())
            }
        }
    }

    fn recover(&self, ctx: &mut TlsContext) {
        if let Content::Fields(body) = &self.body {
            body.recover(ctx);
        }
    }

    fn reset(&mut self) {
        self.msg_type.reset();
        self.length.reset();
        if let Content::Fields(body) = &mut self.body {
            body.reset();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeBody {
    HelloRequest(HelloRequest),
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    HelloVerifyRequest(HelloVerifyRequest),
    ServerKeyExchange(EcdheServerKeyExchange),
    ServerHelloDone(ServerHelloDone),
    PskClientKeyExchange(PskClientKeyExchange),
}

macro_rules! dispatch {
    ($self:expr, $m:ident => $e:expr) => {
        match $self {
            HandshakeBody::HelloRequest($m) => $e,
            HandshakeBody::ClientHello($m) => $e,
            HandshakeBody::ServerHello($m) => $e,
            HandshakeBody::HelloVerifyRequest($m) => $e,
            HandshakeBody::ServerKeyExchange($m) => $e,
            HandshakeBody::ServerHelloDone($m) => $e,
            HandshakeBody::PskClientKeyExchange($m) => $e,
        }
    };
}

impl HandshakeBody {
    pub fn msg_type(&self) -> HandshakeType {
        match self {
            HandshakeBody::HelloRequest(_) => HandshakeType::HelloRequest,
            HandshakeBody::ClientHello(_) => HandshakeType::ClientHello,
            HandshakeBody::ServerHello(_) => HandshakeType::ServerHello,
            HandshakeBody::HelloVerifyRequest(_) => HandshakeType::HelloVerifyRequest,
            HandshakeBody::ServerKeyExchange(_) => HandshakeType::ServerKeyExchange,
            HandshakeBody::ServerHelloDone(_) => HandshakeType::ServerHelloDone,
            HandshakeBody::PskClientKeyExchange(_) => HandshakeType::ClientKeyExchange,
        }
    }

    /// Decode a body that must span all of `input`. Kinds without a model
    /// for the negotiated key exchange become passthrough content.
    pub fn parse<'a>(
        msg_type: HandshakeType,
        input: &'a [u8],
        ctx: &ParseContext,
    ) -> IResult<&'a [u8], Content<HandshakeBody>> {
        let kx = ctx.cipher_suite.key_exchange_algorithm();
        let body = match msg_type {
            HandshakeType::HelloRequest => {
                let (_, m) = parse_complete::<HelloRequest>(input, ctx)?;
                HandshakeBody::HelloRequest(m)
            }
            HandshakeType::ClientHello => {
                let (_, m) = parse_complete::<ClientHello>(input, ctx)?;
                HandshakeBody::ClientHello(m)
            }
            HandshakeType::ServerHello => {
                let (_, m) = parse_complete::<ServerHello>(input, ctx)?;
                HandshakeBody::ServerHello(m)
            }
            HandshakeType::HelloVerifyRequest => {
                let (_, m) = parse_complete::<HelloVerifyRequest>(input, ctx)?;
                HandshakeBody::HelloVerifyRequest(m)
            }
            HandshakeType::ServerKeyExchange
                if matches!(
                    kx,
                    KeyExchangeAlgorithm::EcdheRsa | KeyExchangeAlgorithm::EcdheEcdsa
                ) =>
            {
                let (_, m) = parse_complete::<EcdheServerKeyExchange>(input, ctx)?;
                HandshakeBody::ServerKeyExchange(m)
            }
            HandshakeType::ServerHelloDone => {
                let (_, m) = parse_complete::<ServerHelloDone>(input, ctx)?;
                HandshakeBody::ServerHelloDone(m)
            }
            HandshakeType::ClientKeyExchange if kx == KeyExchangeAlgorithm::Psk => {
                let (_, m) = parse_complete::<PskClientKeyExchange>(input, ctx)?;
                HandshakeBody::PskClientKeyExchange(m)
            }
            _ => {
                trace!("Passthrough handshake body {:?}", msg_type);
                return Ok((&input[input.len()..], Content::Passthrough(input.to_vec())));
            }
        };
        Ok((&input[input.len()..], Content::Fields(body)))
    }

    pub fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error> {
        dispatch!(self, m => m.prepare(ctx))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        dispatch!(self, m => m.serialize(output))
    }

    pub fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        dispatch!(self, m => m.adjust_context(ctx))
    }

    pub fn recover(&self, ctx: &mut TlsContext) {
        dispatch!(self, m => m.recover(ctx))
    }

    pub fn reset(&mut self) {
        dispatch!(self, m => m.reset())
    }
}

/// Run `T::parse` and require it to consume all of `input`.
fn parse_complete<'a, T: Message>(input: &'a [u8], ctx: &ParseContext) -> IResult<&'a [u8], T> {
    let (rest, m) = T::parse(input, ctx)?;
    if !rest.is_empty() {
        return Err(nom::Err::Error(NomError::new(rest, ErrorKind::LengthValue)));
    }
    Ok((rest, m))
}

/// Empty-bodied HelloRequest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloRequest;

impl Message for HelloRequest {
    fn parse<'a>(input: &'a [u8], _ctx: &ParseContext) -> IResult<&'a [u8], HelloRequest> {
        Ok((input, HelloRequest))
    }

    fn prepare(&mut self, _ctx: &TlsContext) -> Result<(), Error> {
        Ok(())
    }

    fn serialize(&self, _output: &mut Vec<u8>) -> Result<(), Error> {
        Ok(())
    }

    fn adjust_context(&self, _ctx: &mut TlsContext) -> Result<(), Error> {
        Ok(())
    }

    fn reset(&mut self) {}
}

/// Empty-bodied ServerHelloDone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerHelloDone;

impl Message for ServerHelloDone {
    fn parse<'a>(input: &'a [u8], _ctx: &ParseContext) -> IResult<&'a [u8], ServerHelloDone> {
        Ok((input, ServerHelloDone))
    }

    fn prepare(&mut self, _ctx: &TlsContext) -> Result<(), Error> {
        Ok(())
    }

    fn serialize(&self, _output: &mut Vec<u8>) -> Result<(), Error> {
        Ok(())
    }

    fn adjust_context(&self, _ctx: &mut TlsContext) -> Result<(), Error> {
        Ok(())
    }

    fn reset(&mut self) {}
}

impl From<HandshakeBody> for HandshakeMessage {
    fn from(body: HandshakeBody) -> Self {
        HandshakeMessage::new(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    const SERVER_HELLO_DONE: &[u8] = &[
        0x0E, // HandshakeType::ServerHelloDone
        0x00, 0x00, 0x00, // Length
    ];

    #[test]
    fn server_hello_done_roundtrip() {
        let ctx = TlsContext::new(Config::default());
        let mut msg = HandshakeMessage::new(HandshakeBody::ServerHelloDone(ServerHelloDone));
        msg.prepare(&ctx).unwrap();

        let mut serialized = Vec::new();
        msg.serialize(&mut serialized).unwrap();
        assert_eq!(serialized, SERVER_HELLO_DONE);

        let (rest, parsed) = HandshakeMessage::parse(&serialized, &ParseContext::default()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, msg);
    }

    #[test]
    fn unknown_type_is_passthrough() {
        let message = [0x14, 0x00, 0x00, 0x02, 0xAB, 0xCD];
        let (_, parsed) = HandshakeMessage::parse(&message, &ParseContext::default()).unwrap();
        assert_eq!(parsed.body, Content::Passthrough(vec![0xAB, 0xCD]));
        assert_eq!(parsed.handshake_type(), Some(HandshakeType::Finished));

        let mut serialized = Vec::new();
        parsed.serialize(&mut serialized).unwrap();
        assert_eq!(serialized, message);
    }

    #[test]
    fn declared_length_beyond_input() {
        let message = [0x0E, 0x00, 0x00, 0x05, 0x00];
        assert!(HandshakeMessage::parse(&message, &ParseContext::default()).is_err());
    }

    #[test]
    fn length_override_is_kept() {
        let ctx = TlsContext::new(Config::default());
        let mut msg = HandshakeMessage::new(HandshakeBody::ServerHelloDone(ServerHelloDone));
        msg.length.set_override(0x10);
        msg.prepare(&ctx).unwrap();

        let mut serialized = Vec::new();
        msg.serialize(&mut serialized).unwrap();
        assert_eq!(serialized, [0x0E, 0x00, 0x00, 0x10]);
    }
}
