mod alert;
mod change_cipher_spec;
mod client_hello;
mod error;
mod extension;
mod extensions;
mod field;
mod fragment;
mod handshake;
mod hello_verify_request;
mod parse_context;
mod psk_client_key_exchange;
mod server_hello;
mod server_key_exchange;

pub use alert::AlertMessage;
pub use change_cipher_spec::ChangeCipherSpecMessage;
pub use client_hello::ClientHello;
pub use error::ParseError;
pub use extension::{Extension, ExtensionData};
pub use extensions::supported_versions::SupportedVersionsExtension;
pub use field::{Content, Field};
pub use fragment::{DtlsFragment, FragmentSlice};
pub use handshake::{HandshakeBody, HandshakeMessage, HelloRequest, ServerHelloDone};
pub use hello_verify_request::HelloVerifyRequest;
pub use parse_context::ParseContext;
pub use psk_client_key_exchange::PskClientKeyExchange;
pub use server_hello::ServerHello;
pub use server_key_exchange::{EcdheServerKeyExchange, NAMED_CURVE};

use nom::bytes::complete::take;
use nom::IResult;

use crate::context::TlsContext;
use crate::types::ContentType;
use crate::Error;

/// One message kind of the pipeline.
///
/// `prepare` only fills unset fields, so it can run repeatedly and never
/// replaces an override. `adjust_context` is the single place a message
/// changes the connection state.
pub trait Message: Sized {
    fn parse<'a>(input: &'a [u8], ctx: &ParseContext) -> IResult<&'a [u8], Self>;

    fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error>;

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error>;

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error>;

    /// Safe default applied when `adjust_context` fails with
    /// [`Error::Adjustment`].
    fn recover(&self, _ctx: &mut TlsContext) {}

    /// Clear computed fields so the message can be prepared against new
    /// state. Overrides stay.
    fn reset(&mut self);
}

/// Anything carried directly in a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMessage {
    Handshake(HandshakeMessage),
    Alert(AlertMessage),
    ChangeCipherSpec(ChangeCipherSpecMessage),
    /// Content types without a structured model, such as application data.
    Raw {
        content_type: ContentType,
        data: Vec<u8>,
    },
}

impl ProtocolMessage {
    pub fn content_type(&self) -> ContentType {
        match self {
            ProtocolMessage::Handshake(_) => ContentType::Handshake,
            ProtocolMessage::Alert(_) => ContentType::Alert,
            ProtocolMessage::ChangeCipherSpec(_) => ContentType::ChangeCipherSpec,
            ProtocolMessage::Raw { content_type, .. } => *content_type,
        }
    }

    pub fn parse<'a>(
        content_type: ContentType,
        input: &'a [u8],
        ctx: &ParseContext,
    ) -> IResult<&'a [u8], ProtocolMessage> {
        match content_type {
            ContentType::Handshake => {
                let (rest, m) = HandshakeMessage::parse(input, ctx)?;
                Ok((rest, ProtocolMessage::Handshake(m)))
            }
            ContentType::Alert => {
                let (rest, m) = AlertMessage::parse(input, ctx)?;
                Ok((rest, ProtocolMessage::Alert(m)))
            }
            ContentType::ChangeCipherSpec => {
                let (rest, m) = ChangeCipherSpecMessage::parse(input, ctx)?;
                Ok((rest, ProtocolMessage::ChangeCipherSpec(m)))
            }
            _ => {
                let (rest, data) = take(input.len())(input)?;
                Ok((
                    rest,
                    ProtocolMessage::Raw {
                        content_type,
                        data: data.to_vec(),
                    },
                ))
            }
        }
    }

    /// Whether the handler runs the state transition for this message.
    pub fn adjusts_context(&self) -> bool {
        match self {
            ProtocolMessage::Handshake(m) => m.adjust_context,
            ProtocolMessage::Alert(m) => m.adjust_context,
            ProtocolMessage::ChangeCipherSpec(m) => m.adjust_context,
            ProtocolMessage::Raw { .. } => false,
        }
    }

    pub fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error> {
        match self {
            ProtocolMessage::Handshake(m) => m.prepare(ctx),
            ProtocolMessage::Alert(m) => m.prepare(ctx),
            ProtocolMessage::ChangeCipherSpec(m) => m.prepare(ctx),
            ProtocolMessage::Raw { .. } => Ok(()),
        }
    }

    pub fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        match self {
            ProtocolMessage::Handshake(m) => m.serialize(output),
            ProtocolMessage::Alert(m) => m.serialize(output),
            ProtocolMessage::ChangeCipherSpec(m) => m.serialize(output),
            ProtocolMessage::Raw { data, .. } => {
                output.extend_from_slice(data);
                Ok(())
            }
        }
    }

    pub fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        match self {
            ProtocolMessage::Handshake(m) => m.adjust_context(ctx),
            ProtocolMessage::Alert(m) => m.adjust_context(ctx),
            ProtocolMessage::ChangeCipherSpec(m) => m.adjust_context(ctx),
            ProtocolMessage::Raw { .. } => Ok(()),
        }
    }

    pub fn recover(&self, ctx: &mut TlsContext) {
        match self {
            ProtocolMessage::Handshake(m) => m.recover(ctx),
            ProtocolMessage::Alert(m) => m.recover(ctx),
            ProtocolMessage::ChangeCipherSpec(m) => m.recover(ctx),
            ProtocolMessage::Raw { .. } => {}
        }
    }

    pub fn reset(&mut self) {
        match self {
            ProtocolMessage::Handshake(m) => m.reset(),
            ProtocolMessage::Alert(m) => m.reset(),
            ProtocolMessage::ChangeCipherSpec(m) => m.reset(),
            ProtocolMessage::Raw { .. } => {}
        }
    }
}

impl From<HandshakeMessage> for ProtocolMessage {
    fn from(m: HandshakeMessage) -> Self {
        ProtocolMessage::Handshake(m)
    }
}

impl From<AlertMessage> for ProtocolMessage {
    fn from(m: AlertMessage) -> Self {
        ProtocolMessage::Alert(m)
    }
}

impl From<ChangeCipherSpecMessage> for ProtocolMessage {
    fn from(m: ChangeCipherSpecMessage) -> Self {
        ProtocolMessage::ChangeCipherSpec(m)
    }
}
