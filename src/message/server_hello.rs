use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::IResult;

use super::extension::{
    adjust_extensions, parse_extension_block, prepare_extension_block, serialize_extension_block,
};
use super::{Extension, Field, Message, ParseContext};
use crate::context::TlsContext;
use crate::types::{CipherSuite, CompressionMethod, ProtocolVersion};
use crate::util::{len_u8, parse_random};
use crate::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerHello {
    pub protocol_version: Field<ProtocolVersion>,
    pub random: Field<[u8; 32]>,
    pub session_id_length: Field<u8>,
    pub session_id: Field<Vec<u8>>,
    pub cipher_suite: Field<CipherSuite>,
    pub compression_method: Field<CompressionMethod>,
    pub extensions_length: Field<Option<u16>>,
    pub extensions: Vec<Extension>,
}

impl ServerHello {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hello answering with the selected version in supported_versions.
    pub fn with_supported_versions() -> Self {
        ServerHello {
            extensions: vec![Extension::supported_versions()],
            ..Default::default()
        }
    }

    fn select_version(ctx: &TlsContext) -> ProtocolVersion {
        let client = ctx.highest_client_protocol_version();
        let ours = ctx.config().highest_protocol_version();
        let version = if client.compare(&ours).is_le() {
            client
        } else {
            ours
        };
        version.legacy_version()
    }

    fn select_cipher_suite(ctx: &TlsContext) -> CipherSuite {
        let supported = ctx.config().default_server_supported_cipher_suites();
        ctx.client_cipher_suites()
            .iter()
            .find(|s| supported.contains(s))
            .copied()
            .unwrap_or_else(|| {
                debug!("No shared cipher suite, using {:?}", ctx.selected_cipher_suite());
                ctx.selected_cipher_suite()
            })
    }

    fn select_compression_method(ctx: &TlsContext) -> CompressionMethod {
        let supported = ctx.config().default_server_supported_compression_methods();
        ctx.client_compression_methods()
            .iter()
            .find(|m| supported.contains(m))
            .copied()
            .unwrap_or_else(|| ctx.selected_compression_method())
    }
}

impl Message for ServerHello {
    fn parse<'a>(input: &'a [u8], ctx: &ParseContext) -> IResult<&'a [u8], ServerHello> {
        let (input, protocol_version) = ProtocolVersion::parse(input)?;
        let (input, random) = parse_random(input)?;
        let (input, session_id_length) = be_u8(input)?;
        let (input, session_id) = take(session_id_length)(input)?;
        let (input, cipher_suite) = CipherSuite::parse(input)?;
        let (input, compression_method) = CompressionMethod::parse(input)?;
        let (input, (extensions_length, extensions)) = parse_extension_block(input, ctx)?;

        Ok((
            input,
            ServerHello {
                protocol_version: Field::Value(protocol_version),
                random: Field::Value(random),
                session_id_length: Field::Value(session_id_length),
                session_id: Field::Value(session_id.to_vec()),
                cipher_suite: Field::Value(cipher_suite),
                compression_method: Field::Value(compression_method),
                extensions_length,
                extensions,
            },
        ))
    }

    fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error> {
        let config = ctx.config();

        self.protocol_version
            .prepare_with(|| Self::select_version(ctx));
        let version = *self.protocol_version.require("server version")?;

        self.random.prepare_with(|| {
            if config.use_fresh_random() {
                let mut random = [0; 32];
                random.copy_from_slice(&ctx.rng().random_bytes(32));
                random
            } else {
                *config.default_server_random()
            }
        });

        self.session_id.prepare_with(|| ctx.session_id().to_vec());
        let session_id = self.session_id.require("session id")?;
        self.session_id_length
            .try_prepare_with(|| len_u8("session id length", session_id.len()))?;

        self.cipher_suite
            .prepare_with(|| Self::select_cipher_suite(ctx));
        self.compression_method
            .prepare_with(|| Self::select_compression_method(ctx));

        prepare_extension_block(&mut self.extensions_length, &mut self.extensions, version, ctx)
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        self.protocol_version
            .require("server version")?
            .serialize(output);
        output.extend_from_slice(self.random.require("server random")?);
        output.push(*self.session_id_length.require("session id length")?);
        output.extend_from_slice(self.session_id.require("session id")?);
        self.cipher_suite.require("cipher suite")?.serialize(output);
        self.compression_method
            .require("compression method")?
            .serialize(output);
        serialize_extension_block(&self.extensions_length, &self.extensions, output)
    }

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        ctx.set_selected_protocol_version(*self.protocol_version.require("server version")?);
        ctx.set_selected_cipher_suite(*self.cipher_suite.require("cipher suite")?);
        ctx.set_selected_compression_method(
            *self.compression_method.require("compression method")?,
        );
        ctx.set_server_random(*self.random.require("server random")?);
        let session_id = self.session_id.require("session id")?;
        let resuming = !session_id.is_empty()
            && ctx.sessions().iter().any(|s| s.session_id() == session_id.as_slice());
        if resuming {
            debug!("ServerHello resumes a stored session");
        }
        ctx.set_resuming(resuming);
        ctx.set_session_id(session_id.clone());
        // supported_versions may still replace the legacy version
        adjust_extensions(&self.extensions, ctx)
    }

    fn reset(&mut self) {
        self.protocol_version.reset();
        self.random.reset();
        self.session_id_length.reset();
        self.session_id.reset();
        self.cipher_suite.reset();
        self.compression_method.reset();
        self.extensions_length.reset();
        for extension in &mut self.extensions {
            extension.reset();
        }
    }
}
