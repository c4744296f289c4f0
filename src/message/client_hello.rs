use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use super::extension::{
    adjust_extensions, parse_extension_block, prepare_extension_block, serialize_extension_block,
};
use super::{Extension, Field, Message, ParseContext};
use crate::context::TlsContext;
use crate::types::{CipherSuite, CompressionMethod, ProtocolVersion};
use crate::util::{len_u16, len_u8, many_until_empty, parse_random};
use crate::Error;

/// ClientHello. The cookie exists only in DTLS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHello {
    pub protocol_version: Field<ProtocolVersion>,
    pub random: Field<[u8; 32]>,
    pub session_id_length: Field<u8>,
    pub session_id: Field<Vec<u8>>,
    pub cookie_length: Field<u8>,
    /// `Value(None)` for TLS, where the field does not exist.
    pub cookie: Field<Option<Vec<u8>>>,
    pub cipher_suites_length: Field<u16>,
    pub cipher_suites: Field<Vec<CipherSuite>>,
    pub compression_methods_length: Field<u8>,
    pub compression_methods: Field<Vec<CompressionMethod>>,
    pub extensions_length: Field<Option<u16>>,
    pub extensions: Vec<Extension>,
}

impl ClientHello {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hello offering the configured supported_versions.
    pub fn with_supported_versions() -> Self {
        ClientHello {
            extensions: vec![Extension::supported_versions()],
            ..Default::default()
        }
    }
}

impl Message for ClientHello {
    fn parse<'a>(input: &'a [u8], ctx: &ParseContext) -> IResult<&'a [u8], ClientHello> {
        let (input, protocol_version) = ProtocolVersion::parse(input)?;
        let (input, random) = parse_random(input)?;
        let (input, session_id_length) = be_u8(input)?;
        let (input, session_id) = take(session_id_length)(input)?;

        let (input, cookie_length, cookie) = if ctx.is_dtls() {
            let (input, cookie_length) = be_u8(input)?;
            let (input, cookie) = take(cookie_length)(input)?;
            (
                input,
                Field::Value(cookie_length),
                Field::Value(Some(cookie.to_vec())),
            )
        } else {
            (input, Field::Unset, Field::Value(None))
        };

        let (input, cipher_suites_length) = be_u16(input)?;
        let (input, suites) = take(cipher_suites_length)(input)?;
        let (_, cipher_suites) = many_until_empty(CipherSuite::parse)(suites)?;

        let (input, compression_methods_length) = be_u8(input)?;
        let (input, methods) = take(compression_methods_length)(input)?;
        let (_, compression_methods) = many_until_empty(CompressionMethod::parse)(methods)?;

        let (input, (extensions_length, extensions)) = parse_extension_block(input, ctx)?;

        Ok((
            input,
            ClientHello {
                protocol_version: Field::Value(protocol_version),
                random: Field::Value(random),
                session_id_length: Field::Value(session_id_length),
                session_id: Field::Value(session_id.to_vec()),
                cookie_length,
                cookie,
                cipher_suites_length: Field::Value(cipher_suites_length),
                cipher_suites: Field::Value(cipher_suites),
                compression_methods_length: Field::Value(compression_methods_length),
                compression_methods: Field::Value(compression_methods),
                extensions_length,
                extensions,
            },
        ))
    }

    fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error> {
        let config = ctx.config();

        self.protocol_version
            .prepare_with(|| config.highest_protocol_version().legacy_version());
        let version = *self.protocol_version.require("client version")?;

        self.random.prepare_with(|| {
            if config.use_fresh_random() {
                let mut random = [0; 32];
                random.copy_from_slice(&ctx.rng().random_bytes(32));
                random
            } else {
                *config.default_client_random()
            }
        });

        self.session_id.prepare_with(|| ctx.session_id().to_vec());
        let session_id = self.session_id.require("session id")?;
        self.session_id_length
            .try_prepare_with(|| len_u8("session id length", session_id.len()))?;

        self.cookie.prepare_with(|| {
            if version.is_dtls() {
                Some(ctx.dtls_cookie().to_vec())
            } else {
                None
            }
        });
        if let Some(Some(cookie)) = self.cookie.get() {
            let len = cookie.len();
            self.cookie_length
                .try_prepare_with(|| len_u8("cookie length", len))?;
        }

        self.cipher_suites
            .prepare_with(|| config.default_client_supported_cipher_suites().to_vec());
        let suites = self.cipher_suites.require("cipher suites")?;
        self.cipher_suites_length
            .try_prepare_with(|| len_u16("cipher suites length", suites.len() * 2))?;

        self.compression_methods
            .prepare_with(|| config.default_client_supported_compression_methods().to_vec());
        let methods = self.compression_methods.require("compression methods")?;
        self.compression_methods_length
            .try_prepare_with(|| len_u8("compression methods length", methods.len()))?;

        prepare_extension_block(&mut self.extensions_length, &mut self.extensions, version, ctx)
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        self.protocol_version
            .require("client version")?
            .serialize(output);
        output.extend_from_slice(self.random.require("client random")?);

        output.push(*self.session_id_length.require("session id length")?);
        output.extend_from_slice(self.session_id.require("session id")?);

        if let Some(cookie) = self.cookie.require("cookie")? {
            output.push(*self.cookie_length.require("cookie length")?);
            output.extend_from_slice(cookie);
        }

        let suites_length = self.cipher_suites_length.require("cipher suites length")?;
        output.extend_from_slice(&suites_length.to_be_bytes());
        for suite in self.cipher_suites.require("cipher suites")? {
            suite.serialize(output);
        }

        output.push(
            *self
                .compression_methods_length
                .require("compression methods length")?,
        );
        for method in self.compression_methods.require("compression methods")? {
            method.serialize(output);
        }

        serialize_extension_block(&self.extensions_length, &self.extensions, output)
    }

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        if let Some(version) = self.protocol_version.value() {
            ctx.set_highest_client_protocol_version(version);
        }
        ctx.set_client_random(*self.random.require("client random")?);
        ctx.set_session_id(self.session_id.require("session id")?.clone());
        ctx.set_client_cipher_suites(self.cipher_suites.require("cipher suites")?.clone());
        ctx.set_client_compression_methods(
            self.compression_methods
                .require("compression methods")?
                .clone(),
        );
        if let Some(Some(cookie)) = self.cookie.get() {
            if !cookie.is_empty() {
                ctx.set_dtls_cookie(cookie.clone());
            }
        }
        adjust_extensions(&self.extensions, ctx)
    }

    fn reset(&mut self) {
        self.protocol_version.reset();
        self.random.reset();
        self.session_id_length.reset();
        self.session_id.reset();
        self.cookie_length.reset();
        self.cookie.reset();
        self.cipher_suites_length.reset();
        self.cipher_suites.reset();
        self.compression_methods_length.reset();
        self.compression_methods.reset();
        self.extensions_length.reset();
        for extension in &mut self.extensions {
            extension.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionEnd;
    use crate::Config;

    const MESSAGE: &[u8] = &[
        0xFE, 0xFD, // ProtocolVersion::DTLS1_2
        // Random
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
        0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E,
        0x1F, 0x20, //
        0x01, // SessionId length
        0xAA, // SessionId
        0x02, // Cookie length
        0xBB, 0xCC, // Cookie
        0x00, 0x04, // CipherSuites length
        0xC0, 0x2B, // ECDHE_ECDSA_AES128_GCM_SHA256
        0x00, 0x2F, // RSA_AES128_CBC_SHA
        0x01, // CompressionMethods length
        0x00, // CompressionMethod::Null
        0x00, 0x05, // Extensions length
        0x00, 0x2B, 0x00, 0x01, 0xFF, // Extension with undecodable data
    ];

    #[test]
    fn dtls_roundtrip() {
        let ctx = ParseContext::new(ProtocolVersion::DTLS1_2, ConnectionEnd::Client);
        let (rest, parsed) = ClientHello::parse(MESSAGE, &ctx).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.cookie.get(), Some(&Some(vec![0xBB, 0xCC])));
        assert_eq!(parsed.cipher_suites.get().map(|s| s.len()), Some(2));

        let mut serialized = Vec::new();
        parsed.serialize(&mut serialized).unwrap();
        assert_eq!(serialized, MESSAGE);
    }

    #[test]
    fn tls_has_no_cookie() {
        let config = Config::builder().use_fresh_random(false).build().unwrap();
        let ctx = TlsContext::new(config);

        let mut hello = ClientHello::new();
        hello.prepare(&ctx).unwrap();
        assert_eq!(hello.cookie.get(), Some(&None));
        assert!(!hello.cookie_length.is_set());

        let mut serialized = Vec::new();
        hello.serialize(&mut serialized).unwrap();
        let pctx = ParseContext::new(ProtocolVersion::TLS1_2, ConnectionEnd::Client);
        let (rest, parsed) = ClientHello::parse(&serialized, &pctx).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.random.get(), Some(&[0; 32]));
        assert_eq!(parsed.extensions_length.get(), Some(&Some(0)));
    }

    #[test]
    fn override_wins_over_prepared_length() {
        let ctx = TlsContext::new(Config::default());
        let mut hello = ClientHello::new();
        hello.cipher_suites_length.set_override(0x1234);
        hello.prepare(&ctx).unwrap();

        let mut serialized = Vec::new();
        hello.serialize(&mut serialized).unwrap();
        // version(2) random(32) session id(1)
        assert_eq!(&serialized[35..37], &[0x12, 0x34]);
    }

    #[test]
    fn adjust_records_offer() {
        let pctx = ParseContext::new(ProtocolVersion::DTLS1_2, ConnectionEnd::Client);
        let (_, parsed) = ClientHello::parse(MESSAGE, &pctx).unwrap();
        let mut ctx = TlsContext::new(Config::default());
        ctx.set_talking_end(ConnectionEnd::Client);

        parsed.adjust_context(&mut ctx).unwrap();
        assert_eq!(ctx.client_random()[0], 0x01);
        assert_eq!(ctx.session_id(), &[0xAA]);
        assert_eq!(ctx.dtls_cookie(), &[0xBB, 0xCC]);
        assert_eq!(ctx.client_cipher_suites().len(), 2);
        assert_eq!(
            ctx.highest_client_protocol_version(),
            ProtocolVersion::DTLS1_2
        );
    }
}
