use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use super::{Field, Message, ParseContext};
use crate::context::TlsContext;
use crate::crypto::generate_signature;
use crate::types::{
    HashAlgorithm, KeyExchangeAlgorithm, NamedGroup, SignatureAlgorithm,
    SignatureAndHashAlgorithm,
};
use crate::util::{len_u16, len_u8};
use crate::Error;

/// ECCurveType named_curve (RFC 4492 5.4).
pub const NAMED_CURVE: u8 = 3;

/// ECDHE ServerKeyExchange with signed parameters.
///
/// The signature covers `client_random || server_random || params`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EcdheServerKeyExchange {
    pub curve_type: Field<u8>,
    pub named_group: Field<NamedGroup>,
    pub public_key_length: Field<u8>,
    pub public_key: Field<Vec<u8>>,
    /// Present from TLS 1.2 and DTLS 1.2 on.
    pub signature_and_hash_algorithm: Field<Option<SignatureAndHashAlgorithm>>,
    pub signature_length: Field<u16>,
    pub signature: Field<Vec<u8>>,
}

impl EcdheServerKeyExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// `curve_type | named_group | public_key_length | public_key`
    pub fn serialize_params(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        output.push(*self.curve_type.require("curve type")?);
        output.extend_from_slice(&self.named_group.require("named group")?.as_u16().to_be_bytes());
        output.push(*self.public_key_length.require("public key length")?);
        output.extend_from_slice(self.public_key.require("public key")?);
        Ok(())
    }

    fn signed_data(&self, ctx: &TlsContext) -> Result<Vec<u8>, Error> {
        let mut data = Vec::with_capacity(64 + 4 + 133);
        data.extend_from_slice(ctx.client_random());
        data.extend_from_slice(ctx.server_random());
        self.serialize_params(&mut data)?;
        Ok(data)
    }
}

/// Signature family implied by the key exchange when no algorithm is
/// negotiated.
fn legacy_signature_algorithm(kx: KeyExchangeAlgorithm) -> SignatureAlgorithm {
    let name = kx.name();
    if name.contains("ECDSA") {
        SignatureAlgorithm::ECDSA
    } else if name.contains("RSA") {
        SignatureAlgorithm::RSA
    } else if name.contains("DSS") {
        SignatureAlgorithm::DSA
    } else {
        SignatureAlgorithm::Anonymous
    }
}

impl Message for EcdheServerKeyExchange {
    fn parse<'a>(input: &'a [u8], ctx: &ParseContext) -> IResult<&'a [u8], EcdheServerKeyExchange> {
        let (input, curve_type) = be_u8(input)?;
        let (input, named_group) = NamedGroup::parse(input)?;
        let (input, public_key_length) = be_u8(input)?;
        let (input, public_key) = take(public_key_length)(input)?;

        let (input, signature_and_hash_algorithm) =
            if ctx.version.has_signature_and_hash_algorithm() {
                let (input, alg) = SignatureAndHashAlgorithm::parse(input)?;
                (input, Some(alg))
            } else {
                (input, None)
            };

        let (input, signature_length) = be_u16(input)?;
        let (input, signature) = take(signature_length)(input)?;

        Ok((
            input,
            EcdheServerKeyExchange {
                curve_type: Field::Value(curve_type),
                named_group: Field::Value(named_group),
                public_key_length: Field::Value(public_key_length),
                public_key: Field::Value(public_key.to_vec()),
                signature_and_hash_algorithm: Field::Value(signature_and_hash_algorithm),
                signature_length: Field::Value(signature_length),
                signature: Field::Value(signature.to_vec()),
            },
        ))
    }

    fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error> {
        self.curve_type.prepare_with(|| NAMED_CURVE);
        self.named_group
            .prepare_with(|| ctx.selected_named_group());
        self.public_key
            .prepare_with(|| ctx.server_ec_public_key().to_vec());
        let public_key = self.public_key.require("public key")?;
        self.public_key_length
            .try_prepare_with(|| len_u8("public key length", public_key.len()))?;

        let version = ctx.selected_protocol_version();
        self.signature_and_hash_algorithm.prepare_with(|| {
            if version.has_signature_and_hash_algorithm() {
                Some(ctx.selected_signature_and_hash_algorithm())
            } else {
                None
            }
        });

        if !self.signature.is_set() {
            let algorithm = match self.signature_and_hash_algorithm.require("signature algorithm")? {
                Some(algorithm) => *algorithm,
                None => SignatureAndHashAlgorithm::new(
                    HashAlgorithm::SHA1,
                    legacy_signature_algorithm(ctx.selected_cipher_suite().key_exchange_algorithm()),
                ),
            };
            let data = self.signed_data(ctx)?;
            self.signature = Field::Value(generate_signature(algorithm, ctx, &data)?);
        }
        let signature = self.signature.require("signature")?;
        self.signature_length
            .try_prepare_with(|| len_u16("signature length", signature.len()))
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        self.serialize_params(output)?;
        if let Some(algorithm) = self
            .signature_and_hash_algorithm
            .require("signature algorithm")?
        {
            algorithm.serialize(output);
        }
        output.extend_from_slice(&self.signature_length.require("signature length")?.to_be_bytes());
        output.extend_from_slice(self.signature.require("signature")?);
        Ok(())
    }

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        ctx.set_selected_named_group(*self.named_group.require("named group")?);
        ctx.set_server_ec_public_key(self.public_key.require("public key")?.clone());
        if let Some(Some(algorithm)) = self.signature_and_hash_algorithm.get() {
            ctx.set_selected_signature_and_hash_algorithm(*algorithm);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.curve_type.reset();
        self.named_group.reset();
        self.public_key_length.reset();
        self.public_key.reset();
        self.signature_and_hash_algorithm.reset();
        self.signature_length.reset();
        self.signature.reset();
    }
}
