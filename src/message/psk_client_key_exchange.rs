use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

use super::{Field, Message, ParseContext};
use crate::context::TlsContext;
use crate::crypto::prf::calculate_master_secret;
use crate::util::len_u16;
use crate::Error;

/// Plain PSK ClientKeyExchange (RFC 4279 2): `identity_length(2) | identity`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PskClientKeyExchange {
    pub identity_length: Field<u16>,
    pub identity: Field<Vec<u8>>,
    /// Not on the wire. Computed from the configured PSK when the state
    /// transition runs, unless overridden.
    pub pre_master_secret: Field<Vec<u8>>,
}

impl PskClientKeyExchange {
    pub fn new() -> Self {
        Self::default()
    }
}

/// `uint16 N | N zero bytes | uint16 N | psk`
fn psk_pre_master_secret(psk: &[u8]) -> Vec<u8> {
    let n = (psk.len() as u16).to_be_bytes();
    let mut pms = Vec::with_capacity(4 + psk.len() * 2);
    pms.extend_from_slice(&n);
    pms.resize(2 + psk.len(), 0);
    pms.extend_from_slice(&n);
    pms.extend_from_slice(psk);
    pms
}

impl Message for PskClientKeyExchange {
    fn parse<'a>(input: &'a [u8], _ctx: &ParseContext) -> IResult<&'a [u8], PskClientKeyExchange> {
        let (input, identity_length) = be_u16(input)?;
        let (input, identity) = take(identity_length)(input)?;
        Ok((
            input,
            PskClientKeyExchange {
                identity_length: Field::Value(identity_length),
                identity: Field::Value(identity.to_vec()),
                pre_master_secret: Field::Unset,
            },
        ))
    }

    fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error> {
        self.identity
            .prepare_with(|| ctx.config().default_psk_identity().to_vec());
        let identity = self.identity.require("psk identity")?;
        self.identity_length
            .try_prepare_with(|| len_u16("psk identity length", identity.len()))
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        output.extend_from_slice(&self.identity_length.require("psk identity length")?.to_be_bytes());
        output.extend_from_slice(self.identity.require("psk identity")?);
        Ok(())
    }

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        let pre_master_secret = match self.pre_master_secret.get() {
            Some(pms) => pms.clone(),
            None => psk_pre_master_secret(ctx.config().default_psk()),
        };

        let master_secret = calculate_master_secret(
            ctx.selected_protocol_version(),
            ctx.selected_cipher_suite().prf_hash(),
            &pre_master_secret,
            ctx.client_random(),
            ctx.server_random(),
        )?;
        debug!("Derived PSK master secret");

        ctx.set_pre_master_secret(pre_master_secret);
        ctx.set_master_secret(master_secret);
        ctx.set_psk_identity(self.identity.require("psk identity")?.clone());
        ctx.spawn_session();
        Ok(())
    }

    fn reset(&mut self) {
        self.identity_length.reset();
        self.identity.reset();
        self.pre_master_secret.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CipherSuite, ProtocolVersion};
    use crate::Config;

    const MESSAGE: &[u8] = &[
        0x00, 0x04, // Identity length
        0x61, 0x62, 0x63, 0x64, // "abcd"
    ];

    #[test]
    fn roundtrip() {
        let (rest, parsed) =
            PskClientKeyExchange::parse(MESSAGE, &ParseContext::default()).unwrap();
        assert!(rest.is_empty());

        let mut serialized = Vec::new();
        parsed.serialize(&mut serialized).unwrap();
        assert_eq!(serialized, MESSAGE);
    }

    #[test]
    fn pre_master_secret_layout() {
        let pms = psk_pre_master_secret(&[0xAA, 0xBB]);
        assert_eq!(pms, [0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0xAA, 0xBB]);
    }

    #[test]
    fn adjust_spawns_session() {
        let config = Config::builder()
            .default_selected_cipher_suite(CipherSuite::PSK_AES128_CBC_SHA)
            .default_session_id(vec![7; 4])
            .build()
            .unwrap();
        let mut ctx = TlsContext::new(config);
        let (_, parsed) = PskClientKeyExchange::parse(MESSAGE, &ParseContext::default()).unwrap();

        parsed.adjust_context(&mut ctx).unwrap();
        assert_eq!(ctx.psk_identity(), b"abcd");
        assert_eq!(ctx.master_secret().map(|m| m.len()), Some(48));
        assert_eq!(ctx.sessions().len(), 1);
        assert_eq!(ctx.sessions()[0].session_id(), &[7; 4]);
    }

    #[test]
    fn ssl3_cannot_derive() {
        let config = Config::builder()
            .default_selected_protocol_version(ProtocolVersion::SSL3)
            .build()
            .unwrap();
        let mut ctx = TlsContext::new(config);
        let (_, parsed) = PskClientKeyExchange::parse(MESSAGE, &ParseContext::default()).unwrap();
        assert!(matches!(
            parsed.adjust_context(&mut ctx),
            Err(Error::UnsupportedConfiguration(_))
        ));
        assert!(ctx.sessions().is_empty());
    }
}
