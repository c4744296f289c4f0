use nom::number::complete::be_u16;
use nom::IResult;

use super::HashAlgorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum CipherSuite {
    NULL_WITH_NULL_NULL,
    RSA_AES128_CBC_SHA,
    DHE_DSS_AES128_CBC_SHA,
    DHE_RSA_AES128_CBC_SHA,
    DH_ANON_AES128_CBC_SHA,
    RSA_AES256_CBC_SHA,
    RSA_AES128_CBC_SHA256,
    PSK_AES128_CBC_SHA,
    DHE_PSK_AES128_CBC_SHA,
    RSA_PSK_AES128_CBC_SHA,
    RSA_AES128_GCM_SHA256,
    ECDH_ECDSA_AES128_CBC_SHA,
    ECDHE_ECDSA_AES128_CBC_SHA,
    ECDH_RSA_AES128_CBC_SHA,
    ECDHE_RSA_AES128_CBC_SHA,
    ECDH_ANON_AES128_CBC_SHA,
    ECDHE_ECDSA_AES128_GCM_SHA256,
    ECDHE_RSA_AES128_GCM_SHA256,
    ECDHE_RSA_AES256_GCM_SHA384,
    ECDHE_PSK_AES128_CBC_SHA,
    TLS13_AES128_GCM_SHA256,
    TLS13_AES256_GCM_SHA384,
    Unknown(u16),
}

impl Default for CipherSuite {
    fn default() -> Self {
        Self::Unknown(0xFFFF)
    }
}

impl CipherSuite {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => CipherSuite::NULL_WITH_NULL_NULL,
            0x002F => CipherSuite::RSA_AES128_CBC_SHA,
            0x0032 => CipherSuite::DHE_DSS_AES128_CBC_SHA,
            0x0033 => CipherSuite::DHE_RSA_AES128_CBC_SHA,
            0x0034 => CipherSuite::DH_ANON_AES128_CBC_SHA,
            0x0035 => CipherSuite::RSA_AES256_CBC_SHA,
            0x003C => CipherSuite::RSA_AES128_CBC_SHA256,
            0x008C => CipherSuite::PSK_AES128_CBC_SHA,
            0x0090 => CipherSuite::DHE_PSK_AES128_CBC_SHA,
            0x0094 => CipherSuite::RSA_PSK_AES128_CBC_SHA,
            0x009C => CipherSuite::RSA_AES128_GCM_SHA256,
            0xC004 => CipherSuite::ECDH_ECDSA_AES128_CBC_SHA,
            0xC009 => CipherSuite::ECDHE_ECDSA_AES128_CBC_SHA,
            0xC00E => CipherSuite::ECDH_RSA_AES128_CBC_SHA,
            0xC013 => CipherSuite::ECDHE_RSA_AES128_CBC_SHA,
            0xC018 => CipherSuite::ECDH_ANON_AES128_CBC_SHA,
            0xC02B => CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
            0xC02F => CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
            0xC030 => CipherSuite::ECDHE_RSA_AES256_GCM_SHA384,
            0xC035 => CipherSuite::ECDHE_PSK_AES128_CBC_SHA,
            0x1301 => CipherSuite::TLS13_AES128_GCM_SHA256,
            0x1302 => CipherSuite::TLS13_AES256_GCM_SHA384,
            _ => CipherSuite::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CipherSuite::NULL_WITH_NULL_NULL => 0x0000,
            CipherSuite::RSA_AES128_CBC_SHA => 0x002F,
            CipherSuite::DHE_DSS_AES128_CBC_SHA => 0x0032,
            CipherSuite::DHE_RSA_AES128_CBC_SHA => 0x0033,
            CipherSuite::DH_ANON_AES128_CBC_SHA => 0x0034,
            CipherSuite::RSA_AES256_CBC_SHA => 0x0035,
            CipherSuite::RSA_AES128_CBC_SHA256 => 0x003C,
            CipherSuite::PSK_AES128_CBC_SHA => 0x008C,
            CipherSuite::DHE_PSK_AES128_CBC_SHA => 0x0090,
            CipherSuite::RSA_PSK_AES128_CBC_SHA => 0x0094,
            CipherSuite::RSA_AES128_GCM_SHA256 => 0x009C,
            CipherSuite::ECDH_ECDSA_AES128_CBC_SHA => 0xC004,
            CipherSuite::ECDHE_ECDSA_AES128_CBC_SHA => 0xC009,
            CipherSuite::ECDH_RSA_AES128_CBC_SHA => 0xC00E,
            CipherSuite::ECDHE_RSA_AES128_CBC_SHA => 0xC013,
            CipherSuite::ECDH_ANON_AES128_CBC_SHA => 0xC018,
            CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256 => 0xC02B,
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256 => 0xC02F,
            CipherSuite::ECDHE_RSA_AES256_GCM_SHA384 => 0xC030,
            CipherSuite::ECDHE_PSK_AES128_CBC_SHA => 0xC035,
            CipherSuite::TLS13_AES128_GCM_SHA256 => 0x1301,
            CipherSuite::TLS13_AES256_GCM_SHA384 => 0x1302,
            CipherSuite::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CipherSuite> {
        let (input, value) = be_u16(input)?;
        Ok((input, CipherSuite::from_u16(value)))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.as_u16().to_be_bytes());
    }

    pub fn key_exchange_algorithm(&self) -> KeyExchangeAlgorithm {
        use CipherSuite::*;
        match self {
            NULL_WITH_NULL_NULL => KeyExchangeAlgorithm::Null,
            RSA_AES128_CBC_SHA | RSA_AES256_CBC_SHA | RSA_AES128_CBC_SHA256
            | RSA_AES128_GCM_SHA256 => KeyExchangeAlgorithm::Rsa,
            DHE_DSS_AES128_CBC_SHA => KeyExchangeAlgorithm::DheDss,
            DHE_RSA_AES128_CBC_SHA => KeyExchangeAlgorithm::DheRsa,
            DH_ANON_AES128_CBC_SHA => KeyExchangeAlgorithm::DhAnon,
            PSK_AES128_CBC_SHA => KeyExchangeAlgorithm::Psk,
            DHE_PSK_AES128_CBC_SHA => KeyExchangeAlgorithm::DhePsk,
            RSA_PSK_AES128_CBC_SHA => KeyExchangeAlgorithm::RsaPsk,
            ECDH_ECDSA_AES128_CBC_SHA => KeyExchangeAlgorithm::EcdhEcdsa,
            ECDHE_ECDSA_AES128_CBC_SHA | ECDHE_ECDSA_AES128_GCM_SHA256 => {
                KeyExchangeAlgorithm::EcdheEcdsa
            }
            ECDH_RSA_AES128_CBC_SHA => KeyExchangeAlgorithm::EcdhRsa,
            ECDHE_RSA_AES128_CBC_SHA | ECDHE_RSA_AES128_GCM_SHA256
            | ECDHE_RSA_AES256_GCM_SHA384 => KeyExchangeAlgorithm::EcdheRsa,
            ECDH_ANON_AES128_CBC_SHA => KeyExchangeAlgorithm::EcdhAnon,
            ECDHE_PSK_AES128_CBC_SHA => KeyExchangeAlgorithm::EcdhePsk,
            TLS13_AES128_GCM_SHA256 | TLS13_AES256_GCM_SHA384 => KeyExchangeAlgorithm::Tls13,
            Unknown(_) => KeyExchangeAlgorithm::Unknown,
        }
    }

    /// Hash driving the TLS 1.2 PRF for this suite.
    pub fn prf_hash(&self) -> HashAlgorithm {
        match self {
            CipherSuite::ECDHE_RSA_AES256_GCM_SHA384 | CipherSuite::TLS13_AES256_GCM_SHA384 => {
                HashAlgorithm::SHA384
            }
            _ => HashAlgorithm::SHA256,
        }
    }
}

/// Key exchange family of a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyExchangeAlgorithm {
    Null,
    Rsa,
    DheDss,
    DheRsa,
    DhAnon,
    Psk,
    DhePsk,
    RsaPsk,
    EcdhEcdsa,
    EcdheEcdsa,
    EcdhRsa,
    EcdheRsa,
    EcdhAnon,
    EcdhePsk,
    Tls13,
    Unknown,
}

impl KeyExchangeAlgorithm {
    /// Family name. Legacy signing picks its primitive by substring match on
    /// this, so `ECDH_RSA` counts as an RSA family.
    pub fn name(&self) -> &'static str {
        match self {
            KeyExchangeAlgorithm::Null => "NULL",
            KeyExchangeAlgorithm::Rsa => "RSA",
            KeyExchangeAlgorithm::DheDss => "DHE_DSS",
            KeyExchangeAlgorithm::DheRsa => "DHE_RSA",
            KeyExchangeAlgorithm::DhAnon => "DH_ANON",
            KeyExchangeAlgorithm::Psk => "PSK",
            KeyExchangeAlgorithm::DhePsk => "DHE_PSK",
            KeyExchangeAlgorithm::RsaPsk => "RSA_PSK",
            KeyExchangeAlgorithm::EcdhEcdsa => "ECDH_ECDSA",
            KeyExchangeAlgorithm::EcdheEcdsa => "ECDHE_ECDSA",
            KeyExchangeAlgorithm::EcdhRsa => "ECDH_RSA",
            KeyExchangeAlgorithm::EcdheRsa => "ECDHE_RSA",
            KeyExchangeAlgorithm::EcdhAnon => "ECDH_ANON",
            KeyExchangeAlgorithm::EcdhePsk => "ECDHE_PSK",
            KeyExchangeAlgorithm::Tls13 => "TLS13",
            KeyExchangeAlgorithm::Unknown => "UNKNOWN",
        }
    }

    pub fn is_psk(&self) -> bool {
        matches!(
            self,
            KeyExchangeAlgorithm::Psk
                | KeyExchangeAlgorithm::DhePsk
                | KeyExchangeAlgorithm::RsaPsk
                | KeyExchangeAlgorithm::EcdhePsk
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_suite_survives() {
        let suite = CipherSuite::from_u16(0x1234);
        assert_eq!(suite, CipherSuite::Unknown(0x1234));
        assert_eq!(suite.as_u16(), 0x1234);
        assert_eq!(suite.key_exchange_algorithm(), KeyExchangeAlgorithm::Unknown);
    }

    #[test]
    fn family_names() {
        assert!(CipherSuite::ECDH_RSA_AES128_CBC_SHA
            .key_exchange_algorithm()
            .name()
            .contains("RSA"));
        assert!(CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256
            .key_exchange_algorithm()
            .name()
            .contains("ECDSA"));
        let dss = CipherSuite::DHE_DSS_AES128_CBC_SHA.key_exchange_algorithm();
        assert!(!dss.name().contains("RSA") && !dss.name().contains("ECDSA"));
    }
}
