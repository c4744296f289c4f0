use std::cmp::Ordering;
use std::fmt;

use nom::number::complete::be_u16;
use nom::IResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ProtocolVersion {
    SSL2,
    SSL3,
    TLS1_0,
    TLS1_1,
    TLS1_2,
    TLS1_3,
    DTLS1_0,
    DTLS1_2,
    DTLS1_3,
    Unknown(u16),
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::TLS1_2
    }
}

impl ProtocolVersion {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0002 => ProtocolVersion::SSL2,
            0x0300 => ProtocolVersion::SSL3,
            0x0301 => ProtocolVersion::TLS1_0,
            0x0302 => ProtocolVersion::TLS1_1,
            0x0303 => ProtocolVersion::TLS1_2,
            0x0304 => ProtocolVersion::TLS1_3,
            0xFEFF => ProtocolVersion::DTLS1_0,
            0xFEFD => ProtocolVersion::DTLS1_2,
            0xFEFC => ProtocolVersion::DTLS1_3,
            _ => ProtocolVersion::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ProtocolVersion::SSL2 => 0x0002,
            ProtocolVersion::SSL3 => 0x0300,
            ProtocolVersion::TLS1_0 => 0x0301,
            ProtocolVersion::TLS1_1 => 0x0302,
            ProtocolVersion::TLS1_2 => 0x0303,
            ProtocolVersion::TLS1_3 => 0x0304,
            ProtocolVersion::DTLS1_0 => 0xFEFF,
            ProtocolVersion::DTLS1_2 => 0xFEFD,
            ProtocolVersion::DTLS1_3 => 0xFEFC,
            ProtocolVersion::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ProtocolVersion> {
        let (input, version) = be_u16(input)?;
        Ok((input, ProtocolVersion::from_u16(version)))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.as_u16().to_be_bytes());
    }

    /// Decode a list of 2-byte version codes.
    ///
    /// Returns `None` if the byte count is not a multiple of 2.
    pub fn from_bytes(bytes: &[u8]) -> Option<Vec<ProtocolVersion>> {
        if bytes.len() % 2 != 0 {
            return None;
        }
        let versions = bytes
            .chunks_exact(2)
            .map(|c| ProtocolVersion::from_u16(u16::from_be_bytes([c[0], c[1]])))
            .collect();
        Some(versions)
    }

    pub fn to_bytes(versions: &[ProtocolVersion]) -> Vec<u8> {
        let mut out = Vec::with_capacity(versions.len() * 2);
        for v in versions {
            v.serialize(&mut out);
        }
        out
    }

    pub fn is_dtls(&self) -> bool {
        match self {
            ProtocolVersion::DTLS1_0 | ProtocolVersion::DTLS1_2 | ProtocolVersion::DTLS1_3 => true,
            ProtocolVersion::Unknown(v) => v >> 8 == 0xFE,
            _ => false,
        }
    }

    /// The latest protocol generation, TLS 1.3 or its datagram sibling.
    pub fn is_tls13(&self) -> bool {
        matches!(self, ProtocolVersion::TLS1_3 | ProtocolVersion::DTLS1_3)
    }

    /// SSL3, TLS 1.0 and TLS 1.1 sign with the legacy hash combinations.
    pub fn uses_legacy_signatures(&self) -> bool {
        matches!(
            self,
            ProtocolVersion::SSL3 | ProtocolVersion::TLS1_0 | ProtocolVersion::TLS1_1
        )
    }

    /// Whether a `SignatureAndHashAlgorithm` precedes digitally signed values.
    pub fn has_signature_and_hash_algorithm(&self) -> bool {
        matches!(
            self,
            ProtocolVersion::TLS1_2
                | ProtocolVersion::TLS1_3
                | ProtocolVersion::DTLS1_2
                | ProtocolVersion::DTLS1_3
        )
    }

    /// The version a TLS 1.3 endpoint writes into legacy version fields.
    pub fn legacy_version(&self) -> ProtocolVersion {
        match self {
            ProtocolVersion::TLS1_3 => ProtocolVersion::TLS1_2,
            ProtocolVersion::DTLS1_3 => ProtocolVersion::DTLS1_2,
            other => *other,
        }
    }

    /// Strength on a common TLS scale. DTLS minors are one's complement
    /// encoded, so DTLS 1.2 maps next to TLS 1.2.
    fn rank(&self) -> u16 {
        match self {
            ProtocolVersion::DTLS1_0 => 0x0302,
            ProtocolVersion::DTLS1_2 => 0x0303,
            ProtocolVersion::DTLS1_3 => 0x0304,
            other => other.as_u16(),
        }
    }

    pub fn compare(&self, other: &ProtocolVersion) -> Ordering {
        self.rank().cmp(&other.rank())
    }

    pub fn highest(versions: &[ProtocolVersion]) -> Option<ProtocolVersion> {
        versions.iter().copied().max_by(|a, b| a.compare(b))
    }

    /// Sort strongest first.
    pub fn sort_descending(versions: &mut [ProtocolVersion]) {
        versions.sort_by(|a, b| b.compare(a));
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::SSL2 => write!(f, "SSL 2.0"),
            ProtocolVersion::SSL3 => write!(f, "SSL 3.0"),
            ProtocolVersion::TLS1_0 => write!(f, "TLS 1.0"),
            ProtocolVersion::TLS1_1 => write!(f, "TLS 1.1"),
            ProtocolVersion::TLS1_2 => write!(f, "TLS 1.2"),
            ProtocolVersion::TLS1_3 => write!(f, "TLS 1.3"),
            ProtocolVersion::DTLS1_0 => write!(f, "DTLS 1.0"),
            ProtocolVersion::DTLS1_2 => write!(f, "DTLS 1.2"),
            ProtocolVersion::DTLS1_3 => write!(f, "DTLS 1.3"),
            ProtocolVersion::Unknown(v) => write!(f, "Unknown(0x{:04x})", v),
        }
    }
}
