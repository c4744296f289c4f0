//! Connection parameters that change how bytes decode.

use crate::context::TlsContext;
use crate::types::{CipherSuite, ConnectionEnd, ProtocolVersion};

/// Context passed through message parsing.
///
/// The version decides optional fields such as the DTLS cookie in a
/// ClientHello. The talking end decides between the client and server
/// form of extensions like supported_versions.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext {
    pub version: ProtocolVersion,
    pub cipher_suite: CipherSuite,
    pub talking_end: ConnectionEnd,
}

impl ParseContext {
    pub fn new(version: ProtocolVersion, talking_end: ConnectionEnd) -> Self {
        Self {
            version,
            cipher_suite: CipherSuite::default(),
            talking_end,
        }
    }

    pub fn from_context(ctx: &TlsContext) -> Self {
        Self {
            version: ctx.selected_protocol_version(),
            cipher_suite: ctx.selected_cipher_suite(),
            talking_end: ctx.talking_end(),
        }
    }

    #[inline]
    pub fn is_dtls(&self) -> bool {
        self.version.is_dtls()
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new(ProtocolVersion::TLS1_2, ConnectionEnd::Client)
    }
}
