mod alert;
pub use alert::{AlertDescription, AlertLevel};

mod cipher_suite;
pub use cipher_suite::{CipherSuite, KeyExchangeAlgorithm};

mod comp_meth;
pub use comp_meth::CompressionMethod;

mod ctype;
pub use ctype::ContentType;

mod ext;
pub use ext::{ExtensionType, NamedGroup};

mod handshake;
pub use handshake::HandshakeType;

mod signature;
pub use signature::{HashAlgorithm, SignatureAlgorithm, SignatureAndHashAlgorithm};

mod version;
pub use version::ProtocolVersion;

/// Which side of a connection a peer plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionEnd {
    #[default]
    Client,
    Server,
}

impl ConnectionEnd {
    pub fn peer(&self) -> ConnectionEnd {
        match self {
            ConnectionEnd::Client => ConnectionEnd::Server,
            ConnectionEnd::Server => ConnectionEnd::Client,
        }
    }
}
