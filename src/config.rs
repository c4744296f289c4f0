use crate::types::{
    CipherSuite, CompressionMethod, ConnectionEnd, HashAlgorithm, NamedGroup, ProtocolVersion,
    SignatureAlgorithm, SignatureAndHashAlgorithm,
};
use crate::Error;

/// Connection configuration.
///
/// Besides the local settings, a config holds the defaults every
/// negotiated value falls back to until a message sets it.
#[derive(Debug, Clone)]
pub struct Config {
    connection_end: ConnectionEnd,
    highest_protocol_version: ProtocolVersion,
    default_selected_protocol_version: ProtocolVersion,
    default_highest_client_protocol_version: ProtocolVersion,
    supported_versions: Vec<ProtocolVersion>,
    default_selected_cipher_suite: CipherSuite,
    default_client_supported_cipher_suites: Vec<CipherSuite>,
    default_server_supported_cipher_suites: Vec<CipherSuite>,
    default_selected_compression_method: CompressionMethod,
    default_client_supported_compression_methods: Vec<CompressionMethod>,
    default_server_supported_compression_methods: Vec<CompressionMethod>,
    default_selected_signature_and_hash_algorithm: SignatureAndHashAlgorithm,
    default_client_random: [u8; 32],
    default_server_random: [u8; 32],
    use_fresh_random: bool,
    default_session_id: Vec<u8>,
    default_dtls_cookie: Vec<u8>,
    with_extensions: bool,
    default_selected_named_group: NamedGroup,
    default_server_ec_public_key: Vec<u8>,
    default_psk_identity: Vec<u8>,
    default_psk: Vec<u8>,
    dtls_maximum_fragment_length: usize,
    rng_seed: Option<u64>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            connection_end: ConnectionEnd::Client,
            highest_protocol_version: ProtocolVersion::TLS1_2,
            default_selected_protocol_version: ProtocolVersion::TLS1_2,
            default_highest_client_protocol_version: ProtocolVersion::TLS1_2,
            supported_versions: vec![ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_2],
            default_selected_cipher_suite: CipherSuite::RSA_AES128_CBC_SHA,
            default_client_supported_cipher_suites: vec![
                CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
                CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
                CipherSuite::RSA_AES128_CBC_SHA,
            ],
            default_server_supported_cipher_suites: vec![
                CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
                CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
                CipherSuite::RSA_AES128_CBC_SHA,
            ],
            default_selected_compression_method: CompressionMethod::Null,
            default_client_supported_compression_methods: vec![CompressionMethod::Null],
            default_server_supported_compression_methods: vec![CompressionMethod::Null],
            default_selected_signature_and_hash_algorithm: SignatureAndHashAlgorithm::new(
                HashAlgorithm::SHA256,
                SignatureAlgorithm::RSA,
            ),
            default_client_random: [0; 32],
            default_server_random: [0; 32],
            use_fresh_random: true,
            default_session_id: Vec::new(),
            default_dtls_cookie: Vec::new(),
            with_extensions: true,
            default_selected_named_group: NamedGroup::Secp256r1,
            default_server_ec_public_key: Vec::new(),
            default_psk_identity: b"Client_identity".to_vec(),
            default_psk: vec![0x12, 0x34, 0x56, 0x78, 0x90],
            dtls_maximum_fragment_length: 1400,
            rng_seed: None,
        }
    }

    /// Which side of the connection this peer plays.
    #[inline(always)]
    pub fn connection_end(&self) -> ConnectionEnd {
        self.connection_end
    }

    /// Highest version this peer accepts when selecting from a
    /// supported_versions list.
    #[inline(always)]
    pub fn highest_protocol_version(&self) -> ProtocolVersion {
        self.highest_protocol_version
    }

    /// Version used before one has been negotiated, and the fallback when
    /// version selection fails.
    #[inline(always)]
    pub fn default_selected_protocol_version(&self) -> ProtocolVersion {
        self.default_selected_protocol_version
    }

    #[inline(always)]
    pub fn default_highest_client_protocol_version(&self) -> ProtocolVersion {
        self.default_highest_client_protocol_version
    }

    /// Versions offered in a client supported_versions extension.
    #[inline(always)]
    pub fn supported_versions(&self) -> &[ProtocolVersion] {
        &self.supported_versions
    }

    #[inline(always)]
    pub fn default_selected_cipher_suite(&self) -> CipherSuite {
        self.default_selected_cipher_suite
    }

    #[inline(always)]
    pub fn default_client_supported_cipher_suites(&self) -> &[CipherSuite] {
        &self.default_client_supported_cipher_suites
    }

    #[inline(always)]
    pub fn default_server_supported_cipher_suites(&self) -> &[CipherSuite] {
        &self.default_server_supported_cipher_suites
    }

    #[inline(always)]
    pub fn default_selected_compression_method(&self) -> CompressionMethod {
        self.default_selected_compression_method
    }

    #[inline(always)]
    pub fn default_client_supported_compression_methods(&self) -> &[CompressionMethod] {
        &self.default_client_supported_compression_methods
    }

    #[inline(always)]
    pub fn default_server_supported_compression_methods(&self) -> &[CompressionMethod] {
        &self.default_server_supported_compression_methods
    }

    #[inline(always)]
    pub fn default_selected_signature_and_hash_algorithm(&self) -> SignatureAndHashAlgorithm {
        self.default_selected_signature_and_hash_algorithm
    }

    #[inline(always)]
    pub fn default_client_random(&self) -> &[u8; 32] {
        &self.default_client_random
    }

    #[inline(always)]
    pub fn default_server_random(&self) -> &[u8; 32] {
        &self.default_server_random
    }

    /// Whether hellos carry randoms from the connection random source
    /// instead of the configured defaults.
    #[inline(always)]
    pub fn use_fresh_random(&self) -> bool {
        self.use_fresh_random
    }

    #[inline(always)]
    pub fn default_session_id(&self) -> &[u8] {
        &self.default_session_id
    }

    #[inline(always)]
    pub fn default_dtls_cookie(&self) -> &[u8] {
        &self.default_dtls_cookie
    }

    /// Whether hellos carry an extensions block.
    #[inline(always)]
    pub fn with_extensions(&self) -> bool {
        self.with_extensions
    }

    #[inline(always)]
    pub fn default_selected_named_group(&self) -> NamedGroup {
        self.default_selected_named_group
    }

    /// Encoded EC point sent in an ECDHE ServerKeyExchange.
    #[inline(always)]
    pub fn default_server_ec_public_key(&self) -> &[u8] {
        &self.default_server_ec_public_key
    }

    #[inline(always)]
    pub fn default_psk_identity(&self) -> &[u8] {
        &self.default_psk_identity
    }

    #[inline(always)]
    pub fn default_psk(&self) -> &[u8] {
        &self.default_psk
    }

    /// Largest DTLS handshake fragment body produced when re-fragmenting
    /// without a per-fragment override.
    #[inline(always)]
    pub fn dtls_maximum_fragment_length(&self) -> usize {
        self.dtls_maximum_fragment_length
    }

    /// Seed for the connection random source.
    ///
    /// `None` seeds from OS entropy.
    #[inline(always)]
    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }
}

/// Builder for [`Config`].
pub struct ConfigBuilder {
    connection_end: ConnectionEnd,
    highest_protocol_version: ProtocolVersion,
    default_selected_protocol_version: ProtocolVersion,
    default_highest_client_protocol_version: ProtocolVersion,
    supported_versions: Vec<ProtocolVersion>,
    default_selected_cipher_suite: CipherSuite,
    default_client_supported_cipher_suites: Vec<CipherSuite>,
    default_server_supported_cipher_suites: Vec<CipherSuite>,
    default_selected_compression_method: CompressionMethod,
    default_client_supported_compression_methods: Vec<CompressionMethod>,
    default_server_supported_compression_methods: Vec<CompressionMethod>,
    default_selected_signature_and_hash_algorithm: SignatureAndHashAlgorithm,
    default_client_random: [u8; 32],
    default_server_random: [u8; 32],
    use_fresh_random: bool,
    default_session_id: Vec<u8>,
    default_dtls_cookie: Vec<u8>,
    with_extensions: bool,
    default_selected_named_group: NamedGroup,
    default_server_ec_public_key: Vec<u8>,
    default_psk_identity: Vec<u8>,
    default_psk: Vec<u8>,
    dtls_maximum_fragment_length: usize,
    rng_seed: Option<u64>,
}

impl ConfigBuilder {
    /// Set which side of the connection this peer plays.
    ///
    /// Defaults to client.
    pub fn connection_end(mut self, end: ConnectionEnd) -> Self {
        self.connection_end = end;
        self
    }

    /// Defaults to TLS 1.2.
    pub fn highest_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.highest_protocol_version = version;
        self
    }

    /// Defaults to TLS 1.2.
    pub fn default_selected_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.default_selected_protocol_version = version;
        self
    }

    /// Defaults to TLS 1.2.
    pub fn default_highest_client_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.default_highest_client_protocol_version = version;
        self
    }

    /// Set the versions offered in a client supported_versions extension.
    ///
    /// Defaults to TLS 1.3, TLS 1.2.
    pub fn supported_versions(mut self, versions: Vec<ProtocolVersion>) -> Self {
        self.supported_versions = versions;
        self
    }

    /// Defaults to `RSA_AES128_CBC_SHA`.
    pub fn default_selected_cipher_suite(mut self, suite: CipherSuite) -> Self {
        self.default_selected_cipher_suite = suite;
        self
    }

    pub fn default_client_supported_cipher_suites(mut self, suites: Vec<CipherSuite>) -> Self {
        self.default_client_supported_cipher_suites = suites;
        self
    }

    pub fn default_server_supported_cipher_suites(mut self, suites: Vec<CipherSuite>) -> Self {
        self.default_server_supported_cipher_suites = suites;
        self
    }

    /// Defaults to null compression.
    pub fn default_selected_compression_method(mut self, method: CompressionMethod) -> Self {
        self.default_selected_compression_method = method;
        self
    }

    pub fn default_client_supported_compression_methods(
        mut self,
        methods: Vec<CompressionMethod>,
    ) -> Self {
        self.default_client_supported_compression_methods = methods;
        self
    }

    pub fn default_server_supported_compression_methods(
        mut self,
        methods: Vec<CompressionMethod>,
    ) -> Self {
        self.default_server_supported_compression_methods = methods;
        self
    }

    /// Defaults to `SHA256withRSA`.
    pub fn default_selected_signature_and_hash_algorithm(
        mut self,
        algorithm: SignatureAndHashAlgorithm,
    ) -> Self {
        self.default_selected_signature_and_hash_algorithm = algorithm;
        self
    }

    /// Defaults to all zeros.
    pub fn default_client_random(mut self, random: [u8; 32]) -> Self {
        self.default_client_random = random;
        self
    }

    /// Defaults to all zeros.
    pub fn default_server_random(mut self, random: [u8; 32]) -> Self {
        self.default_server_random = random;
        self
    }

    /// Set whether hellos draw randoms from the connection random source.
    ///
    /// When false the configured default randoms are sent.
    /// Defaults to true.
    pub fn use_fresh_random(mut self, enabled: bool) -> Self {
        self.use_fresh_random = enabled;
        self
    }

    /// Defaults to empty.
    pub fn default_session_id(mut self, session_id: Vec<u8>) -> Self {
        self.default_session_id = session_id;
        self
    }

    /// Defaults to empty.
    pub fn default_dtls_cookie(mut self, cookie: Vec<u8>) -> Self {
        self.default_dtls_cookie = cookie;
        self
    }

    /// Set whether hellos carry an extensions block.
    ///
    /// Defaults to true.
    pub fn with_extensions(mut self, enabled: bool) -> Self {
        self.with_extensions = enabled;
        self
    }

    /// Defaults to secp256r1.
    pub fn default_selected_named_group(mut self, group: NamedGroup) -> Self {
        self.default_selected_named_group = group;
        self
    }

    pub fn default_server_ec_public_key(mut self, key: Vec<u8>) -> Self {
        self.default_server_ec_public_key = key;
        self
    }

    /// Defaults to `Client_identity`.
    pub fn default_psk_identity(mut self, identity: Vec<u8>) -> Self {
        self.default_psk_identity = identity;
        self
    }

    pub fn default_psk(mut self, psk: Vec<u8>) -> Self {
        self.default_psk = psk;
        self
    }

    /// Defaults to 1400.
    pub fn dtls_maximum_fragment_length(mut self, length: usize) -> Self {
        self.dtls_maximum_fragment_length = length;
        self
    }

    /// Seed the connection random source for reproducible output.
    ///
    /// Defaults to unseeded.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns `Error::UnsupportedConfiguration` when a default cannot be
    /// encoded in its wire field.
    pub fn build(self) -> Result<Config, Error> {
        if self.default_session_id.len() > 32 {
            return Err(Error::unsupported(format!(
                "session id of {} bytes exceeds 32",
                self.default_session_id.len()
            )));
        }
        if self.default_dtls_cookie.len() > 255 {
            return Err(Error::unsupported(format!(
                "cookie of {} bytes exceeds 255",
                self.default_dtls_cookie.len()
            )));
        }
        if self.default_psk_identity.len() > u16::MAX as usize {
            return Err(Error::unsupported("psk identity too long"));
        }
        if self.default_psk.len() > u16::MAX as usize {
            return Err(Error::unsupported(format!(
                "psk of {} bytes exceeds {}",
                self.default_psk.len(),
                u16::MAX
            )));
        }

        Ok(Config {
            connection_end: self.connection_end,
            highest_protocol_version: self.highest_protocol_version,
            default_selected_protocol_version: self.default_selected_protocol_version,
            default_highest_client_protocol_version: self.default_highest_client_protocol_version,
            supported_versions: self.supported_versions,
            default_selected_cipher_suite: self.default_selected_cipher_suite,
            default_client_supported_cipher_suites: self.default_client_supported_cipher_suites,
            default_server_supported_cipher_suites: self.default_server_supported_cipher_suites,
            default_selected_compression_method: self.default_selected_compression_method,
            default_client_supported_compression_methods: self
                .default_client_supported_compression_methods,
            default_server_supported_compression_methods: self
                .default_server_supported_compression_methods,
            default_selected_signature_and_hash_algorithm: self
                .default_selected_signature_and_hash_algorithm,
            default_client_random: self.default_client_random,
            default_server_random: self.default_server_random,
            use_fresh_random: self.use_fresh_random,
            default_session_id: self.default_session_id,
            default_dtls_cookie: self.default_dtls_cookie,
            with_extensions: self.with_extensions,
            default_selected_named_group: self.default_selected_named_group,
            default_server_ec_public_key: self.default_server_ec_public_key,
            default_psk_identity: self.default_psk_identity,
            default_psk: self.default_psk,
            dtls_maximum_fragment_length: self.dtls_maximum_fragment_length,
            rng_seed: self.rng_seed,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder()
            .build()
            .expect("Default config should always validate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_session_id_rejected() {
        let res = Config::builder().default_session_id(vec![0; 33]).build();
        assert!(matches!(res, Err(Error::UnsupportedConfiguration(_))));
    }

    #[test]
    fn oversized_psk_rejected() {
        let result = Config::builder().default_psk(vec![0; 65536]).build();
        assert!(matches!(result, Err(Error::UnsupportedConfiguration(_))));

        assert!(Config::builder().default_psk(vec![0; 65535]).build().is_ok());
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.connection_end(), ConnectionEnd::Client);
        assert_eq!(config.dtls_maximum_fragment_length(), 1400);
        assert!(config.with_extensions());
        assert_eq!(config.rng_seed(), None);
    }
}
