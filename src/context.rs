//! Per-connection state shared by every message handler.
//!
//! Values that have not been negotiated yet fall back to the config
//! defaults. Mutation is only possible from inside the crate, from a
//! message's state transition or the handler.

use std::cell::{RefCell, RefMut};
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::config::Config;
use crate::crypto::{KeyProvider, StaticKeyProvider};
use crate::rng::SeededRng;
use crate::types::{
    CipherSuite, CompressionMethod, ConnectionEnd, NamedGroup, ProtocolVersion,
    SignatureAndHashAlgorithm,
};

/// A resumable session.
#[derive(Clone)]
pub struct Session {
    session_id: Vec<u8>,
    master_secret: Zeroizing<Vec<u8>>,
}

impl Session {
    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    pub fn master_secret(&self) -> &[u8] {
        &self.master_secret
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct TlsContext {
    config: Arc<Config>,
    key_provider: Arc<dyn KeyProvider>,
    rng: RefCell<SeededRng>,

    talking_end: ConnectionEnd,

    selected_protocol_version: Option<ProtocolVersion>,
    highest_client_protocol_version: Option<ProtocolVersion>,
    client_supported_versions: Vec<ProtocolVersion>,
    selected_cipher_suite: Option<CipherSuite>,
    selected_compression_method: Option<CompressionMethod>,
    selected_signature_and_hash_algorithm: Option<SignatureAndHashAlgorithm>,

    client_random: Option<[u8; 32]>,
    server_random: Option<[u8; 32]>,
    session_id: Option<Vec<u8>>,
    client_cipher_suites: Option<Vec<CipherSuite>>,
    client_compression_methods: Option<Vec<CompressionMethod>>,
    dtls_cookie: Option<Vec<u8>>,

    write_message_seq: u16,
    read_message_seq: u16,
    write_epoch: u16,
    read_epoch: u16,
    write_record_seq: u64,

    selected_named_group: Option<NamedGroup>,
    server_ec_public_key: Option<Vec<u8>>,

    psk_identity: Option<Vec<u8>>,
    pre_master_secret: Option<Zeroizing<Vec<u8>>>,
    master_secret: Option<Zeroizing<Vec<u8>>>,

    resuming: bool,
    sessions: Vec<Session>,

    write_compression_active: bool,
    read_compression_active: bool,

    received_fatal_alert: bool,
    warnings: Vec<String>,
}

impl TlsContext {
    /// Create state for a connection without signing keys.
    pub fn new(config: Config) -> Self {
        Self::with_key_provider(config, Arc::new(StaticKeyProvider::new()))
    }

    pub fn with_key_provider(config: Config, key_provider: Arc<dyn KeyProvider>) -> Self {
        let rng = SeededRng::new(config.rng_seed());
        let talking_end = config.connection_end();
        TlsContext {
            config: Arc::new(config),
            key_provider,
            rng: RefCell::new(rng),
            talking_end,
            selected_protocol_version: None,
            highest_client_protocol_version: None,
            client_supported_versions: Vec::new(),
            selected_cipher_suite: None,
            selected_compression_method: None,
            selected_signature_and_hash_algorithm: None,
            client_random: None,
            server_random: None,
            session_id: None,
            client_cipher_suites: None,
            client_compression_methods: None,
            dtls_cookie: None,
            write_message_seq: 0,
            read_message_seq: 0,
            write_epoch: 0,
            read_epoch: 0,
            write_record_seq: 0,
            selected_named_group: None,
            server_ec_public_key: None,
            psk_identity: None,
            pre_master_secret: None,
            master_secret: None,
            resuming: false,
            sessions: Vec::new(),
            write_compression_active: false,
            read_compression_active: false,
            received_fatal_alert: false,
            warnings: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn key_provider(&self) -> &dyn KeyProvider {
        self.key_provider.as_ref()
    }

    pub(crate) fn rng(&self) -> RefMut<'_, SeededRng> {
        self.rng.borrow_mut()
    }

    /// The side of the connection this state belongs to.
    #[inline(always)]
    pub fn connection_end(&self) -> ConnectionEnd {
        self.config.connection_end()
    }

    /// The side that produced the message currently being handled.
    pub fn talking_end(&self) -> ConnectionEnd {
        self.talking_end
    }

    pub fn selected_protocol_version(&self) -> ProtocolVersion {
        self.selected_protocol_version
            .unwrap_or_else(|| self.config.default_selected_protocol_version())
    }

    pub fn highest_client_protocol_version(&self) -> ProtocolVersion {
        self.highest_client_protocol_version
            .unwrap_or_else(|| self.config.default_highest_client_protocol_version())
    }

    pub fn client_supported_versions(&self) -> &[ProtocolVersion] {
        &self.client_supported_versions
    }

    pub fn selected_cipher_suite(&self) -> CipherSuite {
        self.selected_cipher_suite
            .unwrap_or_else(|| self.config.default_selected_cipher_suite())
    }

    pub fn selected_compression_method(&self) -> CompressionMethod {
        self.selected_compression_method
            .unwrap_or_else(|| self.config.default_selected_compression_method())
    }

    pub fn selected_signature_and_hash_algorithm(&self) -> SignatureAndHashAlgorithm {
        self.selected_signature_and_hash_algorithm
            .unwrap_or_else(|| self.config.default_selected_signature_and_hash_algorithm())
    }

    pub fn client_random(&self) -> &[u8; 32] {
        self.client_random
            .as_ref()
            .unwrap_or_else(|| self.config.default_client_random())
    }

    pub fn server_random(&self) -> &[u8; 32] {
        self.server_random
            .as_ref()
            .unwrap_or_else(|| self.config.default_server_random())
    }

    pub fn session_id(&self) -> &[u8] {
        self.session_id
            .as_deref()
            .unwrap_or_else(|| self.config.default_session_id())
    }

    pub fn client_cipher_suites(&self) -> &[CipherSuite] {
        self.client_cipher_suites
            .as_deref()
            .unwrap_or_else(|| self.config.default_client_supported_cipher_suites())
    }

    pub fn client_compression_methods(&self) -> &[CompressionMethod] {
        self.client_compression_methods
            .as_deref()
            .unwrap_or_else(|| self.config.default_client_supported_compression_methods())
    }

    pub fn dtls_cookie(&self) -> &[u8] {
        self.dtls_cookie
            .as_deref()
            .unwrap_or_else(|| self.config.default_dtls_cookie())
    }

    pub fn write_message_seq(&self) -> u16 {
        self.write_message_seq
    }

    pub fn read_message_seq(&self) -> u16 {
        self.read_message_seq
    }

    pub fn write_epoch(&self) -> u16 {
        self.write_epoch
    }

    pub fn read_epoch(&self) -> u16 {
        self.read_epoch
    }

    pub fn selected_named_group(&self) -> NamedGroup {
        self.selected_named_group
            .unwrap_or_else(|| self.config.default_selected_named_group())
    }

    pub fn server_ec_public_key(&self) -> &[u8] {
        self.server_ec_public_key
            .as_deref()
            .unwrap_or_else(|| self.config.default_server_ec_public_key())
    }

    pub fn psk_identity(&self) -> &[u8] {
        self.psk_identity
            .as_deref()
            .unwrap_or_else(|| self.config.default_psk_identity())
    }

    pub fn pre_master_secret(&self) -> Option<&[u8]> {
        self.pre_master_secret.as_ref().map(|s| s.as_slice())
    }

    pub fn master_secret(&self) -> Option<&[u8]> {
        self.master_secret.as_ref().map(|s| s.as_slice())
    }

    pub fn is_resuming(&self) -> bool {
        self.resuming
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Records written from now on are compressed.
    pub fn write_compression_active(&self) -> bool {
        self.write_compression_active
    }

    pub fn read_compression_active(&self) -> bool {
        self.read_compression_active
    }

    pub fn received_fatal_alert(&self) -> bool {
        self.received_fatal_alert
    }

    /// Problems recovered from while applying messages to this state.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub(crate) fn record_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub(crate) fn set_talking_end(&mut self, end: ConnectionEnd) {
        self.talking_end = end;
    }

    pub(crate) fn set_selected_protocol_version(&mut self, version: ProtocolVersion) {
        debug!("Selected protocol version: {}", version);
        self.selected_protocol_version = Some(version);
    }

    pub(crate) fn set_highest_client_protocol_version(&mut self, version: ProtocolVersion) {
        self.highest_client_protocol_version = Some(version);
    }

    pub(crate) fn set_client_supported_versions(&mut self, versions: Vec<ProtocolVersion>) {
        self.client_supported_versions = versions;
    }

    pub(crate) fn set_selected_cipher_suite(&mut self, suite: CipherSuite) {
        debug!("Selected cipher suite: {:?}", suite);
        self.selected_cipher_suite = Some(suite);
    }

    pub(crate) fn set_selected_compression_method(&mut self, method: CompressionMethod) {
        self.selected_compression_method = Some(method);
    }

    pub(crate) fn set_selected_signature_and_hash_algorithm(
        &mut self,
        algorithm: SignatureAndHashAlgorithm,
    ) {
        self.selected_signature_and_hash_algorithm = Some(algorithm);
    }

    pub(crate) fn set_client_random(&mut self, random: [u8; 32]) {
        self.client_random = Some(random);
    }

    pub(crate) fn set_server_random(&mut self, random: [u8; 32]) {
        self.server_random = Some(random);
    }

    pub(crate) fn set_session_id(&mut self, session_id: Vec<u8>) {
        self.session_id = Some(session_id);
    }

    pub(crate) fn set_client_cipher_suites(&mut self, suites: Vec<CipherSuite>) {
        self.client_cipher_suites = Some(suites);
    }

    pub(crate) fn set_client_compression_methods(&mut self, methods: Vec<CompressionMethod>) {
        self.client_compression_methods = Some(methods);
    }

    pub(crate) fn set_dtls_cookie(&mut self, cookie: Vec<u8>) {
        self.dtls_cookie = Some(cookie);
    }

    /// Take the next outgoing handshake message_seq.
    pub(crate) fn next_write_message_seq(&mut self) -> u16 {
        let seq = self.write_message_seq;
        self.write_message_seq = self.write_message_seq.wrapping_add(1);
        seq
    }

    pub(crate) fn increase_read_message_seq(&mut self) {
        self.read_message_seq = self.read_message_seq.wrapping_add(1);
    }

    /// Take the next outgoing DTLS record sequence number (48 bit).
    pub(crate) fn next_write_record_seq(&mut self) -> u64 {
        let seq = self.write_record_seq;
        self.write_record_seq = (self.write_record_seq + 1) & 0xFFFF_FFFF_FFFF;
        seq
    }

    pub(crate) fn set_selected_named_group(&mut self, group: NamedGroup) {
        self.selected_named_group = Some(group);
    }

    pub(crate) fn set_server_ec_public_key(&mut self, key: Vec<u8>) {
        self.server_ec_public_key = Some(key);
    }

    pub(crate) fn set_psk_identity(&mut self, identity: Vec<u8>) {
        self.psk_identity = Some(identity);
    }

    pub(crate) fn set_pre_master_secret(&mut self, secret: Vec<u8>) {
        self.pre_master_secret = Some(Zeroizing::new(secret));
    }

    pub(crate) fn set_master_secret(&mut self, secret: Zeroizing<Vec<u8>>) {
        self.master_secret = Some(secret);
    }

    pub(crate) fn set_resuming(&mut self, resuming: bool) {
        self.resuming = resuming;
    }

    /// Store the current session id and master secret as resumable.
    ///
    /// A session with the same id is replaced.
    pub(crate) fn spawn_session(&mut self) {
        let Some(master_secret) = self.master_secret.clone() else {
            return;
        };
        let session_id = self.session_id().to_vec();
        self.sessions.retain(|s| s.session_id != session_id);
        trace!("New resumable session, id len {}", session_id.len());
        self.sessions.push(Session {
            session_id,
            master_secret,
        });
    }

    /// A ChangeCipherSpec from `end` switches that direction to the new
    /// epoch, enabling the negotiated record compression.
    pub(crate) fn change_cipher_spec(&mut self, end: ConnectionEnd) {
        if end == self.connection_end() {
            self.write_epoch = self.write_epoch.wrapping_add(1);
            self.write_record_seq = 0;
            self.write_compression_active = true;
        } else {
            self.read_epoch = self.read_epoch.wrapping_add(1);
            self.read_compression_active = true;
        }
    }

    pub(crate) fn set_received_fatal_alert(&mut self) {
        self.received_fatal_alert = true;
    }
}
