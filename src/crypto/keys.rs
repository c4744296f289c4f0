//! Private key provisioning for signature generation.

use std::fmt;
use std::str;

use p256::ecdsa::SigningKey as P256SigningKey;
use p384::ecdsa::SigningKey as P384SigningKey;
use pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

use crate::context::TlsContext;
use crate::Error;

/// ECDSA private key on one of the supported curves.
pub enum EcPrivateKey {
    P256(P256SigningKey),
    P384(P384SigningKey),
}

impl fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcPrivateKey::P256(_) => f.debug_tuple("EcPrivateKey::P256").finish(),
            EcPrivateKey::P384(_) => f.debug_tuple("EcPrivateKey::P384").finish(),
        }
    }
}

/// Source of the private keys used when signing handshake data.
///
/// The connection state is passed so a provider can select keys per
/// connection end or negotiated parameters.
pub trait KeyProvider: Send + Sync + fmt::Debug {
    fn rsa_private_key(&self, ctx: &TlsContext) -> Option<&RsaPrivateKey>;
    fn dsa_private_key(&self, ctx: &TlsContext) -> Option<&dsa::SigningKey>;
    fn ec_private_key(&self, ctx: &TlsContext) -> Option<&EcPrivateKey>;
}

/// Key provider holding one key per algorithm, independent of context.
#[derive(Default)]
pub struct StaticKeyProvider {
    rsa: Option<RsaPrivateKey>,
    dsa: Option<dsa::SigningKey>,
    ec: Option<EcPrivateKey>,
}

impl StaticKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rsa(mut self, key: RsaPrivateKey) -> Self {
        self.rsa = Some(key);
        self
    }

    pub fn with_dsa(mut self, key: dsa::SigningKey) -> Self {
        self.dsa = Some(key);
        self
    }

    pub fn with_ec(mut self, key: EcPrivateKey) -> Self {
        self.ec = Some(key);
        self
    }

    /// Load a PKCS#8 private key, DER or PEM encoded, into the slot matching
    /// its algorithm. A key already in that slot is replaced.
    pub fn load_private_key(mut self, key: &[u8]) -> Result<Self, Error> {
        if let Ok(key) = P256SigningKey::from_pkcs8_der(key) {
            self.ec = Some(EcPrivateKey::P256(key));
            return Ok(self);
        }
        if let Ok(key) = P384SigningKey::from_pkcs8_der(key) {
            self.ec = Some(EcPrivateKey::P384(key));
            return Ok(self);
        }
        if let Ok(key) = RsaPrivateKey::from_pkcs8_der(key) {
            self.rsa = Some(key);
            return Ok(self);
        }
        if let Ok(key) = dsa::SigningKey::from_pkcs8_der(key) {
            self.dsa = Some(key);
            return Ok(self);
        }

        if let Ok(pem_str) = str::from_utf8(key) {
            if pem_str.contains("-----BEGIN") {
                let (_label, doc) = pkcs8::Document::from_pem(pem_str)
                    .map_err(|e| Error::crypto("Failed to decode PEM private key", e))?;
                return self.load_private_key(doc.as_bytes());
            }
        }

        Err(Error::crypto_msg(
            "Failed to parse private key in any supported format",
        ))
    }
}

impl fmt::Debug for StaticKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeyProvider")
            .field("rsa", &self.rsa.is_some())
            .field("dsa", &self.dsa.is_some())
            .field("ec", &self.ec)
            .finish()
    }
}

impl KeyProvider for StaticKeyProvider {
    fn rsa_private_key(&self, _ctx: &TlsContext) -> Option<&RsaPrivateKey> {
        self.rsa.as_ref()
    }

    fn dsa_private_key(&self, _ctx: &TlsContext) -> Option<&dsa::SigningKey> {
        self.dsa.as_ref()
    }

    fn ec_private_key(&self, _ctx: &TlsContext) -> Option<&EcPrivateKey> {
        self.ec.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_garbage_fails() {
        let res = StaticKeyProvider::new().load_private_key(b"not a key");
        assert!(matches!(res, Err(Error::Crypto { .. })));
    }

    #[test]
    fn load_ec_pkcs8() {
        use p256::pkcs8::EncodePrivateKey;

        let key = P256SigningKey::from_slice(&[7; 32]).unwrap();
        let der = key.to_pkcs8_der().unwrap();
        let provider = StaticKeyProvider::new()
            .load_private_key(der.as_bytes())
            .unwrap();
        assert!(matches!(provider.ec, Some(EcPrivateKey::P256(_))));
        assert!(provider.rsa.is_none());
    }
}
