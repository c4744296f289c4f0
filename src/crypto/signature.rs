//! Signature generation for signed handshake parameters.
//!
//! SSL3, TLS 1.0 and TLS 1.1 do not negotiate a signature algorithm. They
//! sign `MD5(data) || SHA1(data)` with raw PKCS#1 RSA, or the data with
//! SHA1/ECDSA, depending on the key exchange of the selected cipher suite.
//! Every other version signs with the negotiated algorithm.

use std::borrow::Cow;

use md5::Md5;
use p256::ecdsa::Signature as P256Signature;
use p384::ecdsa::Signature as P384Signature;
use rand::{CryptoRng, RngCore};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use signature::hazmat::RandomizedPrehashSigner;
use signature::{RandomizedDigestSigner, SignatureEncoding};

use super::keys::EcPrivateKey;
use crate::context::TlsContext;
use crate::types::{CipherSuite, HashAlgorithm, ProtocolVersion};
use crate::types::{SignatureAlgorithm, SignatureAndHashAlgorithm};
use crate::Error;

/// P-256 scalar field length in bytes
const P256_FIELD_LEN: usize = 32;
/// P-384 scalar field length in bytes
const P384_FIELD_LEN: usize = 48;

/// The scheme actually used to sign and the bytes it signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningInput<'a> {
    pub scheme: SignatureAndHashAlgorithm,
    pub data: Cow<'a, [u8]>,
}

impl SigningInput<'_> {
    /// Scheme name such as `SHA256withRSA` or `NONEwithRSA`.
    pub fn scheme_name(&self) -> String {
        self.scheme.canonical_name()
    }
}

/// Private key borrowed from a [`KeyProvider`](super::KeyProvider).
#[derive(Debug, Clone, Copy)]
pub enum PrivateKey<'a> {
    Rsa(&'a RsaPrivateKey),
    Dsa(&'a dsa::SigningKey),
    Ec(&'a EcPrivateKey),
}

/// Sign `data` for the current connection.
///
/// Anonymous signatures are empty. Otherwise the key for the algorithm's
/// signature family is taken from the context's key provider, and the
/// context's random source drives the signer.
pub fn generate_signature(
    algorithm: SignatureAndHashAlgorithm,
    ctx: &TlsContext,
    data: &[u8],
) -> Result<Vec<u8>, Error> {
    let provider = ctx.key_provider();
    let key = match algorithm.signature {
        SignatureAlgorithm::Anonymous => {
            trace!("Anonymous signature");
            return Ok(Vec::new());
        }
        SignatureAlgorithm::RSA => provider.rsa_private_key(ctx).map(PrivateKey::Rsa),
        SignatureAlgorithm::DSA => provider.dsa_private_key(ctx).map(PrivateKey::Dsa),
        SignatureAlgorithm::ECDSA => provider.ec_private_key(ctx).map(PrivateKey::Ec),
        SignatureAlgorithm::Unknown(value) => {
            return Err(Error::unsupported(format!(
                "Unknown signature algorithm: {}",
                value
            )));
        }
    };
    let key = key.ok_or_else(|| {
        Error::unsupported(format!("No private key for {}", algorithm.canonical_name()))
    })?;

    let input = resolve_signing_input(
        algorithm,
        ctx.selected_protocol_version(),
        ctx.selected_cipher_suite(),
        data,
    )?;
    debug!("Signing {} bytes with {}", input.data.len(), input.scheme_name());

    let mut rng = ctx.rng();
    sign_with_key(key, &input, &mut *rng)
}

/// Decide the signing scheme and the exact bytes to sign.
pub fn resolve_signing_input<'a>(
    algorithm: SignatureAndHashAlgorithm,
    version: ProtocolVersion,
    cipher_suite: CipherSuite,
    data: &'a [u8],
) -> Result<SigningInput<'a>, Error> {
    if !version.uses_legacy_signatures() {
        return Ok(SigningInput {
            scheme: algorithm,
            data: Cow::Borrowed(data),
        });
    }

    let kx = cipher_suite.key_exchange_algorithm().name();
    if kx.contains("RSA") {
        let mut combined = Md5::digest(data).to_vec();
        combined.extend_from_slice(&Sha1::digest(data));
        Ok(SigningInput {
            scheme: SignatureAndHashAlgorithm::new(HashAlgorithm::None, SignatureAlgorithm::RSA),
            data: Cow::Owned(combined),
        })
    } else if kx.contains("ECDSA") {
        Ok(SigningInput {
            scheme: SignatureAndHashAlgorithm::new(HashAlgorithm::SHA1, SignatureAlgorithm::ECDSA),
            data: Cow::Borrowed(data),
        })
    } else {
        Err(Error::unsupported(format!(
            "Legacy signature for {} key exchange in {}",
            kx, version
        )))
    }
}

/// Sign a resolved input. The key must match the scheme's family.
pub fn sign_with_key<R: RngCore + CryptoRng>(
    key: PrivateKey<'_>,
    input: &SigningInput<'_>,
    rng: &mut R,
) -> Result<Vec<u8>, Error> {
    let hash = input.scheme.hash;
    let data = input.data.as_ref();

    match (key, input.scheme.signature) {
        (PrivateKey::Rsa(key), SignatureAlgorithm::RSA) => sign_rsa(key, hash, data, rng),
        (PrivateKey::Dsa(key), SignatureAlgorithm::DSA) => sign_dsa(key, hash, data, rng),
        (PrivateKey::Ec(key), SignatureAlgorithm::ECDSA) => {
            let prehash = digest(hash, data)?;
            match key {
                EcPrivateKey::P256(key) => {
                    let prehash = pad_prehash(prehash, P256_FIELD_LEN);
                    let signature =
                        RandomizedPrehashSigner::<P256Signature>::sign_prehash_with_rng(
                            key, rng, &prehash,
                        )
                        .map_err(|e| Error::crypto("ECDSA P-256 signing failed", e))?;
                    Ok(signature.to_der().as_bytes().to_vec())
                }
                EcPrivateKey::P384(key) => {
                    let prehash = pad_prehash(prehash, P384_FIELD_LEN);
                    let signature =
                        RandomizedPrehashSigner::<P384Signature>::sign_prehash_with_rng(
                            key, rng, &prehash,
                        )
                        .map_err(|e| Error::crypto("ECDSA P-384 signing failed", e))?;
                    Ok(signature.to_der().as_bytes().to_vec())
                }
            }
        }
        (_, signature) => Err(Error::crypto_msg(format!(
            "Private key does not fit {:?} signatures",
            signature
        ))),
    }
}

fn sign_rsa<R: RngCore + CryptoRng>(
    key: &RsaPrivateKey,
    hash: HashAlgorithm,
    data: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, Error> {
    let padding = match hash {
        HashAlgorithm::None => Pkcs1v15Sign::new_unprefixed(),
        HashAlgorithm::MD5 => Pkcs1v15Sign::new::<Md5>(),
        HashAlgorithm::SHA1 => Pkcs1v15Sign::new::<Sha1>(),
        HashAlgorithm::SHA224 => Pkcs1v15Sign::new::<Sha224>(),
        HashAlgorithm::SHA256 => Pkcs1v15Sign::new::<Sha256>(),
        HashAlgorithm::SHA384 => Pkcs1v15Sign::new::<Sha384>(),
        HashAlgorithm::SHA512 => Pkcs1v15Sign::new::<Sha512>(),
        HashAlgorithm::Unknown(v) => {
            return Err(Error::unsupported(format!("Unknown hash algorithm: {}", v)))
        }
    };
    let hashed = digest(hash, data)?;
    key.sign_with_rng(rng, padding, &hashed)
        .map_err(|e| Error::crypto("RSA signing failed", e))
}

fn sign_dsa<R: RngCore + CryptoRng>(
    key: &dsa::SigningKey,
    hash: HashAlgorithm,
    data: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, Error> {
    let signature = match hash {
        HashAlgorithm::MD5 => sign_dsa_digest(key, Md5::new_with_prefix(data), rng),
        HashAlgorithm::SHA1 => sign_dsa_digest(key, Sha1::new_with_prefix(data), rng),
        HashAlgorithm::SHA224 => sign_dsa_digest(key, Sha224::new_with_prefix(data), rng),
        HashAlgorithm::SHA256 => sign_dsa_digest(key, Sha256::new_with_prefix(data), rng),
        HashAlgorithm::SHA384 => sign_dsa_digest(key, Sha384::new_with_prefix(data), rng),
        HashAlgorithm::SHA512 => sign_dsa_digest(key, Sha512::new_with_prefix(data), rng),
        other => {
            return Err(Error::unsupported(format!(
                "DSA signatures with hash {:?}",
                other
            )))
        }
    }
    .map_err(|e| Error::crypto("DSA signing failed", e))?;
    Ok(signature.to_vec())
}

fn sign_dsa_digest<D, R>(
    key: &dsa::SigningKey,
    digest: D,
    rng: &mut R,
) -> Result<dsa::Signature, signature::Error>
where
    D: Digest,
    dsa::SigningKey: RandomizedDigestSigner<D, dsa::Signature>,
    R: RngCore + CryptoRng,
{
    key.try_sign_digest_with_rng(rng, digest)
}

/// Left-pad a digest shorter than the curve's field with zeros. The
/// signer rejects prehashes under half the field size, and leading zeros
/// leave the integer it signs unchanged.
fn pad_prehash(prehash: Vec<u8>, field_len: usize) -> Vec<u8> {
    if prehash.len() >= field_len {
        return prehash;
    }
    let mut padded = vec![0; field_len - prehash.len()];
    padded.extend_from_slice(&prehash);
    padded
}

/// Hash `data`. `None` passes the data through unchanged.
fn digest(hash: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, Error> {
    Ok(match hash {
        HashAlgorithm::None => data.to_vec(),
        HashAlgorithm::MD5 => Md5::digest(data).to_vec(),
        HashAlgorithm::SHA1 => Sha1::digest(data).to_vec(),
        HashAlgorithm::SHA224 => Sha224::digest(data).to_vec(),
        HashAlgorithm::SHA256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::SHA384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::SHA512 => Sha512::digest(data).to_vec(),
        HashAlgorithm::Unknown(v) => {
            return Err(Error::unsupported(format!("Unknown hash algorithm: {}", v)))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &[u8] = b"client_random || server_random || params";

    #[test]
    fn legacy_rsa_signs_md5_sha1() {
        let sha256_rsa =
            SignatureAndHashAlgorithm::new(HashAlgorithm::SHA256, SignatureAlgorithm::RSA);
        let input = resolve_signing_input(
            sha256_rsa,
            ProtocolVersion::TLS1_0,
            CipherSuite::DHE_RSA_AES128_CBC_SHA,
            DATA,
        )
        .unwrap();
        assert_eq!(input.scheme_name(), "NONEwithRSA");
        assert_eq!(input.data.len(), 36);
        assert_eq!(&input.data[..16], Md5::digest(DATA).as_slice());
    }

    #[test]
    fn legacy_ecdsa_signs_sha1() {
        let input = resolve_signing_input(
            SignatureAndHashAlgorithm::default(),
            ProtocolVersion::TLS1_1,
            CipherSuite::ECDHE_ECDSA_AES128_CBC_SHA,
            DATA,
        )
        .unwrap();
        assert_eq!(input.scheme_name(), "SHA1withECDSA");
        assert_eq!(input.data.as_ref(), DATA);
    }

    #[test]
    fn legacy_dss_is_unsupported() {
        let res = resolve_signing_input(
            SignatureAndHashAlgorithm::default(),
            ProtocolVersion::SSL3,
            CipherSuite::DHE_DSS_AES128_CBC_SHA,
            DATA,
        );
        assert!(matches!(res, Err(Error::UnsupportedConfiguration(_))));
    }

    #[test]
    fn short_prehash_is_left_padded() {
        let sha1 = Sha1::digest(DATA).to_vec();
        let padded = pad_prehash(sha1.clone(), P384_FIELD_LEN);
        assert_eq!(padded.len(), 48);
        assert!(padded[..28].iter().all(|b| *b == 0));
        assert_eq!(&padded[28..], sha1.as_slice());

        let sha512 = Sha512::digest(DATA).to_vec();
        assert_eq!(pad_prehash(sha512.clone(), P384_FIELD_LEN), sha512);
    }

    #[test]
    fn modern_versions_keep_algorithm() {
        let alg = SignatureAndHashAlgorithm::new(HashAlgorithm::SHA384, SignatureAlgorithm::ECDSA);
        for version in [ProtocolVersion::TLS1_2, ProtocolVersion::DTLS1_0] {
            let input = resolve_signing_input(
                alg,
                version,
                CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
                DATA,
            )
            .unwrap();
            assert_eq!(input.scheme, alg);
            assert!(matches!(input.data, Cow::Borrowed(_)));
        }
    }
}
