mod forge_common;

use std::sync::Arc;

use forge_common::*;
use md5::Md5;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use rsa::Pkcs1v15Sign;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use signature::DigestVerifier;

use tlsforge::crypto::{generate_signature, resolve_signing_input, EcPrivateKey};
use tlsforge::crypto::StaticKeyProvider;
use tlsforge::types::{
    CipherSuite, HashAlgorithm, ProtocolVersion, SignatureAlgorithm, SignatureAndHashAlgorithm,
};
use tlsforge::{Error, TlsContext};

const DATA: &[u8] = b"client_random server_random params";

fn context(version: ProtocolVersion, suite: CipherSuite, provider: StaticKeyProvider) -> TlsContext {
    let config = server_builder(version)
        .default_selected_cipher_suite(suite)
        .build()
        .unwrap();
    TlsContext::with_key_provider(config, Arc::new(provider))
}

fn algorithm(hash: HashAlgorithm, signature: SignatureAlgorithm) -> SignatureAndHashAlgorithm {
    SignatureAndHashAlgorithm::new(hash, signature)
}

#[test]
fn legacy_rsa_signs_md5_sha1() {
    let _ = env_logger::try_init();

    let key = rsa_key();
    let public = key.to_public_key();
    let ctx = context(
        ProtocolVersion::TLS1_1,
        CipherSuite::ECDHE_RSA_AES128_CBC_SHA,
        StaticKeyProvider::new().with_rsa(key),
    );

    let input = resolve_signing_input(
        algorithm(HashAlgorithm::SHA256, SignatureAlgorithm::RSA),
        ProtocolVersion::TLS1_1,
        CipherSuite::ECDHE_RSA_AES128_CBC_SHA,
        DATA,
    )
    .unwrap();
    assert_eq!(input.scheme_name(), "NONEwithRSA");

    let mut expected = Md5::digest(DATA).to_vec();
    expected.extend_from_slice(&Sha1::digest(DATA));
    assert_eq!(input.data.as_ref(), expected.as_slice());

    let signature = generate_signature(
        algorithm(HashAlgorithm::SHA256, SignatureAlgorithm::RSA),
        &ctx,
        DATA,
    )
    .unwrap();
    public
        .verify(Pkcs1v15Sign::new_unprefixed(), &expected, &signature)
        .unwrap();
}

#[test]
fn legacy_ecdsa_signs_with_sha1() {
    let ctx = context(
        ProtocolVersion::TLS1_0,
        CipherSuite::ECDHE_ECDSA_AES128_CBC_SHA,
        StaticKeyProvider::new().with_ec(EcPrivateKey::P256(p256_key())),
    );
    let scheme = algorithm(HashAlgorithm::SHA256, SignatureAlgorithm::ECDSA);

    let input = resolve_signing_input(
        scheme,
        ProtocolVersion::TLS1_0,
        CipherSuite::ECDHE_ECDSA_AES128_CBC_SHA,
        DATA,
    )
    .unwrap();
    assert_eq!(input.scheme_name(), "SHA1withECDSA");
    assert_eq!(input.data.as_ref(), DATA);

    let signature = generate_signature(scheme, &ctx, DATA).unwrap();
    let signature = Signature::from_der(&signature).unwrap();
    VerifyingKey::from(&p256_key())
        .verify_prehash(&Sha1::digest(DATA), &signature)
        .unwrap();
}

#[test]
fn legacy_ecdsa_signs_on_p384() {
    let ctx = context(
        ProtocolVersion::TLS1_0,
        CipherSuite::ECDHE_ECDSA_AES128_CBC_SHA,
        StaticKeyProvider::new().with_ec(EcPrivateKey::P384(p384_key())),
    );

    let signature = generate_signature(
        algorithm(HashAlgorithm::SHA1, SignatureAlgorithm::ECDSA),
        &ctx,
        DATA,
    )
    .unwrap();

    // SHA-1 is shorter than the P-384 field, the signer sees it zero padded
    let mut prehash = vec![0u8; 28];
    prehash.extend_from_slice(&Sha1::digest(DATA));
    let signature = p384::ecdsa::Signature::from_der(&signature).unwrap();
    p384::ecdsa::VerifyingKey::from(&p384_key())
        .verify_prehash(&prehash, &signature)
        .unwrap();
}

#[test]
fn dsa_signs_with_negotiated_hash() {
    let key = dsa_key();
    let public = key.verifying_key().clone();
    let ctx = context(
        ProtocolVersion::TLS1_2,
        CipherSuite::DHE_DSS_AES128_CBC_SHA,
        StaticKeyProvider::new().with_dsa(key),
    );

    let scheme = algorithm(HashAlgorithm::SHA256, SignatureAlgorithm::DSA);
    let signature = generate_signature(scheme, &ctx, DATA).unwrap();

    let input = resolve_signing_input(
        scheme,
        ProtocolVersion::TLS1_2,
        CipherSuite::DHE_DSS_AES128_CBC_SHA,
        DATA,
    )
    .unwrap();
    assert_eq!(input.scheme_name(), "SHA256withDSA");

    let signature = dsa::Signature::try_from(signature.as_slice()).unwrap();
    public
        .verify_digest(Sha256::new_with_prefix(DATA), &signature)
        .unwrap();
}

#[test]
fn legacy_without_rsa_or_ecdsa_is_unsupported() {
    for suite in [
        CipherSuite::DHE_DSS_AES128_CBC_SHA,
        CipherSuite::PSK_AES128_CBC_SHA,
    ] {
        let result = resolve_signing_input(
            algorithm(HashAlgorithm::SHA1, SignatureAlgorithm::DSA),
            ProtocolVersion::SSL3,
            suite,
            DATA,
        );
        assert!(
            matches!(result, Err(Error::UnsupportedConfiguration(_))),
            "{:?}",
            suite
        );
    }
}

#[test]
fn modern_versions_sign_data_as_is() {
    for version in [
        ProtocolVersion::TLS1_2,
        ProtocolVersion::DTLS1_0,
        ProtocolVersion::DTLS1_2,
    ] {
        let input = resolve_signing_input(
            algorithm(HashAlgorithm::SHA384, SignatureAlgorithm::RSA),
            version,
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
            DATA,
        )
        .unwrap();
        assert_eq!(input.scheme_name(), "SHA384withRSA");
        assert_eq!(input.data.as_ref(), DATA);
    }
}

#[test]
fn anonymous_signature_is_empty() {
    let ctx = context(
        ProtocolVersion::TLS1_2,
        CipherSuite::ECDH_ANON_AES128_CBC_SHA,
        StaticKeyProvider::new(),
    );
    let signature = generate_signature(
        algorithm(HashAlgorithm::None, SignatureAlgorithm::Anonymous),
        &ctx,
        DATA,
    )
    .unwrap();
    assert!(signature.is_empty());
}

#[test]
fn missing_key_is_unsupported() {
    let ctx = context(
        ProtocolVersion::TLS1_2,
        CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
        StaticKeyProvider::new(),
    );
    let result = generate_signature(
        algorithm(HashAlgorithm::SHA256, SignatureAlgorithm::ECDSA),
        &ctx,
        DATA,
    );
    assert!(matches!(result, Err(Error::UnsupportedConfiguration(_))));
}

#[test]
fn pkcs8_key_is_loaded_into_matching_slot() {
    use p256::pkcs8::EncodePrivateKey;

    let der = p256_key().to_pkcs8_der().unwrap();
    let provider = StaticKeyProvider::new()
        .load_private_key(der.as_bytes())
        .unwrap();
    let ctx = context(
        ProtocolVersion::TLS1_2,
        CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
        provider,
    );

    let signature = generate_signature(
        algorithm(HashAlgorithm::SHA256, SignatureAlgorithm::ECDSA),
        &ctx,
        DATA,
    )
    .unwrap();
    // DER encoded SEQUENCE
    assert_eq!(signature[0], 0x30);
}
