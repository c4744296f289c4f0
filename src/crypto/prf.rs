use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha384};
use zeroize::Zeroizing;

use crate::types::{HashAlgorithm, ProtocolVersion};
use crate::Error;

pub const MASTER_SECRET_LABEL: &str = "master secret";
pub const MASTER_SECRET_LENGTH: usize = 48;

/// PRF for TLS 1.2
/// as specified in RFC 5246 Section 5.
///
/// PRF(secret, label, seed) = P_<hash>(secret, label + seed)
pub fn prf_tls12(
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
    hash: HashAlgorithm,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let full_seed = compute_full_seed(label, seed);
    match hash {
        HashAlgorithm::SHA256 => p_hash::<Hmac<Sha256>>(secret, &full_seed, output_len),
        HashAlgorithm::SHA384 => p_hash::<Hmac<Sha384>>(secret, &full_seed, output_len),
        _ => Err(Error::unsupported(format!(
            "Unsupported PRF hash for TLS1.2: {:?}",
            hash
        ))),
    }
}

/// PRF for TLS 1.0 and 1.1 (RFC 2246 Section 5).
///
/// The secret is split in two halves sharing the middle byte on odd
/// lengths; P_MD5 over the first and P_SHA1 over the second are XORed.
pub fn prf_tls10(
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let full_seed = compute_full_seed(label, seed);
    let half = (secret.len() + 1) / 2;
    let s1 = &secret[..half];
    let s2 = &secret[secret.len() - half..];

    let mut output = p_hash::<Hmac<Md5>>(s1, &full_seed, output_len)?;
    let sha = p_hash::<Hmac<Sha1>>(s2, &full_seed, output_len)?;
    for (o, s) in output.iter_mut().zip(sha.iter()) {
        *o ^= s;
    }
    Ok(output)
}

/// master_secret = PRF(pre_master_secret, "master secret",
///                     client_random + server_random)[0..47]
pub fn calculate_master_secret(
    version: ProtocolVersion,
    prf_hash: HashAlgorithm,
    pre_master_secret: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);

    match version {
        ProtocolVersion::TLS1_2 | ProtocolVersion::DTLS1_2 => prf_tls12(
            pre_master_secret,
            MASTER_SECRET_LABEL,
            &seed,
            MASTER_SECRET_LENGTH,
            prf_hash,
        ),
        ProtocolVersion::TLS1_0 | ProtocolVersion::TLS1_1 | ProtocolVersion::DTLS1_0 => prf_tls10(
            pre_master_secret,
            MASTER_SECRET_LABEL,
            &seed,
            MASTER_SECRET_LENGTH,
        ),
        other => Err(Error::unsupported(format!(
            "No master secret derivation for {}",
            other
        ))),
    }
}

fn compute_full_seed(label: &str, seed: &[u8]) -> Vec<u8> {
    let mut full_seed = Vec::with_capacity(label.len() + seed.len());
    full_seed.extend_from_slice(label.as_bytes());
    full_seed.extend_from_slice(seed);
    full_seed
}

fn p_hash<M>(secret: &[u8], full_seed: &[u8], output_len: usize) -> Result<Zeroizing<Vec<u8>>, Error>
where
    M: Mac + hmac::digest::KeyInit + Clone,
{
    let mut result = Zeroizing::new(Vec::with_capacity(output_len));

    let key = <M as Mac>::new_from_slice(secret)
        .map_err(|_| Error::crypto_msg("HMAC key rejected"))?;

    // A(1) = HMAC_hash(secret, A(0)) where A(0) = seed
    let mut a = {
        let mut mac = key.clone();
        mac.update(full_seed);
        mac.finalize().into_bytes()
    };

    while result.len() < output_len {
        // HMAC_hash(secret, A(i) + seed)
        let mut mac = key.clone();
        mac.update(&a);
        mac.update(full_seed);
        let output = mac.finalize().into_bytes();

        let remaining = output_len - result.len();
        let to_copy = remaining.min(output.len());
        result.extend_from_slice(&output[..to_copy]);

        if result.len() < output_len {
            // A(i+1) = HMAC_hash(secret, A(i))
            let mut mac = key.clone();
            mac.update(&a);
            a = mac.finalize().into_bytes();
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls12_prf_known_answer() {
        // Test vector from the IETF TLS WG mailing list for P_SHA256.
        let secret = [
            0x9b, 0xbe, 0x43, 0x6b, 0xa9, 0x40, 0xf0, 0x17, 0xb1, 0x76, 0x52, 0x84, 0x9a, 0x71,
            0xdb, 0x35,
        ];
        let seed = [
            0xa0, 0xba, 0x9f, 0x93, 0x6c, 0xda, 0x31, 0x18, 0x27, 0xa6, 0xf7, 0x96, 0xff, 0xd5,
            0x19, 0x8c,
        ];
        let out = prf_tls12(&secret, "test label", &seed, 16, HashAlgorithm::SHA256).unwrap();
        assert_eq!(
            out.as_slice(),
            &[
                0xe3, 0xf2, 0x29, 0xba, 0x72, 0x7b, 0xe1, 0x7b, 0x8d, 0x12, 0x26, 0x20, 0x55, 0x7c,
                0xd4, 0x53,
            ]
        );
    }

    #[test]
    fn tls10_prf_output_length() {
        let out = prf_tls10(&[1, 2, 3], MASTER_SECRET_LABEL, &[0; 64], 48).unwrap();
        assert_eq!(out.len(), 48);
        let again = prf_tls10(&[1, 2, 3], MASTER_SECRET_LABEL, &[0; 64], 48).unwrap();
        assert_eq!(out, again);
    }

    #[test]
    fn ssl3_has_no_master_secret() {
        let res = calculate_master_secret(
            ProtocolVersion::SSL3,
            HashAlgorithm::SHA256,
            &[0; 8],
            &[0; 32],
            &[0; 32],
        );
        assert!(matches!(res, Err(Error::UnsupportedConfiguration(_))));
    }
}
