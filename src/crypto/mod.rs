//! Cryptographic helpers used while preparing and handling messages.

mod keys;
pub mod prf;
pub mod signature;

pub use keys::{EcPrivateKey, KeyProvider, StaticKeyProvider};
pub use signature::{
    generate_signature, resolve_signing_input, sign_with_key, PrivateKey, SigningInput,
};
