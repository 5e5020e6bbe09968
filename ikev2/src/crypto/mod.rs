//! Cryptographic primitives for the negotiable transform sets: MODP
//! Diffie-Hellman groups, pseudorandom functions with the `prf+` expansion,
//! integrity checksums, CBC encryption, RSA signatures and the SK payload
//! sealing built on top of them.
//!
//! Nothing in this module holds SA state; keys and IVs are always passed in
//! by the caller.

pub mod auth;
pub mod dh;
pub mod encr;
pub mod encrypted;
pub mod integ;
pub mod prf;

use thiserror::Error;

use crate::generator::GeneratorError;
use crate::parser::ParserError;

/// Failure inside one of the cryptographic primitives or the SK payload
/// handling
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum CryptoError {
    #[error("The transform is not implemented in software")]
    UnsupportedTransform,
    #[error("Key length does not fit the transform")]
    InvalidKeyLength,
    #[error("IV length does not match the cipher block length")]
    InvalidIvLength,
    #[error("Integrity checksum verification failed")]
    IntegrityCheckFailed,
    #[error("Decrypted padding is malformed")]
    InvalidPadding,
    #[error("Requested key material exceeds the prf+ counter")]
    KeyMaterialTooLong,
    #[error("Message carries no encrypted payload")]
    MissingEncryptedPayload,
    #[error("Peer sent a degenerate public value")]
    WeakPeerPublicValue,
    #[error("Parameters of the DH group could not be loaded")]
    DhGroup,
    #[error("RSA signature operation failed: {0}")]
    Signature(#[from] rsa::Error),
    #[error("Plaintext recovered from an SK payload could not be parsed: {0}")]
    Parser(#[from] ParserError),
    #[error("Payloads for an SK payload could not be built: {0}")]
    Generator(#[from] GeneratorError),
}
