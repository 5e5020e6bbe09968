//! Implementations for the associated function `try_build` of various IKEv2
//! packet types that converts high-level Rust structs into network-encoded
//! byte arrays

mod attribute;
mod configuration;
mod eap;
mod key_exchange;
mod notification;
mod packet;
mod payload;
mod proposal;
mod security_association;
mod traffic_selector;
mod transform;

pub(crate) use packet::try_build_payload_chain;

use thiserror::Error;

/// Guess for pre-allocating the buffer of a single payload
pub(crate) const ESTIMATED_PAYLOAD_LENGTH: usize = 64;
/// Guess for pre-allocating the buffer of a single proposal
pub(crate) const ESTIMATED_PROPOSAL_LENGTH: usize = 48;

/// Failure while converting a high-level struct into its network-level byte
/// representation
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum GeneratorError {
    #[error("A packet must contain less than 255 payloads")]
    TooManyPayloads,
    #[error("A security association must contain less than 255 proposals")]
    TooManyProposals,
    #[error("A proposal must contain less than 255 transforms")]
    TooManyTransforms,
    #[error("A nonce must be between 16 and 256 bytes long")]
    InvalidNonceLength,
    #[error("Payload data exceeds the 16-bit length field")]
    PayloadTooLarge,
}
