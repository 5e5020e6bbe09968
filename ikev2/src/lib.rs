//! # ikev2
//!
//! Wire-level definitions, parsers, generators and cryptographic primitives
//! for IKEv2 (RFC 7296) as used by the N3IWF untrusted-access responder.

#![warn(missing_docs, clippy::unwrap_used, clippy::expect_used)]

pub mod crypto;
pub mod definitions;
pub mod generator;
pub mod parser;

pub use strum;
pub use zerocopy;

/// Constant value for IKEv2 in the packet header, as <major>.<minor> in 4 bits
/// each, where the <major> is 2 and the <minor> is zero.
pub const IKE_2_VERSION_VALUE: u8 = 0b00100000;

/// Byte length of the fixed IKE message header
pub const IKE_HEADER_LEN: usize = 28;
