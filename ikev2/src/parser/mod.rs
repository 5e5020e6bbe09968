//! Parser functionality to convert network-level bytes into [Message] structs
//!
//! Use the [Message::try_parse] associated function as an entrypoint.
//!
//! [Message]: crate::definitions::Message

mod configuration;
mod eap;
mod notification;
mod packet;
mod security_association;
mod traffic_selector;

pub(crate) use eap::parse_eap;
pub(crate) use notification::parse_delete;
pub(crate) use packet::parse_payload_chain;

use crate::definitions::params::PayloadType;
use crate::definitions::UnparseableParameter;
use thiserror::Error;

/// Failure while parsing an IKEv2 packet from network-level byte representation
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ParserError {
    #[error("Buffer too small to parse the packet")]
    BufferTooSmall,
    #[error("Wrong protocol, expected IKEv2")]
    WrongProtocol,
    #[error("Parameter could not be parsed: {0:#?}")]
    UnparseableParameter(UnparseableParameter),
    #[error("Payload length field points outside the buffer")]
    PayloadLengthOutOfBounds,
    #[error("Refusing a payload marked critical with unknown type {0}")]
    UnknownCriticalPayload(u8),
    #[error("Proposal numbering doesn't start at 1")]
    InvalidProposalNumberingStart,
    #[error("Proposal numbering doesn't increment by 1")]
    InvalidProposalNumbering,
    #[error("Payload structure violates the protocol")]
    ProtocolViolation,
}

impl From<UnparseableParameter> for ParserError {
    fn from(value: UnparseableParameter) -> Self {
        Self::UnparseableParameter(value)
    }
}

/// Simple type alias for results of parser functions
///
/// The `Ok` tuple contains the resulting payload, the size it
/// consumed in bytes and the next payload type
pub type ParserResult<T> = Result<(T, usize, PayloadType), ParserError>;
