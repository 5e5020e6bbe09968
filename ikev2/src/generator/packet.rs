use zerocopy::network_endian::{U32, U64};
use zerocopy::AsBytes;

use crate::definitions::params::{PayloadType, FLAG_INITIATOR, FLAG_RESPONSE};
use crate::definitions::{Header, Message, Payload};
use crate::generator::{GeneratorError, ESTIMATED_PAYLOAD_LENGTH};
use crate::{IKE_2_VERSION_VALUE, IKE_HEADER_LEN};

impl Message {
    /// Build the network representation of this message.
    ///
    /// Payloads are chained in the order they appear in [Message::payloads];
    /// an encrypted payload instead chains to its first inner payload and
    /// must be the last payload of the message.
    pub fn try_build(&self) -> Result<Vec<u8>, GeneratorError> {
        if self.payloads.len() >= 255 {
            return Err(GeneratorError::TooManyPayloads);
        }
        let payloads = try_build_payload_chain(&self.payloads)?;

        let packet_length = (IKE_HEADER_LEN + payloads.len()) as u32;
        let header = Header {
            initiator_spi: U64::from(self.initiator_spi),
            responder_spi: U64::from(self.responder_spi),
            next_payload: match self.payloads.first() {
                None => PayloadType::NoNextPayload,
                Some(Payload::Encrypted(_)) => PayloadType::EncryptedAndAuthenticated,
                Some(t) => t.into(),
            } as u8,
            version: IKE_2_VERSION_VALUE,
            exchange_type: self.exchange_type as u8,
            flags: (if self.initiator { FLAG_INITIATOR } else { 0 })
                | (if self.response { FLAG_RESPONSE } else { 0 }),
            message_id: U32::from(self.message_id),
            length: U32::from(packet_length),
        };

        let mut packet = Vec::with_capacity(packet_length as usize);
        packet.extend_from_slice(header.as_bytes());
        packet.extend(payloads);
        Ok(packet)
    }
}

/// Build a chain of payloads where each generic header points at the type of
/// the following payload.
///
/// This is shared between the packet generator and the SK payload sealing,
/// which encrypts a chain of plaintext payloads.
pub(crate) fn try_build_payload_chain(payloads: &[Payload]) -> Result<Vec<u8>, GeneratorError> {
    let mut chain = Vec::with_capacity(ESTIMATED_PAYLOAD_LENGTH * payloads.len());
    for (i, payload) in payloads.iter().enumerate() {
        chain.extend(payload.try_build(match payloads.get(i + 1) {
            None => PayloadType::NoNextPayload,
            Some(next) => next.into(),
        })?);
    }
    Ok(chain)
}
