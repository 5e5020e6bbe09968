use zerocopy::AsBytes;

use crate::definitions::header::GenericPayloadHeader;
use crate::definitions::params::PayloadType;
use crate::definitions::SecurityAssociation;
use crate::generator::{GeneratorError, ESTIMATED_PROPOSAL_LENGTH};

impl SecurityAssociation {
    /// Build a network-level payload from a [SecurityAssociation]
    ///
    /// This might fail if the payload would not conform to the standard, for
    /// example if too many of a certain type of structure is required.
    pub fn try_build(&self, next_payload: PayloadType) -> Result<Vec<u8>, GeneratorError> {
        if self.proposals.len() >= 255 {
            return Err(GeneratorError::TooManyProposals);
        }
        let mut proposals = Vec::with_capacity(ESTIMATED_PROPOSAL_LENGTH * self.proposals.len());
        for (i, proposal) in self.proposals.iter().enumerate() {
            proposals.extend(proposal.try_build(i as u8 + 1, i == self.proposals.len() - 1)?);
        }

        let packet_length = 4 + proposals.len() as u16;
        let header = GenericPayloadHeader {
            next_payload: next_payload as u8,
            critical: 0,
            payload_length: packet_length.into(),
        };
        let mut packet = Vec::with_capacity(packet_length.into());
        packet.extend_from_slice(header.as_bytes());
        packet.extend(proposals);
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use crate::definitions::params::{
        EncryptionAlgorithm, IntegrityAlgorithm, KeyExchangeMethod, PayloadType,
        PseudorandomFunction, SecurityProtocol,
    };
    use crate::definitions::{Proposal, SecurityAssociation, Transform};

    #[test]
    #[allow(clippy::unwrap_used)]
    fn empty() {
        assert_eq!(
            SecurityAssociation { proposals: vec![] }
                .try_build(PayloadType::NoNextPayload)
                .unwrap(),
            vec![0x00, 0x00, 0x00, 0x04]
        )
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn simple_full() {
        let mut p = Proposal::new_empty(SecurityProtocol::InternetKeyExchange, Some(vec![0x42]));
        p.add(vec![
            Transform::Encryption(EncryptionAlgorithm::AesCbc, Some(256)),
            Transform::Integrity(IntegrityAlgorithm::HmacSha1_96),
            Transform::PseudoRandomFunction(PseudorandomFunction::HmacSha1),
            Transform::KeyExchange(KeyExchangeMethod::ModP2048),
        ]);
        assert_eq!(
            SecurityAssociation { proposals: vec![p] }
                .try_build(PayloadType::KeyExchange)
                .unwrap(),
            vec![
                0x22, 0x00, 0x00, 0x31, // Security Association header
                0x00, 0x00, 0x00, 0x2d, 0x01, 0x01, 0x01, 0x04, // Proposal header
                0x42, // SPI
                0x03, 0x00, 0x00, 0x0c, 0x01, 0x00, 0x00, 0x0c, // Transform 1, encryption
                0x80, 0x0e, 0x01, 0x00, // Transform 1 attributes
                0x03, 0x00, 0x00, 0x08, 0x02, 0x00, 0x00, 0x02, // Transform 2, PRF
                0x03, 0x00, 0x00, 0x08, 0x03, 0x00, 0x00, 0x02, // Transform 3, integrity
                0x00, 0x00, 0x00, 0x08, 0x04, 0x00, 0x00, 0x0e // Transform 4, key exchange
            ]
        )
    }
}
