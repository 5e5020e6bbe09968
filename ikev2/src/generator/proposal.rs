use zerocopy::network_endian::U16;
use zerocopy::AsBytes;

use crate::definitions::{Proposal, Transform};
use crate::generator::GeneratorError;

impl Proposal {
    /// Convert a [Proposal] into a network-level vector of bytes
    ///
    /// The argument `num` defines the number of the proposal in the list of
    /// proposals in a Security Association.
    ///
    /// The argument `last` defines if any proposal is following this proposal
    /// (false) or if this proposal is the last proposal in the Security
    /// Association payload (true).
    ///
    /// Transforms are emitted grouped by type in the order encryption,
    /// pseudorandom function, integrity, key exchange, sequence numbers,
    /// preserving the order within each group.
    pub fn try_build(&self, num: u8, last: bool) -> Result<Vec<u8>, GeneratorError> {
        if self.len() >= 255 {
            return Err(GeneratorError::TooManyTransforms);
        }
        let ordered: Vec<Transform> = self
            .encryption_algorithms
            .iter()
            .map(|(a, k)| Transform::Encryption(*a, *k))
            .chain(
                self.pseudo_random_functions
                    .iter()
                    .map(|p| Transform::PseudoRandomFunction(*p)),
            )
            .chain(self.integrity_algorithms.iter().map(|i| Transform::Integrity(*i)))
            .chain(self.key_exchange_methods.iter().map(|k| Transform::KeyExchange(*k)))
            .chain(self.sequence_numbers.iter().map(|s| Transform::SequenceNumber(*s)))
            .collect();

        let mut transforms = Vec::with_capacity(12 * ordered.len());
        for (i, transform) in ordered.iter().enumerate() {
            transforms.extend(transform.build(i == ordered.len() - 1));
        }

        let packet_length = 8 + self.spi.len() as u16 + transforms.len() as u16;
        let mut packet = Vec::with_capacity(packet_length as usize);
        packet.push(if last { 0 } else { 2 });
        packet.push(0);
        packet.extend_from_slice(U16::from(packet_length).as_bytes());
        packet.push(num);
        packet.push(self.protocol as u8);
        packet.push(self.spi.len() as u8);
        packet.push(ordered.len() as u8);
        packet.extend(self.spi.clone());
        packet.extend(transforms);
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use crate::definitions::params::{KeyExchangeMethod, SecurityProtocol};
    use crate::definitions::{Proposal, Transform};

    #[test]
    #[allow(clippy::unwrap_used)]
    fn empty() {
        assert_eq!(
            Proposal::new_empty(SecurityProtocol::InternetKeyExchange, None)
                .try_build(1, true)
                .unwrap(),
            vec![0x00, 0x00, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00]
        );
        assert_eq!(
            Proposal::new_empty(SecurityProtocol::AuthenticationHeader, None)
                .try_build(0x42, false)
                .unwrap(),
            vec![0x02, 0x00, 0x00, 0x08, 0x42, 0x02, 0x00, 0x00]
        );
        assert_eq!(
            Proposal::new_empty(
                SecurityProtocol::InternetKeyExchange,
                Some(vec![0x13, 0x37])
            )
            .try_build(1, true)
            .unwrap(),
            vec![0x00, 0x00, 0x00, 0x0a, 0x01, 0x01, 0x02, 0x00, 0x13, 0x37]
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn single() {
        let mut p = Proposal::new_empty(SecurityProtocol::InternetKeyExchange, None);
        p.add(vec![Transform::KeyExchange(KeyExchangeMethod::ModP2048)]);
        assert_eq!(
            p.try_build(1, true).unwrap(),
            vec![
                0x00, 0x00, 0x00, 0x10, 0x01, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x08, 0x04,
                0x00, 0x00, 0x0e
            ]
        );
    }
}
