use zerocopy::network_endian::U16;
use zerocopy::AsBytes;

use crate::definitions::header::{GenericPayloadHeader, KeyExchangeHeader};
use crate::definitions::params::PayloadType;
use crate::definitions::KeyExchange;

impl KeyExchange {
    pub(crate) fn build(&self, next_payload: PayloadType) -> Vec<u8> {
        let generic_header = GenericPayloadHeader {
            next_payload: next_payload as u8,
            critical: 0,
            payload_length: U16::from(8 + self.data.len() as u16),
        };
        let key_exchange_header = KeyExchangeHeader {
            dh_group_num: U16::from(self.dh_group as u16),
            reserved: U16::from(0),
        };
        let mut packet = Vec::with_capacity(self.data.len() + 8);
        packet.extend(generic_header.as_bytes());
        packet.extend_from_slice(key_exchange_header.as_bytes());
        packet.extend(self.data.clone());
        packet
    }
}
