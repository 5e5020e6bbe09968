use zerocopy::network_endian::U16;
use zerocopy::AsBytes;

use crate::definitions::header::{TrafficSelectorHeader, TrafficSelectorsHeader};
use crate::definitions::params::TrafficSelectorType;
use crate::definitions::TrafficSelectors;
use crate::generator::GeneratorError;

impl TrafficSelectors {
    /// Build the payload body (without the generic payload header)
    pub(crate) fn try_build_body(&self) -> Result<Vec<u8>, GeneratorError> {
        if self.selectors.len() >= 255 {
            return Err(GeneratorError::TooManyPayloads);
        }
        let header = TrafficSelectorsHeader {
            num_selectors: self.selectors.len() as u8,
            reserved: [0; 3],
        };
        let mut body = Vec::with_capacity(4 + 16 * self.selectors.len());
        body.extend_from_slice(header.as_bytes());
        for selector in &self.selectors {
            let selector_header = TrafficSelectorHeader {
                ts_type: TrafficSelectorType::Ipv4AddrRange as u8,
                ip_protocol: selector.ip_protocol,
                selector_length: U16::from(16),
                start_port: U16::from(selector.start_port),
                end_port: U16::from(selector.end_port),
            };
            body.extend_from_slice(selector_header.as_bytes());
            body.extend_from_slice(&selector.start_addr.octets());
            body.extend_from_slice(&selector.end_addr.octets());
        }
        Ok(body)
    }
}
