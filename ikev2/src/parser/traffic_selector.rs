use std::net::Ipv4Addr;

use log::warn;
use zerocopy::FromBytes;

use crate::definitions::header::{TrafficSelectorHeader, TrafficSelectorsHeader};
use crate::definitions::params::TrafficSelectorType;
use crate::definitions::{TrafficSelector, TrafficSelectors};
use crate::parser::ParserError;

impl TrafficSelectors {
    /// Parses a buffer into a [TrafficSelectors] payload. The buffer must
    /// not contain the generic payload header.
    ///
    /// Selectors of types other than TS_IPV4_ADDR_RANGE are skipped, since
    /// the profile assigns IPv4 inner addresses exclusively.
    pub(crate) fn try_parse(buf: &[u8]) -> Result<Self, ParserError> {
        let header =
            TrafficSelectorsHeader::ref_from_prefix(buf).ok_or(ParserError::BufferTooSmall)?;

        let mut selectors = vec![];
        let mut offset = size_of::<TrafficSelectorsHeader>();
        for _ in 0..header.num_selectors {
            let selector_header = TrafficSelectorHeader::ref_from_prefix(&buf[offset..])
                .ok_or(ParserError::BufferTooSmall)?;
            let total = selector_header.selector_length.get() as usize;
            if total < size_of::<TrafficSelectorHeader>() || offset + total > buf.len() {
                return Err(ParserError::PayloadLengthOutOfBounds);
            }

            match TrafficSelectorType::try_from(selector_header.ts_type) {
                Ok(TrafficSelectorType::Ipv4AddrRange) => {
                    let body = &buf[offset + size_of::<TrafficSelectorHeader>()..offset + total];
                    if body.len() != 8 {
                        return Err(ParserError::PayloadLengthOutOfBounds);
                    }
                    selectors.push(TrafficSelector {
                        ip_protocol: selector_header.ip_protocol,
                        start_port: selector_header.start_port.get(),
                        end_port: selector_header.end_port.get(),
                        start_addr: Ipv4Addr::new(body[0], body[1], body[2], body[3]),
                        end_addr: Ipv4Addr::new(body[4], body[5], body[6], body[7]),
                    });
                }
                Ok(other) => warn!("Skipping traffic selector of type {other:?}"),
                Err(region) => warn!(
                    "Skipping traffic selector of unknown type {} ({region:?})",
                    selector_header.ts_type
                ),
            }

            offset += total;
        }

        Ok(Self { selectors })
    }
}
