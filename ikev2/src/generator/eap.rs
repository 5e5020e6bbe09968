use zerocopy::network_endian::{U16, U32};
use zerocopy::AsBytes;

use crate::definitions::header::{EapExpandedHeader, EapHeader};
use crate::definitions::params::EAP_TYPE_EXPANDED;
use crate::definitions::{EapData, EapMessage};
use crate::generator::GeneratorError;

impl EapMessage {
    /// Build the EAP message body (without the generic payload header)
    pub(crate) fn try_build_body(&self) -> Result<Vec<u8>, GeneratorError> {
        let data = match &self.data {
            EapData::Empty => vec![],
            EapData::Standard(eap_type, data) => {
                let mut body = Vec::with_capacity(1 + data.len());
                body.push(*eap_type);
                body.extend_from_slice(data);
                body
            }
            EapData::Expanded(expanded) => {
                let header = EapExpandedHeader {
                    type_and_vendor: U32::from(
                        (EAP_TYPE_EXPANDED as u32) << 24 | (expanded.vendor_id & 0x00ff_ffff),
                    ),
                    vendor_type: U32::from(expanded.vendor_type),
                };
                let mut body = Vec::with_capacity(8 + expanded.vendor_data.len());
                body.extend_from_slice(header.as_bytes());
                body.extend_from_slice(&expanded.vendor_data);
                body
            }
        };

        let total = size_of::<EapHeader>() + data.len();
        if total > u16::MAX as usize {
            return Err(GeneratorError::PayloadTooLarge);
        }
        let header = EapHeader {
            code: self.code as u8,
            identifier: self.identifier,
            length: U16::from(total as u16),
        };
        let mut body = Vec::with_capacity(total);
        body.extend_from_slice(header.as_bytes());
        body.extend(data);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use crate::definitions::params::{EapCode, VENDOR_ID_3GPP, VENDOR_TYPE_EAP_5G};
    use crate::definitions::{EapData, EapExpanded, EapMessage};
    use crate::parser::parse_eap;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn success() {
        let msg = EapMessage {
            code: EapCode::Success,
            identifier: 0x42,
            data: EapData::Empty,
        };
        assert_eq!(
            msg.try_build_body().unwrap(),
            vec![0x03, 0x42, 0x00, 0x04]
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn expanded_round_trip() {
        let msg = EapMessage {
            code: EapCode::Request,
            identifier: 7,
            data: EapData::Expanded(EapExpanded {
                vendor_id: VENDOR_ID_3GPP,
                vendor_type: VENDOR_TYPE_EAP_5G,
                vendor_data: vec![0x01, 0x00],
            }),
        };
        let body = msg.try_build_body().unwrap();
        // 3GPP vendor id 10415 = 0x0028af
        assert_eq!(
            body,
            vec![
                0x01, 0x07, 0x00, 0x0e, // EAP header
                0xfe, 0x00, 0x28, 0xaf, // expanded type and vendor id
                0x00, 0x00, 0x00, 0x03, // vendor type EAP-5G
                0x01, 0x00, // vendor data: 5G-Start
            ]
        );
        let parsed = parse_eap(&body).unwrap();
        assert_eq!(msg, parsed);
    }
}
