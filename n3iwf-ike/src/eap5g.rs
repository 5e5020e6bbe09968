//! Framing of EAP-5G messages: EAP-Expanded envelopes with the 3GPP vendor
//! id carrying 5G-Start, 5G-NAS and 5G-Stop between UE and AMF
//!
//! The vendor data stays opaque to this module beyond its first octet, the
//! message id; unmarshalling the NAS content is the NGAP side's business.

use ikev2::definitions::params::{EapCode, VENDOR_ID_3GPP, VENDOR_TYPE_EAP_5G};
use ikev2::definitions::{EapData, EapExpanded, EapMessage};

use crate::random::RandomSource;

/// Message id of 5G-Start: the N3IWF asks the UE to begin NAS signalling
pub const MESSAGE_ID_5G_START: u8 = 1;
/// Message id of 5G-NAS: a NAS PDU is carried in the envelope
pub const MESSAGE_ID_5G_NAS: u8 = 2;
/// Message id of 5G-Stop: the UE aborts the procedure
pub const MESSAGE_ID_5G_STOP: u8 = 4;

/// Value of the spare octet following the message id
const SPARE: u8 = 0;

/// Build the EAP request carrying 5G-Start
pub fn build_start_request(identifier: u8) -> EapMessage {
    EapMessage {
        code: EapCode::Request,
        identifier,
        data: EapData::Expanded(EapExpanded {
            vendor_id: VENDOR_ID_3GPP,
            vendor_type: VENDOR_TYPE_EAP_5G,
            vendor_data: vec![MESSAGE_ID_5G_START, SPARE],
        }),
    }
}

/// Build the EAP request carrying a downlink NAS PDU in a 5G-NAS message
pub fn build_nas_request(identifier: u8, nas_pdu: &[u8]) -> EapMessage {
    let mut vendor_data = Vec::with_capacity(4 + nas_pdu.len());
    vendor_data.push(MESSAGE_ID_5G_NAS);
    vendor_data.push(SPARE);
    vendor_data.extend_from_slice(&(nas_pdu.len() as u16).to_be_bytes());
    vendor_data.extend_from_slice(nas_pdu);
    EapMessage {
        code: EapCode::Request,
        identifier,
        data: EapData::Expanded(EapExpanded {
            vendor_id: VENDOR_ID_3GPP,
            vendor_type: VENDOR_TYPE_EAP_5G,
            vendor_data,
        }),
    }
}

/// Build an EAP-Success message
pub fn build_success(identifier: u8) -> EapMessage {
    EapMessage {
        code: EapCode::Success,
        identifier,
        data: EapData::Empty,
    }
}

/// Build an EAP-Failure message
pub fn build_failure(identifier: u8) -> EapMessage {
    EapMessage {
        code: EapCode::Failure,
        identifier,
        data: EapData::Empty,
    }
}

/// Whether an expanded payload is an EAP-5G envelope
pub fn is_eap_5g(expanded: &EapExpanded) -> bool {
    expanded.vendor_id == VENDOR_ID_3GPP && expanded.vendor_type == VENDOR_TYPE_EAP_5G
}

/// The message id in the first vendor data octet
pub fn vendor_message_id(vendor_data: &[u8]) -> Option<u8> {
    vendor_data.first().copied()
}

/// Draw an EAP identifier distinct from the previous one
pub fn draw_identifier(rng: &dyn RandomSource, last: u8) -> u8 {
    loop {
        let identifier = rng.next_u8();
        if identifier != last {
            return identifier;
        }
    }
}

#[cfg(test)]
mod tests {
    use ikev2::definitions::EapData;

    use super::{
        build_nas_request, build_start_request, is_eap_5g, vendor_message_id,
        MESSAGE_ID_5G_NAS, MESSAGE_ID_5G_START,
    };

    #[test]
    fn start_request_shape() {
        let msg = build_start_request(3);
        let EapData::Expanded(expanded) = &msg.data else {
            panic!("expected an expanded payload");
        };
        assert!(is_eap_5g(expanded));
        assert_eq!(
            vendor_message_id(&expanded.vendor_data),
            Some(MESSAGE_ID_5G_START)
        );
    }

    #[test]
    fn nas_request_carries_the_pdu_with_its_length() {
        let msg = build_nas_request(4, &[0xde, 0xad, 0xbe]);
        let EapData::Expanded(expanded) = &msg.data else {
            panic!("expected an expanded payload");
        };
        assert_eq!(
            vendor_message_id(&expanded.vendor_data),
            Some(MESSAGE_ID_5G_NAS)
        );
        assert_eq!(
            expanded.vendor_data,
            vec![0x02, 0x00, 0x00, 0x03, 0xde, 0xad, 0xbe]
        );
    }
}
