use zerocopy::FromBytes;

use crate::definitions::header::{EapExpandedHeader, EapHeader};
use crate::definitions::params::{EapCode, EAP_TYPE_EXPANDED};
use crate::definitions::{EapData, EapExpanded, EapMessage};
use crate::parser::ParserError;

/// Parses an EAP message from the body of an Extensible Authentication
/// payload (without the generic payload header).
pub(crate) fn parse_eap(buf: &[u8]) -> Result<EapMessage, ParserError> {
    let header = EapHeader::ref_from_prefix(buf).ok_or(ParserError::BufferTooSmall)?;
    let total = header.length.get() as usize;
    if total < size_of::<EapHeader>() || total > buf.len() {
        return Err(ParserError::PayloadLengthOutOfBounds);
    }
    let code = EapCode::try_from(header.code)?;
    let body = &buf[size_of::<EapHeader>()..total];

    let data = match code {
        EapCode::Success | EapCode::Failure => EapData::Empty,
        EapCode::Request | EapCode::Response => {
            let (&eap_type, rest) = body.split_first().ok_or(ParserError::BufferTooSmall)?;
            if eap_type == EAP_TYPE_EXPANDED {
                // The expanded header spans the type octet plus the three
                // vendor id octets, so parse it from the body start
                let expanded = EapExpandedHeader::ref_from_prefix(body)
                    .ok_or(ParserError::BufferTooSmall)?;
                EapData::Expanded(EapExpanded {
                    vendor_id: expanded.type_and_vendor.get() & 0x00ff_ffff,
                    vendor_type: expanded.vendor_type.get(),
                    vendor_data: body[size_of::<EapExpandedHeader>()..].to_vec(),
                })
            } else {
                EapData::Standard(eap_type, rest.to_vec())
            }
        }
    };

    Ok(EapMessage {
        code,
        identifier: header.identifier,
        data,
    })
}
