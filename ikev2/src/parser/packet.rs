use log::warn;
use zerocopy::FromBytes;

use crate::definitions::header::{
    AuthenticationHeader, GenericPayloadHeader, Header, IdentificationHeader, KeyExchangeHeader,
};
use crate::definitions::params::{
    AuthenticationMethod, CertificateEncoding, ExchangeType, IdentificationType,
    KeyExchangeMethod, PayloadType, FLAG_INITIATOR, FLAG_RESPONSE,
};
use crate::definitions::{
    Authentication, Certificate, CertificateRequest, Configuration, EncryptedPayload,
    Identification, KeyExchange, Message, Notification, Payload, SecurityAssociation,
    TrafficSelectors,
};
use crate::parser::ParserError;
use crate::{IKE_2_VERSION_VALUE, IKE_HEADER_LEN};

impl Message {
    /// Parse a buffer into a [Message], if possible.
    ///
    /// The parser considers the size of payloads noted in the generic header
    /// of the respective payload to split the buffer and feed them into
    /// sub-parser functions. Every length field is validated against the
    /// slice bounds before any further parsing happens. A payload whose type
    /// is unknown is skipped unless its critical bit is set, in which case
    /// the whole message is rejected.
    pub fn try_parse(buf: &[u8]) -> Result<Self, ParserError> {
        let header = Header::ref_from_prefix(buf).ok_or(ParserError::BufferTooSmall)?;
        if header.version != IKE_2_VERSION_VALUE {
            return Err(ParserError::WrongProtocol);
        }
        if header.length.get() as usize != buf.len() {
            warn!("Buffer length does not match header length");
        }

        let payloads = parse_payload_chain(header.next_payload, &buf[IKE_HEADER_LEN..])?;

        Ok(Self {
            initiator_spi: header.initiator_spi.get(),
            responder_spi: header.responder_spi.get(),
            exchange_type: ExchangeType::try_from(header.exchange_type)?,
            initiator: header.flags & FLAG_INITIATOR == FLAG_INITIATOR,
            response: header.flags & FLAG_RESPONSE == FLAG_RESPONSE,
            message_id: header.message_id.get(),
            payloads,
        })
    }
}

/// Walk a chain of payloads starting with the given payload type.
///
/// The chain is also used for the plaintext payloads recovered from an SK
/// payload, which is why it is separate from the packet parser.
pub(crate) fn parse_payload_chain(
    first: u8,
    buf: &[u8],
) -> Result<Vec<Payload>, ParserError> {
    let mut offset = 0;
    let mut next_type = first;
    let mut payloads = vec![];

    while next_type != PayloadType::NoNextPayload as u8 {
        let header = GenericPayloadHeader::ref_from_prefix(&buf[offset..])
            .ok_or(ParserError::BufferTooSmall)?;
        let total = header.payload_length.get() as usize;
        if total < size_of::<GenericPayloadHeader>() || offset + total > buf.len() {
            return Err(ParserError::PayloadLengthOutOfBounds);
        }
        let body = &buf[offset + size_of::<GenericPayloadHeader>()..offset + total];

        match PayloadType::try_from(next_type) {
            Ok(PayloadType::NoNextPayload) => break,
            Ok(PayloadType::SecurityAssociation) => {
                let sa = if body.is_empty() {
                    SecurityAssociation { proposals: vec![] }
                } else {
                    SecurityAssociation::try_parse(body)?
                };
                payloads.push(Payload::SecurityAssociation(sa));
            }
            Ok(PayloadType::KeyExchange) => {
                payloads.push(Payload::KeyExchange(parse_key_exchange(body)?));
            }
            Ok(PayloadType::IdentificationInitiator) => {
                payloads.push(Payload::IdentificationInitiator(parse_identification(body)?));
            }
            Ok(PayloadType::IdentificationResponder) => {
                payloads.push(Payload::IdentificationResponder(parse_identification(body)?));
            }
            Ok(PayloadType::Certificate) => {
                let (encoding, data) = parse_encoding_prefixed(body)?;
                payloads.push(Payload::Certificate(Certificate { encoding, data }));
            }
            Ok(PayloadType::CertificateRequest) => {
                let (encoding, authorities) = parse_encoding_prefixed(body)?;
                payloads.push(Payload::CertificateRequest(CertificateRequest {
                    encoding,
                    authorities,
                }));
            }
            Ok(PayloadType::Authentication) => {
                payloads.push(Payload::Authentication(parse_authentication(body)?));
            }
            Ok(PayloadType::Nonce) => {
                payloads.push(Payload::Nonce(body.to_vec()));
            }
            Ok(PayloadType::Notify) => {
                payloads.push(Payload::Notify(Notification::try_parse(body)?));
            }
            Ok(PayloadType::Delete) => {
                payloads.push(Payload::Delete(super::notification::parse_delete(body)?));
            }
            Ok(PayloadType::VendorID) => {
                payloads.push(Payload::VendorId(body.to_vec()));
            }
            Ok(PayloadType::TrafficSelectorInitiator) => {
                payloads.push(Payload::TrafficSelectorInitiator(
                    TrafficSelectors::try_parse(body)?,
                ));
            }
            Ok(PayloadType::TrafficSelectorResponder) => {
                payloads.push(Payload::TrafficSelectorResponder(
                    TrafficSelectors::try_parse(body)?,
                ));
            }
            Ok(PayloadType::EncryptedAndAuthenticated) => {
                // The encrypted payload must be the last payload of a packet;
                // its next payload field describes the first payload of the
                // chain recovered after decryption instead.
                payloads.push(Payload::Encrypted(EncryptedPayload {
                    first_inner: PayloadType::try_from(header.next_payload)?,
                    data: body.to_vec(),
                }));
                return Ok(payloads);
            }
            Ok(PayloadType::Configuration) => {
                payloads.push(Payload::Configuration(Configuration::try_parse(body)?));
            }
            Ok(PayloadType::ExtensibleAuthentication) => {
                payloads.push(Payload::Eap(super::eap::parse_eap(body)?));
            }
            Ok(other) => {
                warn!("Unsupported payload type ignored: {other:#?}");
            }
            Err(region) => {
                if header.critical & 0b1000_0000 != 0 {
                    return Err(ParserError::UnknownCriticalPayload(next_type));
                }
                warn!("Unknown payload type ({region:?}) ignored: {next_type}");
            }
        }

        next_type = header.next_payload;
        offset += total;
    }

    Ok(payloads)
}

fn parse_key_exchange(body: &[u8]) -> Result<KeyExchange, ParserError> {
    let header = KeyExchangeHeader::ref_from_prefix(body).ok_or(ParserError::BufferTooSmall)?;
    Ok(KeyExchange {
        dh_group: KeyExchangeMethod::try_from(header.dh_group_num.get())?,
        data: body[size_of::<KeyExchangeHeader>()..].to_vec(),
    })
}

fn parse_identification(body: &[u8]) -> Result<Identification, ParserError> {
    let header =
        IdentificationHeader::ref_from_prefix(body).ok_or(ParserError::BufferTooSmall)?;
    Ok(Identification {
        id_type: IdentificationType::try_from(header.id_type)?,
        data: body[size_of::<IdentificationHeader>()..].to_vec(),
    })
}

fn parse_authentication(body: &[u8]) -> Result<Authentication, ParserError> {
    let header =
        AuthenticationHeader::ref_from_prefix(body).ok_or(ParserError::BufferTooSmall)?;
    Ok(Authentication {
        method: AuthenticationMethod::try_from(header.auth_method)?,
        data: body[size_of::<AuthenticationHeader>()..].to_vec(),
    })
}

fn parse_encoding_prefixed(body: &[u8]) -> Result<(CertificateEncoding, Vec<u8>), ParserError> {
    let (&encoding, rest) = body.split_first().ok_or(ParserError::BufferTooSmall)?;
    Ok((CertificateEncoding::try_from(encoding)?, rest.to_vec()))
}

#[cfg(test)]
mod tests {
    use crate::definitions::params::ExchangeType;
    use crate::definitions::{Message, Payload, SecurityAssociation};

    #[test]
    #[allow(clippy::unwrap_used)]
    fn parse_empty_packet() {
        let buff = vec![
            0x00, 0x04, 0xc0, 0x1d, 0xb4, 0x00, 0xb0, 0xc9, // initiator
            0x00, 0x00, 0x00, 0x00, 0x11, 0xf1, 0x5b, 0xa3, // responder
            0x00, // next payload
            0x20, // version
            0x25, // exchange type
            0x20, // flags, 0b00100000
            0x3b, 0x9a, 0xc9, 0xff, // message ID
            0x00, 0x00, 0x00, 0x1c, // length
        ];
        let packet = Message::try_parse(buff.as_slice()).unwrap();
        assert_eq!(packet.initiator_spi, 1337133713371337);
        assert_eq!(packet.responder_spi, 301030307);
        assert_eq!(packet.message_id, 0x3b9ac9ff);
        assert_eq!(packet.exchange_type, ExchangeType::Informational);
        assert!(packet.response);
        assert_eq!(packet.payloads.len(), 0);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn parse_empty_sa_in_packet() {
        let buff = vec![
            0x00, 0x04, 0xc0, 0x1d, 0xb4, 0x00, 0xb0, 0xc9, // initiator
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // responder
            0x21, // next payload, Security Association
            0x20, // version
            0x22, // exchange type
            0x08, // flags, 0b00001000
            0x1b, 0xad, 0xc9, 0xee, // message ID
            0x00, 0x00, 0x00, 0x20, // length
            0x00, 0x00, 0x00, 0x04, // Security Association (generic payload) header
        ];
        let packet = Message::try_parse(buff.as_slice()).unwrap();
        assert_eq!(packet.initiator_spi, 1337133713371337);
        assert_eq!(packet.responder_spi, 0);
        assert_eq!(packet.message_id, 0x1badc9ee);
        assert_eq!(packet.exchange_type, ExchangeType::IkeSaInit);
        assert!(!packet.response);
        assert!(packet.initiator);
        assert_eq!(packet.payloads.len(), 1);
        assert_eq!(
            packet.payloads[0],
            Payload::SecurityAssociation(SecurityAssociation { proposals: vec![] })
        );
    }

    #[test]
    fn reject_wrong_version() {
        let buff = vec![
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // initiator
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // responder
            0x00, // next payload
            0x30, // version 3.0
            0x22, // exchange type
            0x08, // flags
            0x00, 0x00, 0x00, 0x00, // message ID
            0x00, 0x00, 0x00, 0x1c, // length
        ];
        assert!(Message::try_parse(buff.as_slice()).is_err());
    }

    #[test]
    fn reject_overlong_payload_length() {
        let buff = vec![
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // initiator
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // responder
            0x28, // next payload, Nonce
            0x20, // version
            0x22, // exchange type
            0x08, // flags
            0x00, 0x00, 0x00, 0x00, // message ID
            0x00, 0x00, 0x00, 0x24, // length
            0x00, 0x00, 0xff, 0xff, // Nonce header with absurd length
            0x13, 0x37, 0x13, 0x37, // alleged nonce data
        ];
        assert!(Message::try_parse(buff.as_slice()).is_err());
    }
}
