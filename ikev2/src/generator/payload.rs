use zerocopy::network_endian::U16;
use zerocopy::AsBytes;

use crate::definitions::header::{
    AuthenticationHeader, GenericPayloadHeader, IdentificationHeader,
};
use crate::definitions::params::PayloadType;
use crate::definitions::Payload;
use crate::generator::GeneratorError;

impl Payload {
    pub(crate) fn try_build(&self, next_payload: PayloadType) -> Result<Vec<u8>, GeneratorError> {
        if let Payload::Nonce(v) = self {
            if v.len() < 16 || v.len() > 256 {
                return Err(GeneratorError::InvalidNonceLength);
            }
        }
        match self {
            Payload::SecurityAssociation(v) => v.try_build(next_payload),
            Payload::KeyExchange(v) => Ok(v.build(next_payload)),
            Payload::IdentificationInitiator(v) | Payload::IdentificationResponder(v) => {
                let header = IdentificationHeader {
                    id_type: v.id_type as u8,
                    reserved: [0; 3],
                };
                let mut body = Vec::with_capacity(4 + v.data.len());
                body.extend_from_slice(header.as_bytes());
                body.extend_from_slice(&v.data);
                self.try_build_generic(next_payload, &body)
            }
            Payload::Certificate(v) => {
                let mut body = Vec::with_capacity(1 + v.data.len());
                body.push(v.encoding as u8);
                body.extend_from_slice(&v.data);
                self.try_build_generic(next_payload, &body)
            }
            Payload::CertificateRequest(v) => {
                let mut body = Vec::with_capacity(1 + v.authorities.len());
                body.push(v.encoding as u8);
                body.extend_from_slice(&v.authorities);
                self.try_build_generic(next_payload, &body)
            }
            Payload::Authentication(v) => {
                let header = AuthenticationHeader {
                    auth_method: v.method as u8,
                    reserved: [0; 3],
                };
                let mut body = Vec::with_capacity(4 + v.data.len());
                body.extend_from_slice(header.as_bytes());
                body.extend_from_slice(&v.data);
                self.try_build_generic(next_payload, &body)
            }
            Payload::Notify(v) => v.try_build(next_payload),
            Payload::Delete(v) => Ok(v.build(next_payload)),
            Payload::TrafficSelectorInitiator(v) | Payload::TrafficSelectorResponder(v) => {
                let body = v.try_build_body()?;
                self.try_build_generic(next_payload, &body)
            }
            Payload::Configuration(v) => {
                let body = v.build_body();
                self.try_build_generic(next_payload, &body)
            }
            Payload::Eap(v) => {
                let body = v.try_build_body()?;
                self.try_build_generic(next_payload, &body)
            }
            // The encrypted payload chains to its first inner payload instead
            // of the following payload; there must not be one after it.
            Payload::Encrypted(v) => self.try_build_generic(v.first_inner, &v.data),
            Payload::Nonce(v) | Payload::VendorId(v) => {
                self.try_build_generic(next_payload, v)
            }
        }
    }

    #[inline]
    fn try_build_generic(
        &self,
        next_payload: PayloadType,
        data: &[u8],
    ) -> Result<Vec<u8>, GeneratorError> {
        if data.len() + 4 > u16::MAX as usize {
            return Err(GeneratorError::PayloadTooLarge);
        }
        let header = GenericPayloadHeader {
            next_payload: next_payload as u8,
            critical: 0,
            payload_length: U16::from(data.len() as u16 + 4),
        };
        let mut packet = Vec::with_capacity(data.len() + 4);
        packet.extend_from_slice(header.as_bytes());
        packet.extend_from_slice(data);
        Ok(packet)
    }
}
