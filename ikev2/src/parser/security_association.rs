use log::warn;
use zerocopy::FromBytes;

use crate::definitions::header::{AttributeHeader, ProposalHeader, TransformHeader};
use crate::definitions::params::{
    EncryptionAlgorithm, ExtendedSequenceNumbers, IntegrityAlgorithm, KeyExchangeMethod,
    PseudorandomFunction, SecurityProtocol, TransformType, ATTRIBUTE_TYPE_KEY_LENGTH,
    FLAG_ATTRIBUTE_FORMAT,
};
use crate::definitions::{Proposal, SecurityAssociation, Transform};
use crate::parser::ParserError;

impl SecurityAssociation {
    /// Parses a buffer into a [SecurityAssociation]. The buffer must not
    /// contain the generic payload header, it should only contain the list
    /// of proposals.
    pub(crate) fn try_parse(buf: &[u8]) -> Result<Self, ParserError> {
        let mut proposals = vec![];
        let mut offset = 0;
        let mut more = true;

        while more {
            let header = ProposalHeader::ref_from_prefix(&buf[offset..])
                .ok_or(ParserError::BufferTooSmall)?;
            let total = header.proposal_length.get() as usize;
            if total < size_of::<ProposalHeader>() || offset + total > buf.len() {
                return Err(ParserError::PayloadLengthOutOfBounds);
            }

            if proposals.is_empty() && header.proposal_num != 1 {
                return Err(ParserError::InvalidProposalNumberingStart);
            }
            if !proposals.is_empty() && header.proposal_num as usize != proposals.len() + 1 {
                return Err(ParserError::InvalidProposalNumbering);
            }

            proposals.push(Proposal::try_parse(header, &buf[offset..offset + total])?);

            more = header.last_substruct != 0;
            offset += total;
        }

        Ok(Self { proposals })
    }
}

impl Proposal {
    pub(crate) fn try_parse(header: &ProposalHeader, buf: &[u8]) -> Result<Self, ParserError> {
        let header_len = size_of::<ProposalHeader>();
        let spi_len = header.spi_size as usize;
        if header_len + spi_len > buf.len() {
            return Err(ParserError::PayloadLengthOutOfBounds);
        }
        let spi = Vec::from(&buf[header_len..header_len + spi_len]);
        let protocol = SecurityProtocol::try_from(header.protocol_id)?;

        let mut proposal = Proposal::new_empty(protocol, Some(spi));
        let mut offset = header_len + spi_len;
        for _ in 0..header.num_transforms {
            let (transform, consumed) = parse_transform(&buf[offset..])?;
            if let Some(transform) = transform {
                proposal.add(vec![transform]);
            }
            offset += consumed;
        }

        Ok(proposal)
    }
}

/// Parse a single transform substructure.
///
/// A transform whose algorithm identifier is not recognized is skipped
/// instead of failing the whole message, since negotiation simply won't
/// select it.
fn parse_transform(buf: &[u8]) -> Result<(Option<Transform>, usize), ParserError> {
    let header = TransformHeader::ref_from_prefix(buf).ok_or(ParserError::BufferTooSmall)?;
    let total = header.transform_length.get() as usize;
    if total < size_of::<TransformHeader>() || total > buf.len() {
        return Err(ParserError::PayloadLengthOutOfBounds);
    }

    let attributes = &buf[size_of::<TransformHeader>()..total];
    let id = header.transform_id.get();

    let transform = match TransformType::try_from(header.transform_type) {
        Ok(TransformType::EncryptionAlgorithm) => match EncryptionAlgorithm::try_from(id) {
            Ok(algorithm) => Some(Transform::Encryption(
                algorithm,
                parse_key_length(attributes)?,
            )),
            Err(region) => {
                warn!("Skipping unknown encryption algorithm {id} ({region:?})");
                None
            }
        },
        Ok(TransformType::PseudoRandomFunction) => match PseudorandomFunction::try_from(id) {
            Ok(function) => Some(Transform::PseudoRandomFunction(function)),
            Err(region) => {
                warn!("Skipping unknown pseudorandom function {id} ({region:?})");
                None
            }
        },
        Ok(TransformType::IntegrityAlgorithm) => match IntegrityAlgorithm::try_from(id) {
            Ok(algorithm) => Some(Transform::Integrity(algorithm)),
            Err(region) => {
                warn!("Skipping unknown integrity algorithm {id} ({region:?})");
                None
            }
        },
        Ok(TransformType::KeyExchangeMethod) => match KeyExchangeMethod::try_from(id) {
            Ok(method) => Some(Transform::KeyExchange(method)),
            Err(region) => {
                warn!("Skipping unknown key exchange method {id} ({region:?})");
                None
            }
        },
        Ok(TransformType::ExtendedSequenceNumbers) => {
            match ExtendedSequenceNumbers::try_from(id) {
                Ok(esn) => Some(Transform::SequenceNumber(esn)),
                Err(region) => {
                    warn!("Skipping unknown sequence number mode {id} ({region:?})");
                    None
                }
            }
        }
        Err(region) => {
            warn!(
                "Skipping transform of unknown type {} ({region:?})",
                header.transform_type
            );
            None
        }
    };

    Ok((transform, total))
}

/// Extract the key length attribute, if present.
///
/// Only the fixed-length Key Length attribute is defined for the supported
/// transforms; anything else is ignored.
fn parse_key_length(mut buf: &[u8]) -> Result<Option<u16>, ParserError> {
    let mut key_length = None;
    while !buf.is_empty() {
        let header = AttributeHeader::ref_from_prefix(buf).ok_or(ParserError::BufferTooSmall)?;
        if !header.is_fixed_length() {
            let data_len = header.attribute_value.get() as usize;
            if size_of::<AttributeHeader>() + data_len > buf.len() {
                return Err(ParserError::PayloadLengthOutOfBounds);
            }
            warn!("Ignoring variable-length transform attribute");
            buf = &buf[size_of::<AttributeHeader>() + data_len..];
            continue;
        }
        let attribute_type = header.attribute_type.get() & !FLAG_ATTRIBUTE_FORMAT;
        if attribute_type == ATTRIBUTE_TYPE_KEY_LENGTH {
            key_length = Some(header.attribute_value.get());
        } else {
            warn!("Ignoring transform attribute of type {attribute_type}");
        }
        buf = &buf[size_of::<AttributeHeader>()..];
    }
    Ok(key_length)
}
