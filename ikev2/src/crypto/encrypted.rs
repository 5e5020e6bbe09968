//! Sealing and opening of the SK (Encrypted and Authenticated) payload
//!
//! The checksum always covers the entire message from the first header
//! octet, and it is verified before a single block is decrypted.

use zerocopy::FromBytes;

use crate::crypto::{encr, integ, CryptoError};
use crate::definitions::header::{GenericPayloadHeader, Header};
use crate::definitions::params::{EncryptionAlgorithm, IntegrityAlgorithm, PayloadType};
use crate::definitions::{EncryptedPayload, Message, Payload};
use crate::generator::try_build_payload_chain;
use crate::parser::{parse_payload_chain, ParserError};
use crate::IKE_HEADER_LEN;

/// The keys and transforms protecting one direction of an IKE SA
#[derive(Debug, Clone, Copy)]
pub struct SkCipher<'k> {
    /// Negotiated encryption transform
    pub encryption: EncryptionAlgorithm,
    /// Key for [SkCipher::encryption]
    pub encryption_key: &'k [u8],
    /// Negotiated integrity transform
    pub integrity: IntegrityAlgorithm,
    /// Key for [SkCipher::integrity]
    pub integrity_key: &'k [u8],
}

/// Encrypt the payloads of `msg` into a single SK payload and return the
/// finished wire message.
///
/// The message's payload list is taken as the plaintext chain; the built
/// message carries exactly one SK payload whose next-payload field points at
/// the first inner payload. The IV must be exactly one cipher block and
/// fresh for every message.
pub fn seal(
    msg: &Message,
    cipher: &SkCipher<'_>,
    iv: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let block = cipher.encryption.block_len();
    if iv.len() != block {
        return Err(CryptoError::InvalidIvLength);
    }

    let inner = try_build_payload_chain(&msg.payloads)?;

    // RFC 7296 padding: arbitrary filler plus a trailing pad length octet
    let rem = (inner.len() + 1) % block;
    let pad_len = if rem == 0 { 0 } else { block - rem };
    let mut plaintext = inner;
    plaintext.extend(std::iter::repeat(0u8).take(pad_len));
    plaintext.push(pad_len as u8);

    let ciphertext = encr::encrypt(
        cipher.encryption,
        cipher.encryption_key,
        iv,
        &plaintext,
    )?;

    let icv_len = cipher.integrity.output_len();
    let mut sk_data = Vec::with_capacity(iv.len() + ciphertext.len() + icv_len);
    sk_data.extend_from_slice(iv);
    sk_data.extend(ciphertext);
    sk_data.extend(std::iter::repeat(0u8).take(icv_len));

    let first_inner = match msg.payloads.first() {
        None => PayloadType::NoNextPayload,
        Some(p) => p.into(),
    };
    let sealed = Message {
        payloads: vec![Payload::Encrypted(EncryptedPayload {
            first_inner,
            data: sk_data,
        })],
        ..msg.clone()
    };
    let mut bytes = sealed.try_build()?;

    let checksum_end = bytes.len() - icv_len;
    let icv = integ::checksum(
        cipher.integrity,
        cipher.integrity_key,
        &bytes[..checksum_end],
    )?;
    bytes[checksum_end..].copy_from_slice(&icv);
    Ok(bytes)
}

/// Verify and decrypt the SK payload of a raw message, returning the inner
/// payload sequence.
///
/// `raw` must be the complete datagram, since the checksum covers the whole
/// message. Nothing is decrypted if the checksum does not verify.
pub fn open(raw: &[u8], cipher: &SkCipher<'_>) -> Result<Vec<Payload>, CryptoError> {
    let header = Header::ref_from_prefix(raw).ok_or(ParserError::BufferTooSmall)?;
    let mut offset = IKE_HEADER_LEN;
    let mut next_type = header.next_payload;

    // Locate the SK payload in the plaintext chain
    loop {
        if next_type == PayloadType::NoNextPayload as u8 {
            return Err(CryptoError::MissingEncryptedPayload);
        }
        let generic = GenericPayloadHeader::ref_from_prefix(&raw[offset..])
            .ok_or(ParserError::BufferTooSmall)?;
        let total = generic.payload_length.get() as usize;
        if total < size_of::<GenericPayloadHeader>() || offset + total > raw.len() {
            return Err(CryptoError::Parser(ParserError::PayloadLengthOutOfBounds));
        }
        if next_type == PayloadType::EncryptedAndAuthenticated as u8 {
            return open_sk_payload(raw, offset, total, generic.next_payload, cipher);
        }
        next_type = generic.next_payload;
        offset += total;
    }
}

fn open_sk_payload(
    raw: &[u8],
    offset: usize,
    total: usize,
    first_inner: u8,
    cipher: &SkCipher<'_>,
) -> Result<Vec<Payload>, CryptoError> {
    let block = cipher.encryption.block_len();
    let icv_len = cipher.integrity.output_len();
    let sk_end = offset + total;
    let body_start = offset + size_of::<GenericPayloadHeader>();
    if sk_end - body_start < block + icv_len {
        return Err(CryptoError::Parser(ParserError::BufferTooSmall));
    }

    integ::verify(
        cipher.integrity,
        cipher.integrity_key,
        &raw[..sk_end - icv_len],
        &raw[sk_end - icv_len..sk_end],
    )?;

    let iv = &raw[body_start..body_start + block];
    let ciphertext = &raw[body_start + block..sk_end - icv_len];
    let plaintext = encr::decrypt(cipher.encryption, cipher.encryption_key, iv, ciphertext)?;

    let (&pad_len, rest) = plaintext.split_last().ok_or(CryptoError::InvalidPadding)?;
    if pad_len as usize >= block || pad_len as usize > rest.len() {
        return Err(CryptoError::InvalidPadding);
    }
    let inner = &rest[..rest.len() - pad_len as usize];

    Ok(parse_payload_chain(first_inner, inner)?)
}

#[cfg(test)]
mod tests {
    use super::{open, seal, SkCipher};
    use crate::definitions::params::{
        EapCode, EncryptionAlgorithm, ExchangeType, IntegrityAlgorithm,
    };
    use crate::definitions::{EapData, EapMessage, Message, Payload};

    fn cipher<'k>(encryption_key: &'k [u8], integrity_key: &'k [u8]) -> SkCipher<'k> {
        SkCipher {
            encryption: EncryptionAlgorithm::AesCbc,
            encryption_key,
            integrity: IntegrityAlgorithm::HmacSha1_96,
            integrity_key,
        }
    }

    fn sample_message(payloads: Vec<Payload>) -> Message {
        Message {
            initiator_spi: 0x0102030405060708,
            responder_spi: 0x1112131415161718,
            exchange_type: ExchangeType::IkeAuth,
            initiator: false,
            response: true,
            message_id: 1,
            payloads,
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn seal_then_open() {
        let encryption_key = [0x51; 32];
        let integrity_key = [0x62; 20];
        let cipher = cipher(&encryption_key, &integrity_key);
        let payloads = vec![
            Payload::Nonce(vec![0x77; 32]),
            Payload::Eap(EapMessage {
                code: EapCode::Failure,
                identifier: 9,
                data: EapData::Empty,
            }),
        ];
        let sealed = seal(&sample_message(payloads.clone()), &cipher, &[0x10; 16]).unwrap();
        let opened = open(&sealed, &cipher).unwrap();
        assert_eq!(opened, payloads);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn empty_payload_chain() {
        let encryption_key = [0x51; 16];
        let integrity_key = [0x62; 16];
        let cipher = SkCipher {
            encryption: EncryptionAlgorithm::AesCbc,
            encryption_key: &encryption_key,
            integrity: IntegrityAlgorithm::HmacMd5_96,
            integrity_key: &integrity_key,
        };
        let sealed = seal(&sample_message(vec![]), &cipher, &[0x00; 16]).unwrap();
        let opened = open(&sealed, &cipher).unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn tampering_fails_closed() {
        let encryption_key = [0x51; 32];
        let integrity_key = [0x62; 20];
        let cipher = cipher(&encryption_key, &integrity_key);
        let mut sealed = seal(
            &sample_message(vec![Payload::Nonce(vec![0x77; 32])]),
            &cipher,
            &[0x10; 16],
        )
        .unwrap();
        // Flip one ciphertext bit
        let index = sealed.len() - 20;
        sealed[index] ^= 0x01;
        assert!(open(&sealed, &cipher).is_err());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn wrong_integrity_key_fails() {
        let encryption_key = [0x51; 32];
        let integrity_key = [0x62; 20];
        let other_integrity_key = [0x63; 20];
        let sealed = seal(
            &sample_message(vec![Payload::Nonce(vec![0x77; 32])]),
            &cipher(&encryption_key, &integrity_key),
            &[0x10; 16],
        )
        .unwrap();
        assert!(open(&sealed, &cipher(&encryption_key, &other_integrity_key)).is_err());
    }
}
