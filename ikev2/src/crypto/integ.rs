//! Truncated HMAC integrity checksums for the SK payload

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;

use crate::crypto::CryptoError;
use crate::definitions::params::IntegrityAlgorithm;

/// Compute the transmitted (truncated) checksum over `data`.
pub fn checksum(
    alg: IntegrityAlgorithm,
    key: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut full = match alg {
        IntegrityAlgorithm::HmacMd5_96 => {
            let mut mac =
                Hmac::<Md5>::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        IntegrityAlgorithm::HmacSha1_96 => {
            let mut mac =
                Hmac::<Sha1>::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        _ => return Err(CryptoError::UnsupportedTransform),
    };
    full.truncate(alg.output_len());
    Ok(full)
}

/// Verify a received checksum.
///
/// The comparison runs over the freshly computed checksum in constant time
/// via the MAC crate's truncated verification.
pub fn verify(
    alg: IntegrityAlgorithm,
    key: &[u8],
    data: &[u8],
    tag: &[u8],
) -> Result<(), CryptoError> {
    if tag.len() != alg.output_len() {
        return Err(CryptoError::IntegrityCheckFailed);
    }
    match alg {
        IntegrityAlgorithm::HmacMd5_96 => {
            let mut mac =
                Hmac::<Md5>::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
            mac.update(data);
            mac.verify_truncated_left(tag)
                .map_err(|_| CryptoError::IntegrityCheckFailed)
        }
        IntegrityAlgorithm::HmacSha1_96 => {
            let mut mac =
                Hmac::<Sha1>::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
            mac.update(data);
            mac.verify_truncated_left(tag)
                .map_err(|_| CryptoError::IntegrityCheckFailed)
        }
        _ => Err(CryptoError::UnsupportedTransform),
    }
}

#[cfg(test)]
mod tests {
    use super::{checksum, verify};
    use crate::definitions::params::IntegrityAlgorithm;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn checksum_verifies() {
        let key = [0x17; 20];
        let tag = checksum(IntegrityAlgorithm::HmacSha1_96, &key, b"some message").unwrap();
        assert_eq!(tag.len(), 12);
        verify(IntegrityAlgorithm::HmacSha1_96, &key, b"some message", &tag).unwrap();
        assert!(verify(IntegrityAlgorithm::HmacSha1_96, &key, b"other message", &tag).is_err());
    }

    #[test]
    fn wrong_tag_length_fails() {
        let key = [0x17; 16];
        assert!(verify(IntegrityAlgorithm::HmacMd5_96, &key, b"msg", &[0u8; 16]).is_err());
    }
}
