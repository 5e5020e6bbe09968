//! Pseudorandom functions and the iterated `prf+` expansion of RFC 7296,
//! section 2.13

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;

use crate::crypto::CryptoError;
use crate::definitions::params::PseudorandomFunction;

/// Compute `prf(key, data)` for one of the negotiable functions.
///
/// HMAC accepts keys of any length, so this cannot fail for the supported
/// functions; everything else is rejected as unsupported.
pub fn prf(
    alg: PseudorandomFunction,
    key: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    match alg {
        PseudorandomFunction::HmacMd5 => {
            let mut mac =
                Hmac::<Md5>::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        PseudorandomFunction::HmacSha1 => {
            let mut mac =
                Hmac::<Sha1>::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        _ => Err(CryptoError::UnsupportedTransform),
    }
}

/// The standard iterated expansion
/// `T1 = prf(K, S | 0x01), Ti = prf(K, Ti-1 | S | i)`, concatenated and
/// truncated to the requested length.
pub fn prf_plus(
    alg: PseudorandomFunction,
    key: &[u8],
    seed: &[u8],
    len: usize,
) -> Result<Vec<u8>, CryptoError> {
    let mut out = Vec::with_capacity(len);
    let mut last = vec![];
    let mut counter: u8 = 1;
    while out.len() < len {
        let mut data = Vec::with_capacity(last.len() + seed.len() + 1);
        data.extend_from_slice(&last);
        data.extend_from_slice(seed);
        data.push(counter);
        last = prf(alg, key, &data)?;
        out.extend_from_slice(&last);
        counter = counter
            .checked_add(1)
            .ok_or(CryptoError::KeyMaterialTooLong)?;
    }
    out.truncate(len);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{prf, prf_plus};
    use crate::definitions::params::PseudorandomFunction;

    // RFC 2202, test case 2 for HMAC-SHA-1
    #[test]
    #[allow(clippy::unwrap_used)]
    fn hmac_sha1_vector() {
        let digest = prf(PseudorandomFunction::HmacSha1, b"Jefe", b"what do ya want for nothing?")
            .unwrap();
        assert_eq!(
            digest,
            vec![
                0xef, 0xfc, 0xdf, 0x6a, 0xe5, 0xeb, 0x2f, 0xa2, 0xd2, 0x74, 0x16, 0xd5, 0xf1,
                0x84, 0xdf, 0x9c, 0x25, 0x9a, 0x7c, 0x79
            ]
        );
    }

    // RFC 2202, test case 1 for HMAC-MD5
    #[test]
    #[allow(clippy::unwrap_used)]
    fn hmac_md5_vector() {
        let digest = prf(
            PseudorandomFunction::HmacMd5,
            &[0x0b; 16],
            b"Hi There",
        )
        .unwrap();
        assert_eq!(
            digest,
            vec![
                0x92, 0x94, 0x72, 0x7a, 0x36, 0x38, 0xbb, 0x1c, 0x13, 0xf4, 0x8e, 0xf8, 0x15,
                0x8b, 0xfc, 0x9d
            ]
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn prf_plus_is_prefix_stable() {
        let short = prf_plus(PseudorandomFunction::HmacSha1, b"key", b"seed", 13).unwrap();
        let long = prf_plus(PseudorandomFunction::HmacSha1, b"key", b"seed", 77).unwrap();
        assert_eq!(short.len(), 13);
        assert_eq!(long.len(), 77);
        assert_eq!(&long[..13], short.as_slice());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn prf_plus_first_block_is_plain_prf() {
        let expanded = prf_plus(PseudorandomFunction::HmacSha1, b"key", b"seed", 20).unwrap();
        let first = prf(PseudorandomFunction::HmacSha1, b"key", b"seed\x01").unwrap();
        assert_eq!(expanded, first);
    }
}
