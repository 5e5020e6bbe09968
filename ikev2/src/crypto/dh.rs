//! MODP Diffie-Hellman groups 2 and 14 (RFC 2409 / RFC 3526)

use num_bigint::BigUint;

use crate::crypto::CryptoError;
use crate::definitions::params::KeyExchangeMethod;

// Group 2, 1024-bit MODP prime from RFC 2409, section 6.2
const MODP_1024_PRIME: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
                               29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
                               EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
                               E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
                               EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381\
                               FFFFFFFFFFFFFFFF";

// Group 14, 2048-bit MODP prime from RFC 3526, section 3
const MODP_2048_PRIME: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
                               29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
                               EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
                               E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
                               EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
                               C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
                               83655D23DCA3AD961C62F356208552BB9ED529077096966D\
                               670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
                               E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9\
                               DE2BCBF6955817183995497CEA956AE515D2261898FA0510\
                               15728E5A8AACAA68FFFFFFFFFFFFFFFF";

/// Length in octets of public values and shared secrets of the group
pub fn key_len(method: KeyExchangeMethod) -> Option<usize> {
    match method {
        KeyExchangeMethod::ModP1024 => Some(128),
        KeyExchangeMethod::ModP2048 => Some(256),
        _ => None,
    }
}

fn group_params(method: KeyExchangeMethod) -> Result<(BigUint, BigUint), CryptoError> {
    let prime_hex = match method {
        KeyExchangeMethod::ModP1024 => MODP_1024_PRIME,
        KeyExchangeMethod::ModP2048 => MODP_2048_PRIME,
        _ => return Err(CryptoError::UnsupportedTransform),
    };
    let prime =
        BigUint::parse_bytes(prime_hex.as_bytes(), 16).ok_or(CryptoError::DhGroup)?;
    // Both groups use generator 2
    Ok((prime, BigUint::from(2u8)))
}

/// Compute the public value `g^x mod p` for a private value given as raw
/// big-endian bytes, zero-padded to the group length.
pub fn public_value(
    method: KeyExchangeMethod,
    private: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let (prime, generator) = group_params(method)?;
    let x = BigUint::from_bytes_be(private);
    let public = generator.modpow(&x, &prime);
    Ok(pad_to_group(method, &public)?)
}

/// Compute the shared secret `peer^x mod p`.
///
/// Degenerate peer values (0, 1 and p-1) would collapse the secret and are
/// rejected.
pub fn shared_secret(
    method: KeyExchangeMethod,
    private: &[u8],
    peer_public: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let (prime, _) = group_params(method)?;
    let peer = BigUint::from_bytes_be(peer_public) % &prime;
    let one = BigUint::from(1u8);
    if peer <= one || peer == &prime - &one {
        return Err(CryptoError::WeakPeerPublicValue);
    }
    let x = BigUint::from_bytes_be(private);
    let secret = peer.modpow(&x, &prime);
    pad_to_group(method, &secret)
}

fn pad_to_group(method: KeyExchangeMethod, value: &BigUint) -> Result<Vec<u8>, CryptoError> {
    let len = key_len(method).ok_or(CryptoError::UnsupportedTransform)?;
    let bytes = value.to_bytes_be();
    if bytes.len() > len {
        return Err(CryptoError::DhGroup);
    }
    let mut padded = vec![0u8; len - bytes.len()];
    padded.extend(bytes);
    Ok(padded)
}

#[cfg(test)]
mod tests {
    use super::{key_len, public_value, shared_secret};
    use crate::definitions::params::KeyExchangeMethod;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn tiny_exponent() {
        // g^1 mod p = 2, padded to the group length
        let public = public_value(KeyExchangeMethod::ModP2048, &[0x01]).unwrap();
        assert_eq!(public.len(), 256);
        assert_eq!(public[255], 0x02);
        assert!(public[..255].iter().all(|&b| b == 0));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn both_sides_agree() {
        for method in [KeyExchangeMethod::ModP1024, KeyExchangeMethod::ModP2048] {
            let a_private = [0x11; 32];
            let b_private = [0x22; 32];
            let a_public = public_value(method, &a_private).unwrap();
            let b_public = public_value(method, &b_private).unwrap();
            let a_secret = shared_secret(method, &a_private, &b_public).unwrap();
            let b_secret = shared_secret(method, &b_private, &a_public).unwrap();
            assert_eq!(a_secret, b_secret);
            assert_eq!(a_secret.len(), key_len(method).unwrap());
        }
    }

    #[test]
    fn degenerate_peer_is_rejected() {
        assert!(shared_secret(KeyExchangeMethod::ModP2048, &[0x11; 32], &[0x00]).is_err());
        assert!(shared_secret(KeyExchangeMethod::ModP2048, &[0x11; 32], &[0x01]).is_err());
    }

    #[test]
    fn unsupported_group() {
        assert!(public_value(KeyExchangeMethod::Curve25519, &[0x11; 32]).is_err());
    }
}
