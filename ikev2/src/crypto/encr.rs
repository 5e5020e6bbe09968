//! AES-CBC encryption for the SK payload
//!
//! Only the AES variants are implemented in software; the other transforms
//! of the kernel table exist solely for ESP and are executed by the kernel.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};

use crate::crypto::CryptoError;
use crate::definitions::params::EncryptionAlgorithm;

/// Encrypt a buffer whose length is already a multiple of the cipher block
/// length. Padding is the caller's concern since RFC 7296 prescribes its own
/// padding scheme inside the SK payload.
pub fn encrypt(
    alg: EncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if alg != EncryptionAlgorithm::AesCbc {
        return Err(CryptoError::UnsupportedTransform);
    }
    if iv.len() != alg.block_len() {
        return Err(CryptoError::InvalidIvLength);
    }
    if plaintext.len() % alg.block_len() != 0 {
        return Err(CryptoError::InvalidPadding);
    }
    match key.len() {
        16 => {
            let cipher = cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::InvalidKeyLength)?;
            Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(plaintext))
        }
        24 => {
            let cipher = cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::InvalidKeyLength)?;
            Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(plaintext))
        }
        32 => {
            let cipher = cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::InvalidKeyLength)?;
            Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(plaintext))
        }
        _ => Err(CryptoError::InvalidKeyLength),
    }
}

/// Decrypt a buffer produced by [encrypt].
pub fn decrypt(
    alg: EncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if alg != EncryptionAlgorithm::AesCbc {
        return Err(CryptoError::UnsupportedTransform);
    }
    if iv.len() != alg.block_len() {
        return Err(CryptoError::InvalidIvLength);
    }
    if ciphertext.is_empty() || ciphertext.len() % alg.block_len() != 0 {
        return Err(CryptoError::InvalidPadding);
    }
    match key.len() {
        16 => {
            let cipher = cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::InvalidKeyLength)?;
            cipher
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(|_| CryptoError::InvalidPadding)
        }
        24 => {
            let cipher = cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::InvalidKeyLength)?;
            cipher
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(|_| CryptoError::InvalidPadding)
        }
        32 => {
            let cipher = cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::InvalidKeyLength)?;
            cipher
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(|_| CryptoError::InvalidPadding)
        }
        _ => Err(CryptoError::InvalidKeyLength),
    }
}

#[cfg(test)]
mod tests {
    use super::{decrypt, encrypt};
    use crate::definitions::params::EncryptionAlgorithm;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn round_trip_all_key_sizes() {
        let iv = [0x42; 16];
        let plaintext = [0x13; 48];
        for key_len in [16usize, 24, 32] {
            let key = vec![0x37; key_len];
            let ct = encrypt(EncryptionAlgorithm::AesCbc, &key, &iv, &plaintext).unwrap();
            assert_eq!(ct.len(), plaintext.len());
            assert_ne!(ct.as_slice(), plaintext.as_slice());
            let pt = decrypt(EncryptionAlgorithm::AesCbc, &key, &iv, &ct).unwrap();
            assert_eq!(pt.as_slice(), plaintext.as_slice());
        }
    }

    #[test]
    fn unaligned_input_is_rejected() {
        let iv = [0x42; 16];
        let key = [0x37; 16];
        assert!(encrypt(EncryptionAlgorithm::AesCbc, &key, &iv, &[0x01; 17]).is_err());
    }

    #[test]
    fn other_transforms_are_kernel_only() {
        let iv = [0x42; 8];
        let key = [0x37; 24];
        assert!(encrypt(EncryptionAlgorithm::TripleDes, &key, &iv, &[0x01; 16]).is_err());
    }
}
