//! RSA PKCS#1 v1.5 signatures over SHA-1, the responder authentication
//! method of the profile

use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};

use crate::crypto::CryptoError;

/// Sign `data` with the responder's private key.
pub fn sign_rsa_sha1(key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let digest = Sha1::digest(data);
    Ok(key.sign(Pkcs1v15Sign::new::<Sha1>(), &digest)?)
}

/// Verify a signature made by [sign_rsa_sha1].
pub fn verify_rsa_sha1(
    key: &RsaPublicKey,
    data: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let digest = Sha1::digest(data);
    Ok(key.verify(Pkcs1v15Sign::new::<Sha1>(), &digest, signature)?)
}

#[cfg(test)]
mod tests {
    use rsa::RsaPrivateKey;

    use super::{sign_rsa_sha1, verify_rsa_sha1};

    #[test]
    #[allow(clippy::unwrap_used)]
    fn sign_and_verify() {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public = private.to_public_key();

        let signature = sign_rsa_sha1(&private, b"responder signed octets").unwrap();
        verify_rsa_sha1(&public, b"responder signed octets", &signature).unwrap();
        assert!(verify_rsa_sha1(&public, b"tampered octets", &signature).is_err());
    }
}
