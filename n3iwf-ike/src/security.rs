//! Key schedule, NAT detection hashes and the authentication constructions
//! of the profile

use std::net::IpAddr;

use ikev2::crypto::prf::{prf, prf_plus};
use ikev2::definitions::params::{
    EncryptionAlgorithm, IntegrityAlgorithm, PseudorandomFunction,
};
use ikev2::definitions::Identification;
use sha1::{Digest, Sha1};

use crate::context::child_sa::ChildKeys;
use crate::context::ike_sa::{ChosenTransforms, SessionKeys};
use crate::IkeError;

/// Pad string of the shared-key message integrity code (RFC 7296,
/// section 2.15)
const KEY_PAD: &[u8] = b"Key Pad for IKEv2";

/// Derive the seven session keys of an IKE SA.
///
/// `SKEYSEED = prf(Ni | Nr, g^ir)`, then
/// `{SK_d, SK_ai, SK_ar, SK_ei, SK_er, SK_pi, SK_pr} =
/// prf+(SKEYSEED, Ni | Nr | SPIi | SPIr)` sliced by the negotiated lengths.
pub fn generate_ike_keys(
    transforms: &ChosenTransforms,
    concatenated_nonce: &[u8],
    dh_shared_secret: &[u8],
    initiator_spi: u64,
    responder_spi: u64,
) -> Result<SessionKeys, IkeError> {
    let encryption_len = transforms
        .encryption
        .key_len(transforms.key_length)
        .ok_or(IkeError::NoProposalChosen)?;
    let integrity_len = transforms.integrity.key_len();
    let prf_len = transforms.prf.key_len();

    let skeyseed = prf(transforms.prf, concatenated_nonce, dh_shared_secret)?;

    let mut seed =
        Vec::with_capacity(concatenated_nonce.len() + 2 * size_of::<u64>());
    seed.extend_from_slice(concatenated_nonce);
    seed.extend_from_slice(&initiator_spi.to_be_bytes());
    seed.extend_from_slice(&responder_spi.to_be_bytes());

    let total = 3 * prf_len + 2 * integrity_len + 2 * encryption_len;
    let material = prf_plus(transforms.prf, &skeyseed, &seed, total)?;

    let mut rest = material.as_slice();
    let mut take = |len: usize| {
        let (head, tail) = rest.split_at(len);
        rest = tail;
        head.to_vec()
    };

    Ok(SessionKeys {
        sk_d: take(prf_len),
        sk_ai: take(integrity_len),
        sk_ar: take(integrity_len),
        sk_ei: take(encryption_len),
        sk_er: take(encryption_len),
        sk_pi: take(prf_len),
        sk_pr: take(prf_len),
    })
}

/// Derive the key material of a child SA:
/// `prf+(SK_d, Ni | Nr)` sliced as {encr_i, auth_i, encr_r, auth_r}.
///
/// For a CREATE_CHILD_SA rekey the caller passes the fresh nonces in place
/// of the original Ni | Nr.
pub fn generate_child_keys(
    prf_alg: PseudorandomFunction,
    sk_d: &[u8],
    concatenated_nonce: &[u8],
    encryption: EncryptionAlgorithm,
    key_length: Option<u16>,
    integrity: Option<IntegrityAlgorithm>,
) -> Result<ChildKeys, IkeError> {
    let encryption_len = encryption
        .key_len(key_length)
        .ok_or(IkeError::NoProposalChosen)?;
    let integrity_len = integrity.map(|i| i.key_len()).unwrap_or(0);

    let total = 2 * (encryption_len + integrity_len);
    let material = prf_plus(prf_alg, sk_d, concatenated_nonce, total)?;

    let mut rest = material.as_slice();
    let mut take = |len: usize| {
        let (head, tail) = rest.split_at(len);
        rest = tail;
        head.to_vec()
    };

    Ok(ChildKeys {
        initiator_encryption: take(encryption_len),
        initiator_integrity: take(integrity_len),
        responder_encryption: take(encryption_len),
        responder_integrity: take(integrity_len),
    })
}

/// NAT detection hash over one side of the four-tuple:
/// `sha1(SPIi | SPIr | ip | port)`.
pub fn nat_detection_hash(
    initiator_spi: u64,
    responder_spi: u64,
    addr: IpAddr,
    port: u16,
) -> Vec<u8> {
    let mut hasher = Sha1::new();
    hasher.update(initiator_spi.to_be_bytes());
    hasher.update(responder_spi.to_be_bytes());
    match addr {
        IpAddr::V4(v4) => hasher.update(v4.octets()),
        IpAddr::V6(v6) => hasher.update(v6.octets()),
    }
    hasher.update(port.to_be_bytes());
    hasher.finalize().to_vec()
}

/// The shared-key message integrity code over signed octets, keyed by the
/// EAP-derived Kn3iwf:
/// `prf(prf(Kn3iwf, "Key Pad for IKEv2"), SignedOctets)`.
pub fn shared_key_mic(
    prf_alg: PseudorandomFunction,
    kn3iwf: &[u8],
    signed_octets: &[u8],
) -> Result<Vec<u8>, IkeError> {
    let inner = prf(prf_alg, kn3iwf, KEY_PAD)?;
    Ok(prf(prf_alg, &inner, signed_octets)?)
}

/// `prf(SK_p*, ID body)` appended to the signed octets, where the ID body is
/// the identification payload without its 4-byte generic header.
pub fn id_payload_digest(
    prf_alg: PseudorandomFunction,
    sk_p: &[u8],
    id: &Identification,
) -> Result<Vec<u8>, IkeError> {
    let mut body = Vec::with_capacity(4 + id.data.len());
    body.push(id.id_type as u8);
    body.extend_from_slice(&[0u8; 3]);
    body.extend_from_slice(&id.data);
    Ok(prf(prf_alg, sk_p, &body)?)
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use ikev2::crypto::prf::{prf, prf_plus};
    use ikev2::definitions::params::{
        EncryptionAlgorithm, IntegrityAlgorithm, KeyExchangeMethod, PseudorandomFunction,
    };

    use super::{generate_child_keys, generate_ike_keys, nat_detection_hash, shared_key_mic};
    use crate::context::ike_sa::ChosenTransforms;

    fn transforms() -> ChosenTransforms {
        ChosenTransforms {
            encryption: EncryptionAlgorithm::AesCbc,
            key_length: Some(256),
            prf: PseudorandomFunction::HmacSha1,
            integrity: IntegrityAlgorithm::HmacSha1_96,
            dh: KeyExchangeMethod::ModP2048,
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn key_lengths_follow_the_transforms() {
        let nonce = [0x11; 64];
        let secret = [0x22; 256];
        let keys = generate_ike_keys(&transforms(), &nonce, &secret, 1, 2).unwrap();
        assert_eq!(keys.sk_d.len(), 20);
        assert_eq!(keys.sk_ai.len(), 20);
        assert_eq!(keys.sk_ar.len(), 20);
        assert_eq!(keys.sk_ei.len(), 32);
        assert_eq!(keys.sk_er.len(), 32);
        assert_eq!(keys.sk_pi.len(), 20);
        assert_eq!(keys.sk_pr.len(), 20);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn skeyseed_matches_the_definition() {
        let nonce = [0x11; 64];
        let secret = [0x22; 256];
        let keys = generate_ike_keys(&transforms(), &nonce, &secret, 0xaa, 0xbb).unwrap();

        let skeyseed = prf(PseudorandomFunction::HmacSha1, &nonce, &secret).unwrap();
        let mut seed = nonce.to_vec();
        seed.extend_from_slice(&0xaau64.to_be_bytes());
        seed.extend_from_slice(&0xbbu64.to_be_bytes());
        let material =
            prf_plus(PseudorandomFunction::HmacSha1, &skeyseed, &seed, 20 * 5 + 32 * 2)
                .unwrap();
        assert_eq!(keys.sk_d, &material[..20]);
        assert_eq!(keys.sk_pr, &material[material.len() - 20..]);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn child_keys_without_integrity() {
        let keys = generate_child_keys(
            PseudorandomFunction::HmacSha1,
            &[0x33; 20],
            &[0x44; 64],
            EncryptionAlgorithm::AesCbc,
            Some(256),
            None,
        )
        .unwrap();
        assert_eq!(keys.initiator_encryption.len(), 32);
        assert!(keys.initiator_integrity.is_empty());
        assert_eq!(keys.responder_encryption.len(), 32);
        assert!(keys.responder_integrity.is_empty());
        assert_ne!(keys.initiator_encryption, keys.responder_encryption);
    }

    #[test]
    fn nat_hash_is_sensitive_to_every_input() {
        let base = nat_detection_hash(1, 2, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 500);
        assert_eq!(base.len(), 20);
        assert_ne!(
            base,
            nat_detection_hash(1, 2, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 4500)
        );
        assert_ne!(
            base,
            nat_detection_hash(1, 2, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2)), 500)
        );
        assert_ne!(
            base,
            nat_detection_hash(2, 1, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 500)
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn mic_depends_on_the_key_pad() {
        let kn3iwf = [0x55; 32];
        let octets = b"initiator signed octets";
        let mic = shared_key_mic(PseudorandomFunction::HmacSha1, &kn3iwf, octets).unwrap();
        let plain = prf(PseudorandomFunction::HmacSha1, &kn3iwf, octets).unwrap();
        assert_ne!(mic, plain);
    }
}
