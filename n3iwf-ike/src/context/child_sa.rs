//! Completed ESP child security associations

use ikev2::definitions::params::{EncryptionAlgorithm, IntegrityAlgorithm};
use ikev2::definitions::TrafficSelector;

/// The four key slices of one child SA, in the derivation order
/// {encr_i, auth_i, encr_r, auth_r}
#[derive(Debug, Clone, Default)]
pub struct ChildKeys {
    /// Encryption key for traffic sent by the exchange initiator
    pub initiator_encryption: Vec<u8>,
    /// Integrity key for traffic sent by the exchange initiator
    pub initiator_integrity: Vec<u8>,
    /// Encryption key for traffic sent by the exchange responder
    pub responder_encryption: Vec<u8>,
    /// Integrity key for traffic sent by the exchange responder
    pub responder_integrity: Vec<u8>,
}

/// One ESP child SA, complete and ready for kernel installation
#[derive(Debug, Clone)]
pub struct ChildSa {
    /// SPI this side allocated; selects inbound traffic and keys the store
    pub inbound_spi: u32,
    /// SPI the UE allocated; written into outbound packets
    pub outbound_spi: u32,
    /// Local SPI of the owning IKE SA
    pub parent_local_spi: u64,
    /// Negotiated ESP encryption transform
    pub encryption: EncryptionAlgorithm,
    /// Key length attribute of the encryption transform
    pub key_length: Option<u16>,
    /// Negotiated ESP integrity transform, if any
    pub integrity: Option<IntegrityAlgorithm>,
    /// Derived key material
    pub keys: ChildKeys,
    /// Whether this side initiated the exchange that created the child SA;
    /// decides which key slices protect which direction
    pub local_is_initiator: bool,
    /// Inner IP protocol the SA carries: TCP for the signalling SA, GRE for
    /// user-plane SAs
    pub ip_protocol: u8,
    /// Selector of the N3IWF side, a single /32 in this profile
    pub local_ts: TrafficSelector,
    /// Selector of the UE side, a single /32 in this profile
    pub peer_ts: TrafficSelector,
    /// Whether ESP-in-UDP encapsulation is active (a NAT was detected)
    pub enable_encapsulation: bool,
    /// Local UDP port for the encapsulation
    pub local_port: u16,
    /// UE-side UDP port for the encapsulation
    pub peer_port: u16,
    /// Virtual interface the SA attaches to
    pub xfrm_iface_id: u32,
    /// PDU session served by this SA; none for the signalling SA
    pub pdu_session_id: Option<u8>,
}
