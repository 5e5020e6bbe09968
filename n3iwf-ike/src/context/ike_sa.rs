//! The per-peer IKE security association

use std::net::SocketAddr;

use ikev2::crypto::encrypted::SkCipher;
use ikev2::definitions::params::{
    EncryptionAlgorithm, IntegrityAlgorithm, KeyExchangeMethod, PseudorandomFunction,
};
use ikev2::definitions::{Identification, Proposal, SecurityAssociation, TrafficSelectors};

use crate::dpd::DpdHandle;
use crate::events::PduSessionSetupData;
use crate::context::ue::IkeUe;

/// Progress of one IKE SA through the signalling sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkeState {
    /// IKE_SA_INIT answered, waiting for the first IKE_AUTH round
    PreSignalling,
    /// EAP-5G rounds are running between UE and AMF
    EapSignalling,
    /// EAP finished, waiting for the final AUTH round
    PostSignalling,
    /// Signalling child SA installed, SA fully established
    EndSignalling,
    /// A CREATE_CHILD_SA response is being completed against NGAP context
    HandleCreateChildSa,
}

/// The transform quadruple chosen during IKE_SA_INIT
#[derive(Debug, Clone, Copy)]
pub struct ChosenTransforms {
    /// Encryption algorithm protecting the SK payloads
    pub encryption: EncryptionAlgorithm,
    /// Key length attribute of [ChosenTransforms::encryption]
    pub key_length: Option<u16>,
    /// Pseudorandom function of the key schedule
    pub prf: PseudorandomFunction,
    /// Integrity algorithm protecting the SK payloads
    pub integrity: IntegrityAlgorithm,
    /// Diffie-Hellman group of the key exchange
    pub dh: KeyExchangeMethod,
}

/// The seven keys derived from SKEYSEED (RFC 7296, section 2.14)
#[derive(Debug, Clone, Default)]
#[allow(missing_docs)]
pub struct SessionKeys {
    pub sk_d: Vec<u8>,
    pub sk_ai: Vec<u8>,
    pub sk_ar: Vec<u8>,
    pub sk_ei: Vec<u8>,
    pub sk_er: Vec<u8>,
    pub sk_pi: Vec<u8>,
    pub sk_pr: Vec<u8>,
}

/// Bookkeeping for a CREATE_CHILD_SA request this side has in flight
#[derive(Debug, Clone)]
pub struct PendingChildExchange {
    /// Inbound ESP SPI reserved for the new child SA
    pub inbound_spi: u32,
    /// Encryption transform offered in the request
    pub encryption: EncryptionAlgorithm,
    /// Key length attribute of the offered encryption
    pub key_length: Option<u16>,
    /// Integrity transform offered, when the PDU session asks for it
    pub integrity: Option<IntegrityAlgorithm>,
}

/// Parse result of a received CREATE_CHILD_SA message, parked on the SA
/// until the NGAP context arrives
#[derive(Debug, Clone)]
pub struct TemporaryIkeMsg {
    /// The proposal chosen by the peer, carrying its outbound SPI
    pub proposal: Proposal,
    /// Initiator-side traffic selectors of the message
    pub ts_initiator: TrafficSelectors,
    /// Responder-side traffic selectors of the message
    pub ts_responder: TrafficSelectors,
}

/// One IKE security association, owned by the SA store
pub struct IkeSa {
    /// SPI this side allocated, the store key
    pub local_spi: u64,
    /// SPI the UE allocated
    pub remote_spi: u64,
    /// Current signalling state
    pub state: IkeState,
    /// Chosen transform quadruple
    pub transforms: ChosenTransforms,
    /// Ni | Nr, set at IKE_SA_INIT; replaced by fresh nonces for
    /// CREATE_CHILD_SA rekey derivations
    pub concatenated_nonce: Vec<u8>,
    /// The Diffie-Hellman shared secret g^ir
    pub dh_shared_secret: Vec<u8>,
    /// Derived session keys
    pub keys: SessionKeys,
    /// Octets the UE signs: first request | Nr | prf(SK_pi, IDi')
    pub initiator_signed_octets: Vec<u8>,
    /// Octets this side signs: first response | Ni | prf(SK_pr, IDr')
    pub responder_signed_octets: Vec<u8>,
    /// Identifier of the last EAP request sent
    pub last_eap_identifier: u8,
    /// Whether the first NAS envelope was already relayed to NGAP
    pub first_nas_relayed: bool,
    /// Identity the UE presented in IDi
    pub peer_identity: Option<Identification>,
    /// DER certificate the UE presented, if any
    pub peer_certificate: Option<Vec<u8>>,
    /// Message id of the last request the UE initiated
    pub initiator_message_id: u32,
    /// Message id for the next exchange this side initiates
    pub responder_message_id: u32,
    /// NAT flag for the UE side
    pub ue_is_behind_nat: bool,
    /// NAT flag for this side
    pub n3iwf_is_behind_nat: bool,
    /// Current UE-side outer address
    pub ue_addr: SocketAddr,
    /// N3IWF-side outer address of the four-tuple
    pub local_addr: SocketAddr,
    /// Liveness probe task, armed once the SA is established
    pub dpd: Option<DpdHandle>,
    /// The ESP SA payload negotiated in the first IKE_AUTH round, replayed
    /// in the final round with the allocated inbound SPI
    pub ike_auth_response_sa: Option<SecurityAssociation>,
    /// The UE's outbound ESP SPI for the signalling child SA
    pub peer_esp_spi: Option<u32>,
    /// CREATE_CHILD_SA request in flight, if any
    pub pending_exchange: Option<PendingChildExchange>,
    /// Parked CREATE_CHILD_SA parse result awaiting NGAP context
    pub temporary_child_msg: Option<TemporaryIkeMsg>,
    /// PDU session work list for the CREATE_CHILD_SA sequence
    pub setup_data: Option<PduSessionSetupData>,
    /// The authenticated UE bound to this SA
    pub ue: Option<IkeUe>,
}

impl IkeSa {
    /// Cipher protecting messages this side sends (SK_er / SK_ar)
    pub fn responder_cipher(&self) -> SkCipher<'_> {
        SkCipher {
            encryption: self.transforms.encryption,
            encryption_key: &self.keys.sk_er,
            integrity: self.transforms.integrity,
            integrity_key: &self.keys.sk_ar,
        }
    }

    /// Cipher protecting messages the UE sends (SK_ei / SK_ai)
    pub fn initiator_cipher(&self) -> SkCipher<'_> {
        SkCipher {
            encryption: self.transforms.encryption,
            encryption_key: &self.keys.sk_ei,
            integrity: self.transforms.integrity,
            integrity_key: &self.keys.sk_ai,
        }
    }
}
