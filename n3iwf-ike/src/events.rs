//! Typed events bridging the IKE core and the AMF-facing (NGAP) subsystem
//!
//! Both directions run over bounded channels so neither side can stall the
//! other's receive loop. Every event carries the local SPI of the IKE SA it
//! concerns; the receiving side re-locates the SA and verifies it still
//! exists and is in the expected state before acting.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};

/// A UDP datagram together with the four-tuple it belongs to
#[derive(Debug, Clone)]
pub struct Datagram {
    /// Raw message bytes
    pub data: Vec<u8>,
    /// The UE-side address
    pub peer: SocketAddr,
    /// The N3IWF-side address
    pub local: SocketAddr,
}

/// Context kinds the IKE core may request from the NGAP side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NgapContextKind {
    /// The queue of PDU sessions awaiting child SAs
    PduSessionSetupData,
}

/// One PDU session awaiting its user-plane child SA
#[derive(Debug, Clone)]
pub struct PduSession {
    /// PDU session identity assigned by the core network
    pub id: u8,
    /// QoS flow identifiers of the session
    pub qos_flow_ids: Vec<u8>,
    /// User-plane function address announced via UP_IP4_ADDRESS
    pub up_ip4: Ipv4Addr,
    /// Whether the session requires ESP integrity protection
    pub integrity_protection: bool,
    /// Whether the session carries the default QoS rule
    pub is_default: bool,
    /// Optional DSCP marking for the session's flows
    pub dscp: Option<u8>,
}

/// Work list driving the CREATE_CHILD_SA sequence for one UE
#[derive(Debug, Clone, Default)]
pub struct PduSessionSetupData {
    /// Sessions not yet negotiated
    pub pending: VecDeque<PduSession>,
    /// The session whose exchange is currently in flight
    pub current: Option<PduSession>,
    /// Ids of sessions whose establishment failed
    pub failed: Vec<u8>,
    /// Ids of sessions whose child SA is installed
    pub established: Vec<u8>,
}

/// Events emitted by the IKE core towards the NGAP subsystem
#[derive(Debug, Clone)]
pub enum NgapEvent {
    /// An EAP-5G envelope arrived from the UE and needs unmarshalling
    UnmarshalEap5gData {
        /// IKE SA the envelope arrived on
        local_spi: u64,
        /// The opaque vendor data of the EAP-Expanded message
        vendor_data: Vec<u8>,
        /// Whether this is the first NAS message of the UE (it then carries
        /// AN parameters and becomes an InitialUEMessage)
        initial: bool,
        /// Current outer address of the UE
        ue_addr: SocketAddr,
    },
    /// The signalling child SA is installed; NAS over TCP may start
    StartTcpSignalNas {
        /// IKE SA the child SA belongs to
        local_spi: u64,
        /// Inner address allocated to the UE
        ue_inner_addr: Ipv4Addr,
    },
    /// The core asks for NGAP-held context, answered by
    /// [IkeEvent::GetNgapContextResponse]
    GetNgapContext {
        /// IKE SA the request concerns
        local_spi: u64,
        /// Which pieces of context are needed
        kinds: Vec<NgapContextKind>,
    },
    /// First uplink NAS message, relayed by the NAS-over-TCP transport
    SendInitialUeMessage {
        /// IKE SA the message arrived on
        local_spi: u64,
        /// The NAS PDU
        nas_pdu: Vec<u8>,
    },
    /// Subsequent uplink NAS message, relayed by the NAS-over-TCP transport
    SendNasMsg {
        /// IKE SA the message arrived on
        local_spi: u64,
        /// The NAS PDU
        nas_pdu: Vec<u8>,
    },
    /// The UE context is torn down; NGAP should complete the release
    SendUeContextReleaseComplete {
        /// IKE SA that was released
        local_spi: u64,
    },
    /// Child SAs were deleted on the UE's initiative
    SendPduSessionResourceReleaseRes {
        /// IKE SA the child SAs belonged to
        local_spi: u64,
        /// PDU sessions whose resources are gone
        pdu_session_ids: Vec<u8>,
    },
    /// The CREATE_CHILD_SA sequence for a setup request has finished
    SendPduSessionResourceSetupRes {
        /// IKE SA the sequence ran on
        local_spi: u64,
        /// Sessions with an installed child SA
        established: Vec<u8>,
        /// Sessions that failed
        failed: Vec<u8>,
    },
}

/// Events the NGAP subsystem sends into the IKE core
#[derive(Debug, Clone)]
pub enum IkeEvent {
    /// Authentication failed upstream; answer the UE with EAP-Failure
    SendEap5gFailure {
        /// IKE SA the failure concerns
        local_spi: u64,
    },
    /// Deliver a downlink NAS PDU inside an EAP-5G request
    SendEapNasMsg {
        /// IKE SA to deliver on
        local_spi: u64,
        /// The NAS PDU
        nas_pdu: Vec<u8>,
    },
    /// Authentication succeeded; answer with EAP-Success and arm the final
    /// IKE_AUTH round
    SendEapSuccess {
        /// IKE SA the success concerns
        local_spi: u64,
        /// The derived N3IWF master key
        kn3iwf: Vec<u8>,
        /// Number of PDU sessions the UE is expected to set up
        pdu_session_count: u8,
    },
    /// Start CREATE_CHILD_SA exchanges for the listed PDU sessions
    CreatePduSession {
        /// IKE SA to run the exchanges on
        local_spi: u64,
        /// The sessions to establish
        setup: PduSessionSetupData,
    },
    /// Tear down the IKE SA and everything under it
    IkeDeleteRequest {
        /// IKE SA to delete
        local_spi: u64,
    },
    /// Request deletion of the child SAs of the listed PDU sessions
    SendChildSaDeleteRequest {
        /// IKE SA the child SAs belong to
        local_spi: u64,
        /// Sessions to release
        pdu_session_ids: Vec<u8>,
    },
    /// Update NGAP-owned parts of the UE context
    IkeContextUpdate {
        /// IKE SA the update concerns
        local_spi: u64,
        /// Fresh master key, if it changed
        kn3iwf: Option<Vec<u8>>,
        /// RAN-side identifier for the SPI mapping, if it changed
        ran_ue_ngap_id: Option<u64>,
    },
    /// Answer to [NgapEvent::GetNgapContext]
    GetNgapContextResponse {
        /// IKE SA the context belongs to
        local_spi: u64,
        /// The PDU session work list
        setup: PduSessionSetupData,
    },
}
