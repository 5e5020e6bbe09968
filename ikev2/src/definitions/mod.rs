//! High-level representations of IKEv2 messages and every payload variant

pub mod header;
mod impls;
pub mod params;

use std::net::Ipv4Addr;

pub use header::{GenericPayloadHeader, Header};
use params::{
    AuthenticationMethod, CertificateEncoding, ConfigurationAttributeType, ConfigurationType,
    EapCode, EncryptionAlgorithm, ExchangeType, ExtendedSequenceNumbers, IdentificationType,
    IntegrityAlgorithm, KeyExchangeMethod, NotifyErrorMessage, NotifyStatusMessage, PayloadType,
    PseudorandomFunction, SecurityProtocol,
};

/// When parsing a parameter from its wire value, there are several "regions"
/// in the definitions that can't be defined by Rusts enum. Typically, the
/// last two regions of the parameter definitions are unassigned and/or
/// reserved for private use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum UnparseableParameter {
    /// The parameter is reserved and must not be used, as it may conflict
    /// with older standards
    Reserved,
    /// The parameter has no recognized meaning by any known standard
    Unassigned,
    /// The parameter is reserved for Private Use by proprietary
    /// implementations and not part of a standard
    PrivateUse,
    /// The parameter can not reach the value this resolves to,
    /// as such the packet where it originates from must be invalid
    OutOfRange,
}

/// A full IKEv2 message with its decoded payload sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// SPI chosen by the original initiator of the IKE SA
    pub initiator_spi: u64,
    /// SPI chosen by the responder, zero until the responder allocated one
    pub responder_spi: u64,
    /// Exchange this message belongs to
    pub exchange_type: ExchangeType,
    /// Whether the sender is the original initiator of the IKE SA
    pub initiator: bool,
    /// Whether this message answers a request
    pub response: bool,
    /// Identifier matching requests and responses within one exchange
    pub message_id: u32,
    /// Decoded payloads in wire order
    pub payloads: Vec<Payload>,
}

/// The closed set of payload variants a message may carry
///
/// The state machine matches on these; there is no dynamically typed
/// container anywhere in the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Payload {
    SecurityAssociation(SecurityAssociation),
    KeyExchange(KeyExchange),
    IdentificationInitiator(Identification),
    IdentificationResponder(Identification),
    Certificate(Certificate),
    CertificateRequest(CertificateRequest),
    Authentication(Authentication),
    Nonce(Vec<u8>),
    Notify(Notification),
    Delete(Delete),
    VendorId(Vec<u8>),
    TrafficSelectorInitiator(TrafficSelectors),
    TrafficSelectorResponder(TrafficSelectors),
    Encrypted(EncryptedPayload),
    Configuration(Configuration),
    Eap(EapMessage),
}

impl From<&Payload> for PayloadType {
    fn from(value: &Payload) -> Self {
        match value {
            Payload::SecurityAssociation(_) => PayloadType::SecurityAssociation,
            Payload::KeyExchange(_) => PayloadType::KeyExchange,
            Payload::IdentificationInitiator(_) => PayloadType::IdentificationInitiator,
            Payload::IdentificationResponder(_) => PayloadType::IdentificationResponder,
            Payload::Certificate(_) => PayloadType::Certificate,
            Payload::CertificateRequest(_) => PayloadType::CertificateRequest,
            Payload::Authentication(_) => PayloadType::Authentication,
            Payload::Nonce(_) => PayloadType::Nonce,
            Payload::Notify(_) => PayloadType::Notify,
            Payload::Delete(_) => PayloadType::Delete,
            Payload::VendorId(_) => PayloadType::VendorID,
            Payload::TrafficSelectorInitiator(_) => PayloadType::TrafficSelectorInitiator,
            Payload::TrafficSelectorResponder(_) => PayloadType::TrafficSelectorResponder,
            Payload::Encrypted(_) => PayloadType::EncryptedAndAuthenticated,
            Payload::Configuration(_) => PayloadType::Configuration,
            Payload::Eap(_) => PayloadType::ExtensibleAuthentication,
        }
    }
}

/// A Security Association payload: one or more proposals in preference order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecurityAssociation {
    /// Proposals in the order they appeared on the wire
    pub proposals: Vec<Proposal>,
}

/// A single proposal of a Security Association payload
///
/// Transforms are grouped by their type but keep their wire order within
/// each group, which is the order negotiation must respect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Protocol this proposal negotiates
    pub protocol: SecurityProtocol,
    /// The sending entity's SPI; empty for the initial IKE negotiation,
    /// four octets for ESP child negotiations
    pub spi: Vec<u8>,
    /// Offered encryption algorithms with their optional key length attribute
    pub encryption_algorithms: Vec<(EncryptionAlgorithm, Option<u16>)>,
    /// Offered pseudorandom functions
    pub pseudo_random_functions: Vec<PseudorandomFunction>,
    /// Offered integrity algorithms
    pub integrity_algorithms: Vec<IntegrityAlgorithm>,
    /// Offered key exchange methods
    pub key_exchange_methods: Vec<KeyExchangeMethod>,
    /// Offered sequence number modes
    pub sequence_numbers: Vec<ExtendedSequenceNumbers>,
}

/// A single transform before it is grouped into a [Proposal]
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Transform {
    Encryption(EncryptionAlgorithm, Option<u16>),
    PseudoRandomFunction(PseudorandomFunction),
    Integrity(IntegrityAlgorithm),
    KeyExchange(KeyExchangeMethod),
    SequenceNumber(ExtendedSequenceNumbers),
}

/// A Key Exchange payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExchange {
    /// Group in which the key exchange data was computed
    pub dh_group: KeyExchangeMethod,
    /// The sender's public value, zero-padded to the group length
    pub data: Vec<u8>,
}

/// An identification payload, used for both IDi and IDr
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    /// Format of the identification data
    pub id_type: IdentificationType,
    /// The identity itself, e.g. an FQDN as plain bytes
    pub data: Vec<u8>,
}

/// A certificate payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// Encoding of the carried certificate data
    pub encoding: CertificateEncoding,
    /// The certificate data, DER for X.509 signature certificates
    pub data: Vec<u8>,
}

/// A certificate request payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    /// Encoding the peer asks certificates to be sent in
    pub encoding: CertificateEncoding,
    /// Concatenated SHA-1 hashes of acceptable certification authorities
    pub authorities: Vec<u8>,
}

/// An authentication payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    /// Method the authentication data was computed with
    pub method: AuthenticationMethod,
    /// Signature or MAC over the sender's signed octets
    pub data: Vec<u8>,
}

/// High-level representation of a notify payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Error or status variant including the concrete message type
    pub variant: NotificationType,
    /// Type-specific notification data
    pub data: Vec<u8>,
    /// Protocol of the SA the notification concerns
    pub protocol: SecurityProtocol,
    /// SPI of that SA, if any
    pub spi: Option<Vec<u8>>,
}

/// Splits the shared notify message type field into its two value regions
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum NotificationType {
    Error(NotifyErrorMessage),
    Status(NotifyStatusMessage),
}

/// A delete payload announcing the removal of one or more SAs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    /// Protocol of the deleted SAs
    pub protocol: SecurityProtocol,
    /// The sender's inbound SPIs of the deleted child SAs; empty when the
    /// IKE SA itself is deleted
    pub spis: Vec<u32>,
}

/// A traffic selector payload, used for both TSi and TSr
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficSelectors {
    /// Individual selectors in wire order
    pub selectors: Vec<TrafficSelector>,
}

/// A single IPv4 range selector
///
/// Only TS_IPV4_ADDR_RANGE is representable; the N3IWF profile assigns IPv4
/// inner addresses exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficSelector {
    /// IP protocol number to match, 0 for any
    pub ip_protocol: u8,
    /// First port of the matched range
    pub start_port: u16,
    /// Last port of the matched range
    pub end_port: u16,
    /// First address of the matched range
    pub start_addr: Ipv4Addr,
    /// Last address of the matched range
    pub end_addr: Ipv4Addr,
}

/// The undecrypted content of an SK payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Payload type of the first payload inside the encrypted container
    pub first_inner: PayloadType,
    /// IV, ciphertext and ICV as found on the wire
    pub data: Vec<u8>,
}

/// A configuration payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Role of the payload in the exchange
    pub cfg_type: ConfigurationType,
    /// Attributes in wire order
    pub attributes: Vec<ConfigurationAttribute>,
}

/// A single configuration attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationAttribute {
    /// What the attribute requests or assigns
    pub attribute_type: ConfigurationAttributeType,
    /// Raw value; empty in requests that ask for an assignment
    pub value: Vec<u8>,
}

/// An EAP message carried in an Extensible Authentication payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapMessage {
    /// Request, Response, Success or Failure
    pub code: EapCode,
    /// Matches responses to outstanding requests
    pub identifier: u8,
    /// Method data, absent for Success and Failure
    pub data: EapData,
}

/// Method data of an EAP Request or Response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EapData {
    /// The expanded format (type 254) with vendor id and vendor type
    Expanded(EapExpanded),
    /// Any non-expanded method: the raw type octet plus its data
    Standard(u8, Vec<u8>),
    /// Success and Failure messages carry no method data
    Empty,
}

/// Vendor-scoped data of an EAP-Expanded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapExpanded {
    /// SMI enterprise number, 10415 for 3GPP
    pub vendor_id: u32,
    /// Vendor-assigned method, 3 for EAP-5G
    pub vendor_type: u32,
    /// Opaque vendor data, relayed to the NGAP side without inspection
    /// beyond its first octet
    pub vendor_data: Vec<u8>,
}
