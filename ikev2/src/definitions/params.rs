//! IKEv2 parameters and their parsers as defined in the IANA IKEv2 list
//! found at https://www.iana.org/assignments/ikev2-parameters/ikev2-parameters.xhtml

use serde::{Deserialize, Serialize};
use strum::EnumIter;

use super::UnparseableParameter;

/// Flag bit marking the original initiator of the IKE SA
pub const FLAG_INITIATOR: u8 = 0b00001000;
/// Flag bit marking a response message
pub const FLAG_RESPONSE: u8 = 0b00100000;
/// Top bit of an attribute type selecting the fixed-length TV format
pub const FLAG_ATTRIBUTE_FORMAT: u16 = 0x8000;

/// Attribute type of the Key Length attribute, the only one in use
pub const ATTRIBUTE_TYPE_KEY_LENGTH: u16 = 14;

/// SMI enterprise number of 3GPP, used in EAP-Expanded payloads
pub const VENDOR_ID_3GPP: u32 = 10415;
/// Vendor type of the EAP-5G method under the 3GPP vendor id
pub const VENDOR_TYPE_EAP_5G: u32 = 3;
/// EAP method type marking the expanded format
pub const EAP_TYPE_EXPANDED: u8 = 254;

/// IP protocol number of TCP, used in traffic selectors of the signalling SA
pub const IP_PROTOCOL_TCP: u8 = 6;
/// IP protocol number of GRE, used in traffic selectors of user-plane SAs
pub const IP_PROTOCOL_GRE: u8 = 47;

/// Type of the exchange being used
///
/// This constrains the payloads sent in each message in an exchange.
/// Notably, values 0-33 are reserved, 45-239 are currently unassigned
/// and 240-255 reserved for private use. Also see [UnparseableParameter].
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ExchangeType {
    // RFC 7296
    IkeSaInit = 34,
    // RFC 7296
    IkeAuth = 35,
    // RFC 7296
    CreateChildSa = 36,
    // RFC 7296
    Informational = 37,
    // RFC5723
    IkeSessionResume = 38,
    // RFC9242
    IkeIntermediate = 43,
    // RFC9370
    IkeFollowupKeyExchange = 44,
}

impl TryFrom<u8> for ExchangeType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=33 => Err(UnparseableParameter::Reserved),
            34 => Ok(ExchangeType::IkeSaInit),
            35 => Ok(ExchangeType::IkeAuth),
            36 => Ok(ExchangeType::CreateChildSa),
            37 => Ok(ExchangeType::Informational),
            38 => Ok(ExchangeType::IkeSessionResume),
            43 => Ok(ExchangeType::IkeIntermediate),
            44 => Ok(ExchangeType::IkeFollowupKeyExchange),
            39..=42 | 45..=239 => Err(UnparseableParameter::Unassigned),
            240..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Type of the payload being used
///
/// Refer to https://www.iana.org/assignments/ikev2-parameters/ikev2-parameters.xhtml
/// for details. Notably, values 1-32 are reserved, 55-127 are currently
/// unassigned and 128-255 reserved for private use.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum PayloadType {
    // RFC 7296, this also matches the IKEv1 value while all other values do not
    NoNextPayload = 0,
    // RFC 7296
    SecurityAssociation = 33,
    // RFC 7296
    KeyExchange = 34,
    // RFC 7296
    IdentificationInitiator = 35,
    // RFC 7296
    IdentificationResponder = 36,
    // RFC 7296
    Certificate = 37,
    // RFC 7296
    CertificateRequest = 38,
    // RFC 7296
    Authentication = 39,
    // RFC 7296
    Nonce = 40,
    // RFC 7296
    Notify = 41,
    // RFC 7296
    Delete = 42,
    // RFC 7296
    VendorID = 43,
    // RFC 7296
    TrafficSelectorInitiator = 44,
    // RFC 7296
    TrafficSelectorResponder = 45,
    // RFC 7296
    EncryptedAndAuthenticated = 46,
    // RFC 7296
    Configuration = 47,
    // RFC 7296
    ExtensibleAuthentication = 48,
    // RFC 6467
    GenericSecurePasswordMethod = 49,
    // RFC 7383
    EncryptedAndAuthenticatedFragment = 53,
    // RFC 8019
    PuzzleSolution = 54,
}

impl TryFrom<u8> for PayloadType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PayloadType::NoNextPayload),
            1..=32 => Err(UnparseableParameter::Reserved),
            33 => Ok(PayloadType::SecurityAssociation),
            34 => Ok(PayloadType::KeyExchange),
            35 => Ok(PayloadType::IdentificationInitiator),
            36 => Ok(PayloadType::IdentificationResponder),
            37 => Ok(PayloadType::Certificate),
            38 => Ok(PayloadType::CertificateRequest),
            39 => Ok(PayloadType::Authentication),
            40 => Ok(PayloadType::Nonce),
            41 => Ok(PayloadType::Notify),
            42 => Ok(PayloadType::Delete),
            43 => Ok(PayloadType::VendorID),
            44 => Ok(PayloadType::TrafficSelectorInitiator),
            45 => Ok(PayloadType::TrafficSelectorResponder),
            46 => Ok(PayloadType::EncryptedAndAuthenticated),
            47 => Ok(PayloadType::Configuration),
            48 => Ok(PayloadType::ExtensibleAuthentication),
            49 => Ok(PayloadType::GenericSecurePasswordMethod),
            53 => Ok(PayloadType::EncryptedAndAuthenticatedFragment),
            54 => Ok(PayloadType::PuzzleSolution),
            50..=52 | 55..=127 => Err(UnparseableParameter::Unassigned),
            128..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Type of the transform being used
///
/// Value 0 is reserved, 15-240 is unassigned and 241-255 is
/// reserved for private use. Also see [UnparseableParameter].
///
/// The "Key Exchange Method (KE)" transform type was originally
/// named "Diffie-Hellman Group (D-H)" and was referenced by
/// that name in a number of RFCs published prior
/// to RFC 9370, which gave it the current title.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TransformType {
    EncryptionAlgorithm = 1,
    PseudoRandomFunction = 2,
    IntegrityAlgorithm = 3,
    KeyExchangeMethod = 4,
    ExtendedSequenceNumbers = 5,
}

impl TryFrom<u8> for TransformType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(TransformType::EncryptionAlgorithm),
            2 => Ok(TransformType::PseudoRandomFunction),
            3 => Ok(TransformType::IntegrityAlgorithm),
            4 => Ok(TransformType::KeyExchangeMethod),
            5 => Ok(TransformType::ExtendedSequenceNumbers),
            6..=240 => Err(UnparseableParameter::Unassigned),
            241..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Transform Type 1 - the encryption algorithm of a proposal
///
/// Values 0, 10 and 17 are reserved; everything above 24 that is not listed
/// is treated as unassigned here, 1024-65535 is reserved for private use.
#[derive(
    Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, EnumIter, Serialize, Deserialize,
)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum EncryptionAlgorithm {
    DesIv64 = 1,
    Des = 2,
    TripleDes = 3,
    Rc5 = 4,
    Idea = 5,
    Cast = 6,
    Blowfish = 7,
    ThreeIdea = 8,
    DesIv32 = 9,
    Null = 11,
    AesCbc = 12,
    AesCtr = 13,
    AesCcm8 = 14,
    AesCcm12 = 15,
    AesCcm16 = 16,
    AesGcm8 = 18,
    AesGcm12 = 19,
    AesGcm16 = 20,
    CamelliaCbc = 23,
    CamelliaCtr = 24,
}

impl TryFrom<u16> for EncryptionAlgorithm {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 | 10 | 17 => Err(UnparseableParameter::Reserved),
            1 => Ok(EncryptionAlgorithm::DesIv64),
            2 => Ok(EncryptionAlgorithm::Des),
            3 => Ok(EncryptionAlgorithm::TripleDes),
            4 => Ok(EncryptionAlgorithm::Rc5),
            5 => Ok(EncryptionAlgorithm::Idea),
            6 => Ok(EncryptionAlgorithm::Cast),
            7 => Ok(EncryptionAlgorithm::Blowfish),
            8 => Ok(EncryptionAlgorithm::ThreeIdea),
            9 => Ok(EncryptionAlgorithm::DesIv32),
            11 => Ok(EncryptionAlgorithm::Null),
            12 => Ok(EncryptionAlgorithm::AesCbc),
            13 => Ok(EncryptionAlgorithm::AesCtr),
            14 => Ok(EncryptionAlgorithm::AesCcm8),
            15 => Ok(EncryptionAlgorithm::AesCcm12),
            16 => Ok(EncryptionAlgorithm::AesCcm16),
            18 => Ok(EncryptionAlgorithm::AesGcm8),
            19 => Ok(EncryptionAlgorithm::AesGcm12),
            20 => Ok(EncryptionAlgorithm::AesGcm16),
            23 => Ok(EncryptionAlgorithm::CamelliaCbc),
            24 => Ok(EncryptionAlgorithm::CamelliaCtr),
            21..=22 | 25..=1023 => Err(UnparseableParameter::Unassigned),
            1024..=65535 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Transform Type 2 - the pseudorandom function of a proposal
#[derive(
    Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, EnumIter, Serialize, Deserialize,
)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum PseudorandomFunction {
    HmacMd5 = 1,
    HmacSha1 = 2,
    HmacTiger = 3,
    Aes128Xcbc = 4,
    HmacSha2_256 = 5,
    HmacSha2_384 = 6,
    HmacSha2_512 = 7,
    Aes128Cmac = 8,
}

impl TryFrom<u16> for PseudorandomFunction {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(PseudorandomFunction::HmacMd5),
            2 => Ok(PseudorandomFunction::HmacSha1),
            3 => Ok(PseudorandomFunction::HmacTiger),
            4 => Ok(PseudorandomFunction::Aes128Xcbc),
            5 => Ok(PseudorandomFunction::HmacSha2_256),
            6 => Ok(PseudorandomFunction::HmacSha2_384),
            7 => Ok(PseudorandomFunction::HmacSha2_512),
            8 => Ok(PseudorandomFunction::Aes128Cmac),
            9..=1023 => Err(UnparseableParameter::Unassigned),
            1024..=65535 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Transform Type 3 - the integrity algorithm of a proposal
#[derive(
    Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, EnumIter, Serialize, Deserialize,
)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum IntegrityAlgorithm {
    HmacMd5_96 = 1,
    HmacSha1_96 = 2,
    DesMac = 3,
    KpdkMd5 = 4,
    AesXcbc96 = 5,
    HmacMd5_128 = 6,
    HmacSha1_160 = 7,
    AesCmac96 = 8,
    Aes128Gmac = 9,
    Aes192Gmac = 10,
    Aes256Gmac = 11,
    HmacSha2_256_128 = 12,
    HmacSha2_384_192 = 13,
    HmacSha2_512_256 = 14,
}

impl TryFrom<u16> for IntegrityAlgorithm {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(IntegrityAlgorithm::HmacMd5_96),
            2 => Ok(IntegrityAlgorithm::HmacSha1_96),
            3 => Ok(IntegrityAlgorithm::DesMac),
            4 => Ok(IntegrityAlgorithm::KpdkMd5),
            5 => Ok(IntegrityAlgorithm::AesXcbc96),
            6 => Ok(IntegrityAlgorithm::HmacMd5_128),
            7 => Ok(IntegrityAlgorithm::HmacSha1_160),
            8 => Ok(IntegrityAlgorithm::AesCmac96),
            9 => Ok(IntegrityAlgorithm::Aes128Gmac),
            10 => Ok(IntegrityAlgorithm::Aes192Gmac),
            11 => Ok(IntegrityAlgorithm::Aes256Gmac),
            12 => Ok(IntegrityAlgorithm::HmacSha2_256_128),
            13 => Ok(IntegrityAlgorithm::HmacSha2_384_192),
            14 => Ok(IntegrityAlgorithm::HmacSha2_512_256),
            15..=1023 => Err(UnparseableParameter::Unassigned),
            1024..=65535 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Transform Type 4 - the key exchange method (Diffie-Hellman group) of a
/// proposal
#[derive(
    Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, EnumIter, Serialize, Deserialize,
)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum KeyExchangeMethod {
    ModP768 = 1,
    ModP1024 = 2,
    ModP1536 = 5,
    ModP2048 = 14,
    ModP3072 = 15,
    ModP4096 = 16,
    ModP6144 = 17,
    ModP8192 = 18,
    Ecp256 = 19,
    Ecp384 = 20,
    Ecp521 = 21,
    ModP1024S160 = 22,
    ModP2048S224 = 23,
    ModP2048S256 = 24,
    Ecp192 = 25,
    Ecp224 = 26,
    BrainpoolP224 = 27,
    BrainpoolP256 = 28,
    BrainpoolP384 = 29,
    BrainpoolP512 = 30,
    Curve25519 = 31,
    Curve448 = 32,
}

impl TryFrom<u16> for KeyExchangeMethod {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(KeyExchangeMethod::ModP768),
            2 => Ok(KeyExchangeMethod::ModP1024),
            3..=4 => Err(UnparseableParameter::Reserved),
            5 => Ok(KeyExchangeMethod::ModP1536),
            6..=13 => Err(UnparseableParameter::Unassigned),
            14 => Ok(KeyExchangeMethod::ModP2048),
            15 => Ok(KeyExchangeMethod::ModP3072),
            16 => Ok(KeyExchangeMethod::ModP4096),
            17 => Ok(KeyExchangeMethod::ModP6144),
            18 => Ok(KeyExchangeMethod::ModP8192),
            19 => Ok(KeyExchangeMethod::Ecp256),
            20 => Ok(KeyExchangeMethod::Ecp384),
            21 => Ok(KeyExchangeMethod::Ecp521),
            22 => Ok(KeyExchangeMethod::ModP1024S160),
            23 => Ok(KeyExchangeMethod::ModP2048S224),
            24 => Ok(KeyExchangeMethod::ModP2048S256),
            25 => Ok(KeyExchangeMethod::Ecp192),
            26 => Ok(KeyExchangeMethod::Ecp224),
            27 => Ok(KeyExchangeMethod::BrainpoolP224),
            28 => Ok(KeyExchangeMethod::BrainpoolP256),
            29 => Ok(KeyExchangeMethod::BrainpoolP384),
            30 => Ok(KeyExchangeMethod::BrainpoolP512),
            31 => Ok(KeyExchangeMethod::Curve25519),
            32 => Ok(KeyExchangeMethod::Curve448),
            33..=1023 => Err(UnparseableParameter::Unassigned),
            1024..=65535 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Transform Type 5 - whether extended (64-bit) ESP sequence numbers are used
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum ExtendedSequenceNumbers {
    No = 0,
    Yes = 1,
}

impl TryFrom<u16> for ExtendedSequenceNumbers {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ExtendedSequenceNumbers::No),
            1 => Ok(ExtendedSequenceNumbers::Yes),
            2..=65535 => Err(UnparseableParameter::Unassigned),
        }
    }
}

/// Protocol negotiated by a proposal, or referenced by notify and delete
/// payloads
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum SecurityProtocol {
    /// Used in notify payloads that carry no SPI
    Reserved = 0,
    InternetKeyExchange = 1,
    AuthenticationHeader = 2,
    EncapsulatingSecurityPayload = 3,
}

impl TryFrom<u8> for SecurityProtocol {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SecurityProtocol::Reserved),
            1 => Ok(SecurityProtocol::InternetKeyExchange),
            2 => Ok(SecurityProtocol::AuthenticationHeader),
            3 => Ok(SecurityProtocol::EncapsulatingSecurityPayload),
            4..=200 => Err(UnparseableParameter::Unassigned),
            201..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Format of the data carried in an identification payload
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum IdentificationType {
    Ipv4Addr = 1,
    Fqdn = 2,
    Rfc822Addr = 3,
    Ipv6Addr = 5,
    DerAsn1Dn = 9,
    DerAsn1Gn = 10,
    KeyId = 11,
}

impl TryFrom<u8> for IdentificationType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 | 4 | 6..=8 => Err(UnparseableParameter::Reserved),
            1 => Ok(IdentificationType::Ipv4Addr),
            2 => Ok(IdentificationType::Fqdn),
            3 => Ok(IdentificationType::Rfc822Addr),
            5 => Ok(IdentificationType::Ipv6Addr),
            9 => Ok(IdentificationType::DerAsn1Dn),
            10 => Ok(IdentificationType::DerAsn1Gn),
            11 => Ok(IdentificationType::KeyId),
            12..=200 => Err(UnparseableParameter::Unassigned),
            201..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Indicator for the encoding of certificates and related data
///
/// Values 0 and 5 are reserved, 16-200 are unassigned and 201-255 are
/// reserved for private use.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Copy)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum CertificateEncoding {
    PKCS7WrappedX509Certificate = 1,
    PGPCertificate = 2,
    DNSSignedKey = 3,
    X509CertificateSignature = 4,
    KerberosTokens = 6,
    CertificateRevocationList = 7,
    AuthorityRevocationList = 8,
    SPKICertificate = 9,
    X509CertificateAttribute = 10,
    RawRSAKey = 11, // deprecated
    HashUrlX509Certificate = 12,
    HashUrlX509Bundle = 13,
    OCSPContent = 14,
    RawPublicKey = 15,
}

impl TryFrom<u8> for CertificateEncoding {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(CertificateEncoding::PKCS7WrappedX509Certificate),
            2 => Ok(CertificateEncoding::PGPCertificate),
            3 => Ok(CertificateEncoding::DNSSignedKey),
            4 => Ok(CertificateEncoding::X509CertificateSignature),
            5 => Err(UnparseableParameter::Reserved),
            6 => Ok(CertificateEncoding::KerberosTokens),
            7 => Ok(CertificateEncoding::CertificateRevocationList),
            8 => Ok(CertificateEncoding::AuthorityRevocationList),
            9 => Ok(CertificateEncoding::SPKICertificate),
            10 => Ok(CertificateEncoding::X509CertificateAttribute),
            11 => Ok(CertificateEncoding::RawRSAKey),
            12 => Ok(CertificateEncoding::HashUrlX509Certificate),
            13 => Ok(CertificateEncoding::HashUrlX509Bundle),
            14 => Ok(CertificateEncoding::OCSPContent),
            15 => Ok(CertificateEncoding::RawPublicKey),
            16..=200 => Err(UnparseableParameter::Unassigned),
            201..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Type of authentication method being used
///
/// Value 0 is reserved, values 4-8 and 15-200 are unassigned and
/// values 201-255 are reserved for private use.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Copy)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AuthenticationMethod {
    RSADigitalSignature = 1,
    SharedKeyMessageIntegrityCode = 2,
    DSSDigitalSignature = 3,
    ECDSAWithSHA256 = 9,  // with P-256 curve
    ECDSAWithSHA384 = 10, // with P-384 curve
    ECDSAWithSHA512 = 11, // with P-521 curve
    GenericSecurePassword = 12,
    NULLAuthentication = 13,
    DigitalSignature = 14,
}

impl TryFrom<u8> for AuthenticationMethod {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(AuthenticationMethod::RSADigitalSignature),
            2 => Ok(AuthenticationMethod::SharedKeyMessageIntegrityCode),
            3 => Ok(AuthenticationMethod::DSSDigitalSignature),
            4..=8 => Err(UnparseableParameter::Unassigned),
            9 => Ok(AuthenticationMethod::ECDSAWithSHA256),
            10 => Ok(AuthenticationMethod::ECDSAWithSHA384),
            11 => Ok(AuthenticationMethod::ECDSAWithSHA512),
            12 => Ok(AuthenticationMethod::GenericSecurePassword),
            13 => Ok(AuthenticationMethod::NULLAuthentication),
            14 => Ok(AuthenticationMethod::DigitalSignature),
            15..=200 => Err(UnparseableParameter::Unassigned),
            201..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Notify message types in the error region (0 - 16383)
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum NotifyErrorMessage {
    UnsupportedCriticalPayload = 1,
    InvalidIkeSpi = 4,
    InvalidMajorVersion = 5,
    InvalidSyntax = 7,
    InvalidMessageId = 9,
    InvalidSpi = 11,
    NoProposalChosen = 14,
    InvalidKeyExchangePayload = 17,
    AuthenticationFailed = 24,
    SinglePairRequired = 34,
    NoAdditionalSas = 35,
    InternalAddressFailure = 36,
    FailedCpRequired = 37,
    TsUnacceptable = 38,
    InvalidSelectors = 39,
    UnacceptableAddresses = 40,
    UnexpectedNatDetected = 41,
    UseAssignedHoA = 42,
    TemporaryFailure = 43,
    ChildSaNotFound = 44,
    InvalidGroupId = 45,
    AuthorizationFailed = 46,
    StateNotFound = 47,
}

impl TryFrom<u16> for NotifyErrorMessage {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(NotifyErrorMessage::UnsupportedCriticalPayload),
            2..=3 => Err(UnparseableParameter::Reserved),
            4 => Ok(NotifyErrorMessage::InvalidIkeSpi),
            5 => Ok(NotifyErrorMessage::InvalidMajorVersion),
            6 => Err(UnparseableParameter::Reserved),
            7 => Ok(NotifyErrorMessage::InvalidSyntax),
            8 => Err(UnparseableParameter::Reserved),
            9 => Ok(NotifyErrorMessage::InvalidMessageId),
            10 => Err(UnparseableParameter::Reserved),
            11 => Ok(NotifyErrorMessage::InvalidSpi),
            12..=13 => Err(UnparseableParameter::Reserved),
            14 => Ok(NotifyErrorMessage::NoProposalChosen),
            15..=16 => Err(UnparseableParameter::Reserved),
            17 => Ok(NotifyErrorMessage::InvalidKeyExchangePayload),
            18..=23 => Err(UnparseableParameter::Reserved),
            24 => Ok(NotifyErrorMessage::AuthenticationFailed),
            25..=33 => Err(UnparseableParameter::Reserved),
            34 => Ok(NotifyErrorMessage::SinglePairRequired),
            35 => Ok(NotifyErrorMessage::NoAdditionalSas),
            36 => Ok(NotifyErrorMessage::InternalAddressFailure),
            37 => Ok(NotifyErrorMessage::FailedCpRequired),
            38 => Ok(NotifyErrorMessage::TsUnacceptable),
            39 => Ok(NotifyErrorMessage::InvalidSelectors),
            40 => Ok(NotifyErrorMessage::UnacceptableAddresses),
            41 => Ok(NotifyErrorMessage::UnexpectedNatDetected),
            42 => Ok(NotifyErrorMessage::UseAssignedHoA),
            43 => Ok(NotifyErrorMessage::TemporaryFailure),
            44 => Ok(NotifyErrorMessage::ChildSaNotFound),
            45 => Ok(NotifyErrorMessage::InvalidGroupId),
            46 => Ok(NotifyErrorMessage::AuthorizationFailed),
            47 => Ok(NotifyErrorMessage::StateNotFound),
            48..=8191 => Err(UnparseableParameter::Unassigned),
            8192..=16383 => Err(UnparseableParameter::PrivateUse),
            16384..=65535 => Err(UnparseableParameter::OutOfRange),
        }
    }
}

/// Notify message types in the status region (16384 - 65535)
///
/// The four values above 40959 are 3GPP-private notifications of the N3IWF
/// profile; they fall into the IANA private-use region but are fixed by the
/// access-network specification, so they parse like assigned values here.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum NotifyStatusMessage {
    InitialContact = 16384,
    SetWindowSize = 16385,
    AdditionalTsPossible = 16386,
    IpcompSupported = 16387,
    NatDetectionSourceIp = 16388,
    NatDetectionDestinationIp = 16389,
    Cookie = 16390,
    UseTransportMode = 16391,
    HttpCertLookupSupported = 16392,
    RekeySa = 16393,
    EspTfcPaddingNotSupported = 16394,
    NonFirstFragmentsAlso = 16395,
    MobikeSupported = 16396,
    Fragmentation = 16430,
    SignatureHashAlgorithms = 16431,
    // 3GPP TS 24.502
    Qos5gInfo = 55501,
    // 3GPP TS 24.502
    NasIp4Address = 55502,
    // 3GPP TS 24.502
    UpIp4Address = 55504,
    // 3GPP TS 24.502
    NasTcpPort = 55506,
}

impl TryFrom<u16> for NotifyStatusMessage {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0..=16383 => Err(UnparseableParameter::OutOfRange),
            16384 => Ok(NotifyStatusMessage::InitialContact),
            16385 => Ok(NotifyStatusMessage::SetWindowSize),
            16386 => Ok(NotifyStatusMessage::AdditionalTsPossible),
            16387 => Ok(NotifyStatusMessage::IpcompSupported),
            16388 => Ok(NotifyStatusMessage::NatDetectionSourceIp),
            16389 => Ok(NotifyStatusMessage::NatDetectionDestinationIp),
            16390 => Ok(NotifyStatusMessage::Cookie),
            16391 => Ok(NotifyStatusMessage::UseTransportMode),
            16392 => Ok(NotifyStatusMessage::HttpCertLookupSupported),
            16393 => Ok(NotifyStatusMessage::RekeySa),
            16394 => Ok(NotifyStatusMessage::EspTfcPaddingNotSupported),
            16395 => Ok(NotifyStatusMessage::NonFirstFragmentsAlso),
            16396 => Ok(NotifyStatusMessage::MobikeSupported),
            16430 => Ok(NotifyStatusMessage::Fragmentation),
            16431 => Ok(NotifyStatusMessage::SignatureHashAlgorithms),
            55501 => Ok(NotifyStatusMessage::Qos5gInfo),
            55502 => Ok(NotifyStatusMessage::NasIp4Address),
            55504 => Ok(NotifyStatusMessage::UpIp4Address),
            55506 => Ok(NotifyStatusMessage::NasTcpPort),
            16397..=16429 | 16432..=40959 => Err(UnparseableParameter::Unassigned),
            40960..=55500 | 55503 | 55505 | 55507..=65535 => {
                Err(UnparseableParameter::PrivateUse)
            }
        }
    }
}

/// Role of a configuration payload in the exchange
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ConfigurationType {
    Request = 1,
    Reply = 2,
    Set = 3,
    Ack = 4,
}

impl TryFrom<u8> for ConfigurationType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(ConfigurationType::Request),
            2 => Ok(ConfigurationType::Reply),
            3 => Ok(ConfigurationType::Set),
            4 => Ok(ConfigurationType::Ack),
            5..=127 => Err(UnparseableParameter::Unassigned),
            128..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Attribute types carried in configuration payloads
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum ConfigurationAttributeType {
    InternalIp4Address = 1,
    InternalIp4Netmask = 2,
    InternalIp4Dns = 3,
    InternalIp4Nbns = 4,
    InternalIp4Dhcp = 6,
    ApplicationVersion = 7,
    InternalIp6Address = 8,
    InternalIp6Dns = 10,
    InternalIp6Dhcp = 12,
    InternalIp4Subnet = 13,
    SupportedAttributes = 14,
    InternalIp6Subnet = 15,
}

impl TryFrom<u16> for ConfigurationAttributeType {
    type Error = UnparseableParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 | 5 | 9 | 11 => Err(UnparseableParameter::Reserved),
            1 => Ok(ConfigurationAttributeType::InternalIp4Address),
            2 => Ok(ConfigurationAttributeType::InternalIp4Netmask),
            3 => Ok(ConfigurationAttributeType::InternalIp4Dns),
            4 => Ok(ConfigurationAttributeType::InternalIp4Nbns),
            6 => Ok(ConfigurationAttributeType::InternalIp4Dhcp),
            7 => Ok(ConfigurationAttributeType::ApplicationVersion),
            8 => Ok(ConfigurationAttributeType::InternalIp6Address),
            10 => Ok(ConfigurationAttributeType::InternalIp6Dns),
            12 => Ok(ConfigurationAttributeType::InternalIp6Dhcp),
            13 => Ok(ConfigurationAttributeType::InternalIp4Subnet),
            14 => Ok(ConfigurationAttributeType::SupportedAttributes),
            15 => Ok(ConfigurationAttributeType::InternalIp6Subnet),
            16..=16383 => Err(UnparseableParameter::Unassigned),
            16384..=65535 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Format of a single traffic selector substructure
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TrafficSelectorType {
    Ipv4AddrRange = 7,
    Ipv6AddrRange = 8,
}

impl TryFrom<u8> for TrafficSelectorType {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=6 => Err(UnparseableParameter::Reserved),
            7 => Ok(TrafficSelectorType::Ipv4AddrRange),
            8 => Ok(TrafficSelectorType::Ipv6AddrRange),
            9..=240 => Err(UnparseableParameter::Unassigned),
            241..=255 => Err(UnparseableParameter::PrivateUse),
        }
    }
}

/// Code octet of an EAP message as per RFC 3748
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum EapCode {
    Request = 1,
    Response = 2,
    Success = 3,
    Failure = 4,
}

impl TryFrom<u8> for EapCode {
    type Error = UnparseableParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Err(UnparseableParameter::Reserved),
            1 => Ok(EapCode::Request),
            2 => Ok(EapCode::Response),
            3 => Ok(EapCode::Success),
            4 => Ok(EapCode::Failure),
            5..=255 => Err(UnparseableParameter::Unassigned),
        }
    }
}
