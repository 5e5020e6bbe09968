use std::net::Ipv4Addr;

use crate::definitions::params::{
    EncryptionAlgorithm, IntegrityAlgorithm, PseudorandomFunction, SecurityProtocol,
};
use crate::definitions::{Proposal, TrafficSelector, Transform};

impl Proposal {
    /// Return the number of transforms over all groups of the [Proposal]
    pub fn len(&self) -> usize {
        self.encryption_algorithms.len()
            + self.pseudo_random_functions.len()
            + self.integrity_algorithms.len()
            + self.key_exchange_methods.len()
            + self.sequence_numbers.len()
    }

    /// Check whether the [Proposal] has no transforms at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a number of transforms to the [Proposal], grouping by the correct
    /// transform type
    pub fn add(&mut self, transforms: Vec<Transform>) {
        for transform in transforms {
            match transform {
                Transform::Encryption(a, o) => self.encryption_algorithms.push((a, o)),
                Transform::PseudoRandomFunction(p) => self.pseudo_random_functions.push(p),
                Transform::Integrity(i) => self.integrity_algorithms.push(i),
                Transform::KeyExchange(k) => self.key_exchange_methods.push(k),
                Transform::SequenceNumber(s) => self.sequence_numbers.push(s),
            }
        }
    }

    /// Easily construct a new empty [Proposal] with the supplied protocol and SPI
    pub fn new_empty(protocol: SecurityProtocol, spi: Option<Vec<u8>>) -> Self {
        Self {
            protocol,
            spi: spi.unwrap_or_default(),
            encryption_algorithms: vec![],
            pseudo_random_functions: vec![],
            integrity_algorithms: vec![],
            key_exchange_methods: vec![],
            sequence_numbers: vec![],
        }
    }
}

impl EncryptionAlgorithm {
    /// Key length in octets for the given optional key length attribute,
    /// or `None` when the algorithm/attribute combination is not valid
    pub fn key_len(&self, attribute: Option<u16>) -> Option<usize> {
        match self {
            EncryptionAlgorithm::Des | EncryptionAlgorithm::DesIv64 => Some(8),
            EncryptionAlgorithm::TripleDes => Some(24),
            EncryptionAlgorithm::Cast => match attribute {
                None | Some(128) => Some(16),
                _ => None,
            },
            EncryptionAlgorithm::Blowfish => Some(attribute.unwrap_or(128) as usize / 8),
            EncryptionAlgorithm::Null => Some(0),
            EncryptionAlgorithm::AesCbc | EncryptionAlgorithm::AesCtr => match attribute {
                Some(128) => Some(16),
                Some(192) => Some(24),
                Some(256) => Some(32),
                _ => None,
            },
            _ => None,
        }
    }

    /// Cipher block length in octets, which is also the IV length for the
    /// CBC modes
    pub fn block_len(&self) -> usize {
        match self {
            EncryptionAlgorithm::AesCbc
            | EncryptionAlgorithm::AesCtr
            | EncryptionAlgorithm::CamelliaCbc
            | EncryptionAlgorithm::CamelliaCtr => 16,
            _ => 8,
        }
    }
}

impl PseudorandomFunction {
    /// Preferred key length in octets
    pub fn key_len(&self) -> usize {
        match self {
            PseudorandomFunction::HmacMd5 => 16,
            PseudorandomFunction::HmacSha1 => 20,
            PseudorandomFunction::HmacTiger => 24,
            PseudorandomFunction::Aes128Xcbc | PseudorandomFunction::Aes128Cmac => 16,
            PseudorandomFunction::HmacSha2_256 => 32,
            PseudorandomFunction::HmacSha2_384 => 48,
            PseudorandomFunction::HmacSha2_512 => 64,
        }
    }

    /// Output length in octets of a single invocation
    pub fn output_len(&self) -> usize {
        match self {
            PseudorandomFunction::HmacMd5 => 16,
            PseudorandomFunction::HmacSha1 => 20,
            PseudorandomFunction::HmacTiger => 24,
            PseudorandomFunction::Aes128Xcbc | PseudorandomFunction::Aes128Cmac => 16,
            PseudorandomFunction::HmacSha2_256 => 32,
            PseudorandomFunction::HmacSha2_384 => 48,
            PseudorandomFunction::HmacSha2_512 => 64,
        }
    }
}

impl IntegrityAlgorithm {
    /// Key length in octets
    pub fn key_len(&self) -> usize {
        match self {
            IntegrityAlgorithm::HmacMd5_96 | IntegrityAlgorithm::HmacMd5_128 => 16,
            IntegrityAlgorithm::HmacSha1_96 | IntegrityAlgorithm::HmacSha1_160 => 20,
            IntegrityAlgorithm::AesXcbc96 | IntegrityAlgorithm::AesCmac96 => 16,
            IntegrityAlgorithm::HmacSha2_256_128 => 32,
            IntegrityAlgorithm::HmacSha2_384_192 => 48,
            IntegrityAlgorithm::HmacSha2_512_256 => 64,
            _ => 0,
        }
    }

    /// Length in octets of the transmitted (possibly truncated) checksum
    pub fn output_len(&self) -> usize {
        match self {
            IntegrityAlgorithm::HmacMd5_96
            | IntegrityAlgorithm::HmacSha1_96
            | IntegrityAlgorithm::AesXcbc96
            | IntegrityAlgorithm::AesCmac96 => 12,
            IntegrityAlgorithm::HmacMd5_128 | IntegrityAlgorithm::HmacSha2_256_128 => 16,
            IntegrityAlgorithm::HmacSha1_160 => 20,
            IntegrityAlgorithm::HmacSha2_384_192 => 24,
            IntegrityAlgorithm::HmacSha2_512_256 => 32,
            _ => 0,
        }
    }
}

impl TrafficSelector {
    /// Selector matching exactly one host on every port
    pub fn single_host(addr: Ipv4Addr, ip_protocol: u8) -> Self {
        Self {
            ip_protocol,
            start_port: 0,
            end_port: 65535,
            start_addr: addr,
            end_addr: addr,
        }
    }
}
