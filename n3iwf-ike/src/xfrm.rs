//! Binding of completed child SAs to the kernel IPsec (XFRM) framework
//!
//! The binder turns a [ChildSa] into matched pairs of policy and state
//! entries and manages the per-PDU-session virtual interfaces. The actual
//! netlink conversation lives behind [XfrmDriver]; an in-memory recording
//! driver is provided for tests and dry runs.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use ikev2::definitions::params::{EncryptionAlgorithm, IntegrityAlgorithm};
use ikev2::definitions::TrafficSelector;
use thiserror::Error;
use tracing::debug;

use crate::config::XfrmConfig;
use crate::context::child_sa::ChildSa;

/// Failure while talking to the kernel IPsec framework
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum XfrmError {
    #[error("Kernel driver rejected the operation: {0}")]
    Driver(String),
    #[error("Transform {0:?} has no kernel algorithm name")]
    UnknownAlgorithm(&'static str),
}

/// Direction of a policy or state entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XfrmDirection {
    /// Traffic from the UE into the N3IWF
    In,
    /// Traffic from the N3IWF towards the UE
    Out,
}

/// One ESP state entry as handed to the kernel
#[derive(Debug, Clone)]
pub struct XfrmState {
    /// Direction the state serves
    pub direction: XfrmDirection,
    /// ESP SPI of the state
    pub spi: u32,
    /// Outer source address
    pub src: IpAddr,
    /// Outer destination address
    pub dst: IpAddr,
    /// Kernel name of the encryption algorithm, e.g. `cbc(aes)`
    pub encryption_alg: &'static str,
    /// Raw encryption key
    pub encryption_key: Vec<u8>,
    /// Kernel name of the authentication algorithm, if integrity is on
    pub auth_alg: Option<&'static str>,
    /// Raw authentication key, if integrity is on
    pub auth_key: Option<Vec<u8>>,
    /// UDP source and destination port when ESP-in-UDP encapsulation is on
    pub encapsulation: Option<(u16, u16)>,
    /// Virtual interface the state binds to
    pub iface_id: u32,
}

/// One policy entry as handed to the kernel
#[derive(Debug, Clone)]
pub struct XfrmPolicy {
    /// Direction the policy matches
    pub direction: XfrmDirection,
    /// Inner source selector
    pub src: TrafficSelector,
    /// Inner destination selector
    pub dst: TrafficSelector,
    /// Inner IP protocol the policy matches
    pub ip_protocol: u8,
    /// SPI of the state the policy references
    pub spi: u32,
    /// Virtual interface the policy binds to
    pub iface_id: u32,
}

/// A virtual IPsec interface to be created
#[derive(Debug, Clone)]
pub struct IfaceRequest {
    /// Interface name, e.g. `ipsec7`
    pub name: String,
    /// Physical interface it attaches to
    pub parent: String,
    /// XFRM interface id
    pub id: u32,
    /// Inner gateway address assigned to the interface
    pub addr: Ipv4Addr,
    /// Prefix length of the inner subnet
    pub prefix_len: u8,
}

/// The kernel conversation, kept abstract so the responder core never links
/// against netlink directly
pub trait XfrmDriver: Send + Sync {
    /// Install one state entry
    fn add_state(&self, state: &XfrmState) -> Result<(), XfrmError>;
    /// Install one policy entry
    fn add_policy(&self, policy: &XfrmPolicy) -> Result<(), XfrmError>;
    /// Remove the state and policy entries of a child SA
    fn delete_child(&self, inbound_spi: u32, outbound_spi: u32) -> Result<(), XfrmError>;
    /// Create a virtual IPsec interface
    fn setup_iface(&self, iface: &IfaceRequest) -> Result<(), XfrmError>;
}

/// Kernel algorithm name of an ESP encryption transform
pub fn kernel_encryption_name(alg: EncryptionAlgorithm) -> Option<&'static str> {
    match alg {
        EncryptionAlgorithm::Des => Some("cbc(des)"),
        EncryptionAlgorithm::TripleDes => Some("cbc(des3_ede)"),
        EncryptionAlgorithm::Cast => Some("cbc(cast5)"),
        EncryptionAlgorithm::Blowfish => Some("cbc(blowfish)"),
        EncryptionAlgorithm::Null => Some("ecb(cipher_null)"),
        EncryptionAlgorithm::AesCbc => Some("cbc(aes)"),
        EncryptionAlgorithm::AesCtr => Some("rfc3686(ctr(aes))"),
        _ => None,
    }
}

/// Kernel algorithm name of an ESP integrity transform
pub fn kernel_integrity_name(alg: IntegrityAlgorithm) -> Option<&'static str> {
    match alg {
        IntegrityAlgorithm::HmacMd5_96 => Some("hmac(md5)"),
        IntegrityAlgorithm::HmacSha1_96 => Some("hmac(sha1)"),
        IntegrityAlgorithm::AesXcbc96 => Some("xcbc(aes)"),
        _ => None,
    }
}

/// Turns child SAs into kernel entries and tracks the virtual interfaces
pub struct XfrmBinder {
    driver: Box<dyn XfrmDriver>,
    iface_name: String,
    parent_iface: String,
    base_iface_id: u32,
    ifaces: Mutex<HashSet<u32>>,
    // User-plane interfaces count upwards from base + 1; the signalling
    // interface keeps the base id itself
    up_offset: AtomicU32,
}

impl XfrmBinder {
    /// Create a binder over the given driver and interface settings
    pub fn new(driver: Box<dyn XfrmDriver>, cfg: &XfrmConfig) -> Self {
        Self {
            driver,
            iface_name: cfg.iface_name.clone(),
            parent_iface: cfg.parent_iface.clone(),
            base_iface_id: cfg.base_iface_id,
            ifaces: Mutex::new(HashSet::new()),
            up_offset: AtomicU32::new(1),
        }
    }

    /// Interface id of the signalling child SA
    pub fn default_iface_id(&self) -> u32 {
        self.base_iface_id
    }

    /// Allocate the interface id for the next user-plane child SA
    pub fn next_up_iface_id(&self) -> u32 {
        self.base_iface_id + self.up_offset.fetch_add(1, Ordering::SeqCst)
    }

    /// Create the virtual interface for `id` unless it already exists
    pub fn ensure_iface(
        &self,
        id: u32,
        addr: Ipv4Addr,
        prefix_len: u8,
    ) -> Result<(), XfrmError> {
        let mut ifaces = match self.ifaces.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if ifaces.contains(&id) {
            return Ok(());
        }
        self.driver.setup_iface(&IfaceRequest {
            name: format!("{}{}", self.iface_name, id),
            parent: self.parent_iface.clone(),
            id,
            addr,
            prefix_len,
        })?;
        ifaces.insert(id);
        Ok(())
    }

    /// Install the matched inbound/outbound policy and state entries for a
    /// completed child SA.
    ///
    /// Which key slices protect which direction follows from who initiated
    /// the creating exchange. Encapsulation ports are honoured only when the
    /// child SA has them enabled, which in turn happens only when a NAT was
    /// detected.
    pub fn apply(&self, child: &ChildSa, local: IpAddr, peer: IpAddr) -> Result<(), XfrmError> {
        let encryption_alg = kernel_encryption_name(child.encryption)
            .ok_or(XfrmError::UnknownAlgorithm("encryption"))?;
        let auth_alg = match child.integrity {
            Some(integrity) => Some(
                kernel_integrity_name(integrity)
                    .ok_or(XfrmError::UnknownAlgorithm("integrity"))?,
            ),
            None => None,
        };

        // Keys of the exchange initiator protect what the initiator sends
        let (in_encr, in_auth, out_encr, out_auth) = if child.local_is_initiator {
            (
                &child.keys.responder_encryption,
                &child.keys.responder_integrity,
                &child.keys.initiator_encryption,
                &child.keys.initiator_integrity,
            )
        } else {
            (
                &child.keys.initiator_encryption,
                &child.keys.initiator_integrity,
                &child.keys.responder_encryption,
                &child.keys.responder_integrity,
            )
        };

        let encapsulation_in = child
            .enable_encapsulation
            .then_some((child.peer_port, child.local_port));
        let encapsulation_out = child
            .enable_encapsulation
            .then_some((child.local_port, child.peer_port));

        self.driver.add_state(&XfrmState {
            direction: XfrmDirection::In,
            spi: child.inbound_spi,
            src: peer,
            dst: local,
            encryption_alg,
            encryption_key: in_encr.clone(),
            auth_alg,
            auth_key: auth_alg.map(|_| in_auth.clone()),
            encapsulation: encapsulation_in,
            iface_id: child.xfrm_iface_id,
        })?;
        self.driver.add_policy(&XfrmPolicy {
            direction: XfrmDirection::In,
            src: child.peer_ts,
            dst: child.local_ts,
            ip_protocol: child.ip_protocol,
            spi: child.inbound_spi,
            iface_id: child.xfrm_iface_id,
        })?;

        self.driver.add_state(&XfrmState {
            direction: XfrmDirection::Out,
            spi: child.outbound_spi,
            src: local,
            dst: peer,
            encryption_alg,
            encryption_key: out_encr.clone(),
            auth_alg,
            auth_key: auth_alg.map(|_| out_auth.clone()),
            encapsulation: encapsulation_out,
            iface_id: child.xfrm_iface_id,
        })?;
        self.driver.add_policy(&XfrmPolicy {
            direction: XfrmDirection::Out,
            src: child.local_ts,
            dst: child.peer_ts,
            ip_protocol: child.ip_protocol,
            spi: child.outbound_spi,
            iface_id: child.xfrm_iface_id,
        })?;

        debug!(
            "Installed child SA {:#010x}/{:#010x} on interface {}",
            child.inbound_spi, child.outbound_spi, child.xfrm_iface_id
        );
        Ok(())
    }

    /// Remove the kernel entries of a child SA
    pub fn remove(&self, child: &ChildSa) -> Result<(), XfrmError> {
        self.driver.delete_child(child.inbound_spi, child.outbound_spi)
    }
}

/// A driver that records every call instead of talking to the kernel
#[derive(Debug, Default)]
pub struct RecordingXfrmDriver {
    /// Every state entry handed to the driver
    pub states: Mutex<Vec<XfrmState>>,
    /// Every policy entry handed to the driver
    pub policies: Mutex<Vec<XfrmPolicy>>,
    /// Every interface request handed to the driver
    pub ifaces: Mutex<Vec<IfaceRequest>>,
    /// Every child SA deletion handed to the driver
    pub deleted: Mutex<Vec<(u32, u32)>>,
}

impl XfrmDriver for RecordingXfrmDriver {
    fn add_state(&self, state: &XfrmState) -> Result<(), XfrmError> {
        match self.states.lock() {
            Ok(mut guard) => guard.push(state.clone()),
            Err(poisoned) => poisoned.into_inner().push(state.clone()),
        }
        Ok(())
    }

    fn add_policy(&self, policy: &XfrmPolicy) -> Result<(), XfrmError> {
        match self.policies.lock() {
            Ok(mut guard) => guard.push(policy.clone()),
            Err(poisoned) => poisoned.into_inner().push(policy.clone()),
        }
        Ok(())
    }

    fn delete_child(&self, inbound_spi: u32, outbound_spi: u32) -> Result<(), XfrmError> {
        match self.deleted.lock() {
            Ok(mut guard) => guard.push((inbound_spi, outbound_spi)),
            Err(poisoned) => poisoned.into_inner().push((inbound_spi, outbound_spi)),
        }
        Ok(())
    }

    fn setup_iface(&self, iface: &IfaceRequest) -> Result<(), XfrmError> {
        match self.ifaces.lock() {
            Ok(mut guard) => guard.push(iface.clone()),
            Err(poisoned) => poisoned.into_inner().push(iface.clone()),
        }
        Ok(())
    }
}
