//! Shared stores for IKE SAs, child SAs and the SPI-to-NGAP-id mapping
//!
//! IKE SAs are owned by the store behind a per-SA async mutex; a handler
//! locks one SA for the duration of a single message, which yields the
//! per-SA serialization the state machine relies on. The maps themselves
//! are only ever held for non-awaiting lookups.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, RwLock};

use tokio::sync::Mutex;

use crate::context::child_sa::ChildSa;
use crate::context::ike_sa::IkeSa;
use crate::random::RandomSource;

/// Reservation state of an inbound ESP SPI
enum ChildEntry {
    /// SPI allocated, keys not yet derived; never visible to the kernel
    Half { parent_local_spi: u64 },
    /// Fully negotiated and installed
    Complete(Box<ChildSa>),
}

/// The three shared maps of the responder
#[derive(Default)]
pub struct SaStore {
    ike_sas: RwLock<HashMap<u64, Arc<Mutex<IkeSa>>>>,
    child_sas: StdMutex<HashMap<u32, ChildEntry>>,
    ngap_ids: RwLock<HashMap<u64, u64>>,
}

impl SaStore {
    /// Draw an unused non-zero local IKE SPI
    pub fn alloc_ike_spi(&self, rng: &dyn RandomSource) -> u64 {
        let sas = match self.ike_sas.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            let spi = rng.next_u64();
            if spi != 0 && !sas.contains_key(&spi) {
                return spi;
            }
        }
    }

    /// Insert a freshly created IKE SA and return its shared handle
    pub fn insert_ike_sa(&self, sa: IkeSa) -> Arc<Mutex<IkeSa>> {
        let spi = sa.local_spi;
        let handle = Arc::new(Mutex::new(sa));
        let mut sas = match self.ike_sas.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sas.insert(spi, handle.clone());
        handle
    }

    /// Look up an IKE SA by its local SPI
    pub fn ike_sa(&self, local_spi: u64) -> Option<Arc<Mutex<IkeSa>>> {
        let sas = match self.ike_sas.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sas.get(&local_spi).cloned()
    }

    /// Remove an IKE SA, returning its handle for final cleanup
    pub fn remove_ike_sa(&self, local_spi: u64) -> Option<Arc<Mutex<IkeSa>>> {
        let mut sas = match self.ike_sas.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sas.remove(&local_spi)
    }

    /// Draw an unused inbound ESP SPI and reserve it as a half SA
    pub fn alloc_child_spi(&self, rng: &dyn RandomSource, parent_local_spi: u64) -> u32 {
        let mut children = match self.child_sas.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            let spi = rng.next_u32();
            if spi != 0 && !children.contains_key(&spi) {
                children.insert(spi, ChildEntry::Half { parent_local_spi });
                return spi;
            }
        }
    }

    /// Replace the half-SA reservation with the completed child SA
    pub fn complete_child_sa(&self, child: ChildSa) {
        let mut children = match self.child_sas.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        children.insert(child.inbound_spi, ChildEntry::Complete(Box::new(child)));
    }

    /// Drop a reservation whose negotiation failed
    pub fn release_child_spi(&self, inbound_spi: u32) {
        let mut children = match self.child_sas.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        children.remove(&inbound_spi);
    }

    /// Look up a completed child SA by its inbound SPI
    pub fn child_sa(&self, inbound_spi: u32) -> Option<ChildSa> {
        let children = match self.child_sas.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match children.get(&inbound_spi) {
            Some(ChildEntry::Complete(child)) => Some(*child.clone()),
            _ => None,
        }
    }

    /// Find the completed child SA whose outbound SPI matches, as listed in
    /// a peer's delete payload
    pub fn child_sa_by_outbound(&self, outbound_spi: u32) -> Option<ChildSa> {
        let children = match self.child_sas.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        children.values().find_map(|entry| match entry {
            ChildEntry::Complete(child) if child.outbound_spi == outbound_spi => {
                Some(*child.clone())
            }
            _ => None,
        })
    }

    /// All completed child SAs under one IKE SA
    pub fn children_of(&self, parent_local_spi: u64) -> Vec<ChildSa> {
        let children = match self.child_sas.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        children
            .values()
            .filter_map(|entry| match entry {
                ChildEntry::Complete(child) if child.parent_local_spi == parent_local_spi => {
                    Some(*child.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Remove a child SA (or reservation) by inbound SPI
    pub fn remove_child_sa(&self, inbound_spi: u32) -> Option<ChildSa> {
        let mut children = match self.child_sas.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match children.remove(&inbound_spi) {
            Some(ChildEntry::Complete(child)) => Some(*child),
            _ => None,
        }
    }

    /// Record the RAN-side identifier for a local SPI
    pub fn set_ngap_id(&self, local_spi: u64, ran_ue_ngap_id: u64) {
        let mut ids = match self.ngap_ids.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        ids.insert(local_spi, ran_ue_ngap_id);
    }

    /// Look up the RAN-side identifier of a local SPI
    pub fn ngap_id(&self, local_spi: u64) -> Option<u64> {
        let ids = match self.ngap_ids.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        ids.get(&local_spi).copied()
    }

    /// Drop the RAN-side identifier of a removed SA
    pub fn remove_ngap_id(&self, local_spi: u64) {
        let mut ids = match self.ngap_ids.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        ids.remove(&local_spi);
    }
}
