//! # n3iwf-ike
//!
//! The IKEv2 responder core of an N3IWF: terminates untrusted-access IPsec
//! tunnels from 5G UEs, relays the EAP-5G authentication to the AMF-facing
//! subsystem through typed events, and installs negotiated child SAs into
//! the kernel IPsec framework through an injectable driver.

#![warn(missing_docs, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use ikev2::crypto::CryptoError;
use ikev2::definitions::params::PayloadType;
use ikev2::generator::GeneratorError;
use ikev2::parser::ParserError;
use rsa::RsaPrivateKey;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::context::store::SaStore;
use crate::context::ue::AddressPool;
use crate::context::IkeState;
use crate::events::{Datagram, NgapEvent};
use crate::random::RandomSource;
use crate::xfrm::{XfrmBinder, XfrmDriver, XfrmError};

pub mod config;
pub mod context;
pub mod dpd;
pub mod eap5g;
pub mod events;
mod handler;
pub mod random;
pub mod security;
pub mod service;
pub mod xfrm;

#[cfg(test)]
mod tests;

/// The responder's long-term key material, loaded by the embedding process
#[derive(Debug, Clone)]
pub struct Credentials {
    /// RSA key the responder signs its AUTH payload with
    pub private_key: RsaPrivateKey,
    /// DER-encoded X.509 leaf certificate matching [Credentials::private_key]
    pub certificate_der: Vec<u8>,
}

/// The IKE responder with all its shared state.
///
/// One instance serves every UE; per-SA work is serialized through the SA
/// store, so the server itself is freely shared behind an [Arc].
pub struct IkeServer {
    pub(crate) cfg: Config,
    pub(crate) creds: Credentials,
    pub(crate) sas: SaStore,
    pub(crate) ue_pool: AddressPool,
    pub(crate) xfrm: XfrmBinder,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) ngap_tx: mpsc::Sender<NgapEvent>,
    pub(crate) out_tx: mpsc::Sender<Datagram>,
    // Handle to the owning Arc, needed to hand background tasks a clone
    pub(crate) me: Weak<IkeServer>,
}

impl IkeServer {
    /// Assemble a responder from its collaborators.
    ///
    /// `ngap_tx` carries events to the AMF-facing subsystem; `out_tx` carries
    /// finished datagrams to the UDP sender task.
    pub fn new(
        cfg: Config,
        creds: Credentials,
        xfrm_driver: Box<dyn XfrmDriver>,
        rng: Box<dyn RandomSource>,
        ngap_tx: mpsc::Sender<NgapEvent>,
        out_tx: mpsc::Sender<Datagram>,
    ) -> Arc<Self> {
        let ue_pool = AddressPool::new(cfg.ue_subnet, cfg.ipsec_gateway);
        let xfrm = XfrmBinder::new(xfrm_driver, &cfg.xfrm);
        Arc::new_cyclic(|me| Self {
            cfg,
            creds,
            sas: SaStore::default(),
            ue_pool,
            xfrm,
            rng,
            ngap_tx,
            out_tx,
            me: me.clone(),
        })
    }

    pub(crate) async fn send_datagram(
        &self,
        data: Vec<u8>,
        peer: SocketAddr,
        local: SocketAddr,
    ) -> Result<(), IkeError> {
        self.out_tx
            .send(Datagram { data, peer, local })
            .await
            .map_err(|_| IkeError::ChannelClosed)
    }

    pub(crate) async fn send_ngap_event(&self, event: NgapEvent) -> Result<(), IkeError> {
        self.ngap_tx
            .send(event)
            .await
            .map_err(|_| IkeError::ChannelClosed)
    }
}

/// Errors that may occur while handling IKE traffic
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum IkeError {
    #[error("Could not decode message: {0}")]
    Decode(#[from] ParserError),
    #[error("Could not encode message: {0}")]
    Encode(#[from] GeneratorError),
    #[error("Cryptographic failure: {0}")]
    Crypto(#[from] CryptoError),
    #[error("No acceptable proposal")]
    NoProposalChosen,
    #[error("Peer key exchange does not match the chosen group")]
    InvalidKePayload,
    #[error("Peer authentication failed")]
    AuthenticationFailed,
    #[error("No IKE SA for SPI {0:#018x}")]
    UnknownSa(u64),
    #[error("Message lacks a {0:?} payload")]
    MissingPayload(PayloadType),
    #[error("Unexpected message in state {0:?}")]
    State(IkeState),
    #[error("UE address pool exhausted")]
    AddressPoolExhausted,
    #[error("Kernel IPsec binding failed: {0}")]
    Xfrm(#[from] XfrmError),
    #[error("Event channel closed")]
    ChannelClosed,
}
