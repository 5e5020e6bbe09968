//! The responder state machine: exchange dispatch, response helpers and SA
//! teardown

mod auth;
mod child_sa;
mod informational;
mod ngap_event;
mod sa_init;

use ikev2::crypto::encrypted;
use ikev2::definitions::params::{ExchangeType, NotifyErrorMessage, FLAG_RESPONSE};
use ikev2::definitions::{Message, Notification, Payload};
use ikev2::{IKE_2_VERSION_VALUE, IKE_HEADER_LEN};
use tracing::{debug, instrument, trace, warn};

use crate::context::ike_sa::IkeSa;
use crate::events::{Datagram, NgapEvent};
use crate::{IkeError, IkeServer};

impl IkeServer {
    /// Handle one received datagram.
    ///
    /// Parse and format errors drop the datagram silently to avoid
    /// amplification; every other error path either answered the peer
    /// already or deliberately leaves the exchange unanswered so the peer
    /// retransmits.
    #[instrument(skip_all, fields(peer = %dgram.peer))]
    pub async fn handle_datagram(&self, dgram: Datagram) {
        if let Err(err) = self.dispatch_datagram(&dgram).await {
            debug!("Exchange aborted: {err}");
        }
    }

    async fn dispatch_datagram(&self, dgram: &Datagram) -> Result<(), IkeError> {
        let raw = dgram.data.as_slice();
        if raw.len() < IKE_HEADER_LEN {
            trace!("Dropping short datagram of {} bytes", raw.len());
            return Ok(());
        }

        // The version octet sits behind the two SPIs and the next payload
        // field; a major version above 2 must be answered before the parser
        // rejects the message as a whole.
        let major_version = raw[17] >> 4;
        if major_version > IKE_2_VERSION_VALUE >> 4 {
            let message_id = u32::from_be_bytes([raw[20], raw[21], raw[22], raw[23]]);
            return self
                .send_plain_notify_raw(
                    raw,
                    message_id,
                    Notification::error(NotifyErrorMessage::InvalidMajorVersion, vec![]),
                    dgram,
                )
                .await;
        }

        let msg = match Message::try_parse(raw) {
            Ok(msg) => msg,
            Err(err) => {
                trace!("Dropping unparseable datagram: {err}");
                return Ok(());
            }
        };

        if msg.exchange_type == ExchangeType::IkeSaInit {
            return self.handle_ike_sa_init(&msg, dgram).await;
        }

        let Some(handle) = self.sas.ike_sa(msg.responder_spi) else {
            debug!("No IKE SA for SPI {:#018x}", msg.responder_spi);
            return self
                .send_plain_notify_raw(
                    raw,
                    msg.message_id,
                    Notification::error(NotifyErrorMessage::InvalidIkeSpi, vec![]),
                    dgram,
                )
                .await;
        };
        let mut sa = handle.lock().await;

        let payloads = match encrypted::open(raw, &sa.initiator_cipher()) {
            Ok(payloads) => payloads,
            Err(err) => {
                warn!(
                    "Dropping message on {:#018x} that fails decryption: {err}",
                    sa.local_spi
                );
                return Ok(());
            }
        };

        if !msg.response {
            sa.initiator_message_id = msg.message_id;
        }

        match msg.exchange_type {
            ExchangeType::IkeAuth => self.handle_ike_auth(&mut sa, &msg, payloads, dgram).await,
            ExchangeType::CreateChildSa => {
                self.handle_create_child_sa(&mut sa, &msg, payloads).await
            }
            ExchangeType::Informational => {
                self.handle_informational(&mut sa, &msg, payloads).await
            }
            other => {
                warn!("Ignoring unsupported exchange {other:?}");
                Ok(())
            }
        }
    }

    /// Send a plaintext INFORMATIONAL response carrying a single notify,
    /// echoing the SPIs of a message that never reached an SA.
    async fn send_plain_notify_raw(
        &self,
        raw: &[u8],
        message_id: u32,
        notify: Notification,
        dgram: &Datagram,
    ) -> Result<(), IkeError> {
        let initiator_spi = u64::from_be_bytes([
            raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
        ]);
        let responder_spi = u64::from_be_bytes([
            raw[8], raw[9], raw[10], raw[11], raw[12], raw[13], raw[14], raw[15],
        ]);
        // Never answer something that is itself flagged as a response
        if raw[19] & FLAG_RESPONSE != 0 {
            return Ok(());
        }
        let response = Message {
            initiator_spi,
            responder_spi,
            exchange_type: ExchangeType::Informational,
            initiator: false,
            response: true,
            message_id,
            payloads: vec![Payload::Notify(notify)],
        };
        self.send_datagram(response.try_build()?, dgram.peer, dgram.local)
            .await
    }

    /// Seal payloads into an SK payload and send the finished message to the
    /// SA's current four-tuple.
    pub(crate) async fn seal_and_send(
        &self,
        sa: &IkeSa,
        exchange_type: ExchangeType,
        response: bool,
        message_id: u32,
        payloads: Vec<Payload>,
    ) -> Result<(), IkeError> {
        let msg = Message {
            initiator_spi: sa.remote_spi,
            responder_spi: sa.local_spi,
            exchange_type,
            initiator: false,
            response,
            message_id,
            payloads,
        };
        let mut iv = vec![0u8; sa.transforms.encryption.block_len()];
        self.rng.fill_bytes(&mut iv);
        let bytes = encrypted::seal(&msg, &sa.responder_cipher(), &iv)?;
        self.send_datagram(bytes, sa.ue_addr, sa.local_addr).await
    }

    /// Build, seal and send the liveness probe for the DPD task; returns the
    /// finished bytes for retransmission.
    pub(crate) async fn send_dpd_probe(&self, local_spi: u64) -> Result<Vec<u8>, IkeError> {
        let handle = self
            .sas
            .ike_sa(local_spi)
            .ok_or(IkeError::UnknownSa(local_spi))?;
        let sa = handle.lock().await;
        let msg = Message {
            initiator_spi: sa.remote_spi,
            responder_spi: sa.local_spi,
            exchange_type: ExchangeType::Informational,
            initiator: false,
            response: false,
            message_id: sa.responder_message_id,
            payloads: vec![],
        };
        let mut iv = vec![0u8; sa.transforms.encryption.block_len()];
        self.rng.fill_bytes(&mut iv);
        let bytes = encrypted::seal(&msg, &sa.responder_cipher(), &iv)?;
        self.send_datagram(bytes.clone(), sa.ue_addr, sa.local_addr)
            .await?;
        Ok(bytes)
    }

    /// Retransmit an unanswered probe verbatim.
    pub(crate) async fn resend_dpd_probe(
        &self,
        local_spi: u64,
        probe: Vec<u8>,
    ) -> Result<(), IkeError> {
        let handle = self
            .sas
            .ike_sa(local_spi)
            .ok_or(IkeError::UnknownSa(local_spi))?;
        let sa = handle.lock().await;
        self.send_datagram(probe, sa.ue_addr, sa.local_addr).await
    }

    /// Tear down an SA whose peer stopped answering liveness probes.
    pub(crate) async fn teardown_dead_peer(&self, local_spi: u64) {
        let Some(handle) = self.sas.remove_ike_sa(local_spi) else {
            return;
        };
        let mut sa = handle.lock().await;
        self.release_sa_resources(&mut sa);
        let _ = self
            .send_ngap_event(NgapEvent::SendUeContextReleaseComplete { local_spi })
            .await;
    }

    /// Drop everything an SA owns: the liveness task, its child SAs with
    /// their kernel entries, the inner address and the NGAP id mapping.
    ///
    /// The SA itself must already be out of the store (or about to be).
    pub(crate) fn release_sa_resources(&self, sa: &mut IkeSa) {
        if let Some(dpd) = sa.dpd.take() {
            dpd.abort();
        }
        for child in self.sas.children_of(sa.local_spi) {
            if let Err(err) = self.xfrm.remove(&child) {
                warn!(
                    "Could not remove kernel entries of child SA {:#010x}: {err}",
                    child.inbound_spi
                );
            }
            self.sas.remove_child_sa(child.inbound_spi);
        }
        if let Some(pending) = sa.pending_exchange.take() {
            self.sas.release_child_spi(pending.inbound_spi);
        }
        if let Some(addr) = sa.ue.as_ref().and_then(|ue| ue.inner_addr) {
            self.ue_pool.release(addr);
        }
        self.sas.remove_ngap_id(sa.local_spi);
    }
}
