//! INFORMATIONAL: liveness probes and SA deletions

use ikev2::definitions::params::{ExchangeType, SecurityProtocol};
use ikev2::definitions::{Delete, Message, Payload};
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::context::ike_sa::IkeSa;
use crate::events::NgapEvent;
use crate::{IkeError, IkeServer};

impl IkeServer {
    pub(crate) async fn handle_informational(
        &self,
        sa: &mut IkeSa,
        msg: &Message,
        payloads: Vec<Payload>,
    ) -> Result<(), IkeError> {
        // A response completes an exchange this side initiated: a liveness
        // probe or one of the delete requests. It is never answered, and the
        // message id counter advances exactly once per completed exchange.
        if msg.response {
            if payloads.is_empty() {
                if let Some(dpd) = &sa.dpd {
                    dpd.record_reply();
                }
            } else {
                debug!(
                    "Peer acknowledged a delete request on {:#018x}",
                    sa.local_spi
                );
            }
            sa.responder_message_id = sa.responder_message_id.wrapping_add(1);
            return Ok(());
        }

        if payloads.is_empty() {
            // The peer probes us; echo an empty encrypted message
            return self
                .seal_and_send(sa, ExchangeType::Informational, true, msg.message_id, vec![])
                .await;
        }

        for payload in payloads {
            match payload {
                Payload::Delete(delete)
                    if delete.protocol == SecurityProtocol::InternetKeyExchange =>
                {
                    return self.handle_ike_delete(sa, msg).await;
                }
                Payload::Delete(delete)
                    if delete.protocol == SecurityProtocol::EncapsulatingSecurityPayload =>
                {
                    return self.handle_esp_delete(sa, msg, delete).await;
                }
                other => debug!(
                    "Ignoring informational payload {:?}",
                    ikev2::definitions::params::PayloadType::from(&other)
                ),
            }
        }

        self.seal_and_send(sa, ExchangeType::Informational, true, msg.message_id, vec![])
            .await
    }

    /// The UE deletes the IKE SA: acknowledge, tear everything down and let
    /// NGAP complete the context release.
    async fn handle_ike_delete(
        &self,
        sa: &mut IkeSa,
        msg: &Message,
    ) -> Result<(), IkeError> {
        info!("UE deletes IKE SA {:#018x}", sa.local_spi);
        self.seal_and_send(sa, ExchangeType::Informational, true, msg.message_id, vec![])
            .await?;
        let local_spi = sa.local_spi;
        self.sas.remove_ike_sa(local_spi);
        self.release_sa_resources(sa);
        self.send_ngap_event(NgapEvent::SendUeContextReleaseComplete { local_spi })
            .await
    }

    /// The UE deletes child SAs: remove the kernel entries, answer with the
    /// matching inbound SPIs and report the released PDU sessions.
    async fn handle_esp_delete(
        &self,
        sa: &mut IkeSa,
        msg: &Message,
        delete: Delete,
    ) -> Result<(), IkeError> {
        let mut inbound_spis = vec![];
        let mut pdu_session_ids = vec![];
        // The listed SPIs are the UE's inbound ones, i.e. our outbound
        for spi in delete.spis.iter().unique() {
            let Some(child) = self.sas.child_sa_by_outbound(*spi) else {
                warn!("Delete for unknown ESP SPI {spi:#010x}");
                continue;
            };
            if let Err(err) = self.xfrm.remove(&child) {
                warn!(
                    "Could not remove kernel entries of child SA {:#010x}: {err}",
                    child.inbound_spi
                );
            }
            self.sas.remove_child_sa(child.inbound_spi);
            if let Some(ue) = sa.ue.as_mut() {
                ue.child_spis.retain(|s| *s != child.inbound_spi);
            }
            inbound_spis.push(child.inbound_spi);
            if let Some(id) = child.pdu_session_id {
                pdu_session_ids.push(id);
            }
        }

        self.seal_and_send(
            sa,
            ExchangeType::Informational,
            true,
            msg.message_id,
            vec![Payload::Delete(Delete {
                protocol: SecurityProtocol::EncapsulatingSecurityPayload,
                spis: inbound_spis,
            })],
        )
        .await?;

        self.send_ngap_event(NgapEvent::SendPduSessionResourceReleaseRes {
            local_spi: sa.local_spi,
            pdu_session_ids,
        })
        .await
    }
}
