//! Reactions to events the NGAP subsystem sends into the IKE core
//!
//! Every event carries a local SPI; the SA is re-located and its state
//! checked before anything happens, so replies to requests whose SA died
//! in the meantime are discarded without side effects.

use ikev2::definitions::params::{ExchangeType, SecurityProtocol};
use ikev2::definitions::{Delete, Payload};
use tracing::{debug, info, warn};

use crate::context::ike_sa::IkeState;
use crate::context::ue::IkeUe;
use crate::eap5g;
use crate::events::IkeEvent;
use crate::{IkeError, IkeServer};

impl IkeServer {
    /// Handle one event from the NGAP subsystem.
    pub async fn handle_event(&self, event: IkeEvent) {
        if let Err(err) = self.dispatch_event(event).await {
            debug!("Event handling aborted: {err}");
        }
    }

    async fn dispatch_event(&self, event: IkeEvent) -> Result<(), IkeError> {
        match event {
            IkeEvent::SendEap5gFailure { local_spi } => {
                let handle = self
                    .sas
                    .ike_sa(local_spi)
                    .ok_or(IkeError::UnknownSa(local_spi))?;
                let mut sa = handle.lock().await;
                if sa.state != IkeState::EapSignalling {
                    return Err(IkeError::State(sa.state));
                }
                info!("EAP-5G failure reported for {local_spi:#018x}");
                let message_id = sa.initiator_message_id;
                let failure = eap5g::build_failure(sa.last_eap_identifier);
                self.seal_and_send(
                    &mut sa,
                    ExchangeType::IkeAuth,
                    true,
                    message_id,
                    vec![Payload::Eap(failure)],
                )
                .await
            }

            IkeEvent::SendEapNasMsg { local_spi, nas_pdu } => {
                let handle = self
                    .sas
                    .ike_sa(local_spi)
                    .ok_or(IkeError::UnknownSa(local_spi))?;
                let mut sa = handle.lock().await;
                if sa.state != IkeState::EapSignalling {
                    return Err(IkeError::State(sa.state));
                }
                let identifier =
                    eap5g::draw_identifier(self.rng.as_ref(), sa.last_eap_identifier);
                sa.last_eap_identifier = identifier;
                let message_id = sa.initiator_message_id;
                self.seal_and_send(
                    &mut sa,
                    ExchangeType::IkeAuth,
                    true,
                    message_id,
                    vec![Payload::Eap(eap5g::build_nas_request(identifier, &nas_pdu))],
                )
                .await
            }

            IkeEvent::SendEapSuccess {
                local_spi,
                kn3iwf,
                pdu_session_count,
            } => {
                let handle = self
                    .sas
                    .ike_sa(local_spi)
                    .ok_or(IkeError::UnknownSa(local_spi))?;
                let mut sa = handle.lock().await;
                if sa.state != IkeState::EapSignalling {
                    return Err(IkeError::State(sa.state));
                }
                sa.ue = Some(IkeUe {
                    kn3iwf,
                    pdu_session_count,
                    ..IkeUe::default()
                });
                let message_id = sa.initiator_message_id;
                let success = eap5g::build_success(sa.last_eap_identifier);
                self.seal_and_send(
                    &mut sa,
                    ExchangeType::IkeAuth,
                    true,
                    message_id,
                    vec![Payload::Eap(success)],
                )
                .await?;
                sa.state = IkeState::PostSignalling;
                Ok(())
            }

            IkeEvent::CreatePduSession { local_spi, setup } => {
                let handle = self
                    .sas
                    .ike_sa(local_spi)
                    .ok_or(IkeError::UnknownSa(local_spi))?;
                let mut sa = handle.lock().await;
                if sa.state != IkeState::EndSignalling {
                    warn!(
                        "Dropping PDU session setup for {local_spi:#018x} in state {:?}",
                        sa.state
                    );
                    return Err(IkeError::State(sa.state));
                }
                sa.setup_data = Some(setup);
                self.start_next_pdu_session(&mut sa).await
            }

            IkeEvent::IkeDeleteRequest { local_spi } => {
                let handle = self
                    .sas
                    .ike_sa(local_spi)
                    .ok_or(IkeError::UnknownSa(local_spi))?;
                let mut sa = handle.lock().await;
                info!("Deleting IKE SA {local_spi:#018x} on NGAP request");
                let message_id = sa.responder_message_id;
                self.seal_and_send(
                    &mut sa,
                    ExchangeType::Informational,
                    false,
                    message_id,
                    vec![Payload::Delete(Delete {
                        protocol: SecurityProtocol::InternetKeyExchange,
                        spis: vec![],
                    })],
                )
                .await?;
                self.sas.remove_ike_sa(local_spi);
                self.release_sa_resources(&mut sa);
                Ok(())
            }

            IkeEvent::SendChildSaDeleteRequest {
                local_spi,
                pdu_session_ids,
            } => {
                let handle = self
                    .sas
                    .ike_sa(local_spi)
                    .ok_or(IkeError::UnknownSa(local_spi))?;
                let mut sa = handle.lock().await;
                let mut inbound_spis = vec![];
                for child in self.sas.children_of(local_spi) {
                    let Some(id) = child.pdu_session_id else {
                        continue;
                    };
                    if !pdu_session_ids.contains(&id) {
                        continue;
                    }
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
                }
                if inbound_spis.is_empty() {
                    debug!("No child SAs to delete for {local_spi:#018x}");
                    return Ok(());
                }
                let message_id = sa.responder_message_id;
                self.seal_and_send(
                    &mut sa,
                    ExchangeType::Informational,
                    false,
                    message_id,
                    vec![Payload::Delete(Delete {
                        protocol: SecurityProtocol::EncapsulatingSecurityPayload,
                        spis: inbound_spis,
                    })],
                )
                .await
            }

            IkeEvent::IkeContextUpdate {
                local_spi,
                kn3iwf,
                ran_ue_ngap_id,
            } => {
                let handle = self
                    .sas
                    .ike_sa(local_spi)
                    .ok_or(IkeError::UnknownSa(local_spi))?;
                let mut sa = handle.lock().await;
                if let Some(kn3iwf) = kn3iwf {
                    if let Some(ue) = sa.ue.as_mut() {
                        ue.kn3iwf = kn3iwf;
                    }
                }
                if let Some(ran_ue_ngap_id) = ran_ue_ngap_id {
                    self.sas.set_ngap_id(local_spi, ran_ue_ngap_id);
                }
                Ok(())
            }

            IkeEvent::GetNgapContextResponse { local_spi, setup } => {
                let Some(handle) = self.sas.ike_sa(local_spi) else {
                    // The SA died while the request was in flight; discard
                    debug!("Discarding NGAP context for vanished SA {local_spi:#018x}");
                    return Ok(());
                };
                let mut sa = handle.lock().await;
                match sa.state {
                    IkeState::HandleCreateChildSa => {
                        // The IKE side keeps its own work list across the
                        // round-trip; adopt the NGAP copy only on first use
                        if sa.setup_data.is_none() {
                            sa.setup_data = Some(setup);
                        }
                        self.complete_child_exchange(&mut sa).await
                    }
                    IkeState::EndSignalling => {
                        if setup.pending.is_empty() && setup.current.is_none() {
                            debug!("No PDU sessions pending for {local_spi:#018x}");
                            return Ok(());
                        }
                        sa.setup_data = Some(setup);
                        self.start_next_pdu_session(&mut sa).await
                    }
                    other => {
                        debug!(
                            "Discarding NGAP context for {local_spi:#018x} in state {other:?}"
                        );
                        Ok(())
                    }
                }
            }
        }
    }
}
