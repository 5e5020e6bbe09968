//! CREATE_CHILD_SA: one user-plane child SA per PDU session, driven by the
//! NGAP work list
//!
//! The N3IWF initiates these exchanges. A received CREATE_CHILD_SA is the
//! UE's answer to an outstanding request; its parse result is parked on the
//! SA until the NGAP context round-trip confirms the session is still
//! wanted, then the child SA is completed, installed and the next session
//! attempted.

use ikev2::definitions::params::{
    EncryptionAlgorithm, ExchangeType, ExtendedSequenceNumbers, IntegrityAlgorithm,
    NotifyStatusMessage, PayloadType, SecurityProtocol, IP_PROTOCOL_GRE,
};
use ikev2::definitions::{
    Message, Notification, Payload, Proposal, TrafficSelector, TrafficSelectors, Transform,
};
use tracing::{debug, info, warn};

use crate::context::child_sa::ChildSa;
use crate::context::ike_sa::{IkeSa, IkeState, PendingChildExchange, TemporaryIkeMsg};
use crate::events::{NgapContextKind, NgapEvent, PduSession};
use crate::security::generate_child_keys;
use crate::{IkeError, IkeServer};

impl IkeServer {
    /// Handle a received CREATE_CHILD_SA message: park the parse result and
    /// ask NGAP whether the PDU session context still exists.
    pub(crate) async fn handle_create_child_sa(
        &self,
        sa: &mut IkeSa,
        _msg: &Message,
        payloads: Vec<Payload>,
    ) -> Result<(), IkeError> {
        if sa.pending_exchange.is_none() {
            warn!(
                "Unsolicited CREATE_CHILD_SA on {:#018x}, dropping",
                sa.local_spi
            );
            return Ok(());
        }

        let mut sa_payload = None;
        let mut peer_nonce = None;
        let mut ts_initiator = None;
        let mut ts_responder = None;
        for payload in payloads {
            match payload {
                Payload::SecurityAssociation(esp) => sa_payload = Some(esp),
                Payload::Nonce(nonce) => peer_nonce = Some(nonce),
                Payload::TrafficSelectorInitiator(ts) => ts_initiator = Some(ts),
                Payload::TrafficSelectorResponder(ts) => ts_responder = Some(ts),
                _ => {}
            }
        }
        let sa_payload =
            sa_payload.ok_or(IkeError::MissingPayload(PayloadType::SecurityAssociation))?;
        let peer_nonce = peer_nonce.ok_or(IkeError::MissingPayload(PayloadType::Nonce))?;
        let ts_initiator = ts_initiator
            .ok_or(IkeError::MissingPayload(PayloadType::TrafficSelectorInitiator))?;
        let ts_responder = ts_responder
            .ok_or(IkeError::MissingPayload(PayloadType::TrafficSelectorResponder))?;
        let proposal = sa_payload
            .proposals
            .into_iter()
            .next()
            .ok_or(IkeError::NoProposalChosen)?;

        // The request placed the fresh local nonce first; completing the
        // pair yields the derivation seed for this child SA
        sa.concatenated_nonce.extend_from_slice(&peer_nonce);

        sa.temporary_child_msg = Some(TemporaryIkeMsg {
            proposal,
            ts_initiator,
            ts_responder,
        });
        sa.state = IkeState::HandleCreateChildSa;

        self.send_ngap_event(NgapEvent::GetNgapContext {
            local_spi: sa.local_spi,
            kinds: vec![NgapContextKind::PduSessionSetupData],
        })
        .await
    }

    /// Continuation after NGAP confirmed the context: derive keys, install
    /// the child SA and attempt the next PDU session.
    pub(crate) async fn complete_child_exchange(
        &self,
        sa: &mut IkeSa,
    ) -> Result<(), IkeError> {
        let pending = sa.pending_exchange.take().ok_or(IkeError::State(sa.state))?;
        let parked = sa
            .temporary_child_msg
            .take()
            .ok_or(IkeError::State(sa.state))?;
        let session = sa
            .setup_data
            .as_mut()
            .and_then(|setup| setup.current.take())
            .ok_or(IkeError::State(sa.state))?;

        let installed = self.install_pdu_session_child(sa, &pending, &parked, &session);
        if let Some(setup) = sa.setup_data.as_mut() {
            match installed {
                Ok(()) => setup.established.push(session.id),
                Err(ref err) => {
                    warn!(
                        "Could not establish child SA for PDU session {}: {err}",
                        session.id
                    );
                    self.sas.release_child_spi(pending.inbound_spi);
                    setup.failed.push(session.id);
                }
            }
        }

        // The exchange this side initiated is complete either way
        sa.responder_message_id = sa.responder_message_id.wrapping_add(1);

        self.start_next_pdu_session(sa).await
    }

    fn install_pdu_session_child(
        &self,
        sa: &mut IkeSa,
        pending: &PendingChildExchange,
        parked: &TemporaryIkeMsg,
        session: &PduSession,
    ) -> Result<(), IkeError> {
        if parked.proposal.spi.len() != 4 {
            return Err(IkeError::NoProposalChosen);
        }
        let outbound_spi = u32::from_be_bytes([
            parked.proposal.spi[0],
            parked.proposal.spi[1],
            parked.proposal.spi[2],
            parked.proposal.spi[3],
        ]);

        // Prefer what the peer echoed; fall back to what was offered
        let (encryption, key_length) = parked
            .proposal
            .encryption_algorithms
            .first()
            .copied()
            .unwrap_or((pending.encryption, pending.key_length));
        let integrity = parked
            .proposal
            .integrity_algorithms
            .first()
            .copied()
            .or(pending.integrity);

        let keys = generate_child_keys(
            sa.transforms.prf,
            &sa.keys.sk_d,
            &sa.concatenated_nonce,
            encryption,
            key_length,
            integrity,
        )?;

        let ue_inner_addr = sa
            .ue
            .as_ref()
            .and_then(|ue| ue.inner_addr)
            .ok_or(IkeError::State(sa.state))?;

        // User-plane tunnels run over GRE between the inner addresses; this
        // is fixed by the access-network profile rather than negotiated
        let iface_id = self.xfrm.next_up_iface_id();
        let child = ChildSa {
            inbound_spi: pending.inbound_spi,
            outbound_spi,
            parent_local_spi: sa.local_spi,
            encryption,
            key_length,
            integrity,
            keys,
            local_is_initiator: true,
            ip_protocol: IP_PROTOCOL_GRE,
            local_ts: TrafficSelector::single_host(self.cfg.ipsec_gateway, 0),
            peer_ts: TrafficSelector::single_host(ue_inner_addr, 0),
            enable_encapsulation: sa.ue_is_behind_nat || sa.n3iwf_is_behind_nat,
            local_port: sa.local_addr.port(),
            peer_port: sa.ue_addr.port(),
            xfrm_iface_id: iface_id,
            pdu_session_id: Some(session.id),
        };

        self.xfrm.ensure_iface(
            iface_id,
            self.cfg.ipsec_gateway,
            self.cfg.ue_subnet.prefix_len(),
        )?;
        self.xfrm.apply(&child, sa.local_addr.ip(), sa.ue_addr.ip())?;
        self.sas.complete_child_sa(child);
        if let Some(ue) = sa.ue.as_mut() {
            ue.child_spis.push(pending.inbound_spi);
            ue.installed_pdu_sessions += 1;
        }
        info!(
            "Child SA for PDU session {} installed on interface {iface_id}",
            session.id
        );
        Ok(())
    }

    /// Pop the next PDU session off the work list and send its
    /// CREATE_CHILD_SA request, or report the finished list to NGAP.
    pub(crate) async fn start_next_pdu_session(
        &self,
        sa: &mut IkeSa,
    ) -> Result<(), IkeError> {
        let setup = sa.setup_data.as_mut().ok_or(IkeError::State(sa.state))?;
        if let Some(next) = setup.pending.pop_front() {
            setup.current = Some(next.clone());
            return self.send_child_sa_request(sa, &next).await;
        }

        let established = setup.established.clone();
        let failed = setup.failed.clone();
        sa.setup_data = None;
        sa.state = IkeState::EndSignalling;
        debug!(
            "PDU session setup on {:#018x} finished: {} established, {} failed",
            sa.local_spi,
            established.len(),
            failed.len()
        );
        self.send_ngap_event(NgapEvent::SendPduSessionResourceSetupRes {
            local_spi: sa.local_spi,
            established,
            failed,
        })
        .await
    }

    /// Build and send the CREATE_CHILD_SA request for one PDU session.
    async fn send_child_sa_request(
        &self,
        sa: &mut IkeSa,
        session: &PduSession,
    ) -> Result<(), IkeError> {
        let ue_inner_addr = sa
            .ue
            .as_ref()
            .and_then(|ue| ue.inner_addr)
            .ok_or(IkeError::State(sa.state))?;

        let inbound_spi = self.sas.alloc_child_spi(self.rng.as_ref(), sa.local_spi);
        let encryption = EncryptionAlgorithm::AesCbc;
        let key_length = Some(256);
        let integrity = session
            .integrity_protection
            .then_some(IntegrityAlgorithm::HmacSha1_96);

        let mut proposal = Proposal::new_empty(
            SecurityProtocol::EncapsulatingSecurityPayload,
            Some(inbound_spi.to_be_bytes().to_vec()),
        );
        let mut transforms = vec![Transform::Encryption(encryption, key_length)];
        if let Some(integrity) = integrity {
            transforms.push(Transform::Integrity(integrity));
        }
        transforms.push(Transform::SequenceNumber(ExtendedSequenceNumbers::No));
        proposal.add(transforms);

        let mut local_nonce = vec![0u8; 32];
        self.rng.fill_bytes(&mut local_nonce);
        // Fresh nonces replace Ni | Nr for this derivation; the peer's half
        // is appended when the response arrives
        sa.concatenated_nonce = local_nonce.clone();

        sa.pending_exchange = Some(PendingChildExchange {
            inbound_spi,
            encryption,
            key_length,
            integrity,
        });

        self.seal_and_send(
            sa,
            ExchangeType::CreateChildSa,
            false,
            sa.responder_message_id,
            vec![
                Payload::SecurityAssociation(ikev2::definitions::SecurityAssociation {
                    proposals: vec![proposal],
                }),
                Payload::Nonce(local_nonce),
                Payload::TrafficSelectorInitiator(TrafficSelectors {
                    selectors: vec![TrafficSelector::single_host(self.cfg.ipsec_gateway, 0)],
                }),
                Payload::TrafficSelectorResponder(TrafficSelectors {
                    selectors: vec![TrafficSelector::single_host(ue_inner_addr, 0)],
                }),
                Payload::Notify(Notification::status(
                    NotifyStatusMessage::Qos5gInfo,
                    build_qos_info_data(session),
                )),
                Payload::Notify(Notification::status(
                    NotifyStatusMessage::UpIp4Address,
                    session.up_ip4.octets().to_vec(),
                )),
            ],
        )
        .await
    }
}

/// Notification data of 5G_QOS_INFO: length, PDU session id, QFI list and
/// the default/DSCP flags
fn build_qos_info_data(session: &PduSession) -> Vec<u8> {
    let mut data = vec![0u8];
    data.push(session.id);
    data.push(session.qos_flow_ids.len() as u8);
    data.extend_from_slice(&session.qos_flow_ids);
    let mut flags = 0u8;
    if session.is_default {
        flags |= 0x01;
    }
    if session.dscp.is_some() {
        flags |= 0x02;
    }
    data.push(flags);
    if let Some(dscp) = session.dscp {
        data.push(dscp);
    }
    data[0] = data.len() as u8;
    data
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::build_qos_info_data;
    use crate::events::PduSession;

    #[test]
    fn qos_info_layout() {
        let session = PduSession {
            id: 5,
            qos_flow_ids: vec![1, 2],
            up_ip4: Ipv4Addr::new(192, 0, 2, 9),
            integrity_protection: false,
            is_default: true,
            dscp: None,
        };
        assert_eq!(build_qos_info_data(&session), vec![5, 5, 2, 1, 2, 0x01]);
    }

    #[test]
    fn qos_info_with_dscp() {
        let session = PduSession {
            id: 9,
            qos_flow_ids: vec![7],
            up_ip4: Ipv4Addr::new(192, 0, 2, 9),
            integrity_protection: true,
            is_default: false,
            dscp: Some(34),
        };
        assert_eq!(build_qos_info_data(&session), vec![6, 9, 1, 7, 0x02, 34]);
    }
}
