//! IKE_SA_INIT: transform negotiation, key exchange, NAT detection and the
//! birth of an IKE SA

use ikev2::crypto::dh;
use ikev2::definitions::params::{
    EncryptionAlgorithm, ExchangeType, IdentificationType, IntegrityAlgorithm,
    NotifyErrorMessage, NotifyStatusMessage, PseudorandomFunction, SecurityProtocol,
};
use ikev2::definitions::{
    Identification, KeyExchange, Message, Notification, NotificationType, Payload, Proposal,
    SecurityAssociation, Transform,
};
use tracing::{debug, info};

use crate::context::ike_sa::{ChosenTransforms, IkeSa, IkeState};
use crate::events::Datagram;
use crate::security::{generate_ike_keys, id_payload_digest, nat_detection_hash};
use crate::{IkeError, IkeServer};

/// Pseudorandom functions the responder negotiates for the IKE SA
const SUPPORTED_PRF: &[PseudorandomFunction] =
    &[PseudorandomFunction::HmacMd5, PseudorandomFunction::HmacSha1];

/// Integrity algorithms the responder negotiates for the IKE SA
const SUPPORTED_INTEGRITY: &[IntegrityAlgorithm] = &[
    IntegrityAlgorithm::HmacMd5_96,
    IntegrityAlgorithm::HmacSha1_96,
];

/// Whether the offered encryption transform is in the IKE-negotiable set
fn encryption_supported(alg: EncryptionAlgorithm, key_length: Option<u16>) -> bool {
    alg == EncryptionAlgorithm::AesCbc && matches!(key_length, Some(128 | 192 | 256))
}

impl IkeServer {
    pub(crate) async fn handle_ike_sa_init(
        &self,
        msg: &Message,
        dgram: &Datagram,
    ) -> Result<(), IkeError> {
        let mut sa_payload = None;
        let mut key_exchange = None;
        let mut peer_nonce = None;
        let mut nat_source_hashes = vec![];
        let mut nat_destination_hashes = vec![];
        for payload in &msg.payloads {
            match payload {
                Payload::SecurityAssociation(sa) => sa_payload = Some(sa),
                Payload::KeyExchange(ke) => key_exchange = Some(ke),
                Payload::Nonce(nonce) => peer_nonce = Some(nonce.clone()),
                Payload::Notify(notify) => match notify.variant {
                    NotificationType::Status(NotifyStatusMessage::NatDetectionSourceIp) => {
                        nat_source_hashes.push(notify.data.clone());
                    }
                    NotificationType::Status(NotifyStatusMessage::NatDetectionDestinationIp) => {
                        nat_destination_hashes.push(notify.data.clone());
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        let sa_payload = sa_payload.ok_or(IkeError::MissingPayload(
            ikev2::definitions::params::PayloadType::SecurityAssociation,
        ))?;
        let key_exchange = key_exchange.ok_or(IkeError::MissingPayload(
            ikev2::definitions::params::PayloadType::KeyExchange,
        ))?;
        let peer_nonce = peer_nonce.ok_or(IkeError::MissingPayload(
            ikev2::definitions::params::PayloadType::Nonce,
        ))?;

        // Pick the first acceptable proposal and the first supported
        // transform of each type, in received order
        let Some((transforms, response_proposal)) = self.select_ike_proposal(sa_payload) else {
            debug!("No acceptable IKE proposal from {}", dgram.peer);
            return self
                .send_sa_init_error(
                    msg,
                    dgram,
                    Notification::error(NotifyErrorMessage::NoProposalChosen, vec![]),
                )
                .await;
        };

        // The key exchange data must belong to the chosen group
        if key_exchange.dh_group != transforms.dh {
            debug!(
                "Peer sent key exchange for {:?} while {:?} was chosen",
                key_exchange.dh_group, transforms.dh
            );
            return self
                .send_sa_init_error(
                    msg,
                    dgram,
                    Notification::error(
                        NotifyErrorMessage::InvalidKeyExchangePayload,
                        (transforms.dh as u16).to_be_bytes().to_vec(),
                    ),
                )
                .await;
        }

        let private_len = dh::key_len(transforms.dh).ok_or(IkeError::NoProposalChosen)?;
        let mut dh_private = vec![0u8; private_len];
        self.rng.fill_bytes(&mut dh_private);
        let dh_public = dh::public_value(transforms.dh, &dh_private)?;
        let dh_shared_secret =
            dh::shared_secret(transforms.dh, &dh_private, &key_exchange.data)?;

        let mut local_nonce = vec![0u8; 32];
        self.rng.fill_bytes(&mut local_nonce);

        let local_spi = self.sas.alloc_ike_spi(self.rng.as_ref());

        // NAT flags: the respective side is behind a NAT when none of the
        // peer-computed hashes matches the address actually observed
        let expected_source = nat_detection_hash(
            msg.initiator_spi,
            msg.responder_spi,
            dgram.peer.ip(),
            dgram.peer.port(),
        );
        let ue_is_behind_nat = !nat_source_hashes.is_empty()
            && nat_source_hashes.iter().all(|h| *h != expected_source);
        let expected_destination = nat_detection_hash(
            msg.initiator_spi,
            msg.responder_spi,
            dgram.local.ip(),
            dgram.local.port(),
        );
        let n3iwf_is_behind_nat = !nat_destination_hashes.is_empty()
            && nat_destination_hashes
                .iter()
                .all(|h| *h != expected_destination);

        let mut concatenated_nonce = peer_nonce.clone();
        concatenated_nonce.extend_from_slice(&local_nonce);

        let keys = generate_ike_keys(
            &transforms,
            &concatenated_nonce,
            &dh_shared_secret,
            msg.initiator_spi,
            local_spi,
        )?;

        let response = Message {
            initiator_spi: msg.initiator_spi,
            responder_spi: local_spi,
            exchange_type: ExchangeType::IkeSaInit,
            initiator: false,
            response: true,
            message_id: msg.message_id,
            payloads: vec![
                Payload::SecurityAssociation(SecurityAssociation {
                    proposals: vec![response_proposal],
                }),
                Payload::KeyExchange(KeyExchange {
                    dh_group: transforms.dh,
                    data: dh_public,
                }),
                Payload::Nonce(local_nonce.clone()),
                Payload::Notify(Notification::status(
                    NotifyStatusMessage::NatDetectionSourceIp,
                    nat_detection_hash(
                        msg.initiator_spi,
                        local_spi,
                        dgram.local.ip(),
                        dgram.local.port(),
                    ),
                )),
                Payload::Notify(Notification::status(
                    NotifyStatusMessage::NatDetectionDestinationIp,
                    nat_detection_hash(
                        msg.initiator_spi,
                        local_spi,
                        dgram.peer.ip(),
                        dgram.peer.port(),
                    ),
                )),
            ],
        };
        let response_bytes = response.try_build()?;

        // Octets both sides will sign during IKE_AUTH; the ID digests of the
        // initiator side are appended once IDi arrives
        let responder_identity = Identification {
            id_type: IdentificationType::Fqdn,
            data: self.cfg.fqdn.as_bytes().to_vec(),
        };
        let mut initiator_signed_octets = dgram.data.clone();
        initiator_signed_octets.extend_from_slice(&local_nonce);
        let mut responder_signed_octets = response_bytes.clone();
        responder_signed_octets.extend_from_slice(&peer_nonce);
        responder_signed_octets.extend(id_payload_digest(
            transforms.prf,
            &keys.sk_pr,
            &responder_identity,
        )?);

        self.sas.insert_ike_sa(IkeSa {
            local_spi,
            remote_spi: msg.initiator_spi,
            state: IkeState::PreSignalling,
            transforms,
            concatenated_nonce,
            dh_shared_secret,
            keys,
            initiator_signed_octets,
            responder_signed_octets,
            last_eap_identifier: 0,
            first_nas_relayed: false,
            peer_identity: None,
            peer_certificate: None,
            initiator_message_id: msg.message_id,
            responder_message_id: 0,
            ue_is_behind_nat,
            n3iwf_is_behind_nat,
            ue_addr: dgram.peer,
            local_addr: dgram.local,
            dpd: None,
            ike_auth_response_sa: None,
            peer_esp_spi: None,
            pending_exchange: None,
            temporary_child_msg: None,
            setup_data: None,
            ue: None,
        });

        info!(
            "Created IKE SA {local_spi:#018x} for {} (UE NAT: {ue_is_behind_nat}, local NAT: {n3iwf_is_behind_nat})",
            dgram.peer
        );
        self.send_datagram(response_bytes, dgram.peer, dgram.local)
            .await
    }

    /// First acceptable proposal plus the single-choice proposal echoed in
    /// the response. Proposals missing one of the four mandatory transform
    /// types are skipped; offered ESN transforms are never selected and stay
    /// absent from the response, since IKE SAs have no sequence numbers.
    fn select_ike_proposal(
        &self,
        sa: &SecurityAssociation,
    ) -> Option<(ChosenTransforms, Proposal)> {
        for proposal in &sa.proposals {
            if proposal.protocol != SecurityProtocol::InternetKeyExchange {
                continue;
            }
            let Some((encryption, key_length)) = proposal
                .encryption_algorithms
                .iter()
                .find(|(alg, key_length)| encryption_supported(*alg, *key_length))
                .copied()
            else {
                continue;
            };
            let Some(prf) = proposal
                .pseudo_random_functions
                .iter()
                .find(|prf| SUPPORTED_PRF.contains(*prf))
                .copied()
            else {
                continue;
            };
            let Some(integrity) = proposal
                .integrity_algorithms
                .iter()
                .find(|integrity| SUPPORTED_INTEGRITY.contains(*integrity))
                .copied()
            else {
                continue;
            };
            let Some(dh) = proposal
                .key_exchange_methods
                .iter()
                .find(|method| {
                    self.cfg.dh_groups.contains(*method) && dh::key_len(**method).is_some()
                })
                .copied()
            else {
                continue;
            };

            let mut response_proposal = Proposal::new_empty(
                SecurityProtocol::InternetKeyExchange,
                Some(proposal.spi.clone()),
            );
            response_proposal.add(vec![
                Transform::Encryption(encryption, key_length),
                Transform::PseudoRandomFunction(prf),
                Transform::Integrity(integrity),
                Transform::KeyExchange(dh),
            ]);

            return Some((
                ChosenTransforms {
                    encryption,
                    key_length,
                    prf,
                    integrity,
                    dh,
                },
                response_proposal,
            ));
        }
        None
    }

    /// Plaintext IKE_SA_INIT response carrying a single error notify
    async fn send_sa_init_error(
        &self,
        msg: &Message,
        dgram: &Datagram,
        notify: Notification,
    ) -> Result<(), IkeError> {
        let response = Message {
            initiator_spi: msg.initiator_spi,
            responder_spi: 0,
            exchange_type: ExchangeType::IkeSaInit,
            initiator: false,
            response: true,
            message_id: msg.message_id,
            payloads: vec![Payload::Notify(notify)],
        };
        self.send_datagram(response.try_build()?, dgram.peer, dgram.local)
            .await
    }
}
