//! IKE_AUTH: ESP negotiation, the EAP-5G relay rounds and the final
//! authenticated round that installs the signalling child SA

use ikev2::crypto::auth::sign_rsa_sha1;
use ikev2::definitions::params::{
    AuthenticationMethod, CertificateEncoding, ConfigurationAttributeType, ConfigurationType,
    EapCode, EncryptionAlgorithm, ExchangeType, ExtendedSequenceNumbers, IdentificationType,
    IntegrityAlgorithm, NotifyErrorMessage, NotifyStatusMessage, PayloadType, SecurityProtocol,
    IP_PROTOCOL_TCP,
};
use ikev2::definitions::{
    Authentication, Certificate, Configuration, ConfigurationAttribute, EapData, Identification,
    Message, Notification, Payload, Proposal, SecurityAssociation, TrafficSelector,
    TrafficSelectors, Transform,
};
use tracing::{debug, info, warn};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::context::child_sa::ChildSa;
use crate::context::ike_sa::{IkeSa, IkeState};
use crate::eap5g;
use crate::events::{Datagram, NgapContextKind, NgapEvent};
use crate::security::{generate_child_keys, id_payload_digest, shared_key_mic};
use crate::{dpd, IkeError, IkeServer};

/// Integrity algorithms installable for ESP
const ESP_SUPPORTED_INTEGRITY: &[IntegrityAlgorithm] = &[
    IntegrityAlgorithm::HmacMd5_96,
    IntegrityAlgorithm::HmacSha1_96,
    IntegrityAlgorithm::AesXcbc96,
];

/// Whether the offered encryption transform is installable for ESP
fn esp_encryption_supported(alg: EncryptionAlgorithm, key_length: Option<u16>) -> bool {
    match alg {
        EncryptionAlgorithm::Des
        | EncryptionAlgorithm::TripleDes
        | EncryptionAlgorithm::Blowfish
        | EncryptionAlgorithm::Null => true,
        EncryptionAlgorithm::Cast => matches!(key_length, None | Some(128)),
        EncryptionAlgorithm::AesCbc | EncryptionAlgorithm::AesCtr => {
            matches!(key_length, Some(128 | 192 | 256))
        }
        _ => false,
    }
}

impl IkeServer {
    pub(crate) async fn handle_ike_auth(
        &self,
        sa: &mut IkeSa,
        msg: &Message,
        payloads: Vec<Payload>,
        dgram: &Datagram,
    ) -> Result<(), IkeError> {
        match sa.state {
            IkeState::PreSignalling => self.handle_pre_signalling(sa, msg, payloads).await,
            IkeState::EapSignalling => self.handle_eap_signalling(sa, msg, payloads, dgram).await,
            IkeState::PostSignalling => self.handle_post_signalling(sa, msg, payloads).await,
            other => {
                warn!("Ignoring IKE_AUTH message in state {other:?}");
                Ok(())
            }
        }
    }

    async fn handle_pre_signalling(
        &self,
        sa: &mut IkeSa,
        msg: &Message,
        payloads: Vec<Payload>,
    ) -> Result<(), IkeError> {
        let mut identity = None;
        let mut certificate = None;
        let mut sa_payload = None;
        let mut ts_initiator = None;
        let mut ts_responder = None;
        for payload in payloads {
            match payload {
                Payload::IdentificationInitiator(id) => identity = Some(id),
                Payload::Certificate(cert) => certificate = Some(cert),
                Payload::CertificateRequest(_) => {}
                Payload::SecurityAssociation(esp) => sa_payload = Some(esp),
                Payload::TrafficSelectorInitiator(ts) => ts_initiator = Some(ts),
                Payload::TrafficSelectorResponder(ts) => ts_responder = Some(ts),
                other => debug!("Ignoring payload {:?} in first IKE_AUTH round", PayloadType::from(&other)),
            }
        }
        let identity = identity.ok_or(IkeError::MissingPayload(
            PayloadType::IdentificationInitiator,
        ))?;
        let sa_payload =
            sa_payload.ok_or(IkeError::MissingPayload(PayloadType::SecurityAssociation))?;
        if ts_initiator.is_none() || ts_responder.is_none() {
            return Err(IkeError::MissingPayload(PayloadType::TrafficSelectorInitiator));
        }

        // The initiator's signed octets grow by prf(SK_pi, IDi')
        sa.initiator_signed_octets.extend(id_payload_digest(
            sa.transforms.prf,
            &sa.keys.sk_pi,
            &identity,
        )?);
        sa.peer_identity = Some(identity);
        if let Some(cert) = certificate {
            if X509Certificate::from_der(&cert.data).is_err() {
                warn!("Peer certificate does not parse as X.509, keeping it anyway");
            }
            sa.peer_certificate = Some(cert.data);
        }

        // ESP negotiation against the kernel-installable transform table
        let Some((response_proposal, peer_spi)) = select_esp_proposal(&sa_payload) else {
            debug!("No acceptable ESP proposal on {:#018x}", sa.local_spi);
            return self
                .seal_and_send(
                    sa,
                    ExchangeType::IkeAuth,
                    true,
                    msg.message_id,
                    vec![Payload::Notify(Notification::error(
                        NotifyErrorMessage::NoProposalChosen,
                        vec![],
                    ))],
                )
                .await;
        };
        sa.ike_auth_response_sa = Some(SecurityAssociation {
            proposals: vec![response_proposal],
        });
        sa.peer_esp_spi = Some(peer_spi);

        let responder_identity = Identification {
            id_type: IdentificationType::Fqdn,
            data: self.cfg.fqdn.as_bytes().to_vec(),
        };
        let signature = sign_rsa_sha1(&self.creds.private_key, &sa.responder_signed_octets)?;
        let identifier = eap5g::draw_identifier(self.rng.as_ref(), sa.last_eap_identifier);
        sa.last_eap_identifier = identifier;

        self.seal_and_send(
            sa,
            ExchangeType::IkeAuth,
            true,
            msg.message_id,
            vec![
                Payload::IdentificationResponder(responder_identity),
                Payload::Certificate(Certificate {
                    encoding: CertificateEncoding::X509CertificateSignature,
                    data: self.creds.certificate_der.clone(),
                }),
                Payload::Authentication(Authentication {
                    method: AuthenticationMethod::RSADigitalSignature,
                    data: signature,
                }),
                Payload::Eap(eap5g::build_start_request(identifier)),
            ],
        )
        .await?;
        sa.state = IkeState::EapSignalling;
        Ok(())
    }

    async fn handle_eap_signalling(
        &self,
        sa: &mut IkeSa,
        msg: &Message,
        payloads: Vec<Payload>,
        dgram: &Datagram,
    ) -> Result<(), IkeError> {
        let eap = payloads
            .into_iter()
            .find_map(|payload| match payload {
                Payload::Eap(eap) => Some(eap),
                _ => None,
            })
            .ok_or(IkeError::MissingPayload(PayloadType::ExtensibleAuthentication))?;

        if eap.code != EapCode::Response {
            warn!("Expected an EAP response, got {:?}", eap.code);
            return Ok(());
        }
        if eap.identifier != sa.last_eap_identifier {
            warn!(
                "EAP identifier {} does not match the outstanding request {}",
                eap.identifier, sa.last_eap_identifier
            );
            return Ok(());
        }
        let EapData::Expanded(expanded) = eap.data else {
            warn!("Expected an EAP expanded payload");
            return Ok(());
        };
        if !eap5g::is_eap_5g(&expanded) {
            warn!(
                "Expected an EAP-5G envelope, got vendor {}/{}",
                expanded.vendor_id, expanded.vendor_type
            );
            return Ok(());
        }

        if eap5g::vendor_message_id(&expanded.vendor_data) == Some(eap5g::MESSAGE_ID_5G_STOP) {
            info!("UE aborted the EAP-5G procedure on {:#018x}", sa.local_spi);
            return self
                .seal_and_send(
                    sa,
                    ExchangeType::IkeAuth,
                    true,
                    msg.message_id,
                    vec![Payload::Eap(eap5g::build_failure(sa.last_eap_identifier))],
                )
                .await;
        }

        // The four-tuple may have moved behind a NAT between rounds
        sa.ue_addr = dgram.peer;
        sa.local_addr = dgram.local;

        let initial = !sa.first_nas_relayed;
        sa.first_nas_relayed = true;
        self.send_ngap_event(NgapEvent::UnmarshalEap5gData {
            local_spi: sa.local_spi,
            vendor_data: expanded.vendor_data,
            initial,
            ue_addr: sa.ue_addr,
        })
        .await
    }

    async fn handle_post_signalling(
        &self,
        sa: &mut IkeSa,
        msg: &Message,
        payloads: Vec<Payload>,
    ) -> Result<(), IkeError> {
        let mut authentication = None;
        let mut configuration = None;
        for payload in payloads {
            match payload {
                Payload::Authentication(auth) => authentication = Some(auth),
                Payload::Configuration(cp) => configuration = Some(cp),
                _ => {}
            }
        }

        let kn3iwf = sa
            .ue
            .as_ref()
            .map(|ue| ue.kn3iwf.clone())
            .ok_or(IkeError::State(sa.state))?;

        let accepted = match &authentication {
            Some(auth) if auth.method == AuthenticationMethod::SharedKeyMessageIntegrityCode => {
                let expected =
                    shared_key_mic(sa.transforms.prf, &kn3iwf, &sa.initiator_signed_octets)?;
                auth.data == expected
            }
            _ => false,
        };
        if !accepted {
            warn!("Shared-key MIC verification failed on {:#018x}", sa.local_spi);
            return self
                .seal_and_send(
                    sa,
                    ExchangeType::IkeAuth,
                    true,
                    msg.message_id,
                    vec![Payload::Notify(Notification::error(
                        NotifyErrorMessage::AuthenticationFailed,
                        vec![],
                    ))],
                )
                .await;
        }

        let requested_address = configuration.as_ref().is_some_and(|cp| {
            cp.cfg_type == ConfigurationType::Request
                && cp.attributes.iter().any(|attribute| {
                    attribute.attribute_type == ConfigurationAttributeType::InternalIp4Address
                })
        });
        if !requested_address {
            warn!("UE did not request an inner address, assigning one anyway");
        }

        let ue_inner_addr = self.ue_pool.allocate()?;

        // Replay the stored ESP choice with a freshly allocated inbound SPI
        let inbound_spi = self.sas.alloc_child_spi(self.rng.as_ref(), sa.local_spi);
        let mut response_sa = match sa.ike_auth_response_sa.clone() {
            Some(response_sa) => response_sa,
            None => {
                self.ue_pool.release(ue_inner_addr);
                self.sas.release_child_spi(inbound_spi);
                return Err(IkeError::State(sa.state));
            }
        };
        let (encryption, key_length, integrity) = match response_sa.proposals.first_mut() {
            Some(proposal) => {
                proposal.spi = inbound_spi.to_be_bytes().to_vec();
                (
                    proposal.encryption_algorithms[0].0,
                    proposal.encryption_algorithms[0].1,
                    proposal.integrity_algorithms.first().copied(),
                )
            }
            None => {
                self.ue_pool.release(ue_inner_addr);
                self.sas.release_child_spi(inbound_spi);
                return Err(IkeError::State(sa.state));
            }
        };

        let outbound_spi = match sa.peer_esp_spi {
            Some(spi) => spi,
            None => {
                self.ue_pool.release(ue_inner_addr);
                self.sas.release_child_spi(inbound_spi);
                return Err(IkeError::State(sa.state));
            }
        };

        let keys = generate_child_keys(
            sa.transforms.prf,
            &sa.keys.sk_d,
            &sa.concatenated_nonce,
            encryption,
            key_length,
            integrity,
        )?;

        let child = ChildSa {
            inbound_spi,
            outbound_spi,
            parent_local_spi: sa.local_spi,
            encryption,
            key_length,
            integrity,
            keys,
            local_is_initiator: false,
            ip_protocol: IP_PROTOCOL_TCP,
            local_ts: TrafficSelector::single_host(self.cfg.ipsec_gateway, 0),
            peer_ts: TrafficSelector::single_host(ue_inner_addr, 0),
            enable_encapsulation: sa.ue_is_behind_nat || sa.n3iwf_is_behind_nat,
            local_port: sa.local_addr.port(),
            peer_port: sa.ue_addr.port(),
            xfrm_iface_id: self.xfrm.default_iface_id(),
            pdu_session_id: None,
        };

        // Kernel installation; a failure aborts the exchange without a
        // response so the peer retransmits
        let installed = self
            .xfrm
            .ensure_iface(
                self.xfrm.default_iface_id(),
                self.cfg.ipsec_gateway,
                self.cfg.ue_subnet.prefix_len(),
            )
            .and_then(|()| {
                self.xfrm
                    .apply(&child, sa.local_addr.ip(), sa.ue_addr.ip())
            });
        if let Err(err) = installed {
            self.ue_pool.release(ue_inner_addr);
            self.sas.release_child_spi(inbound_spi);
            return Err(err.into());
        }
        self.sas.complete_child_sa(child);
        if let Some(ue) = sa.ue.as_mut() {
            ue.inner_addr = Some(ue_inner_addr);
            ue.child_spis.push(inbound_spi);
        }

        let responder_auth = Authentication {
            method: AuthenticationMethod::SharedKeyMessageIntegrityCode,
            data: shared_key_mic(sa.transforms.prf, &kn3iwf, &sa.responder_signed_octets)?,
        };

        self.seal_and_send(
            sa,
            ExchangeType::IkeAuth,
            true,
            msg.message_id,
            vec![
                Payload::Authentication(responder_auth),
                Payload::SecurityAssociation(response_sa),
                Payload::TrafficSelectorInitiator(TrafficSelectors {
                    selectors: vec![TrafficSelector::single_host(ue_inner_addr, 0)],
                }),
                Payload::TrafficSelectorResponder(TrafficSelectors {
                    selectors: vec![TrafficSelector::single_host(self.cfg.ipsec_gateway, 0)],
                }),
                Payload::Configuration(Configuration {
                    cfg_type: ConfigurationType::Reply,
                    attributes: vec![
                        ConfigurationAttribute {
                            attribute_type: ConfigurationAttributeType::InternalIp4Address,
                            value: ue_inner_addr.octets().to_vec(),
                        },
                        ConfigurationAttribute {
                            attribute_type: ConfigurationAttributeType::InternalIp4Netmask,
                            value: self.ue_pool.netmask().octets().to_vec(),
                        },
                    ],
                }),
                Payload::Notify(Notification::status(
                    NotifyStatusMessage::NasIp4Address,
                    self.cfg.ipsec_gateway.octets().to_vec(),
                )),
                Payload::Notify(Notification::status(
                    NotifyStatusMessage::NasTcpPort,
                    self.cfg.nas_tcp_port.to_be_bytes().to_vec(),
                )),
            ],
        )
        .await?;
        sa.state = IkeState::EndSignalling;
        info!(
            "IKE SA {:#018x} established, UE inner address {ue_inner_addr}",
            sa.local_spi
        );

        if let Some(server) = self.me.upgrade() {
            sa.dpd = Some(dpd::spawn(server, sa.local_spi, self.cfg.dpd));
        }

        self.send_ngap_event(NgapEvent::StartTcpSignalNas {
            local_spi: sa.local_spi,
            ue_inner_addr,
        })
        .await?;
        self.send_ngap_event(NgapEvent::GetNgapContext {
            local_spi: sa.local_spi,
            kinds: vec![NgapContextKind::PduSessionSetupData],
        })
        .await
    }
}

/// Choose the ESP transforms of the signalling child SA from the kernel
/// table. Proposals offering a key exchange method (PFS) or demanding
/// extended sequence numbers are skipped.
///
/// Returns the single-choice proposal for the response (still carrying the
/// peer's SPI) and the peer's outbound SPI.
fn select_esp_proposal(sa: &SecurityAssociation) -> Option<(Proposal, u32)> {
    for proposal in &sa.proposals {
        if proposal.protocol != SecurityProtocol::EncapsulatingSecurityPayload {
            continue;
        }
        if proposal.spi.len() != 4 {
            continue;
        }
        if !proposal.key_exchange_methods.is_empty() {
            continue;
        }
        if !proposal.sequence_numbers.is_empty()
            && !proposal
                .sequence_numbers
                .contains(&ExtendedSequenceNumbers::No)
        {
            continue;
        }
        let Some((encryption, key_length)) = proposal
            .encryption_algorithms
            .iter()
            .find(|(alg, key_length)| esp_encryption_supported(*alg, *key_length))
            .copied()
        else {
            continue;
        };
        let integrity = if proposal.integrity_algorithms.is_empty() {
            None
        } else {
            match proposal
                .integrity_algorithms
                .iter()
                .find(|integrity| ESP_SUPPORTED_INTEGRITY.contains(*integrity))
            {
                Some(integrity) => Some(*integrity),
                None => continue,
            }
        };

        let peer_spi = u32::from_be_bytes([
            proposal.spi[0],
            proposal.spi[1],
            proposal.spi[2],
            proposal.spi[3],
        ]);

        let mut response_proposal = Proposal::new_empty(
            SecurityProtocol::EncapsulatingSecurityPayload,
            Some(proposal.spi.clone()),
        );
        let mut transforms = vec![Transform::Encryption(encryption, key_length)];
        if let Some(integrity) = integrity {
            transforms.push(Transform::Integrity(integrity));
        }
        transforms.push(Transform::SequenceNumber(ExtendedSequenceNumbers::No));
        response_proposal.add(transforms);

        return Some((response_proposal, peer_spi));
    }
    None
}
