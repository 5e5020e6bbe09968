//! End-to-end exchanges against a responder with scripted randomness, a
//! recording kernel driver and channel-observed NGAP traffic

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use ikev2::crypto::auth::verify_rsa_sha1;
use ikev2::crypto::encrypted::{open, seal, SkCipher};
use ikev2::crypto::{dh, prf};
use ikev2::definitions::params::{
    AuthenticationMethod, ConfigurationAttributeType, ConfigurationType, EapCode,
    EncryptionAlgorithm, ExchangeType, ExtendedSequenceNumbers, IdentificationType,
    IntegrityAlgorithm, KeyExchangeMethod, NotifyErrorMessage, PseudorandomFunction,
    SecurityProtocol, VENDOR_ID_3GPP, VENDOR_TYPE_EAP_5G, IP_PROTOCOL_TCP,
};
use ikev2::definitions::{
    Authentication, Configuration, ConfigurationAttribute, EapData, EapExpanded, EapMessage,
    Identification, KeyExchange, Message, NotificationType, Payload, Proposal,
    SecurityAssociation, TrafficSelector, TrafficSelectors, Transform,
};
use rsa::RsaPrivateKey;
use tokio::sync::mpsc;

use crate::config::{test_config, Config};
use crate::context::ike_sa::{ChosenTransforms, SessionKeys};
use crate::events::{Datagram, IkeEvent, NgapEvent, PduSession, PduSessionSetupData};
use crate::random::RandomSource;
use crate::security::{generate_ike_keys, id_payload_digest, shared_key_mic};
use crate::xfrm::{IfaceRequest, RecordingXfrmDriver, XfrmDriver, XfrmError, XfrmPolicy, XfrmState};
use crate::{Credentials, IkeServer};

/// Byte source that replays scripted values and falls back to a counter
/// pattern, so identifier draws always terminate
struct ScriptedRandom {
    queue: StdMutex<VecDeque<Vec<u8>>>,
    counter: AtomicU8,
}

impl ScriptedRandom {
    fn new(items: Vec<Vec<u8>>) -> Self {
        Self {
            queue: StdMutex::new(items.into()),
            counter: AtomicU8::new(1),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn fill_bytes(&self, buf: &mut [u8]) {
        if let Some(item) = self.queue.lock().unwrap().pop_front() {
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = item.get(i).copied().unwrap_or(0xcc);
            }
            return;
        }
        let base = self.counter.fetch_add(1, Ordering::SeqCst);
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = base.wrapping_add(i as u8);
        }
    }
}

/// Delegating driver so the recordings stay inspectable after the box moved
/// into the server
struct SharedDriver(Arc<RecordingXfrmDriver>);

impl XfrmDriver for SharedDriver {
    fn add_state(&self, state: &XfrmState) -> Result<(), XfrmError> {
        self.0.add_state(state)
    }
    fn add_policy(&self, policy: &XfrmPolicy) -> Result<(), XfrmError> {
        self.0.add_policy(policy)
    }
    fn delete_child(&self, inbound_spi: u32, outbound_spi: u32) -> Result<(), XfrmError> {
        self.0.delete_child(inbound_spi, outbound_spi)
    }
    fn setup_iface(&self, iface: &IfaceRequest) -> Result<(), XfrmError> {
        self.0.setup_iface(iface)
    }
}

struct Harness {
    server: Arc<IkeServer>,
    ngap_rx: mpsc::Receiver<NgapEvent>,
    out_rx: mpsc::Receiver<Datagram>,
    xfrm: Arc<RecordingXfrmDriver>,
    public_key: rsa::RsaPublicKey,
}

fn harness_with(cfg: Config, scripted: Vec<Vec<u8>>) -> Harness {
    let (ngap_tx, ngap_rx) = mpsc::channel(64);
    let (out_tx, out_rx) = mpsc::channel(64);
    let xfrm = Arc::new(RecordingXfrmDriver::default());
    // Small but sufficient for PKCS#1 v1.5 over SHA-1, keeps the suite fast
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
    let public_key = private_key.to_public_key();
    let server = IkeServer::new(
        cfg,
        Credentials {
            private_key,
            certificate_der: vec![0x30, 0x82, 0x01, 0x00],
        },
        Box::new(SharedDriver(xfrm.clone())),
        Box::new(ScriptedRandom::new(scripted)),
        ngap_tx,
        out_tx,
    );
    Harness {
        server,
        ngap_rx,
        out_rx,
        xfrm,
        public_key,
    }
}

fn harness(scripted: Vec<Vec<u8>>) -> Harness {
    harness_with(test_config(), scripted)
}

fn ue_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 10)), 500)
}

fn local_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 500)
}

impl Harness {
    async fn feed(&self, data: Vec<u8>) {
        self.server
            .handle_datagram(Datagram {
                data,
                peer: ue_addr(),
                local: local_addr(),
            })
            .await;
    }

    fn sent(&mut self) -> Vec<u8> {
        self.out_rx.try_recv().expect("expected an outbound datagram").data
    }

    fn no_output(&mut self) {
        assert!(self.out_rx.try_recv().is_err());
    }
}

/// The simulated peer with everything it needs to drive a handshake
struct TestUe {
    spi: u64,
    nonce: Vec<u8>,
    dh_private: Vec<u8>,
    esp_spi: u32,
    message_id: u32,
    server_spi: u64,
    server_nonce: Vec<u8>,
    keys: SessionKeys,
    request1: Vec<u8>,
    response1: Vec<u8>,
    kn3iwf: Vec<u8>,
}

impl TestUe {
    fn new() -> Self {
        Self {
            spi: 0x0102030405060708,
            nonce: vec![0x00; 32],
            dh_private: vec![0x33; 32],
            esp_spi: 0xaabbccdd,
            message_id: 0,
            server_spi: 0,
            server_nonce: vec![],
            keys: SessionKeys::default(),
            request1: vec![],
            response1: vec![],
            kn3iwf: vec![0x77; 32],
        }
    }

    fn transforms() -> ChosenTransforms {
        ChosenTransforms {
            encryption: EncryptionAlgorithm::AesCbc,
            key_length: Some(256),
            prf: PseudorandomFunction::HmacSha1,
            integrity: IntegrityAlgorithm::HmacSha1_96,
            dh: KeyExchangeMethod::ModP2048,
        }
    }

    fn identity() -> Identification {
        Identification {
            id_type: IdentificationType::KeyId,
            data: b"ue-001".to_vec(),
        }
    }

    fn init_request(&mut self) -> Vec<u8> {
        let mut proposal =
            Proposal::new_empty(SecurityProtocol::InternetKeyExchange, Some(vec![]));
        proposal.add(vec![
            Transform::Encryption(EncryptionAlgorithm::AesCbc, Some(256)),
            Transform::PseudoRandomFunction(PseudorandomFunction::HmacSha1),
            Transform::Integrity(IntegrityAlgorithm::HmacSha1_96),
            Transform::KeyExchange(KeyExchangeMethod::ModP2048),
            Transform::SequenceNumber(ExtendedSequenceNumbers::No),
            Transform::SequenceNumber(ExtendedSequenceNumbers::Yes),
        ]);
        let request = Message {
            initiator_spi: self.spi,
            responder_spi: 0,
            exchange_type: ExchangeType::IkeSaInit,
            initiator: true,
            response: false,
            message_id: 0,
            payloads: vec![
                Payload::SecurityAssociation(SecurityAssociation {
                    proposals: vec![proposal],
                }),
                Payload::KeyExchange(KeyExchange {
                    dh_group: KeyExchangeMethod::ModP2048,
                    data: dh::public_value(KeyExchangeMethod::ModP2048, &self.dh_private)
                        .unwrap(),
                }),
                Payload::Nonce(self.nonce.clone()),
            ],
        }
        .try_build()
        .unwrap();
        self.request1 = request.clone();
        request
    }

    fn absorb_init_response(&mut self, response: Vec<u8>) {
        let msg = Message::try_parse(&response).unwrap();
        assert!(msg.response);
        self.server_spi = msg.responder_spi;
        let mut server_public = None;
        for payload in &msg.payloads {
            match payload {
                Payload::KeyExchange(ke) => server_public = Some(ke.data.clone()),
                Payload::Nonce(nonce) => self.server_nonce = nonce.clone(),
                _ => {}
            }
        }
        let shared = dh::shared_secret(
            KeyExchangeMethod::ModP2048,
            &self.dh_private,
            &server_public.unwrap(),
        )
        .unwrap();
        let mut nonces = self.nonce.clone();
        nonces.extend_from_slice(&self.server_nonce);
        self.keys =
            generate_ike_keys(&Self::transforms(), &nonces, &shared, self.spi, self.server_spi)
                .unwrap();
        self.response1 = response;
    }

    fn send_cipher(&self) -> SkCipher<'_> {
        SkCipher {
            encryption: EncryptionAlgorithm::AesCbc,
            encryption_key: &self.keys.sk_ei,
            integrity: IntegrityAlgorithm::HmacSha1_96,
            integrity_key: &self.keys.sk_ai,
        }
    }

    fn recv_cipher(&self) -> SkCipher<'_> {
        SkCipher {
            encryption: EncryptionAlgorithm::AesCbc,
            encryption_key: &self.keys.sk_er,
            integrity: IntegrityAlgorithm::HmacSha1_96,
            integrity_key: &self.keys.sk_ar,
        }
    }

    fn seal_request(&mut self, exchange_type: ExchangeType, payloads: Vec<Payload>) -> Vec<u8> {
        self.message_id += 1;
        let msg = Message {
            initiator_spi: self.spi,
            responder_spi: self.server_spi,
            exchange_type,
            initiator: true,
            response: false,
            message_id: self.message_id,
            payloads,
        };
        seal(&msg, &self.send_cipher(), &[0x42; 16]).unwrap()
    }

    fn seal_response(
        &self,
        exchange_type: ExchangeType,
        message_id: u32,
        payloads: Vec<Payload>,
    ) -> Vec<u8> {
        let msg = Message {
            initiator_spi: self.spi,
            responder_spi: self.server_spi,
            exchange_type,
            initiator: true,
            response: true,
            message_id,
            payloads,
        };
        seal(&msg, &self.send_cipher(), &[0x43; 16]).unwrap()
    }

    fn open_payloads(&self, raw: &[u8]) -> Vec<Payload> {
        open(raw, &self.recv_cipher()).unwrap()
    }

    fn initiator_signed_octets(&self) -> Vec<u8> {
        let mut octets = self.request1.clone();
        octets.extend_from_slice(&self.server_nonce);
        octets.extend(
            id_payload_digest(
                PseudorandomFunction::HmacSha1,
                &self.keys.sk_pi,
                &Self::identity(),
            )
            .unwrap(),
        );
        octets
    }

    fn responder_signed_octets(&self, fqdn: &str) -> Vec<u8> {
        let mut octets = self.response1.clone();
        octets.extend_from_slice(&self.nonce);
        octets.extend(
            id_payload_digest(
                PseudorandomFunction::HmacSha1,
                &self.keys.sk_pr,
                &Identification {
                    id_type: IdentificationType::Fqdn,
                    data: fqdn.as_bytes().to_vec(),
                },
            )
            .unwrap(),
        );
        octets
    }

    fn first_auth_request(&mut self) -> Vec<u8> {
        let mut proposal = Proposal::new_empty(
            SecurityProtocol::EncapsulatingSecurityPayload,
            Some(self.esp_spi.to_be_bytes().to_vec()),
        );
        proposal.add(vec![
            Transform::Encryption(EncryptionAlgorithm::AesCbc, Some(256)),
            Transform::Integrity(IntegrityAlgorithm::HmacSha1_96),
            Transform::SequenceNumber(ExtendedSequenceNumbers::No),
        ]);
        let any_ts = TrafficSelectors {
            selectors: vec![TrafficSelector {
                ip_protocol: 0,
                start_port: 0,
                end_port: 65535,
                start_addr: Ipv4Addr::new(0, 0, 0, 0),
                end_addr: Ipv4Addr::new(255, 255, 255, 255),
            }],
        };
        self.seal_request(
            ExchangeType::IkeAuth,
            vec![
                Payload::IdentificationInitiator(Self::identity()),
                Payload::SecurityAssociation(SecurityAssociation {
                    proposals: vec![proposal],
                }),
                Payload::TrafficSelectorInitiator(any_ts.clone()),
                Payload::TrafficSelectorResponder(any_ts),
            ],
        )
    }

    fn eap_nas_response(&mut self, identifier: u8) -> Vec<u8> {
        self.seal_request(
            ExchangeType::IkeAuth,
            vec![Payload::Eap(EapMessage {
                code: EapCode::Response,
                identifier,
                data: EapData::Expanded(EapExpanded {
                    vendor_id: VENDOR_ID_3GPP,
                    vendor_type: VENDOR_TYPE_EAP_5G,
                    vendor_data: vec![0x02, 0x00, 0x00, 0x03, 0xde, 0xad, 0xbe],
                }),
            })],
        )
    }

    fn final_auth_request(&mut self) -> Vec<u8> {
        let mic = shared_key_mic(
            PseudorandomFunction::HmacSha1,
            &self.kn3iwf,
            &self.initiator_signed_octets(),
        )
        .unwrap();
        self.seal_request(
            ExchangeType::IkeAuth,
            vec![
                Payload::Authentication(Authentication {
                    method: AuthenticationMethod::SharedKeyMessageIntegrityCode,
                    data: mic,
                }),
                Payload::Configuration(Configuration {
                    cfg_type: ConfigurationType::Request,
                    attributes: vec![ConfigurationAttribute {
                        attribute_type: ConfigurationAttributeType::InternalIp4Address,
                        value: vec![],
                    }],
                }),
            ],
        )
    }
}

fn find_eap(payloads: &[Payload]) -> &EapMessage {
    payloads
        .iter()
        .find_map(|payload| match payload {
            Payload::Eap(eap) => Some(eap),
            _ => None,
        })
        .expect("expected an EAP payload")
}

/// Scripted values for one IKE_SA_INIT: DH private, Nr, local SPI
fn init_script() -> Vec<Vec<u8>> {
    vec![vec![0x22; 32], vec![0x11; 32], vec![0x9a; 8]]
}

/// Drive a UE through IKE_SA_INIT, the EAP-5G rounds and the final
/// authenticated round, leaving an established SA behind.
async fn establish(h: &mut Harness, ue: &mut TestUe) {
    h.feed(ue.init_request()).await;
    ue.absorb_init_response(h.sent());

    h.feed(ue.first_auth_request()).await;
    let payloads = ue.open_payloads(&h.sent());
    let identifier = find_eap(&payloads).identifier;

    h.feed(ue.eap_nas_response(identifier)).await;
    let Some(NgapEvent::UnmarshalEap5gData { local_spi, .. }) = h.ngap_rx.try_recv().ok()
    else {
        panic!("expected the EAP-5G envelope to be relayed");
    };
    assert_eq!(local_spi, ue.server_spi);

    h.server
        .handle_event(IkeEvent::SendEapSuccess {
            local_spi,
            kn3iwf: ue.kn3iwf.clone(),
            pdu_session_count: 1,
        })
        .await;
    let payloads = ue.open_payloads(&h.sent());
    assert_eq!(find_eap(&payloads).code, EapCode::Success);

    h.feed(ue.final_auth_request()).await;
}

#[tokio::test]
async fn sa_init_negotiates_the_offered_quadruple() {
    let mut h = harness(init_script());
    let mut ue = TestUe::new();

    h.feed(ue.init_request()).await;
    let response = h.sent();
    let msg = Message::try_parse(&response).unwrap();
    assert_eq!(msg.exchange_type, ExchangeType::IkeSaInit);
    assert!(msg.response);

    let sa = msg
        .payloads
        .iter()
        .find_map(|payload| match payload {
            Payload::SecurityAssociation(sa) => Some(sa),
            _ => None,
        })
        .unwrap();
    let proposal = &sa.proposals[0];
    assert_eq!(
        proposal.encryption_algorithms,
        vec![(EncryptionAlgorithm::AesCbc, Some(256))]
    );
    assert_eq!(
        proposal.pseudo_random_functions,
        vec![PseudorandomFunction::HmacSha1]
    );
    assert_eq!(
        proposal.integrity_algorithms,
        vec![IntegrityAlgorithm::HmacSha1_96]
    );
    assert_eq!(
        proposal.key_exchange_methods,
        vec![KeyExchangeMethod::ModP2048]
    );
    // ESN was offered but must be absent from the response
    assert!(proposal.sequence_numbers.is_empty());

    ue.absorb_init_response(response);
    assert_eq!(ue.server_nonce, vec![0x11; 32]);

    // SK_d must match an independent prf+ expansion over the fixed inputs
    let shared = dh::shared_secret(
        KeyExchangeMethod::ModP2048,
        &[0x22; 32],
        &dh::public_value(KeyExchangeMethod::ModP2048, &ue.dh_private).unwrap(),
    )
    .unwrap();
    let mut nonces = vec![0x00; 32];
    nonces.extend_from_slice(&[0x11; 32]);
    let skeyseed = prf::prf(PseudorandomFunction::HmacSha1, &nonces, &shared).unwrap();
    let mut seed = nonces.clone();
    seed.extend_from_slice(&ue.spi.to_be_bytes());
    seed.extend_from_slice(&ue.server_spi.to_be_bytes());
    let material = prf::prf_plus(
        PseudorandomFunction::HmacSha1,
        &skeyseed,
        &seed,
        3 * 20 + 2 * 20 + 2 * 32,
    )
    .unwrap();
    assert_eq!(ue.keys.sk_d, material[..20].to_vec());

    let handle = h.server.sas.ike_sa(ue.server_spi).unwrap();
    let sa = handle.lock().await;
    assert_eq!(sa.keys.sk_d, ue.keys.sk_d);
    assert_eq!(sa.keys.sk_er, ue.keys.sk_er);
}

#[tokio::test]
async fn sa_init_rejects_mismatched_key_exchange_group() {
    let mut h = harness(init_script());
    let ue = TestUe::new();

    let mut proposal = Proposal::new_empty(SecurityProtocol::InternetKeyExchange, Some(vec![]));
    proposal.add(vec![
        Transform::Encryption(EncryptionAlgorithm::AesCbc, Some(256)),
        Transform::PseudoRandomFunction(PseudorandomFunction::HmacSha1),
        Transform::Integrity(IntegrityAlgorithm::HmacSha1_96),
        Transform::KeyExchange(KeyExchangeMethod::ModP2048),
    ]);
    let request = Message {
        initiator_spi: ue.spi,
        responder_spi: 0,
        exchange_type: ExchangeType::IkeSaInit,
        initiator: true,
        response: false,
        message_id: 0,
        payloads: vec![
            Payload::SecurityAssociation(SecurityAssociation {
                proposals: vec![proposal],
            }),
            Payload::KeyExchange(KeyExchange {
                dh_group: KeyExchangeMethod::ModP1024,
                data: dh::public_value(KeyExchangeMethod::ModP1024, &[0x33; 32]).unwrap(),
            }),
            Payload::Nonce(vec![0x00; 32]),
        ],
    }
    .try_build()
    .unwrap();

    h.feed(request).await;
    let msg = Message::try_parse(&h.sent()).unwrap();
    let Payload::Notify(notify) = &msg.payloads[0] else {
        panic!("expected a notify payload");
    };
    assert_eq!(
        notify.variant,
        NotificationType::Error(NotifyErrorMessage::InvalidKeyExchangePayload)
    );
    assert_eq!(notify.data, vec![0x00, 0x0e]);
}

#[tokio::test]
async fn sa_init_refuses_triple_des_only() {
    let mut h = harness(init_script());
    let ue = TestUe::new();

    let mut proposal = Proposal::new_empty(SecurityProtocol::InternetKeyExchange, Some(vec![]));
    proposal.add(vec![
        Transform::Encryption(EncryptionAlgorithm::TripleDes, None),
        Transform::PseudoRandomFunction(PseudorandomFunction::HmacSha1),
        Transform::Integrity(IntegrityAlgorithm::HmacSha1_96),
        Transform::KeyExchange(KeyExchangeMethod::ModP2048),
    ]);
    let request = Message {
        initiator_spi: ue.spi,
        responder_spi: 0,
        exchange_type: ExchangeType::IkeSaInit,
        initiator: true,
        response: false,
        message_id: 0,
        payloads: vec![
            Payload::SecurityAssociation(SecurityAssociation {
                proposals: vec![proposal],
            }),
            Payload::KeyExchange(KeyExchange {
                dh_group: KeyExchangeMethod::ModP2048,
                data: dh::public_value(KeyExchangeMethod::ModP2048, &[0x33; 32]).unwrap(),
            }),
            Payload::Nonce(vec![0x00; 32]),
        ],
    }
    .try_build()
    .unwrap();

    h.feed(request).await;
    let msg = Message::try_parse(&h.sent()).unwrap();
    let Payload::Notify(notify) = &msg.payloads[0] else {
        panic!("expected a notify payload");
    };
    assert_eq!(
        notify.variant,
        NotificationType::Error(NotifyErrorMessage::NoProposalChosen)
    );
}

#[tokio::test]
async fn full_auth_installs_the_tcp_signalling_child_sa() {
    let mut h = harness(init_script());
    let mut ue = TestUe::new();

    h.feed(ue.init_request()).await;
    ue.absorb_init_response(h.sent());

    h.feed(ue.first_auth_request()).await;
    let payloads = ue.open_payloads(&h.sent());

    // The responder proves its identity with an RSA signature over its
    // signed octets
    let auth = payloads
        .iter()
        .find_map(|payload| match payload {
            Payload::Authentication(auth) => Some(auth),
            _ => None,
        })
        .unwrap();
    assert_eq!(auth.method, AuthenticationMethod::RSADigitalSignature);
    verify_rsa_sha1(
        &h.public_key,
        &ue.responder_signed_octets("n3iwf.free5gc.org"),
        &auth.data,
    )
    .unwrap();
    let identifier = find_eap(&payloads).identifier;

    h.feed(ue.eap_nas_response(identifier)).await;
    let Some(NgapEvent::UnmarshalEap5gData {
        local_spi, initial, ..
    }) = h.ngap_rx.try_recv().ok()
    else {
        panic!("expected the EAP-5G envelope to be relayed");
    };
    assert!(initial);

    h.server
        .handle_event(IkeEvent::SendEapSuccess {
            local_spi,
            kn3iwf: ue.kn3iwf.clone(),
            pdu_session_count: 1,
        })
        .await;
    let payloads = ue.open_payloads(&h.sent());
    assert_eq!(find_eap(&payloads).code, EapCode::Success);

    h.feed(ue.final_auth_request()).await;
    let payloads = ue.open_payloads(&h.sent());

    // The final round assigns the first pool address and mirrors it in TSi
    let ts_initiator = payloads
        .iter()
        .find_map(|payload| match payload {
            Payload::TrafficSelectorInitiator(ts) => Some(ts),
            _ => None,
        })
        .unwrap();
    let ts_responder = payloads
        .iter()
        .find_map(|payload| match payload {
            Payload::TrafficSelectorResponder(ts) => Some(ts),
            _ => None,
        })
        .unwrap();
    let allocated = Ipv4Addr::new(10, 0, 0, 2);
    assert_eq!(ts_initiator.selectors[0].start_addr, allocated);
    assert_eq!(ts_initiator.selectors[0].end_addr, allocated);
    assert_eq!(
        ts_responder.selectors[0].start_addr,
        Ipv4Addr::new(10, 0, 0, 1)
    );
    assert_eq!(
        ts_responder.selectors[0].end_addr,
        Ipv4Addr::new(10, 0, 0, 1)
    );

    let configuration = payloads
        .iter()
        .find_map(|payload| match payload {
            Payload::Configuration(cp) => Some(cp),
            _ => None,
        })
        .unwrap();
    assert_eq!(configuration.cfg_type, ConfigurationType::Reply);
    assert_eq!(configuration.attributes[0].value, vec![10, 0, 0, 2]);

    // The installed child SA carries NAS signalling over TCP
    let policies = h.xfrm.policies.lock().unwrap();
    assert_eq!(policies.len(), 2);
    assert!(policies.iter().all(|p| p.ip_protocol == IP_PROTOCOL_TCP));
    drop(policies);

    let states = h.xfrm.states.lock().unwrap();
    assert_eq!(states.len(), 2);
    // No NAT was detected, so no UDP encapsulation
    assert!(states.iter().all(|s| s.encapsulation.is_none()));
    drop(states);

    let handle = h.server.sas.ike_sa(ue.server_spi).unwrap();
    let sa = handle.lock().await;
    let children = h.server.sas.children_of(sa.local_spi);
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].ip_protocol, IP_PROTOCOL_TCP);
    assert_eq!(children[0].outbound_spi, ue.esp_spi);
}

#[tokio::test]
async fn one_child_sa_request_per_pdu_session() {
    let mut h = harness(init_script());
    let mut ue = TestUe::new();
    establish(&mut h, &mut ue).await;
    // Final IKE_AUTH response plus the StartTcpSignalNas/GetNgapContext pair
    let _ = h.sent();
    while h.ngap_rx.try_recv().is_ok() {}

    let signalling_spi = {
        let children = h.server.sas.children_of(ue.server_spi);
        children[0].inbound_spi
    };

    let session = |id: u8| PduSession {
        id,
        qos_flow_ids: vec![id],
        up_ip4: Ipv4Addr::new(192, 0, 2, 77),
        integrity_protection: id == 2,
        is_default: true,
        dscp: None,
    };
    h.server
        .handle_event(IkeEvent::CreatePduSession {
            local_spi: ue.server_spi,
            setup: PduSessionSetupData {
                pending: [session(1), session(2)].into(),
                ..PduSessionSetupData::default()
            },
        })
        .await;

    let mut request_spis = vec![];
    for (round, peer_spi) in [(0u32, 0xbb000001u32), (1, 0xbb000002)] {
        let request = ue.open_payloads(&h.sent());
        let outer = {
            // Request message ids count up with each self-initiated exchange
            let sa_payload = request
                .iter()
                .find_map(|payload| match payload {
                    Payload::SecurityAssociation(sa) => Some(sa),
                    _ => None,
                })
                .unwrap();
            let proposal = &sa_payload.proposals[0];
            assert_eq!(proposal.spi.len(), 4);
            u32::from_be_bytes([
                proposal.spi[0],
                proposal.spi[1],
                proposal.spi[2],
                proposal.spi[3],
            ])
        };
        assert_ne!(outer, signalling_spi);
        assert!(!request_spis.contains(&outer));
        request_spis.push(outer);

        let nonce = request
            .iter()
            .find_map(|payload| match payload {
                Payload::Nonce(nonce) => Some(nonce.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(nonce.len(), 32);

        // Echo the proposal with the UE-side SPI
        let mut response_proposal = Proposal::new_empty(
            SecurityProtocol::EncapsulatingSecurityPayload,
            Some(peer_spi.to_be_bytes().to_vec()),
        );
        response_proposal.add(vec![
            Transform::Encryption(EncryptionAlgorithm::AesCbc, Some(256)),
            Transform::SequenceNumber(ExtendedSequenceNumbers::No),
        ]);
        let any_ts = TrafficSelectors {
            selectors: vec![TrafficSelector::single_host(Ipv4Addr::new(10, 0, 0, 2), 0)],
        };
        let response = ue.seal_response(
            ExchangeType::CreateChildSa,
            round,
            vec![
                Payload::SecurityAssociation(SecurityAssociation {
                    proposals: vec![response_proposal],
                }),
                Payload::Nonce(vec![0x55; 32]),
                Payload::TrafficSelectorInitiator(any_ts.clone()),
                Payload::TrafficSelectorResponder(any_ts),
            ],
        );
        h.feed(response).await;

        let Some(NgapEvent::GetNgapContext { local_spi, .. }) = h.ngap_rx.try_recv().ok()
        else {
            panic!("expected a context request");
        };
        h.server
            .handle_event(IkeEvent::GetNgapContextResponse {
                local_spi,
                setup: PduSessionSetupData::default(),
            })
            .await;
    }

    // Exactly two requests were emitted
    h.no_output();
    let Some(NgapEvent::SendPduSessionResourceSetupRes {
        established,
        failed,
        ..
    }) = h.ngap_rx.try_recv().ok()
    else {
        panic!("expected the setup result");
    };
    assert_eq!(established, vec![1, 2]);
    assert!(failed.is_empty());

    // The second user-plane tunnel sits on the next interface id
    let base = test_config().xfrm.base_iface_id;
    let children = h.server.sas.children_of(ue.server_spi);
    let mut iface_ids: Vec<u32> = children
        .iter()
        .filter(|child| child.pdu_session_id.is_some())
        .map(|child| child.xfrm_iface_id)
        .collect();
    iface_ids.sort_unstable();
    assert_eq!(iface_ids, vec![base + 1, base + 2]);
    assert!(children
        .iter()
        .filter(|child| child.pdu_session_id == Some(2))
        .all(|child| child.integrity.is_some()));
}

#[tokio::test]
async fn dpd_reply_cancels_the_retransmission() {
    let mut cfg = test_config();
    cfg.dpd.idle_secs = 0;
    cfg.dpd.retransmit_secs = 3600;
    let mut h = harness_with(cfg, init_script());
    let mut ue = TestUe::new();
    establish(&mut h, &mut ue).await;
    let _ = h.sent();

    // The liveness task fires immediately with a zero idle period
    let probe = loop {
        tokio::task::yield_now().await;
        if let Ok(datagram) = h.out_rx.try_recv() {
            break datagram.data;
        }
    };
    let payloads = ue.open_payloads(&probe);
    assert!(payloads.is_empty());
    let probe_msg = Message::try_parse(&probe).unwrap();
    assert_eq!(probe_msg.exchange_type, ExchangeType::Informational);
    assert!(!probe_msg.response);
    assert_eq!(probe_msg.message_id, 0);

    // Answer the probe and observe the counter at zero
    let reply = ue.seal_response(ExchangeType::Informational, probe_msg.message_id, vec![]);
    h.feed(reply).await;

    let handle = h.server.sas.ike_sa(ue.server_spi).unwrap();
    let sa = handle.lock().await;
    assert_eq!(sa.dpd.as_ref().unwrap().retry_count(), 0);
    assert_eq!(sa.responder_message_id, 1);
}

#[tokio::test]
async fn ike_delete_releases_everything() {
    let mut h = harness(init_script());
    let mut ue = TestUe::new();
    establish(&mut h, &mut ue).await;
    let _ = h.sent();
    while h.ngap_rx.try_recv().is_ok() {}

    let delete = ue.seal_request(
        ExchangeType::Informational,
        vec![Payload::Delete(ikev2::definitions::Delete {
            protocol: SecurityProtocol::InternetKeyExchange,
            spis: vec![],
        })],
    );
    h.feed(delete).await;
    let payloads = ue.open_payloads(&h.sent());
    assert!(payloads.is_empty());

    let Some(NgapEvent::SendUeContextReleaseComplete { local_spi }) = h.ngap_rx.try_recv().ok()
    else {
        panic!("expected the context release");
    };
    assert_eq!(local_spi, ue.server_spi);
    assert!(h.server.sas.ike_sa(ue.server_spi).is_none());
    assert!(h.server.sas.children_of(ue.server_spi).is_empty());
    assert_eq!(h.xfrm.deleted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn esp_delete_ack_is_not_answered() {
    let mut h = harness(init_script());
    let mut ue = TestUe::new();
    establish(&mut h, &mut ue).await;
    let _ = h.sent();
    while h.ngap_rx.try_recv().is_ok() {}

    // The acknowledgement of a self-initiated delete lists the peer's own
    // deleted inbound SPIs; it completes our exchange and nothing more
    let ack = ue.seal_response(
        ExchangeType::Informational,
        0,
        vec![Payload::Delete(ikev2::definitions::Delete {
            protocol: SecurityProtocol::EncapsulatingSecurityPayload,
            spis: vec![0xbb000009],
        })],
    );
    h.feed(ack).await;

    h.no_output();
    assert!(h.ngap_rx.try_recv().is_err());
    assert_eq!(h.server.sas.children_of(ue.server_spi).len(), 1);
    assert!(h.xfrm.deleted.lock().unwrap().is_empty());

    let handle = h.server.sas.ike_sa(ue.server_spi).unwrap();
    let sa = handle.lock().await;
    assert_eq!(sa.responder_message_id, 1);
}

#[tokio::test]
async fn unknown_spi_gets_invalid_ike_spi() {
    let mut h = harness(vec![]);
    let msg = Message {
        initiator_spi: 0x1111,
        responder_spi: 0x2222,
        exchange_type: ExchangeType::Informational,
        initiator: true,
        response: false,
        message_id: 7,
        payloads: vec![],
    }
    .try_build()
    .unwrap();
    h.feed(msg).await;
    let response = Message::try_parse(&h.sent()).unwrap();
    assert!(response.response);
    assert_eq!(response.message_id, 7);
    let Payload::Notify(notify) = &response.payloads[0] else {
        panic!("expected a notify payload");
    };
    assert_eq!(
        notify.variant,
        NotificationType::Error(NotifyErrorMessage::InvalidIkeSpi)
    );
}

#[tokio::test]
async fn higher_major_version_is_rejected() {
    let mut h = harness(vec![]);
    let mut raw = Message {
        initiator_spi: 0x3333,
        responder_spi: 0,
        exchange_type: ExchangeType::IkeSaInit,
        initiator: true,
        response: false,
        message_id: 0,
        payloads: vec![],
    }
    .try_build()
    .unwrap();
    raw[17] = 0x30; // major version 3
    h.feed(raw).await;
    let response = Message::try_parse(&h.sent()).unwrap();
    assert_eq!(response.exchange_type, ExchangeType::Informational);
    let Payload::Notify(notify) = &response.payloads[0] else {
        panic!("expected a notify payload");
    };
    assert_eq!(
        notify.variant,
        NotificationType::Error(NotifyErrorMessage::InvalidMajorVersion)
    );
}
