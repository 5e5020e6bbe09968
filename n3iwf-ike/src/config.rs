//! Static configuration of the responder
//!
//! The embedding process is responsible for locating and deserializing the
//! configuration; everything here is plain data.

use std::net::{Ipv4Addr, SocketAddr};

use ikev2::definitions::params::KeyExchangeMethod;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// Configuration of the IKE responder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Public address and port the UDP socket binds to, normally port 500
    pub listen_addr: SocketAddr,
    /// Hostname sent as the responder's ID_FQDN identity
    pub fqdn: String,
    /// Subnet inner UE addresses are allocated from
    pub ue_subnet: Ipv4Net,
    /// Inner gateway address of the N3IWF, also announced as the NAS IPv4
    /// address
    pub ipsec_gateway: Ipv4Addr,
    /// TCP port of the NAS signalling endpoint announced to the UE
    pub nas_tcp_port: u16,
    /// Diffie-Hellman groups the responder accepts, in no particular order
    #[serde(default = "default_dh_groups")]
    pub dh_groups: Vec<KeyExchangeMethod>,
    /// Kernel IPsec interface settings
    pub xfrm: XfrmConfig,
    /// Dead peer detection timings
    #[serde(default)]
    pub dpd: DpdConfig,
}

/// Naming and numbering of the virtual IPsec interfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XfrmConfig {
    /// Prefix for interface names; the interface id is appended
    pub iface_name: String,
    /// Physical interface the virtual interfaces attach to
    pub parent_iface: String,
    /// Interface id of the signalling interface; user-plane interfaces
    /// count upwards from here
    pub base_iface_id: u32,
}

/// Dead peer detection timings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DpdConfig {
    /// Idle seconds before a liveness probe is sent
    pub idle_secs: u64,
    /// Seconds to wait for a reply before retransmitting
    pub retransmit_secs: u64,
    /// Number of unanswered retransmissions after which the peer counts as
    /// dead
    pub max_retries: u32,
}

impl Default for DpdConfig {
    fn default() -> Self {
        Self {
            idle_secs: 60,
            retransmit_secs: 10,
            max_retries: 3,
        }
    }
}

fn default_dh_groups() -> Vec<KeyExchangeMethod> {
    vec![KeyExchangeMethod::ModP2048, KeyExchangeMethod::ModP1024]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn test_config() -> Config {
    use std::net::IpAddr;

    Config {
        listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 500),
        fqdn: "n3iwf.free5gc.org".to_string(),
        ue_subnet: "10.0.0.0/24".parse().unwrap(),
        ipsec_gateway: Ipv4Addr::new(10, 0, 0, 1),
        nas_tcp_port: 20000,
        dh_groups: default_dh_groups(),
        xfrm: XfrmConfig {
            iface_name: "ipsec".to_string(),
            parent_iface: "eth0".to_string(),
            base_iface_id: 7,
        },
        dpd: DpdConfig::default(),
    }
}
