//! ICE server configuration
//!
//! The relay hands each socket a list of STUN/TURN servers in the init
//! frame; this module turns that opaque list into the `webrtc` crate's
//! `RTCConfiguration`.

use latch_protocol::wire::IceServer;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;

/// Build an `RTCConfiguration` from the init frame's ICE server list.
pub fn build_configuration(servers: &[IceServer]) -> RTCConfiguration {
    let ice_servers = servers
        .iter()
        .map(|s| RTCIceServer {
            urls: s.urls.clone(),
            username: s.username.clone().unwrap_or_default(),
            credential: s.credential.clone().unwrap_or_default(),
            ..Default::default()
        })
        .collect();

    RTCConfiguration {
        ice_servers,
        ..Default::default()
    }
}
