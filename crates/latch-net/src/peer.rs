//! `webrtc`-crate-backed implementation of
//! [`latch_protocol::peer::PeerConnection`]
//!
//! This is the only module in the workspace that touches ICE/DTLS/SCTP
//! directly. Everything above it — the handshake driver, the wire types —
//! talks only to the trait.

use std::sync::{Arc, Mutex};

use latch_protocol::error::{ProtocolError, Result};
use latch_protocol::peer::{ConnectionKind, ConnectionState, PeerConnection};
use latch_protocol::wire::{IceCandidate, IceServer, SessionDescription};

use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_candidate_type::RTCIceCandidateType;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::stats::{StatsReportType, StatsReport};

fn build_configuration(servers: &[IceServer]) -> RTCConfiguration {
    crate::ice::build_configuration(servers)
}

fn to_net_err(e: webrtc::Error) -> ProtocolError {
    ProtocolError::Transport(e.to_string())
}

fn candidate_from_rtc(candidate: &RTCIceCandidate) -> Option<IceCandidate> {
    let init = candidate.to_json().ok()?;
    Some(IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index.map(|v| v as u32),
    })
}

fn to_connection_state(state: RTCPeerConnectionState) -> ConnectionState {
    match state {
        RTCPeerConnectionState::New | RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed | RTCPeerConnectionState::Unspecified => ConnectionState::Closed,
    }
}

/// Inspect the stats report for the nominated candidate pair and classify
/// it as host, reflexive, or TURN-relayed (spec.md §8 Scenario 1's
/// host/srflx-or-prflx/relay split), based on the candidate types on
/// either side of the pair.
fn classify_stats(report: &StatsReport) -> Option<ConnectionKind> {
    let pair = report.reports.values().find_map(|entry| match entry {
        StatsReportType::CandidatePair(pair) if pair.nominated => Some(pair),
        _ => None,
    })?;

    let local_type = match report.reports.get(&pair.local_candidate_id) {
        Some(StatsReportType::LocalCandidate(c)) => Some(c.candidate_type),
        _ => None,
    };
    let remote_type = match report.reports.get(&pair.remote_candidate_id) {
        Some(StatsReportType::RemoteCandidate(c)) => Some(c.candidate_type),
        _ => None,
    };

    let is_relay = |t: Option<RTCIceCandidateType>| t == Some(RTCIceCandidateType::Relay);
    let is_host = |t: Option<RTCIceCandidateType>| t == Some(RTCIceCandidateType::Host);

    Some(if is_relay(local_type) || is_relay(remote_type) {
        ConnectionKind::Relayed
    } else if is_host(local_type) && is_host(remote_type) {
        ConnectionKind::Host
    } else {
        ConnectionKind::Reflexive
    })
}

/// A peer connection backed by `webrtc::peer_connection::RTCPeerConnection`.
pub struct WebRtcPeerConnection {
    pc: Arc<RTCPeerConnection>,
    connection_kind: Arc<Mutex<Option<ConnectionKind>>>,
}

impl WebRtcPeerConnection {
    /// Build a new peer connection configured with the given ICE servers.
    pub async fn new(ice_servers: &[IceServer]) -> Result<Self> {
        let api = APIBuilder::new().build();
        let config = build_configuration(ice_servers);
        let pc = api.new_peer_connection(config).await.map_err(to_net_err)?;
        Ok(Self {
            pc: Arc::new(pc),
            connection_kind: Arc::new(Mutex::new(None)),
        })
    }
}

impl PeerConnection for WebRtcPeerConnection {
    async fn create_offer(&mut self) -> Result<SessionDescription> {
        let offer = self.pc.create_offer(None).await.map_err(to_net_err)?;
        self.pc
            .set_local_description(offer.clone())
            .await
            .map_err(to_net_err)?;
        Ok(SessionDescription {
            sdp_type: "offer".into(),
            sdp: offer.sdp,
        })
    }

    async fn create_answer(&mut self, remote: SessionDescription) -> Result<SessionDescription> {
        let offer = RTCSessionDescription::offer(remote.sdp).map_err(to_net_err)?;
        self.pc.set_remote_description(offer).await.map_err(to_net_err)?;

        let answer = self.pc.create_answer(None).await.map_err(to_net_err)?;
        self.pc
            .set_local_description(answer.clone())
            .await
            .map_err(to_net_err)?;
        Ok(SessionDescription {
            sdp_type: "answer".into(),
            sdp: answer.sdp,
        })
    }

    async fn set_remote_description(&mut self, remote: SessionDescription) -> Result<()> {
        let answer = RTCSessionDescription::answer(remote.sdp).map_err(to_net_err)?;
        self.pc.set_remote_description(answer).await.map_err(to_net_err)?;
        Ok(())
    }

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index.map(|v| v as u16),
            username_fragment: None,
        };
        self.pc.add_ice_candidate(init).await.map_err(to_net_err)?;
        Ok(())
    }

    fn on_ice_candidate(&mut self, mut callback: Box<dyn FnMut(Option<IceCandidate>) + Send>) {
        self.pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let mapped = candidate.as_ref().and_then(candidate_from_rtc);
            callback(mapped);
            Box::pin(async {})
        }));
    }

    fn on_connection_state_change(&mut self, mut callback: Box<dyn FnMut(ConnectionState) + Send>) {
        let pc = Arc::clone(&self.pc);
        let connection_kind = Arc::clone(&self.connection_kind);
        self.pc
            .on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
                callback(to_connection_state(state));
                let pc = Arc::clone(&pc);
                let connection_kind = Arc::clone(&connection_kind);
                Box::pin(async move {
                    if state == RTCPeerConnectionState::Connected {
                        if let Ok(report) = pc.get_stats().await {
                            if let Some(kind) = classify_stats(&report) {
                                *connection_kind.lock().unwrap() = Some(kind);
                            }
                        }
                    }
                })
            }));
    }

    fn connection_kind(&self) -> Option<ConnectionKind> {
        *self.connection_kind.lock().unwrap()
    }

    async fn close(&mut self) {
        if let Err(e) = self.pc.close().await {
            tracing::warn!(error = %e, "error closing peer connection");
        }
    }
}
