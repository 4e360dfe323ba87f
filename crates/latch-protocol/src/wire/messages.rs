//! Rendezvous wire message types
//!
//! Three frame shapes travel over the rendezvous WebSocket, always as text
//! frames:
//!
//! 1. the init frame, JSON, sent once by the server to each socket on connect;
//! 2. the PAKE frame, raw bytes, base64url-encoded, unauthenticated;
//! 3. the sealed frame, base64url of `nonce || ciphertext`, authenticated
//!    once a session key exists — its plaintext decodes to a [`SealedPayload`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Subprotocol tag both peers and the relay must agree on.
pub const SUBPROTOCOL: &str = "4";

/// An ICE server entry, passed through opaquely from the relay's
/// configuration to the peer's `RTCConfiguration`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServer {
    /// One or more STUN/TURN URLs for this server entry.
    pub urls: Vec<String>,
    /// TURN username, absent for STUN-only entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// TURN credential, absent for STUN-only entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// The frame the server sends each socket immediately after it joins a slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InitFrame {
    /// The slot this socket has joined, as assigned by the server.
    pub slot: String,
    /// ICE servers the peer should configure its connection with.
    #[serde(rename = "iceServers")]
    pub ice_servers: Vec<IceServer>,
}

impl InitFrame {
    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an init frame from the text received on the wire.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A WebRTC session description, as exchanged in an offer or answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDescription {
    /// "offer" or "answer".
    #[serde(rename = "type")]
    pub sdp_type: String,
    /// The SDP body.
    pub sdp: String,
}

/// A single trickled ICE candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceCandidate {
    /// Candidate line, in SDP attribute form. Empty once local gathering
    /// completes: the sentinel that terminates the candidate trickle
    /// (spec.md §3/§6), rather than a distinct message shape.
    pub candidate: String,
    /// Media stream identification tag, when present.
    #[serde(rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    /// Media line index, when present.
    #[serde(rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u32>,
}

impl IceCandidate {
    /// The sentinel sent once local candidate gathering completes: an
    /// otherwise-normal candidate object with an empty `candidate` field.
    pub fn end_of_candidates() -> Self {
        Self {
            candidate: String::new(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }

    /// Whether this candidate is the end-of-gathering sentinel.
    pub fn is_end_of_candidates(&self) -> bool {
        self.candidate.is_empty()
    }
}

/// The plaintext carried inside every sealed frame once a session key
/// exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SealedPayload {
    /// The initiator's session description.
    Offer(SessionDescription),
    /// The joiner's session description.
    Answer(SessionDescription),
    /// A trickled ICE candidate, or the end-of-candidates sentinel
    /// (empty `candidate` field — see [`IceCandidate::end_of_candidates`]).
    Candidate(IceCandidate),
    /// Sent immediately before closing with `CloseBadKey`: a farewell
    /// sealed under this side's session key so the peer has something to
    /// (attempt to) authenticate before the socket drops, even though a
    /// mismatched passphrase means it likely won't decrypt.
    Bye,
}

impl SealedPayload {
    /// Encode the payload's inner JSON for sealing.
    pub fn to_plaintext(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a payload from a sealed frame's opened plaintext.
    pub fn from_plaintext(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Base64url-encode a raw PAKE message or sealed frame for the wire.
pub fn encode_frame(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a base64url frame received on the wire.
pub fn decode_frame(text: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text.trim())
        .map_err(|e| ProtocolError::ProtocolViolation(format!("invalid base64url frame: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_frame_roundtrip() {
        let frame = InitFrame {
            slot: "42".into(),
            ice_servers: vec![IceServer {
                urls: vec!["stun:stun.example.com:3478".into()],
                username: None,
                credential: None,
            }],
        };
        let json = frame.to_json().unwrap();
        assert_eq!(InitFrame::from_json(&json).unwrap(), frame);
    }

    #[test]
    fn sealed_payload_roundtrip() {
        let payload = SealedPayload::Offer(SessionDescription {
            sdp_type: "offer".into(),
            sdp: "v=0...".into(),
        });
        let bytes = payload.to_plaintext().unwrap();
        assert_eq!(SealedPayload::from_plaintext(&bytes).unwrap(), payload);
    }

    #[test]
    fn end_of_candidates_sentinel_has_empty_candidate_field() {
        let payload = SealedPayload::Candidate(IceCandidate::end_of_candidates());
        let bytes = payload.to_plaintext().unwrap();
        let decoded = SealedPayload::from_plaintext(&bytes).unwrap();
        assert_eq!(decoded, payload);
        match decoded {
            SealedPayload::Candidate(c) => assert!(c.is_end_of_candidates()),
            other => panic!("expected a candidate sentinel, got {other:?}"),
        }
    }

    #[test]
    fn bye_roundtrip() {
        let payload = SealedPayload::Bye;
        let bytes = payload.to_plaintext().unwrap();
        assert_eq!(SealedPayload::from_plaintext(&bytes).unwrap(), payload);
    }

    #[test]
    fn frame_encoding_roundtrip() {
        let raw = b"some pake public message bytes";
        let encoded = encode_frame(raw);
        assert_eq!(decode_frame(&encoded).unwrap(), raw);
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode_frame("not valid base64!!").is_err());
    }
}
