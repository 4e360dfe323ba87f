//! Wire protocol encoding/decoding

pub mod messages;

pub use messages::{
    decode_frame, encode_frame, IceCandidate, IceServer, InitFrame, SealedPayload,
    SessionDescription, SUBPROTOCOL,
};
