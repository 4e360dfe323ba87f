//! Password-Authenticated Key Exchange (PAKE) protocols

pub mod cpace;

pub use cpace::{Initiator, JoinerState};
