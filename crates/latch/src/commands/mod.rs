//! Command implementations

pub mod completions;
pub mod join;
pub mod new;
mod session;
pub mod version;
