//! Selective-repeat sliding-window ARQ for a point-to-point link.
//!
//! [`layer::Session`] holds the protocol state and reacts to events without
//! doing any I/O itself; [`station`] drives it against real collaborators.

pub mod layer;
pub mod protocol;
pub mod station;
pub mod utils;
