//! Governance dispatch and token message intake for a guardian-attested bridge.
//!
//! [`Bridge`] ties the pieces together: incoming bytes are decoded and verified against the
//! guardian set registry, their sequence is admitted on the channel's window, and only then is
//! the governance action applied or the token message delivered.

#![deny(unused_results)]

pub mod bridge;
pub mod config;
pub mod dispatcher;
mod error;
pub mod upgrade;

pub use {
    bridge::{ActionExecutor, Bridge, BridgeState, Delivery},
    config::{Config, GovernanceOrdering},
    dispatcher::{Admission, GovernanceDispatcher, GovernanceGuard, GovernanceVaa},
    error::Error,
};
