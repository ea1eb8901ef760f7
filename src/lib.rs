//! Edge-inference camera agent.
//!
//! The crate is split into a host-testable core (link, resources, watchdog,
//! pipeline, transport, recovery) that talks to hardware only through small
//! traits, and the ESP32 bindings under [`firmware`] behind the `firmware`
//! feature.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod clock;
pub mod config;
pub mod error;
pub mod link;
pub mod pipeline;
pub mod recovery;
pub mod resources;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod watchdog;

#[cfg(feature = "firmware")]
pub mod firmware;

#[cfg(test)]
pub(crate) mod testing;

pub use config::AgentConfig;
pub use error::{AgentExit, Fault, FatalFault, RestartReason, TransientFault};
pub use recovery::{RecoveryController, RecoveryPhase};
