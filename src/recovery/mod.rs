//! Recovery controller.
//!
//! Policy lives in a `statig` machine ([`RecoveryEngine`]); the async
//! [`RecoveryController`] performs the I/O for the current phase and feeds the
//! outcome back as a [`RecoveryEvent`].

pub mod controller;
pub mod engine;
pub mod events;
mod machine;
#[cfg(test)]
mod tests;
pub mod types;

pub use controller::{FrameProgress, RecoveryController};
pub use engine::{RecoveryEngine, RecoveryStep};
pub use events::RecoveryEvent;
pub use types::{ApplyStatus, FailureCounter, RecoveryPhase, RecoverySnapshot};
