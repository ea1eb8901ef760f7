//! ESP32 bindings for the agent traits and the boot sequence.

mod bootstrap;
pub mod clock;
pub mod heap;
pub mod net;
pub mod vision;
pub mod wifi;

pub use bootstrap::run;
