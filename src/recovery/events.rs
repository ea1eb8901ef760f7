use crate::error::Fault;

/// Outcomes reported by the controller after each I/O step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RecoveryEvent {
    /// Start an association attempt from LinkDown.
    BeginLink,
    LinkUp,
    LinkFailed,
    SessionOpened,
    Fault(Fault),
    BackoffElapsed,
}
