use crate::error::{Fault, RestartReason};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RecoveryPhase {
    LinkDown,
    Linking,
    SessionEstablishing,
    Streaming,
    Retrying,
    HardRestart(RestartReason),
    /// The run never linked; nothing further happens until the next boot.
    Halted,
}

impl RecoveryPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LinkDown => "LinkDown",
            Self::Linking => "Linking",
            Self::SessionEstablishing => "SessionEstablishing",
            Self::Streaming => "Streaming",
            Self::Retrying => "Retrying",
            Self::HardRestart(_) => "HardRestart",
            Self::Halted => "Halted",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::HardRestart(_) | Self::Halted)
    }
}

/// Consecutive failures since the last successful session open.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FailureCounter(u8);

impl FailureCounter {
    pub const fn count(self) -> u8 {
        self.0
    }

    pub fn record(&mut self) -> u8 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    pub const fn reached(self, threshold: u8) -> bool {
        self.0 >= threshold
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RecoverySnapshot {
    pub phase: RecoveryPhase,
    pub failures: FailureCounter,
    pub sessions_opened: u32,
    pub last_fault: Option<Fault>,
}

impl Default for RecoverySnapshot {
    fn default() -> Self {
        Self {
            phase: RecoveryPhase::LinkDown,
            failures: FailureCounter::default(),
            sessions_opened: 0,
            last_fault: None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ApplyStatus {
    Applied,
    Unchanged,
    InvalidTransition,
}
