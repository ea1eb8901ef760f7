use statig::blocking::IntoStateMachineExt as _;

use super::events::RecoveryEvent;
use super::machine::{DispatchContext, RecoveryMachine};
use super::types::{ApplyStatus, RecoveryPhase, RecoverySnapshot};

#[derive(Clone, Copy, Debug)]
pub struct RecoveryStep {
    pub before: RecoverySnapshot,
    pub after: RecoverySnapshot,
    pub status: ApplyStatus,
}

impl RecoveryStep {
    pub fn changed(self) -> bool {
        matches!(self.status, ApplyStatus::Applied)
    }

    pub fn phase_changed(self) -> bool {
        self.before.phase != self.after.phase
    }
}

/// Pure recovery policy. Holds no device handles; the controller feeds it
/// the outcome of every I/O step and acts on the resulting phase.
pub struct RecoveryEngine {
    machine: statig::blocking::StateMachine<RecoveryMachine>,
}

impl RecoveryEngine {
    pub fn new(max_failures_before_restart: u8) -> Self {
        Self {
            machine: RecoveryMachine::new(max_failures_before_restart).state_machine(),
        }
    }

    pub fn snapshot(&self) -> RecoverySnapshot {
        self.machine.inner().snapshot
    }

    pub fn phase(&self) -> RecoveryPhase {
        self.snapshot().phase
    }

    pub fn apply(&mut self, event: RecoveryEvent) -> RecoveryStep {
        let before = self.snapshot();
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);
        let after = self.snapshot();
        RecoveryStep {
            before,
            after,
            status: context.status,
        }
    }
}
