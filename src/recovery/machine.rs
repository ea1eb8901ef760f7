use statig::prelude::*;

use super::events::RecoveryEvent;
use super::types::{ApplyStatus, RecoveryPhase, RecoverySnapshot};
use crate::error::{FatalFault, Fault, RestartReason, TransientFault};

#[derive(Clone, Copy, Debug)]
pub(super) struct RecoveryMachine {
    pub(super) snapshot: RecoverySnapshot,
    threshold: u8,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct DispatchContext {
    pub(super) status: ApplyStatus,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            status: ApplyStatus::Unchanged,
        }
    }
}

impl RecoveryMachine {
    pub(super) fn new(threshold: u8) -> Self {
        Self {
            snapshot: RecoverySnapshot::default(),
            threshold: threshold.max(1),
        }
    }

    fn enter(&mut self, context: &mut DispatchContext, phase: RecoveryPhase) {
        self.snapshot.phase = phase;
        context.status = ApplyStatus::Applied;
    }

    fn fault(&mut self, context: &mut DispatchContext, fault: Fault) -> Outcome<State> {
        self.snapshot.last_fault = Some(fault);
        match fault {
            Fault::Fatal(FatalFault::FrameStall { elapsed_ms }) => {
                self.restart(context, RestartReason::FrameStall { elapsed_ms })
            }
            Fault::Transient(kind) if !kind.counts_as_failure() => {
                self.enter(context, RecoveryPhase::LinkDown);
                Transition(State::link_down())
            }
            Fault::Transient(_) => {
                let failures = self.snapshot.failures.record();
                if self.snapshot.failures.reached(self.threshold) {
                    self.restart(context, RestartReason::FailureThreshold { failures })
                } else {
                    self.enter(context, RecoveryPhase::Retrying);
                    Transition(State::retrying())
                }
            }
        }
    }

    fn restart(&mut self, context: &mut DispatchContext, reason: RestartReason) -> Outcome<State> {
        self.enter(context, RecoveryPhase::HardRestart(reason));
        Transition(State::hard_restart())
    }

    fn invalid(context: &mut DispatchContext) -> Outcome<State> {
        context.status = ApplyStatus::InvalidTransition;
        Handled
    }
}

#[state_machine(initial = "State::link_down()")]
impl RecoveryMachine {
    #[state]
    fn link_down(&mut self, context: &mut DispatchContext, event: &RecoveryEvent) -> Outcome<State> {
        match event {
            RecoveryEvent::BeginLink => {
                self.enter(context, RecoveryPhase::Linking);
                Transition(State::linking())
            }
            _ => Self::invalid(context),
        }
    }

    #[state]
    fn linking(&mut self, context: &mut DispatchContext, event: &RecoveryEvent) -> Outcome<State> {
        match event {
            RecoveryEvent::LinkUp => {
                self.enter(context, RecoveryPhase::SessionEstablishing);
                Transition(State::session_establishing())
            }
            // A run that never linked stops here; the next boot tries again.
            RecoveryEvent::LinkFailed if self.snapshot.sessions_opened == 0 => {
                self.enter(context, RecoveryPhase::Halted);
                Transition(State::halted())
            }
            RecoveryEvent::LinkFailed => {
                self.fault(context, Fault::Transient(TransientFault::LinkUnavailable))
            }
            _ => Self::invalid(context),
        }
    }

    #[state]
    fn session_establishing(
        &mut self,
        context: &mut DispatchContext,
        event: &RecoveryEvent,
    ) -> Outcome<State> {
        match event {
            RecoveryEvent::SessionOpened => {
                self.snapshot.failures.reset();
                self.snapshot.sessions_opened = self.snapshot.sessions_opened.saturating_add(1);
                self.enter(context, RecoveryPhase::Streaming);
                Transition(State::streaming())
            }
            RecoveryEvent::Fault(fault) => self.fault(context, *fault),
            _ => Self::invalid(context),
        }
    }

    #[state]
    fn streaming(&mut self, context: &mut DispatchContext, event: &RecoveryEvent) -> Outcome<State> {
        match event {
            RecoveryEvent::Fault(fault) => self.fault(context, *fault),
            _ => Self::invalid(context),
        }
    }

    #[state]
    fn retrying(&mut self, context: &mut DispatchContext, event: &RecoveryEvent) -> Outcome<State> {
        match event {
            RecoveryEvent::BackoffElapsed => {
                self.enter(context, RecoveryPhase::Linking);
                Transition(State::linking())
            }
            _ => Self::invalid(context),
        }
    }

    #[state]
    fn hard_restart(
        &mut self,
        context: &mut DispatchContext,
        event: &RecoveryEvent,
    ) -> Outcome<State> {
        let _ = event;
        Self::invalid(context)
    }

    #[state]
    fn halted(&mut self, context: &mut DispatchContext, event: &RecoveryEvent) -> Outcome<State> {
        let _ = event;
        Self::invalid(context)
    }
}
