//! Run counters owned by the recovery controller.
//!
//! Kept as a plain value rather than process statics so a controller can be
//! driven in isolation.

use log::info;

use crate::error::{Fault, TransientFault};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Telemetry {
    pub frames_sent: u32,
    pub bytes_sent: u64,
    pub sessions_opened: u32,
    pub connect_failures: u32,
    pub send_failures: u32,
    pub pipeline_failures: u32,
    pub link_drops: u32,
    pub link_failures: u32,
    pub low_memory_pauses: u32,
    pub collections: u32,
}

impl Telemetry {
    pub fn record_frame_sent(&mut self, bytes: usize) {
        self.frames_sent = self.frames_sent.saturating_add(1);
        self.bytes_sent = self.bytes_sent.saturating_add(bytes as u64);
    }

    pub fn record_session_opened(&mut self) {
        self.sessions_opened = self.sessions_opened.saturating_add(1);
    }

    pub fn record_link_failure(&mut self) {
        self.link_failures = self.link_failures.saturating_add(1);
    }

    pub fn record_low_memory_pause(&mut self) {
        self.low_memory_pauses = self.low_memory_pauses.saturating_add(1);
    }

    pub fn record_collection(&mut self) {
        self.collections = self.collections.saturating_add(1);
    }

    pub fn record_fault(&mut self, fault: Fault) {
        let counter = match fault {
            Fault::Transient(TransientFault::Connect(_)) => &mut self.connect_failures,
            Fault::Transient(TransientFault::Send(_)) => &mut self.send_failures,
            Fault::Transient(TransientFault::Pipeline(_)) => &mut self.pipeline_failures,
            Fault::Transient(TransientFault::LinkDropped) => &mut self.link_drops,
            Fault::Transient(TransientFault::LinkUnavailable) => &mut self.link_failures,
            Fault::Fatal(_) => return,
        };
        *counter = counter.saturating_add(1);
    }

    pub fn log_summary(&self) {
        info!(
            "telemetry: frames={} bytes={} sessions={} connect_fail={} send_fail={} pipeline_fail={} link_drops={} link_fail={} low_mem={} collections={}",
            self.frames_sent,
            self.bytes_sent,
            self.sessions_opened,
            self.connect_failures,
            self.send_failures,
            self.pipeline_failures,
            self.link_drops,
            self.link_failures,
            self.low_memory_pauses,
            self.collections,
        );
    }
}
