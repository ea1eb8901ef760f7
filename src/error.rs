//! Fault taxonomy of the agent.
//!
//! Leaf errors come from the device traits. The controller folds them into a
//! [`Fault`], which is either transient (handled by reconnect, backoff and
//! collection) or fatal (handled by a hard device restart).

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioError {
    InvalidCredentials,
    Config,
    Start,
    Connect,
    Timeout,
}

impl RadioError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::Config => "config",
            Self::Start => "start",
            Self::Connect => "connect",
            Self::Timeout => "timeout",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectError {
    InvalidEndpoint,
    Refused,
    TimedOut,
    Unreachable,
}

impl ConnectError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidEndpoint => "invalid_endpoint",
            Self::Refused => "refused",
            Self::TimedOut => "timed_out",
            Self::Unreachable => "unreachable",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendError {
    NotOpen,
    ConnectionReset,
    TimedOut,
}

impl SendError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotOpen => "not_open",
            Self::ConnectionReset => "connection_reset",
            Self::TimedOut => "timed_out",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineError {
    Capture,
    Inference,
    EmptyOutput,
    Encode,
    OutOfMemory,
}

impl PipelineError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Inference => "inference",
            Self::EmptyOutput => "empty_output",
            Self::Encode => "encode",
            Self::OutOfMemory => "out_of_memory",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransientFault {
    /// WiFi association lost while streaming.
    LinkDropped,
    /// Re-association failed after the run had already streamed.
    LinkUnavailable,
    Connect(ConnectError),
    Send(SendError),
    Pipeline(PipelineError),
}

impl TransientFault {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LinkDropped => "link_dropped",
            Self::LinkUnavailable => "link_unavailable",
            Self::Connect(_) => "connect",
            Self::Send(_) => "send",
            Self::Pipeline(_) => "pipeline",
        }
    }

    pub const fn detail(self) -> &'static str {
        match self {
            Self::LinkDropped | Self::LinkUnavailable => "none",
            Self::Connect(err) => err.as_str(),
            Self::Send(err) => err.as_str(),
            Self::Pipeline(err) => err.as_str(),
        }
    }

    /// Whether the fault advances the consecutive-failure counter.
    pub const fn counts_as_failure(self) -> bool {
        !matches!(self, Self::LinkDropped)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatalFault {
    FrameStall { elapsed_ms: u64 },
}

impl FatalFault {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FrameStall { .. } => "frame_stall",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    Transient(TransientFault),
    Fatal(FatalFault),
}

impl Fault {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transient(kind) => kind.as_str(),
            Self::Fatal(kind) => kind.as_str(),
        }
    }
}

impl From<ConnectError> for Fault {
    fn from(err: ConnectError) -> Self {
        Self::Transient(TransientFault::Connect(err))
    }
}

impl From<SendError> for Fault {
    fn from(err: SendError) -> Self {
        Self::Transient(TransientFault::Send(err))
    }
}

impl From<PipelineError> for Fault {
    fn from(err: PipelineError) -> Self {
        Self::Transient(TransientFault::Pipeline(err))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartReason {
    FrameStall { elapsed_ms: u64 },
    FailureThreshold { failures: u8 },
}

impl RestartReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FrameStall { .. } => "frame_stall",
            Self::FailureThreshold { .. } => "failure_threshold",
        }
    }
}

/// How a run of the controller ended.
///
/// `HardRestart` is a request to reset the device; the caller owns the reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentExit {
    LinkUnavailable,
    HardRestart(RestartReason),
}
