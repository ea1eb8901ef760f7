use log::{debug, error, info, warn};

use super::engine::{RecoveryEngine, RecoveryStep};
use super::events::RecoveryEvent;
use super::types::{ApplyStatus, RecoveryPhase, RecoverySnapshot};
use crate::{
    clock::Clock,
    config::{AgentConfig, MAX_LABELS},
    error::{AgentExit, FatalFault, Fault, PipelineError, RestartReason, TransientFault},
    link::{LinkManager, WifiRadio},
    pipeline::{top1, FrameRecord, VisionBackend},
    resources::{HeapProbe, Pressure, ResourceMonitor},
    telemetry::Telemetry,
    transport::{Transport, TransportSession},
    types::{LinkState, WifiCredentials},
    watchdog::{FrameWatchdog, StallCheck},
};

/// Result of one streaming iteration that did not fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameProgress {
    Sent { bytes: usize },
    MemoryBackoff,
}

/// Owns every device handle, timer and counter of one agent run.
pub struct RecoveryController<R, H, T, V, C> {
    config: AgentConfig,
    credentials: WifiCredentials,
    link: LinkManager<R>,
    resources: ResourceMonitor<H>,
    session: TransportSession<T>,
    vision: V,
    clock: C,
    watchdog: FrameWatchdog,
    engine: RecoveryEngine,
    telemetry: Telemetry,
}

impl<R, H, T, V, C> RecoveryController<R, H, T, V, C>
where
    R: WifiRadio,
    H: HeapProbe,
    T: Transport,
    V: VisionBackend,
    C: Clock,
{
    pub fn new(
        config: AgentConfig,
        credentials: WifiCredentials,
        radio: R,
        heap: H,
        transport: T,
        vision: V,
        clock: C,
    ) -> Self {
        let config = config.sanitized();
        let now_ms = clock.now_ms();
        Self {
            link: LinkManager::new(radio, config.link),
            resources: ResourceMonitor::new(
                heap,
                config.min_free_bytes,
                config.collect_interval_ms,
                now_ms,
            ),
            session: TransportSession::new(transport),
            watchdog: FrameWatchdog::new(now_ms, config.frame_timeout_ms),
            engine: RecoveryEngine::new(config.max_failures_before_restart),
            telemetry: Telemetry::default(),
            config,
            credentials,
            vision,
            clock,
        }
    }

    pub fn snapshot(&self) -> RecoverySnapshot {
        self.engine.snapshot()
    }

    pub fn telemetry(&self) -> Telemetry {
        self.telemetry
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    pub fn session_open(&self) -> bool {
        self.session.is_open()
    }

    /// Drives the agent until the run ends. Never returns while the device is
    /// making progress.
    pub async fn run(&mut self) -> AgentExit {
        info!(
            "recovery: start host={} port={} labels={} threshold={}",
            self.config.endpoint.host,
            self.config.endpoint.port,
            self.config.labels.len(),
            self.config.max_failures_before_restart
        );

        loop {
            match self.engine.phase() {
                RecoveryPhase::LinkDown => {
                    self.apply(RecoveryEvent::BeginLink);
                }
                RecoveryPhase::Linking => {
                    let linked = self
                        .link
                        .ensure_connected(&self.credentials, &mut self.clock)
                        .await;
                    if linked {
                        self.apply(RecoveryEvent::LinkUp);
                    } else {
                        self.telemetry.record_link_failure();
                        self.apply(RecoveryEvent::LinkFailed);
                    }
                }
                RecoveryPhase::SessionEstablishing => {
                    match self.session.open(&self.config.endpoint).await {
                        Ok(()) => {
                            self.telemetry.record_session_opened();
                            self.apply(RecoveryEvent::SessionOpened);
                        }
                        Err(err) => self.fail(err.into()),
                    }
                }
                RecoveryPhase::Streaming => match self.stream_once().await {
                    Ok(FrameProgress::Sent { bytes }) => {
                        debug!("recovery: frame sent bytes={}", bytes);
                    }
                    Ok(FrameProgress::MemoryBackoff) => {}
                    Err(fault) => self.fail(fault),
                },
                RecoveryPhase::Retrying => {
                    self.clock.sleep_ms(self.config.retry_backoff_ms).await;
                    self.collect();
                    self.apply(RecoveryEvent::BackoffElapsed);
                }
                RecoveryPhase::HardRestart(reason) => {
                    if let RestartReason::FailureThreshold { .. } = reason {
                        self.clock.sleep_ms(self.config.restart_pause_ms).await;
                    }
                    error!("recovery: hard restart reason={}", reason.as_str());
                    self.telemetry.log_summary();
                    return AgentExit::HardRestart(reason);
                }
                RecoveryPhase::Halted => {
                    error!(
                        "recovery: wifi unavailable ssid={}, stopping",
                        self.credentials.ssid.as_str()
                    );
                    return AgentExit::LinkUnavailable;
                }
            }
        }
    }

    /// One pass of the inner loop. Order: link, memory, watchdog, frame.
    pub async fn stream_once(&mut self) -> Result<FrameProgress, Fault> {
        if !self.link.is_connected() {
            return Err(Fault::Transient(TransientFault::LinkDropped));
        }

        if let Pressure::LowMemory(_) = self.resources.check_pressure() {
            self.telemetry.record_low_memory_pause();
            self.collect();
            self.clock.sleep_ms(self.config.low_memory_backoff_ms).await;
            return Ok(FrameProgress::MemoryBackoff);
        }

        if let StallCheck::Stalled { elapsed_ms } = self.watchdog.check(self.clock.now_ms()) {
            return Err(Fault::Fatal(FatalFault::FrameStall { elapsed_ms }));
        }

        let frame = self.vision.capture().await?;
        let captured_at_ms = self.clock.now_ms();
        self.vision.present(&frame, None);
        self.watchdog.feed(captured_at_ms);

        let labels = self.config.labels;
        let mut scores = [0.0f32; MAX_LABELS];
        let scores = &mut scores[..labels.len().min(MAX_LABELS)];
        {
            let roi = frame.crop_center(self.config.input_size);
            self.vision.infer(&roi, scores)?;
        }
        let classification = top1(scores, labels).ok_or(PipelineError::EmptyOutput)?;
        self.vision.present(&frame, Some(&classification));

        let payload = self.vision.compress(&frame, self.config.compress_quality)?;
        drop(frame);
        let record = FrameRecord::new(captured_at_ms, classification, payload);
        debug!(
            "frame: label={} confidence={} payload={}",
            classification.label,
            classification.confidence,
            record.payload().len()
        );

        let message = record.into_message();
        let bytes = message.len();
        self.session.send(&message).await?;
        drop(message);
        self.telemetry.record_frame_sent(bytes);

        let memory = self.resources.snapshot();
        info!(
            "mem: free={} allocated={} total={}",
            memory.free_bytes,
            memory.allocated_bytes,
            memory.total_bytes()
        );
        if self.resources.maybe_periodic_collect(self.clock.now_ms()) {
            self.telemetry.record_collection();
        }
        self.clock.sleep_ms(self.config.inter_frame_delay_ms).await;

        Ok(FrameProgress::Sent { bytes })
    }

    fn fail(&mut self, fault: Fault) {
        let streaming = matches!(self.engine.phase(), RecoveryPhase::Streaming);
        self.session.close();
        self.telemetry.record_fault(fault);
        match fault {
            Fault::Transient(kind) => warn!(
                "recovery: transient fault kind={} detail={}",
                kind.as_str(),
                kind.detail()
            ),
            Fault::Fatal(FatalFault::FrameStall { elapsed_ms }) => {
                error!("recovery: frame stall elapsed_ms={}", elapsed_ms)
            }
        }
        if streaming {
            self.telemetry.log_summary();
        }
        self.apply(RecoveryEvent::Fault(fault));
    }

    fn collect(&mut self) {
        self.vision.release_scratch();
        self.resources.collect(self.clock.now_ms());
        self.telemetry.record_collection();
    }

    fn apply(&mut self, event: RecoveryEvent) -> RecoveryStep {
        let step = self.engine.apply(event);
        if matches!(step.status, ApplyStatus::InvalidTransition) {
            warn!(
                "recovery: ignored event={:?} phase={}",
                event,
                step.before.phase.as_str()
            );
        } else if step.phase_changed() {
            info!(
                "recovery: phase {} -> {} failures={}",
                step.before.phase.as_str(),
                step.after.phase.as_str(),
                step.after.failures.count()
            );
        }
        step
    }
}
