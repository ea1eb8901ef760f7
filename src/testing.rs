//! Scripted devices for host tests.
//!
//! Every fake shares one [`World`] so a test can script faults up front and
//! inspect the full event trace afterwards. Time only moves when the code
//! under test sleeps, or when a fake is told to take time.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::{
    clock::Clock,
    error::{ConnectError, PipelineError, RadioError, SendError},
    link::WifiRadio,
    pipeline::{Classification, Frame, VisionBackend},
    resources::HeapProbe,
    transport::Transport,
    types::{Endpoint, ResourceSnapshot, WifiCredentials},
};

pub(crate) type Shared = Rc<RefCell<World>>;

// A test that sleeps this long is looping.
const RUNAWAY_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Event {
    Associate,
    Connect,
    Shutdown,
    Capture,
    Present { classified: bool },
    Compress,
    Send(usize),
    Reclaim,
    ReleaseScratch,
    Sleep(u32),
}

pub(crate) struct World {
    pub now_ms: u64,
    pub events: Vec<Event>,

    pub link_up: bool,
    pub associate_results: VecDeque<Result<(), RadioError>>,
    pub association_delay_ms: u64,
    /// Per-attempt delays, consumed before `association_delay_ms` applies.
    pub association_delays: VecDeque<u64>,
    pending_link_up_at: Option<u64>,
    /// Link goes down right after this many successful sends in total.
    pub drop_link_after_sends: Option<usize>,

    pub free_bytes: usize,
    pub allocated_bytes: usize,
    pub reclaim_gain: usize,

    pub connect_results: VecDeque<Result<(), ConnectError>>,
    pub connect_default: Result<(), ConnectError>,
    pub send_results: VecDeque<Result<(), SendError>>,
    /// Sends beyond this many successful ones fail with a reset.
    pub max_sends: Option<usize>,
    pub send_ms: u64,
    pub sent: Vec<Vec<u8>>,

    pub capture_results: VecDeque<Result<(), PipelineError>>,
    pub capture_ms: u64,
    pub scores: Vec<f32>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            now_ms: 0,
            events: Vec::new(),
            link_up: false,
            associate_results: VecDeque::new(),
            association_delay_ms: 0,
            association_delays: VecDeque::new(),
            pending_link_up_at: None,
            drop_link_after_sends: None,
            free_bytes: 200 * 1024,
            allocated_bytes: 64 * 1024,
            reclaim_gain: 0,
            connect_results: VecDeque::new(),
            connect_default: Ok(()),
            send_results: VecDeque::new(),
            max_sends: None,
            send_ms: 0,
            sent: Vec::new(),
            capture_results: VecDeque::new(),
            capture_ms: 0,
            scores: vec![0.05, 0.8675, 0.03, 0.02, 0.03],
        }
    }
}

impl World {
    pub fn shared() -> Shared {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn count(&self, event: Event) -> usize {
        self.events.iter().filter(|seen| **seen == event).count()
    }

    pub fn sleeps(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Sleep(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, event: Event) -> Option<usize> {
        self.events.iter().position(|seen| *seen == event)
    }

    fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
        assert!(self.now_ms < RUNAWAY_MS, "virtual clock ran away");
    }
}

pub(crate) struct FakeClock(Shared);

impl FakeClock {
    pub fn new(world: &Shared) -> Self {
        Self(world.clone())
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.0.borrow().now_ms
    }

    async fn sleep_ms(&mut self, ms: u32) {
        let mut world = self.0.borrow_mut();
        world.events.push(Event::Sleep(ms));
        world.advance(ms as u64);
    }
}

pub(crate) struct FakeRadio(Shared);

impl FakeRadio {
    pub fn new(world: &Shared) -> Self {
        Self(world.clone())
    }
}

impl WifiRadio for FakeRadio {
    async fn associate(&mut self, _credentials: &WifiCredentials) -> Result<(), RadioError> {
        let mut world = self.0.borrow_mut();
        world.events.push(Event::Associate);
        world.associate_results.pop_front().unwrap_or(Ok(()))?;
        let fallback = world.association_delay_ms;
        let delay_ms = world.association_delays.pop_front().unwrap_or(fallback);
        if delay_ms == 0 {
            world.link_up = true;
            world.pending_link_up_at = None;
        } else {
            let at = world.now_ms + delay_ms;
            world.pending_link_up_at = Some(at);
        }
        Ok(())
    }

    fn is_associated(&mut self) -> bool {
        let mut world = self.0.borrow_mut();
        if let Some(at) = world.pending_link_up_at {
            if world.now_ms >= at {
                world.link_up = true;
                world.pending_link_up_at = None;
            }
        }
        world.link_up
    }
}

pub(crate) struct FakeHeap(Shared);

impl FakeHeap {
    pub fn new(world: &Shared) -> Self {
        Self(world.clone())
    }
}

impl HeapProbe for FakeHeap {
    fn sample(&self) -> ResourceSnapshot {
        let world = self.0.borrow();
        ResourceSnapshot {
            free_bytes: world.free_bytes,
            allocated_bytes: world.allocated_bytes,
        }
    }

    fn reclaim(&mut self) {
        let mut world = self.0.borrow_mut();
        world.events.push(Event::Reclaim);
        let gain = world.reclaim_gain;
        world.free_bytes += gain;
    }
}

pub(crate) struct FakeTransport(Shared);

impl FakeTransport {
    pub fn new(world: &Shared) -> Self {
        Self(world.clone())
    }
}

impl Transport for FakeTransport {
    async fn connect(&mut self, _endpoint: &Endpoint) -> Result<(), ConnectError> {
        let mut world = self.0.borrow_mut();
        world.events.push(Event::Connect);
        let default = world.connect_default;
        world.connect_results.pop_front().unwrap_or(default)
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        let mut world = self.0.borrow_mut();
        world.events.push(Event::Send(bytes.len()));
        let send_ms = world.send_ms;
        world.advance(send_ms);
        let delivered = world.sent.len();
        if world.max_sends.is_some_and(|max| delivered >= max) {
            return Err(SendError::ConnectionReset);
        }
        world.send_results.pop_front().unwrap_or(Ok(()))?;
        world.sent.push(bytes.to_vec());
        if world.drop_link_after_sends == Some(delivered + 1) {
            world.link_up = false;
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.0.borrow_mut().events.push(Event::Shutdown);
    }
}

pub(crate) struct FakeVision(Shared);

impl FakeVision {
    pub const FRAME_WIDTH: u16 = 16;
    pub const FRAME_HEIGHT: u16 = 12;

    pub fn new(world: &Shared) -> Self {
        Self(world.clone())
    }
}

impl VisionBackend for FakeVision {
    async fn capture(&mut self) -> Result<Frame, PipelineError> {
        let mut world = self.0.borrow_mut();
        world.events.push(Event::Capture);
        let capture_ms = world.capture_ms;
        world.advance(capture_ms);
        world.capture_results.pop_front().unwrap_or(Ok(()))?;
        Ok(Frame::filled(Self::FRAME_WIDTH, Self::FRAME_HEIGHT, 0x07E0))
    }

    fn infer(&mut self, _roi: &Frame, scores: &mut [f32]) -> Result<(), PipelineError> {
        let world = self.0.borrow();
        for (slot, score) in scores.iter_mut().zip(world.scores.iter()) {
            *slot = *score;
        }
        Ok(())
    }

    fn present(&mut self, _frame: &Frame, overlay: Option<&Classification>) {
        self.0.borrow_mut().events.push(Event::Present {
            classified: overlay.is_some(),
        });
    }

    fn compress(&mut self, _frame: &Frame, quality: u8) -> Result<Vec<u8>, PipelineError> {
        self.0.borrow_mut().events.push(Event::Compress);
        Ok(vec![0xFF, 0xD8, quality, 0xFF, 0xD9])
    }

    fn release_scratch(&mut self) {
        self.0.borrow_mut().events.push(Event::ReleaseScratch);
    }
}
