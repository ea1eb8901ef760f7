use embassy_futures::block_on;

use super::*;
use crate::{
    config::AgentConfig,
    error::{AgentExit, ConnectError, Fault, PipelineError, RadioError, RestartReason, TransientFault},
    testing::{Event, FakeClock, FakeHeap, FakeRadio, FakeTransport, FakeVision, Shared, World},
    types::{LinkState, WifiCredentials},
};

type TestController = RecoveryController<FakeRadio, FakeHeap, FakeTransport, FakeVision, FakeClock>;

const THRESHOLD_RESTART: AgentExit =
    AgentExit::HardRestart(RestartReason::FailureThreshold { failures: 3 });

fn controller(world: &Shared) -> TestController {
    RecoveryController::new(
        AgentConfig::defaults(),
        WifiCredentials::from_parts("orchard", "hunter22").unwrap(),
        FakeRadio::new(world),
        FakeHeap::new(world),
        FakeTransport::new(world),
        FakeVision::new(world),
        FakeClock::new(world),
    )
}

/// First `sessions` connects succeed, every later one is refused, and the
/// server stops accepting after `frames` records. Ends every run in a
/// threshold restart.
fn script_until_restart(world: &Shared, sessions: usize, frames: usize) {
    let mut world = world.borrow_mut();
    world.connect_results.extend((0..sessions).map(|_| Ok(())));
    world.connect_default = Err(ConnectError::Refused);
    world.max_sends = Some(frames);
}

#[test]
fn startup_link_failure_ends_run() {
    let world = World::shared();
    world
        .borrow_mut()
        .associate_results
        .push_back(Err(RadioError::Timeout));
    let mut agent = controller(&world);

    assert_eq!(block_on(agent.run()), AgentExit::LinkUnavailable);
    assert_eq!(agent.snapshot().phase, RecoveryPhase::Halted);
    assert_eq!(agent.telemetry().link_failures, 1);
    assert_eq!(world.borrow().count(Event::Connect), 0);
}

#[test]
fn startup_association_timeout_ends_run() {
    let world = World::shared();
    world.borrow_mut().association_delay_ms = 60_000;
    let mut agent = controller(&world);

    assert_eq!(block_on(agent.run()), AgentExit::LinkUnavailable);
    assert_eq!(agent.link_state(), LinkState::Disconnected);
    assert_eq!(world.borrow().sleeps(), vec![100; 100]);
}

#[test]
fn third_connect_failure_restarts() {
    let world = World::shared();
    world.borrow_mut().connect_default = Err(ConnectError::Refused);
    let mut agent = controller(&world);

    assert_eq!(block_on(agent.run()), THRESHOLD_RESTART);

    let world = world.borrow();
    assert_eq!(world.count(Event::Connect), 3);
    assert_eq!(world.sleeps(), vec![5_000, 5_000, 2_000]);
    assert_eq!(world.count(Event::Reclaim), 2);
    assert_eq!(world.count(Event::ReleaseScratch), 2);
    assert_eq!(world.count(Event::Capture), 0);
    assert_eq!(agent.telemetry().connect_failures, 3);
}

#[test]
fn successful_session_resets_failure_count() {
    let world = World::shared();
    {
        let mut world = world.borrow_mut();
        world.connect_results.push_back(Err(ConnectError::TimedOut));
        world.connect_results.push_back(Err(ConnectError::TimedOut));
    }
    script_until_restart(&world, 1, 2);
    let mut agent = controller(&world);

    assert_eq!(block_on(agent.run()), THRESHOLD_RESTART);

    // Two failures before the session, then three after it.
    let telemetry = agent.telemetry();
    assert_eq!(telemetry.connect_failures, 4);
    assert_eq!(telemetry.send_failures, 1);
    assert_eq!(telemetry.frames_sent, 2);
    assert_eq!(telemetry.sessions_opened, 1);
}

#[test]
fn every_send_carries_one_capture_and_one_compress() {
    let world = World::shared();
    script_until_restart(&world, 1, 3);
    let mut agent = controller(&world);

    block_on(agent.run());

    let world = world.borrow();
    assert_eq!(world.count(Event::Capture), 4);
    assert_eq!(world.count(Event::Compress), 4);
    assert_eq!(world.sent.len(), 3);
    assert!(!agent.session_open());
}

#[test]
fn record_on_the_wire() {
    let world = World::shared();
    script_until_restart(&world, 1, 1);
    let mut agent = controller(&world);

    block_on(agent.run());

    let world = world.borrow();
    assert_eq!(
        world.sent[0],
        b"FFD823FFD9;result=[{\"label\": \"banana\", \"confidence\": 0.87}]\n".to_vec()
    );
    let first_send = world
        .events
        .iter()
        .position(|event| matches!(event, Event::Send(_)))
        .unwrap();
    let presents: Vec<_> = world.events[..first_send]
        .iter()
        .filter(|event| matches!(event, Event::Present { .. }))
        .copied()
        .collect();
    assert_eq!(
        presents,
        vec![
            Event::Present { classified: false },
            Event::Present { classified: true }
        ]
    );
}

#[test]
fn frame_stall_restarts_without_pause() {
    let world = World::shared();
    world.borrow_mut().send_ms = 31_000;
    let mut agent = controller(&world);

    assert_eq!(
        block_on(agent.run()),
        AgentExit::HardRestart(RestartReason::FrameStall { elapsed_ms: 31_500 })
    );

    let world = world.borrow();
    assert_eq!(world.sleeps(), vec![500]);
    assert_eq!(world.count(Event::Capture), 1);
    assert_eq!(agent.snapshot().failures.count(), 0);
}

#[test]
fn failing_camera_with_healthy_server_hits_frame_stall() {
    let world = World::shared();
    world
        .borrow_mut()
        .capture_results
        .extend((0..100).map(|_| Err(PipelineError::Capture)));
    let mut agent = controller(&world);

    // Every retry reconnects fine and resets the failure count, so only the
    // frame clock can end the run.
    assert_eq!(
        block_on(agent.run()),
        AgentExit::HardRestart(RestartReason::FrameStall { elapsed_ms: 35_000 })
    );

    let world = world.borrow();
    assert_eq!(world.count(Event::Capture), 7);
    assert_eq!(world.count(Event::Connect), 8);
    assert_eq!(world.sleeps(), vec![5_000; 7]);
    assert!(world.sent.is_empty());
    assert_eq!(agent.telemetry().pipeline_failures, 7);
    assert_eq!(agent.telemetry().sessions_opened, 8);
}

#[test]
fn slow_relink_after_drop_hits_frame_stall() {
    let world = World::shared();
    {
        let mut world = world.borrow_mut();
        world.drop_link_after_sends = Some(1);
        // First join is instant, the first two rejoins time out, later ones are instant.
        world.association_delays.extend([0, 60_000, 60_000]);
    }
    let mut agent = controller(&world);

    assert_eq!(
        block_on(agent.run()),
        AgentExit::HardRestart(RestartReason::FrameStall { elapsed_ms: 30_500 })
    );

    let world = world.borrow();
    assert_eq!(world.count(Event::Associate), 4);
    assert_eq!(world.count(Event::Capture), 1);
    assert_eq!(world.sent.len(), 1);
    assert!(!world.sleeps().contains(&2_000));

    let telemetry = agent.telemetry();
    assert_eq!(telemetry.link_drops, 1);
    assert_eq!(telemetry.link_failures, 2);
    assert_eq!(telemetry.sessions_opened, 2);
    assert_eq!(agent.snapshot().failures.count(), 0);
}

#[test]
fn low_memory_pauses_before_capturing() {
    let world = World::shared();
    {
        let mut world = world.borrow_mut();
        world.free_bytes = 10_000;
        world.reclaim_gain = 4_000;
    }
    script_until_restart(&world, 1, 1);
    let mut agent = controller(&world);

    block_on(agent.run());

    let world = world.borrow();
    let first_capture = world.position(Event::Capture).unwrap();
    let before_capture = &world.events[..first_capture];
    assert_eq!(
        before_capture
            .iter()
            .filter(|event| **event == Event::Reclaim)
            .count(),
        3
    );
    assert!(!before_capture
        .iter()
        .any(|event| matches!(event, Event::Send(_))));
    assert_eq!(world.sleeps()[..3], [1_000, 1_000, 1_000]);
    assert_eq!(agent.telemetry().low_memory_pauses, 3);
}

#[test]
fn link_drop_relinks_without_counting() {
    let world = World::shared();
    world.borrow_mut().drop_link_after_sends = Some(2);
    script_until_restart(&world, 2, 4);
    let mut agent = controller(&world);

    assert_eq!(block_on(agent.run()), THRESHOLD_RESTART);

    let world = world.borrow();
    assert_eq!(world.count(Event::Associate), 2);
    let relink = world
        .events
        .iter()
        .rposition(|event| *event == Event::Associate)
        .unwrap();
    assert!(!world.events[..relink].contains(&Event::Sleep(5_000)));

    let telemetry = agent.telemetry();
    assert_eq!(telemetry.link_drops, 1);
    assert_eq!(telemetry.frames_sent, 4);
    assert_eq!(telemetry.sessions_opened, 2);
}

#[test]
fn pipeline_failure_takes_retry_path() {
    let world = World::shared();
    world
        .borrow_mut()
        .capture_results
        .push_back(Err(PipelineError::Capture));
    script_until_restart(&world, 2, 1);
    let mut agent = controller(&world);

    assert_eq!(block_on(agent.run()), THRESHOLD_RESTART);

    let world = world.borrow();
    let first_shutdown = world.position(Event::Shutdown).unwrap();
    let second_connect = world
        .events
        .iter()
        .enumerate()
        .filter(|(_, event)| **event == Event::Connect)
        .nth(1)
        .map(|(index, _)| index)
        .unwrap();
    assert!(first_shutdown < second_connect);
    assert_eq!(world.events[first_shutdown + 1], Event::Sleep(5_000));

    let telemetry = agent.telemetry();
    assert_eq!(telemetry.pipeline_failures, 1);
    assert_eq!(telemetry.frames_sent, 1);
    assert_eq!(telemetry.sessions_opened, 2);
}

#[test]
fn unusable_scores_count_as_pipeline_failure() {
    let world = World::shared();
    world.borrow_mut().scores = vec![f32::NAN; 5];
    script_until_restart(&world, 1, 0);
    let mut agent = controller(&world);

    assert_eq!(block_on(agent.run()), THRESHOLD_RESTART);
    assert_eq!(
        agent.snapshot().last_fault,
        Some(Fault::from(ConnectError::Refused))
    );
    assert_eq!(agent.telemetry().pipeline_failures, 1);
    assert_eq!(world.borrow().count(Event::Compress), 0);
}

#[test]
fn stream_once_reports_link_drop_before_capturing() {
    let world = World::shared();
    let mut agent = controller(&world);

    assert_eq!(
        block_on(agent.stream_once()),
        Err(Fault::Transient(TransientFault::LinkDropped))
    );
    assert_eq!(world.borrow().count(Event::Capture), 0);
}
