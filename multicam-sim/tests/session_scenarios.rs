//! End-to-end sessions over simulated media on a virtual clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;

use multicam_core::{
    EngineConfiguration, ManualScheduler, MultiAngleSession, Scheduler, ThreadScheduler,
};
use multicam_sim::{MediaCatalog, MediaScript, SimulatedBackend, StreamProbe};

/// Host event pump period.
const FRAME: Duration = Duration::from_millis(10);

struct Rig {
    scheduler: Arc<ManualScheduler>,
    backend: Arc<SimulatedBackend>,
    session: MultiAngleSession,
}

fn rig(angles: Vec<(&str, MediaScript)>) -> Rig {
    let scheduler = Arc::new(ManualScheduler::new());
    let mut catalog = MediaCatalog::new();
    let mut sources = Vec::new();
    for (location, script) in angles {
        catalog.insert(location, script);
        sources.push(location.to_string());
    }
    let backend = Arc::new(SimulatedBackend::new(scheduler.clone(), catalog));
    let mut session =
        MultiAngleSession::new(backend.clone(), scheduler.clone(), EngineConfiguration::default())
            .unwrap();
    session.setup(sources);
    Rig {
        scheduler,
        backend,
        session,
    }
}

fn uniform(count: usize, duration_secs: f64) -> Rig {
    let names: Vec<String> = (0..count).map(|i| format!("angle-{}.mp4", i)).collect();
    rig(names
        .iter()
        .map(|name| (name.as_str(), MediaScript::new(duration_secs)))
        .collect())
}

impl Rig {
    /// Advance the clock frame by frame, pumping events like a UI loop.
    fn run(&mut self, secs: f64) {
        let frames = (secs / FRAME.as_secs_f64()).round() as u32;
        for _ in 0..frames {
            self.scheduler.advance(FRAME);
            self.session.process_events();
        }
    }

    fn probes(&self) -> Vec<StreamProbe> {
        self.backend.probes()
    }

    fn playing_count(&self) -> usize {
        self.probes().iter().filter(|p| p.playing && !p.released).count()
    }

    fn unmuted(&self) -> Vec<usize> {
        self.probes()
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.muted && !p.released)
            .map(|(i, _)| i)
            .collect()
    }
}

#[test]
fn angles_load_and_play_in_lockstep() {
    let mut rig = rig(vec![
        ("north.mp4", MediaScript::new(120.0)),
        ("south.mp4", MediaScript::new(118.0)),
        ("east.mp4", MediaScript::new(121.0)),
    ]);

    rig.run(0.2);
    assert_eq!(rig.session.duration(), 121.0);
    assert!((0..3).all(|i| rig.session.stream_status(i).unwrap().is_ready()));

    rig.session.play();
    rig.run(5.0);

    for probe in rig.probes() {
        assert!(probe.playing);
        assert_relative_eq!(probe.position_secs, 5.0, epsilon = 1e-6);
        assert_eq!(probe.forward_buffer_secs, 2.0);
    }
    assert_relative_eq!(rig.session.current_time(), 5.0, epsilon = 0.05);
    assert_eq!(rig.unmuted(), vec![0]);
}

#[test]
fn repeated_setup_with_same_sources_keeps_streams() {
    let mut rig = uniform(3, 60.0);
    rig.run(0.2);

    rig.session.setup(vec!["angle-0.mp4", "angle-1.mp4", "angle-2.mp4"]);
    rig.run(0.2);

    assert_eq!(rig.backend.opened_count(), 3);
    assert!(rig.probes().iter().all(|p| !p.released));
}

#[test]
fn mode_round_trip_restores_duration_and_routing() {
    let mut rig = rig(vec![
        ("north.mp4", MediaScript::new(100.0)),
        ("south.mp4", MediaScript::new(140.0)),
        ("east.mp4", MediaScript::new(120.0)),
    ]);
    rig.run(0.2);
    rig.session.play();
    rig.run(1.0);

    rig.session.set_single_angle(true);
    assert_eq!(rig.session.duration(), 100.0);
    assert_eq!(rig.playing_count(), 1);

    rig.session.set_single_angle(false);
    rig.run(0.3);
    assert_eq!(rig.session.duration(), 140.0);
    assert_eq!(rig.unmuted(), vec![0]);
    assert_eq!(rig.playing_count(), 3);
}

#[test]
fn empty_session_ignores_every_operation() {
    let mut rig = rig(Vec::new());

    rig.session.play();
    rig.session.switch_active_angle(0);
    rig.session.set_single_angle(true);
    rig.session.seek(4.0);
    rig.session.freeze_for(1.0);
    rig.run(1.0);

    assert!(!rig.session.is_playing());
    assert_eq!(rig.session.active_index(), None);
    assert_eq!(rig.backend.opened_count(), 0);
}

#[test]
fn single_angle_switch_lands_on_current_time() {
    let mut rig = uniform(4, 60.0);
    rig.run(0.2);
    rig.session.set_single_angle(true);
    rig.session.play();
    rig.run(3.0);

    rig.session.switch_active_angle(2);
    assert!(rig.unmuted().is_empty());
    assert_eq!(rig.playing_count(), 0);

    for _ in 0..10 {
        rig.run(0.01);
        assert!(rig.playing_count() <= 1);
        assert!(rig.unmuted().len() <= 1);
    }

    let probes = rig.probes();
    assert_eq!(rig.session.audible_index(), Some(2));
    assert_eq!(rig.unmuted(), vec![2]);
    assert!(probes[2].playing);
    assert!(!probes[0].playing && !probes[1].playing && !probes[3].playing);
    assert_relative_eq!(probes[2].position_secs, probes[0].position_secs, epsilon = 0.2);
}

#[test]
fn rapid_switches_end_on_the_last_angle() {
    let mut rig = uniform(4, 60.0);
    rig.run(0.2);
    rig.session.set_single_angle(true);
    rig.session.play();
    rig.run(1.0);

    rig.session.switch_active_angle(1);
    rig.run(0.02);
    rig.session.switch_active_angle(3);
    rig.run(0.02);
    rig.session.switch_active_angle(2);
    rig.run(0.5);

    assert_eq!(rig.session.active_index(), Some(2));
    assert_eq!(rig.unmuted(), vec![2]);
    assert_eq!(rig.playing_count(), 1);
    assert!(rig.probes()[2].playing);
    assert_eq!(rig.scheduler.repeating_timers(), 1);
}

#[test]
fn multi_angle_seek_resumes_every_angle_together() {
    let mut rig = uniform(3, 60.0);
    rig.run(0.2);
    rig.session.play();
    rig.run(1.0);

    rig.session.seek(20.05);
    assert_eq!(rig.playing_count(), 0);
    rig.run(0.1);

    let probes = rig.probes();
    assert!(probes.iter().all(|p| p.playing));
    for probe in &probes {
        assert_relative_eq!(probe.position_secs, probes[0].position_secs, epsilon = 1e-9);
    }
    // Landed on the 20s keyframe, then played for 50ms.
    assert_relative_eq!(probes[0].position_secs, 20.05, epsilon = 0.011);
}

#[test]
fn single_angle_seek_is_frame_exact() {
    let mut rig = uniform(2, 60.0);
    rig.run(0.2);
    rig.session.set_single_angle(true);

    rig.session.seek(20.05);
    rig.run(0.1);

    let probes = rig.probes();
    assert_relative_eq!(probes[0].position_secs, 20.05, epsilon = 1e-9);
    assert_eq!(probes[1].seeks_issued, 0);
}

#[test]
fn freeze_holds_then_resumes() {
    let mut rig = uniform(2, 60.0);
    rig.run(0.2);
    rig.session.play();
    rig.run(1.0);

    rig.session.freeze_for(2.0);
    let frozen_at = rig.probes()[0].position_secs;
    rig.run(1.0);
    assert!(rig.session.is_frozen());
    assert_relative_eq!(rig.probes()[0].position_secs, frozen_at, epsilon = 1e-9);

    rig.run(1.1);
    assert!(!rig.session.is_frozen());
    assert!(rig.session.is_playing());
    assert_eq!(rig.playing_count(), 2);

    rig.run(1.0);
    assert!(rig.probes()[0].position_secs > frozen_at + 0.8);
}

#[test]
fn cancelled_freeze_keeps_paused() {
    let mut rig = uniform(2, 60.0);
    rig.run(0.2);
    rig.session.play();
    rig.session.freeze_for(2.0);

    rig.run(1.0);
    rig.session.cancel_freeze();
    rig.run(3.0);

    assert!(!rig.session.is_playing());
    assert_eq!(rig.playing_count(), 0);
}

#[test]
fn end_of_active_angle_stops_playback() {
    let mut rig = rig(vec![
        ("short.mp4", MediaScript::new(2.0)),
        ("long.mp4", MediaScript::new(5.0)),
    ]);
    rig.run(0.2);
    rig.session.play();

    rig.run(3.0);

    assert!(!rig.session.is_playing());
    assert_eq!(rig.playing_count(), 0);
    assert_relative_eq!(rig.probes()[0].position_secs, 2.0, epsilon = 1e-6);
}

#[test]
fn failed_angle_is_left_out() {
    let mut rig = rig(vec![
        ("north.mp4", MediaScript::new(60.0)),
        ("drone.mp4", MediaScript::failing("unsupported codec")),
        ("south.mp4", MediaScript::new(60.0)),
    ]);
    rig.run(0.2);
    assert!(rig.session.stream_status(1).unwrap().is_failed());
    assert_eq!(rig.session.duration(), 60.0);

    rig.session.play();
    rig.session.seek(10.0);
    rig.run(0.5);

    let probes = rig.probes();
    assert!(probes[0].playing && probes[2].playing);
    assert!(!probes[1].playing);
    assert_eq!(probes[1].seeks_issued, 0);
}

#[test]
fn unknown_source_becomes_failed_angle() {
    let mut rig = uniform(2, 60.0);

    rig.session.setup(vec!["angle-0.mp4", "missing.mp4", "angle-1.mp4"]);
    rig.run(0.2);

    assert_eq!(rig.session.stream_count(), 3);
    assert!(rig.session.stream_status(1).unwrap().is_failed());
    assert!(rig.session.stream_status(2).unwrap().is_ready());
}

#[test]
fn step_frames_moves_by_whole_frames() {
    let mut rig = rig(vec![(
        "north.mp4",
        MediaScript::new(60.0).with_frame_rate(25.0),
    )]);
    rig.run(0.2);
    rig.session.seek(10.0);
    rig.run(0.1);

    rig.session.step_frames(5);
    rig.run(0.1);

    assert_relative_eq!(rig.probes()[0].position_secs, 10.2, epsilon = 1e-9);
    assert!(!rig.session.is_playing());
}

#[test]
fn rate_scales_progress() {
    let mut rig = uniform(2, 60.0);
    rig.run(0.2);
    rig.session.set_rate(2.0);
    rig.session.play();

    rig.run(2.0);

    for probe in rig.probes() {
        assert_eq!(probe.rate, 2.0);
        assert_relative_eq!(probe.position_secs, 4.0, epsilon = 1e-6);
    }
}

#[test]
fn teardown_releases_streams_and_timers() {
    let mut rig = uniform(3, 60.0);
    rig.run(0.2);
    rig.session.play();
    rig.session.freeze_for(1.0);

    rig.session.teardown();

    assert!(rig.probes().iter().all(|p| p.released && !p.playing));
    assert_eq!(rig.scheduler.pending_timers(), 0);
    rig.run(2.0);
    assert_eq!(rig.session.stream_count(), 0);
}

#[test]
fn plays_in_real_time_on_thread_scheduler() {
    let scheduler = Arc::new(ThreadScheduler::new());
    let catalog = MediaCatalog::new()
        .with("north.mp4", MediaScript::new(30.0).with_load_latency(Duration::from_millis(10)))
        .with("south.mp4", MediaScript::new(30.0).with_load_latency(Duration::from_millis(10)));
    let backend = Arc::new(SimulatedBackend::new(scheduler.clone(), catalog));
    let mut session =
        MultiAngleSession::new(backend.clone(), scheduler.clone(), EngineConfiguration::default())
            .unwrap();
    session.setup(["north.mp4", "south.mp4"]);
    session.play();

    let started = Instant::now();
    while session.current_time() < 0.1 && started.elapsed() < Duration::from_secs(5) {
        session.process_events();
        std::thread::sleep(Duration::from_millis(10));
    }

    assert!(session.current_time() >= 0.1);
    assert_eq!(session.duration(), 30.0);
    assert!(scheduler.now() > Duration::ZERO);
    session.teardown();
    assert!(backend.probes().iter().all(|p| p.released));
}
