//! Drives a session over simulated media in real time and logs what happens.
//!
//! Usage: `multicam-demo [location=<seconds>|location=fail ...]`
//! Run with `RUST_LOG=info` (or `debug`) to see the engine's log.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use multicam_core::{
    EngineConfiguration, MultiAngleSession, PlaybackDelegate, PlaybackError, PlaybackSnapshot,
    ThreadScheduler,
};
use multicam_sim::{MediaCatalog, SimulatedBackend};

const DEFAULT_ANGLES: [&str; 4] = [
    "north.mp4=30",
    "south.mp4=29.5",
    "east.mp4=31",
    "drone.mp4=fail",
];

/// Frame period of the host's event pump.
const PUMP_INTERVAL: Duration = Duration::from_millis(16);

enum Action {
    Play,
    SwitchAngle(usize),
    SingleAngle(bool),
    AudioSource(usize),
    Freeze(f64),
    Seek(f64),
    StepFrames(i32),
    Rate(f32),
    Pause,
}

const TIMELINE: [(f64, Action); 10] = [
    (0.5, Action::Play),
    (2.0, Action::AudioSource(1)),
    (3.0, Action::SingleAngle(true)),
    (4.0, Action::SwitchAngle(2)),
    (5.0, Action::Freeze(1.5)),
    (7.5, Action::Seek(12.0)),
    (8.5, Action::Rate(2.0)),
    (9.5, Action::SingleAngle(false)),
    (11.0, Action::StepFrames(15)),
    (12.0, Action::Pause),
];

struct LogDelegate;

impl PlaybackDelegate for LogDelegate {
    fn on_state_changed(&self, snapshot: &PlaybackSnapshot) {
        log::debug!(
            "state: playing={} frozen={} t={:.2}/{:.2} angle={:?} mode={:?}",
            snapshot.is_playing,
            snapshot.is_frozen,
            snapshot.current_time,
            snapshot.duration,
            snapshot.active_index,
            snapshot.mode
        );
    }

    fn on_stream_degraded(&self, index: usize, error: &PlaybackError) {
        log::warn!("angle {} degraded: {}", index, error);
    }

    fn on_freeze_changed(&self, frozen: bool) {
        log::info!("freeze {}", if frozen { "started" } else { "ended" });
    }
}

fn apply(session: &mut MultiAngleSession, action: &Action) {
    match *action {
        Action::Play => session.play(),
        Action::SwitchAngle(index) => session.switch_active_angle(index),
        Action::SingleAngle(enabled) => session.set_single_angle(enabled),
        Action::AudioSource(index) => session.set_audio_source(index),
        Action::Freeze(secs) => session.freeze_for(secs),
        Action::Seek(secs) => session.seek(secs),
        Action::StepFrames(count) => session.step_frames(count),
        Action::Rate(rate) => session.set_rate(rate),
        Action::Pause => session.pause(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let entries: Vec<&str> = if args.is_empty() {
        DEFAULT_ANGLES.to_vec()
    } else {
        args.iter().map(String::as_str).collect()
    };
    let (catalog, sources) = MediaCatalog::parse_all(entries)?;

    let scheduler = Arc::new(ThreadScheduler::new());
    let backend = Arc::new(SimulatedBackend::new(scheduler.clone(), catalog));
    let mut session = MultiAngleSession::new(backend, scheduler, EngineConfiguration::default())?;
    session.set_delegate(Arc::new(LogDelegate));

    log::info!("multicam-core {} with {} angles", multicam_core::VERSION, sources.len());
    session.setup(sources);

    let started = Instant::now();
    let mut next = 0;
    while next < TIMELINE.len() {
        session.process_events();

        let elapsed = started.elapsed().as_secs_f64();
        while next < TIMELINE.len() && TIMELINE[next].0 <= elapsed {
            apply(&mut session, &TIMELINE[next].1);
            next += 1;
        }
        thread::sleep(PUMP_INTERVAL);
    }
    session.process_events();

    println!("{}", session.snapshot().to_json()?);
    session.teardown();
    Ok(())
}
