//! Scheduler timing tests
//!
//! Drives the transport and scheduler through the public API with a
//! deterministic audio clock, plus one short run on the system clock.

use nexus_seq::messaging::NoteRecorder;
use nexus_seq::sequencer::MAX_SWING;
use nexus_seq::{AudioClock, PatternBank, STEPS, Scheduler, SystemClock, Transport, VoiceId};
use std::sync::Arc;
use std::time::Duration;

const EPSILON: f64 = 1e-9;

fn full_bank() -> Arc<PatternBank> {
    let bank = Arc::new(PatternBank::new());
    for voice in VoiceId::ALL {
        bank.with_pattern(voice, |p| p.set_pattern(&[true; STEPS]));
    }
    bank
}

/// Dispatch `polls` polls `poll_secs` apart and return the playhead record
fn run_transport(bpm: f64, swing: f64, polls: usize, poll_secs: f64) -> Vec<(usize, f64)> {
    let mut transport = Transport::new(full_bank());
    transport.set_tempo(bpm);
    transport.set_swing(swing);

    let mut recorder = NoteRecorder::new();
    transport.start(0.0);
    for i in 0..polls {
        transport.dispatch_due(i as f64 * poll_secs, &mut recorder);
    }
    recorder.steps()
}

#[test]
fn test_step_times_strictly_increase_across_tempo_and_swing() {
    for bpm in [60.0, 90.0, 120.0, 175.0, 240.0] {
        for swing in [0.0, 0.05, 0.1, MAX_SWING] {
            let steps = run_transport(bpm, swing, 200, 0.025);
            assert!(steps.len() > STEPS, "{} BPM produced {} steps", bpm, steps.len());

            let step_secs = 60.0 / bpm / 4.0;
            let beat_secs = 60.0 / bpm;
            for (n, &(step, time)) in steps.iter().enumerate() {
                assert_eq!(step, n % STEPS);
                let offset = if step % 2 == 1 { swing * beat_secs } else { 0.0 };
                let expected = n as f64 * step_secs + offset;
                assert!(
                    (time - expected).abs() < EPSILON,
                    "{} BPM swing {}: step {} at {} (expected {})",
                    bpm,
                    swing,
                    n,
                    time,
                    expected
                );
            }
            for pair in steps.windows(2) {
                assert!(pair[1].1 > pair[0].1);
            }
        }
    }
}

#[test]
fn test_coarse_polls_skip_nothing() {
    // One poll every half second at 240 BPM: four steps per poll
    let steps = run_transport(240.0, 0.0, 20, 0.5);
    let indices: Vec<usize> = steps.iter().map(|&(step, _)| step).collect();
    let expected: Vec<usize> = (0..indices.len()).map(|n| n % STEPS).collect();
    assert_eq!(indices, expected);
}

#[test]
fn test_each_voice_fires_once_per_time() {
    let mut transport = Transport::new(full_bank());
    let mut recorder = NoteRecorder::new();
    transport.start(0.0);
    for i in 0..40 {
        transport.dispatch_due(i as f64 * 0.025, &mut recorder);
    }

    let events = recorder.events();
    for voice in VoiceId::ALL {
        let times: Vec<f64> = events
            .iter()
            .filter(|e| e.voice == voice)
            .map(|e| e.time)
            .collect();
        for pair in times.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }
    for pair in events.windows(2) {
        assert!(pair[1].time >= pair[0].time);
    }
}

#[test]
fn test_end_to_end_reference_timing() {
    let clock = AudioClock::new(48000.0);
    clock.advance_seconds(2.0);
    let t0 = 2.0;

    let recorder = NoteRecorder::new();
    let bank = Arc::new(PatternBank::new());
    bank.with_pattern(VoiceId::Drum, |p| p.set_pattern(&[true; STEPS]));
    let mut scheduler = Scheduler::new(bank, Arc::new(clock.clone()), Box::new(recorder.clone()));
    scheduler.set_tempo(120.0);
    scheduler.set_swing(0.0);
    scheduler.start().unwrap();

    for _ in 0..40 {
        clock.advance(1200);
        scheduler.poll();
    }
    scheduler.stop();

    let events = recorder.events();
    let time_of = |step: usize| {
        events
            .iter()
            .find(|e| e.step == step)
            .map(|e| e.time)
            .unwrap()
    };
    assert!((time_of(0) - t0).abs() < EPSILON);
    assert!((time_of(1) - (t0 + 0.125)).abs() < EPSILON);
    assert!((time_of(4) - (t0 + 0.5)).abs() < EPSILON);
}

#[test]
fn test_tempo_change_applies_to_later_steps_only() {
    let clock = AudioClock::new(48000.0);
    let recorder = NoteRecorder::new();
    let mut scheduler =
        Scheduler::new(full_bank(), Arc::new(clock.clone()), Box::new(recorder.clone()));
    scheduler.start().unwrap();

    // Step 0 (at 0.0) is out; step 1 is due at 0.125
    let before = recorder.steps();
    assert_eq!(before, vec![(0, 0.0)]);

    scheduler.set_tempo(240.0);
    clock.advance_seconds(0.1);
    scheduler.poll();
    scheduler.stop();

    let steps = recorder.steps();
    // Step 1 keeps the slot computed at 120 BPM; later steps use 240 BPM
    assert!((steps[1].1 - 0.125).abs() < EPSILON);
    assert!((steps[2].1 - 0.1875).abs() < EPSILON);
}

#[test]
fn test_system_clock_playback_and_stop() {
    let recorder = NoteRecorder::new();
    let mut scheduler = Scheduler::new(
        full_bank(),
        Arc::new(SystemClock::new()),
        Box::new(recorder.clone()),
    );
    scheduler.set_tempo(240.0);
    scheduler.start().unwrap();
    std::thread::sleep(Duration::from_millis(300));
    scheduler.stop();

    let steps = recorder.steps();
    // 300ms at 62.5ms per step plus the lookahead
    assert!(steps.len() >= 4, "only {} steps", steps.len());
    for (n, &(step, _)) in steps.iter().enumerate() {
        assert_eq!(step, n % STEPS);
    }

    let count = recorder.len();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(recorder.len(), count);
}
