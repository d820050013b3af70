use nexus_seq::{EngineConfig, EngineEvent, NoteEvent, NoteSink, SequencerEngine};
use std::sync::Arc;
use std::time::Duration;

// How long the demo plays before printing the final patterns
const PLAY_DURATION: Duration = Duration::from_secs(4);

/// Prints every dispatched note through the log
struct LogSink;

impl NoteSink for LogSink {
    fn note(&mut self, event: NoteEvent) {
        log::info!(
            "{:>6} step {:>2} at {:.3}s (vel {:.1})",
            event.voice,
            event.step,
            event.time,
            event.velocity
        );
    }

    fn step_advanced(&mut self, step: usize, time: f64) {
        log::trace!("Playhead -> {} at {:.3}s", step, time);
    }
}

fn load_config() -> EngineConfig {
    let Some(path) = std::env::args().nth(1) else {
        return EngineConfig::default();
    };

    match EngineConfig::from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Nexus Seq ===");
    let config = load_config();

    let mut engine = match SequencerEngine::with_system_clock(config, Box::new(LogSink)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to initialize engine: {}", e);
            std::process::exit(1);
        }
    };

    engine.subscribe(Arc::new(|event: EngineEvent| {
        if let EngineEvent::Mutated(kind) = event {
            log::info!("Chaos: {}", kind);
        }
    }));

    engine.apply_preset("Classic House");
    engine.evolve(8);

    if let Err(e) = engine.activate_chaos() {
        eprintln!("Chaos director unavailable: {}", e);
    }
    if let Err(e) = engine.start() {
        eprintln!("Failed to start playback: {}", e);
        std::process::exit(1);
    }

    println!("Playing at {} BPM for {:?}...", engine.tempo(), PLAY_DURATION);
    std::thread::sleep(PLAY_DURATION);

    engine.stop();
    engine.deactivate_chaos();

    match engine.snapshot().to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize patterns: {}", e),
    }
}
