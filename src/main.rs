use polyrhythm_engine::audio::{AudioOutput, OutputDevice};
use polyrhythm_engine::preset::builtin_presets;
use polyrhythm_engine::{
    Action, EngineConfig, EngineEvent, PolyrhythmEngine, PolyrhythmState, ReadyFlag,
    RotateDirection, Store, create_event_channel,
};
use ringbuf::traits::Consumer;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

fn print_help() {
    println!("Commands:");
    println!("  p          play / pause");
    println!("  + | -      tempo up / down by 5 BPM");
    println!("  a          add a track");
    println!("  t N        toggle track N active");
    println!("  m N        toggle track N mute");
    println!("  b N K      set track N beat number to K");
    println!("  r N | l N  rotate track N right / left");
    println!("  c N        clear track N");
    println!("  x N S      toggle step S of track N");
    println!("  s          print share string");
    println!("  load TEXT  load a preset name or share string");
    println!("  v          toggle hit display");
    println!("  q          quit");
}

fn print_state(state: &PolyrhythmState) {
    println!("{} BPM, cycle of {} steps", state.tempo, state.lcm);
    for track in state.tracks.iter() {
        let pattern: String = track
            .beats
            .iter()
            .map(|b| if b.is_on { 'x' } else { '.' })
            .collect();
        println!(
            "  [{}] {:>2} {:<9} {}{} {}",
            track.index,
            track.beat_number,
            track.sample,
            if track.is_active { "on " } else { "off" },
            if track.is_mute { " (muted)" } else { "" },
            pattern
        );
    }
}

fn parse_index(arg: Option<&str>) -> Option<usize> {
    arg.and_then(|s| s.parse().ok())
}

fn load(engine: &Mutex<PolyrhythmEngine>, text: &str) -> bool {
    let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
    engine.load_builtin_preset(text) || engine.load_from_url(text)
}

/// Runs one command line. Returns false on quit
fn run_command(line: &str, engine: &Mutex<PolyrhythmEngine>, store: &Store, show_hits: &AtomicBool) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };
    let first = parse_index(parts.clone().next());

    let action = match command {
        "q" => return false,
        "p" => {
            let state = engine.lock().unwrap_or_else(PoisonError::into_inner).toggle_play();
            println!("Transport: {:?}", state);
            return true;
        }
        "s" => {
            let share = engine.lock().unwrap_or_else(PoisonError::into_inner).share_url();
            println!("{}", share);
            return true;
        }
        "v" => {
            let show = !show_hits.load(Ordering::Relaxed);
            show_hits.store(show, Ordering::Relaxed);
            return true;
        }
        "load" => {
            let text = line.trim_start()["load".len()..].trim();
            if load(engine, text) {
                print_state(&store.snapshot());
            } else {
                eprintln!("Not a preset: {}", text);
            }
            return true;
        }
        "+" => Some(Action::ChangeTempo(store.snapshot().tempo.saturating_add(5))),
        "-" => Some(Action::ChangeTempo(store.snapshot().tempo.saturating_sub(5))),
        "a" => Some(Action::AddTrack),
        "t" => first.map(Action::ToggleActive),
        "m" => first.map(Action::ToggleMute),
        "c" => first.map(Action::ClearBeats),
        "r" => first.map(|i| Action::rotate(i, RotateDirection::Clockwise)),
        "l" => first.map(|i| Action::rotate(i, RotateDirection::CounterClockwise)),
        "b" => {
            let beat_number = parts.nth(1).and_then(|s| s.parse::<u32>().ok());
            first.zip(beat_number).map(|(track, beat_number)| Action::ChangeBeatNumber {
                track,
                beat_number,
            })
        }
        "x" => {
            let step = parse_index(parts.nth(1));
            first.zip(step).map(|(track, step)| Action::ToggleBeat { track, step })
        }
        _ => None,
    };

    match action {
        // Edits go through the store; the audio thread reschedules on its next block
        Some(action) => print_state(&store.dispatch(action)),
        None => print_help(),
    }
    true
}

fn main() {
    println!("=== Polyrhythm ===");
    println!("Version {}\n", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load_or_default();

    let device = match OutputDevice::open_default() {
        Ok(device) => device,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return;
        }
    };
    println!("Device audio: {}", device.name());
    println!("Config audio: {} Hz, {} channels", device.sample_rate(), device.channels());

    let ready = ReadyFlag::new();
    let (event_tx, mut event_rx) = create_event_channel(config.event_capacity);
    let engine = PolyrhythmEngine::from_config(&config, device.sample_rate() as f64, ready.clone())
        .with_events(event_tx);
    let store = engine.store();
    let engine = Arc::new(Mutex::new(engine));

    if let Some(arg) = std::env::args().nth(1) {
        if !load(&engine, &arg) {
            eprintln!("Not a preset, keeping the default rhythm: {}", arg);
        }
    }

    let _output = match AudioOutput::start(device, Arc::clone(&engine), ready) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return;
        }
    };

    let show_hits = Arc::new(AtomicBool::new(false));
    {
        let show_hits = Arc::clone(&show_hits);
        thread::spawn(move || loop {
            while let Some(event) = event_rx.try_pop() {
                if let EngineEvent::Hit { track, step, sample, .. } = event {
                    if show_hits.load(Ordering::Relaxed) {
                        println!("step {:>3}  track {} {}", step, track, sample);
                    }
                }
            }
            thread::sleep(Duration::from_millis(10));
        });
    }

    println!("Presets:");
    for preset in builtin_presets() {
        println!("  {}", preset.name.unwrap_or_default());
    }
    println!();
    print_state(&store.snapshot());
    print_help();

    let state = engine.lock().unwrap_or_else(PoisonError::into_inner).start();
    println!("Transport: {:?}", state);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        if !run_command(&line, &engine, &store, &show_hits) {
            break;
        }
        let _ = io::stdout().flush();
    }

    engine.lock().unwrap_or_else(PoisonError::into_inner).pause();
    println!("Bye");
}
