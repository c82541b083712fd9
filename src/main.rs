use smfplay::messaging::channels::{self, MessageConsumer};
use smfplay::messaging::{DisplayConsumer, UpdateCategory};
use smfplay::sequencer::player::{self, RunOutcome};
use smfplay::{
    Command, DisplayUpdate, MidiEvent, PlayerConfig, Sequence, Sequencer, create_command_channel,
    create_display_channel, create_message_channel,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

const USAGE: &str = "Usage: smfplay [--config FILE] [--json] [--info] [-v] <file.mid>";

/// How often the main thread drains the display and message queues
const DRAIN_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    json: bool,
    info: bool,
    verbosity: u8,
    file: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a file")?;
                args.config = Some(PathBuf::from(path));
            }
            "--json" => args.json = true,
            "--info" => args.info = true,
            "-v" | "--verbose" => args.verbosity += 1,
            "-vv" => args.verbosity += 2,
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with('-') => return Err(format!("Unknown option '{}'", flag)),
            file => {
                if args.file.replace(PathBuf::from(file)).is_some() {
                    return Err("Only one file can be played".to_string());
                }
            }
        }
    }
    Ok(args)
}

/// Minimal stderr logger for the `log` facade
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(config: &PlayerConfig, verbosity: u8) -> Result<(), Box<dyn std::error::Error>> {
    let level = match verbosity {
        0 => config.log_level_filter()?,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    log::set_logger(&LOGGER).map_err(|e| e.to_string())?;
    log::set_max_level(level);
    Ok(())
}

fn print_summary(sequence: &Sequence, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let summary = sequence.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Title:      {}", summary.title.as_deref().unwrap_or("-"));
    println!("Format:     {}", summary.format_type);
    println!("Resolution: {} ticks per quarter", sequence.ticks_per_quarter());
    println!(
        "Length:     {} ticks ({:.1} s)",
        summary.tick_length, summary.duration_seconds
    );
    for (index, track) in summary.tracks.iter().enumerate() {
        println!(
            "Track {:>2}:   {} events {}",
            index,
            track.events,
            track.title.as_deref().unwrap_or("")
        );
    }
    for (tick, bpm) in &summary.tempos {
        println!("Tempo:      {} BPM at {}", bpm, tick);
    }
    for (tick, ts) in &summary.time_signatures {
        println!("Time:       {} at {}", ts, tick);
    }
    for (tick, key) in &summary.key_signatures {
        println!("Key:        {} at {}", key, tick);
    }
    for (tick, marker) in &summary.markers {
        println!("Marker:     {} at {}", marker, tick);
    }
    println!("Lyrics:     {} lines", summary.lyric_lines);
    Ok(())
}

fn drain_output(display_rx: &mut DisplayConsumer, message_rx: &mut MessageConsumer) {
    for update in channels::drain(display_rx) {
        match (&update, update.category()) {
            (_, UpdateCategory::Position) | (DisplayUpdate::Beat(_), _) => {}
            (DisplayUpdate::Lyric { text, .. }, _)
            | (DisplayUpdate::Marker(text), _)
            | (DisplayUpdate::Text(text), _)
                if text.is_empty() => {}
            _ => println!("{}", update),
        }
    }
    for message in channels::drain(message_rx) {
        match MidiEvent::from_bytes(&message) {
            Some(event) if !event.is_reset() => log::debug!("{}", event),
            Some(_) => {}
            None => log::trace!("{:02X?}", message),
        }
    }
}

fn play(
    sequence: Sequence,
    config: &PlayerConfig,
) -> Result<RunOutcome, Box<dyn std::error::Error>> {
    let (message_tx, mut message_rx) = create_message_channel(config.message_queue_capacity);
    let (display_tx, mut display_rx) = create_display_channel(config.display_queue_capacity);
    let (mut command_tx, mut command_rx) = create_command_channel(16);

    let mut sequencer = Sequencer::from_config(config, message_tx, display_tx);
    sequencer.load(sequence);
    if ringbuf::traits::Producer::try_push(&mut command_tx, Command::Play).is_err() {
        return Err("command queue full".into());
    }

    let playback = thread::spawn(move || player::run(&mut sequencer, &mut command_rx));
    while !playback.is_finished() {
        drain_output(&mut display_rx, &mut message_rx);
        thread::sleep(DRAIN_INTERVAL);
    }
    let outcome = playback
        .join()
        .map_err(|_| "playback thread panicked")?;
    drain_output(&mut display_rx, &mut message_rx);
    Ok(outcome)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::load_or_default()?,
    };
    init_logging(&config, args.verbosity)?;

    let file = args.file.ok_or(USAGE)?;
    let sequence = Sequence::from_file(&file, &config.decode_options()?)?;

    if args.info {
        return print_summary(&sequence, args.json);
    }

    println!("Playing {}", file.display());
    let outcome = play(sequence, &config)?;
    log::info!("Playback {:?}", outcome);
    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
