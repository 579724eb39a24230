//! Terminal karaoke player for Standard MIDI Files

use std::{
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use karaoke_midi::{
    player::{format_time, note_frequency, velocity_gain, AudioSink, LyricSink, Player, PlayerConfig},
    playback::PlaybackStatus,
    reader::MidiReadable,
    timeline::{lyrics::LyricWindow, ScheduleOptions, Scheduler},
    ParsedMidi,
};
use tracing_subscriber::EnvFilter;

/// Delay between clock ticks while playing
const FRAME: Duration = Duration::from_millis(10);

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.options.config()?;

    match cli.command {
        Commands::Lyrics { input } => print_lyrics(&input, config),
        Commands::Play { input } => play(&input, config),
    }
}

/// Reads and parses a file
fn load(input: &Path) -> Result<ParsedMidi> {
    let bytes = input
        .get_midi_bytes()
        .with_context(|| format!("reading {}", input.display()))?;

    let midi =
        ParsedMidi::parse(&bytes).with_context(|| format!("parsing {}", input.display()))?;

    tracing::info!(
        format = ?midi.header().format(),
        tracks = midi.tracks().len(),
        division = ?midi.header().division(),
        "loaded file"
    );
    Ok(midi)
}

/// Prints every lyric cue with its time
fn print_lyrics(input: &Path, config: PlayerConfig) -> Result<()> {
    let midi = load(input)?;
    let timeline = Scheduler::new(&midi)
        .with_options(config.schedule_options())?
        .schedule();

    for cue in karaoke_midi::timeline::lyrics::extract_lyrics(&timeline) {
        println!("{:>8.3}  {}", cue.time_seconds(), cue.text());
    }
    println!("length {}", format_time(timeline.duration()));

    Ok(())
}

/// Plays a file against the wall clock until it finishes
fn play(input: &Path, config: PlayerConfig) -> Result<()> {
    let midi = load(input)?;
    let mut player = Player::from_midi(&midi, config, TerminalAudio, TerminalLyrics)?;
    let duration = player.state().duration;

    let start = Instant::now();
    player.play(0.0)?;

    loop {
        let now = start.elapsed().as_secs_f64();
        player.update(now);

        if player.state().status == PlaybackStatus::Stopped {
            break;
        }
        thread::sleep(FRAME);
    }

    println!("finished {}", format_time(duration));
    Ok(())
}

/// Prints notes instead of synthesizing them
#[derive(Debug)]
struct TerminalAudio;

impl AudioSink for TerminalAudio {
    fn play_note(&mut self, note: u8, velocity: u8, duration_seconds: f64) {
        tracing::debug!(
            note,
            frequency = note_frequency(note),
            gain = velocity_gain(velocity),
            duration_seconds,
            "note"
        );
    }
}

/// Prints the current lyric line with the next one as a preview
#[derive(Debug)]
struct TerminalLyrics;

impl LyricSink for TerminalLyrics {
    fn show(&mut self, window: LyricWindow<'_>) {
        let next = window.next.map_or("", |cue| cue.text());
        println!(
            "[{}] {}    ({})",
            format_time(window.current.time_seconds()),
            window.current.text(),
            next
        );
    }
}

/// Sets up logging from `RUST_LOG`, defaulting to `info`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Karaoke player for Standard MIDI Files", long_about = None)]
struct Cli {
    /// Timing options shared by every command
    #[command(flatten)]
    options: TimingArgs,
    /// What to do
    #[command(subcommand)]
    command: Commands,
}

/// Timing flags
#[derive(clap::Args, Debug)]
struct TimingArgs {
    /// Play at a fixed tempo in beats per minute, ignoring the file's tempo changes
    #[arg(long, global = true, value_parser = positive_number)]
    bpm: Option<f64>,
    /// Stretch every duration by this factor, 2.0 is half speed
    #[arg(long, default_value_t = 1.0, global = true, value_parser = positive_number)]
    time_warp: f64,
    /// How long each note sounds, in seconds
    #[arg(long, default_value_t = 0.5, global = true, value_parser = positive_number)]
    note_duration: f64,
}

impl TimingArgs {
    /// Builds the player settings
    fn config(&self) -> Result<PlayerConfig> {
        let tempo_override = match self.bpm {
            Some(bpm) => ScheduleOptions::from_bpm(bpm)?.tempo_override,
            None => None,
        };

        Ok(PlayerConfig {
            tempo_override,
            time_warp: self.time_warp,
            note_duration: self.note_duration,
        })
    }
}

/// Parses a finite number above zero
fn positive_number(value: &str) -> Result<f64, String> {
    let number: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;

    if number.is_finite() && number > 0.0 {
        Ok(number)
    } else {
        Err(format!("`{value}` must be greater than zero"))
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the lyric timeline of a file
    Lyrics {
        /// Path to the MIDI file
        input: PathBuf,
    },
    /// Play a file in real time, printing lyrics as they come up
    Play {
        /// Path to the MIDI file
        input: PathBuf,
    },
}
