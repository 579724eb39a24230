//! Drives a [`PlaybackClock`] and hands due notes and lyrics to host supplied sinks

use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    playback::{ClockError, PlaybackClock, PlaybackState},
    timeline::{
        lyrics::{current_index, extract_lyrics, window_at, LyricCue, LyricWindow},
        ScheduleError, ScheduleOptions, Scheduler, Timeline,
    },
    ParsedMidi,
};

/// Frequency of A4, MIDI note 69
const CONCERT_A: f64 = 440.0;

/// Highest MIDI velocity
const MAX_VELOCITY: f64 = 127.0;

/// Something that can sound a note
pub trait AudioSink {
    /// Plays `note` at `velocity` for `duration_seconds`. Only called for velocities above 0.
    fn play_note(&mut self, note: u8, velocity: u8, duration_seconds: f64);
}

/// Something that can show the lyrics around the current line
pub trait LyricSink {
    /// Called whenever the current line changes
    fn show(&mut self, window: LyricWindow<'_>);
}

/// Equal tempered frequency of a MIDI note in Hz
pub fn note_frequency(note: u8) -> f64 {
    CONCERT_A * 2f64.powf((note as f64 - 69.0) / 12.0)
}

/// Linear gain for a MIDI velocity, 0.0 to 1.0
pub fn velocity_gain(velocity: u8) -> f64 {
    velocity.min(127) as f64 / MAX_VELOCITY
}

/// Formats seconds as `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Settings for a [`Player`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlayerConfig {
    /// Fixed microseconds per quarter note, replacing the file's tempo events
    pub tempo_override: Option<u32>,
    /// Multiplier applied to every duration
    pub time_warp: f64,
    /// How long each note sounds, in seconds
    pub note_duration: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tempo_override: None,
            time_warp: 1.0,
            note_duration: 0.5,
        }
    }
}

impl PlayerConfig {
    /// The scheduling part of the configuration
    pub fn schedule_options(&self) -> ScheduleOptions {
        ScheduleOptions {
            tempo_override: self.tempo_override,
            time_warp: self.time_warp,
        }
    }
}

/// A karaoke player. The host calls [`Player::update`] with its clock as often as it likes, due
/// notes go to the audio sink and line changes go to the lyric sink.
#[derive(Debug)]
pub struct Player<A, L> {
    /// Playback position
    clock: PlaybackClock,
    /// Lyric cues of the loaded song
    lyrics: Vec<LyricCue>,
    /// Settings
    config: PlayerConfig,
    /// Where notes go
    audio: A,
    /// Where lyrics go
    lyric_sink: L,
    /// Index of the cue last handed to the lyric sink
    shown: Option<usize>,
}

impl<A: AudioSink, L: LyricSink> Player<A, L> {
    /// Creates a stopped player for an already scheduled song
    pub fn new(timeline: Timeline, config: PlayerConfig, audio: A, lyric_sink: L) -> Self {
        let lyrics = extract_lyrics(&timeline);
        debug!(cues = lyrics.len(), "extracted lyrics");

        Self {
            clock: PlaybackClock::with_timeline(timeline),
            lyrics,
            config,
            audio,
            lyric_sink,
            shown: None,
        }
    }

    /// Schedules `midi` with the configured tempo options and creates a player for it
    pub fn from_midi(
        midi: &ParsedMidi,
        config: PlayerConfig,
        audio: A,
        lyric_sink: L,
    ) -> Result<Self, ScheduleError> {
        let timeline = Scheduler::new(midi)
            .with_options(config.schedule_options())?
            .schedule();

        Ok(Self::new(timeline, config, audio, lyric_sink))
    }

    /// Advances to host time `now`. Returns the number of notes sent to the audio sink.
    pub fn update(&mut self, now: f64) -> usize {
        let mut played = 0;

        for event in self.clock.tick(now) {
            if let Some(note) = event.event().audible_note_on() {
                trace!(
                    time = event.time_seconds(),
                    key = note.key(),
                    velocity = note.velocity(),
                    "note"
                );
                self.audio
                    .play_note(note.key(), note.velocity(), self.config.note_duration);
                played += 1;
            }
        }

        self.refresh_lyrics(false);
        played
    }

    /// Starts or resumes at host time `now`
    pub fn play(&mut self, now: f64) -> Result<(), ClockError> {
        self.clock.play(now)
    }

    /// Pauses at the last update
    pub fn pause(&mut self) -> Result<(), ClockError> {
        self.clock.pause()
    }

    /// Rewinds to the start
    pub fn stop(&mut self) {
        self.clock.stop();
        self.refresh_lyrics(true);
    }

    /// Moves to `time_seconds` in the song
    pub fn seek(&mut self, time_seconds: f64, now: f64) {
        self.clock.seek(time_seconds, now);
        self.refresh_lyrics(true);
    }

    /// Snapshot of the clock
    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    /// The underlying clock
    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Lyric cues of the loaded song
    pub fn lyrics(&self) -> &[LyricCue] {
        &self.lyrics
    }

    /// Settings
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// The audio sink
    pub fn audio(&self) -> &A {
        &self.audio
    }

    /// The lyric sink
    pub fn lyric_sink(&self) -> &L {
        &self.lyric_sink
    }

    /// Sends the lyric window if the current cue moved, or always when `force` is set
    fn refresh_lyrics(&mut self, force: bool) {
        let time = self.clock.current_time();
        let index = current_index(&self.lyrics, time);

        if !force && index == self.shown {
            return;
        }

        if let Some(window) = window_at(&self.lyrics, time) {
            self.lyric_sink.show(window);
        }
        self.shown = index;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        format_time, note_frequency, velocity_gain, AudioSink, LyricSink, Player, PlayerConfig,
    };
    use crate::{
        playback::PlaybackStatus,
        timeline::{
            lyrics::LyricWindow,
            schedule,
            tests::{lyric, midi, note_off, note_on, tempo},
            ScheduleError,
        },
    };

    #[derive(Debug, Default)]
    struct RecordingAudio {
        notes: Vec<(u8, u8, f64)>,
    }

    impl AudioSink for RecordingAudio {
        fn play_note(&mut self, note: u8, velocity: u8, duration_seconds: f64) {
            self.notes.push((note, velocity, duration_seconds));
        }
    }

    #[derive(Debug, Default)]
    struct RecordingLyrics {
        lines: Vec<(Option<String>, String, Option<String>)>,
    }

    impl LyricSink for RecordingLyrics {
        fn show(&mut self, window: LyricWindow<'_>) {
            self.lines.push((
                window.previous.map(|cue| cue.text().to_string()),
                window.current.text().to_string(),
                window.next.map(|cue| cue.text().to_string()),
            ));
        }
    }

    fn current_lines(lyrics: &RecordingLyrics) -> Vec<&str> {
        lyrics.lines.iter().map(|(_, line, _)| line.as_str()).collect()
    }

    /// Lyrics at 0.0 and 0.5, notes at 0.0 and 0.5 plus a silent note on and a note off
    fn player(config: PlayerConfig) -> Player<RecordingAudio, RecordingLyrics> {
        let song = midi(
            480,
            vec![
                vec![lyric(0, "Hel"), lyric(480, "lo")],
                vec![
                    note_on(0, 60, 100),
                    note_on(480, 60, 0),
                    note_on(0, 64, 80),
                    note_off(480, 64),
                ],
            ],
        );

        Player::new(
            schedule(&song, config.tempo_override),
            config,
            RecordingAudio::default(),
            RecordingLyrics::default(),
        )
    }

    #[test]
    fn pitch_and_gain_helpers() {
        assert!((note_frequency(69) - 440.0).abs() < 1e-9);
        assert!((note_frequency(81) - 880.0).abs() < 1e-9);
        assert!((note_frequency(57) - 220.0).abs() < 1e-9);
        assert_eq!(velocity_gain(127), 1.0);
        assert_eq!(velocity_gain(0), 0.0);
    }

    #[test]
    fn time_formats_as_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(61.9), "1:01");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(-4.0), "0:00");
    }

    #[test]
    fn update_plays_audible_notes_only() {
        let mut player = player(PlayerConfig::default());
        player.play(0.0).expect("Play");

        assert_eq!(player.update(0.0), 1);
        assert_eq!(player.update(0.25), 0);
        assert_eq!(player.update(0.5), 1);

        assert_eq!(player.audio().notes, vec![(60, 100, 0.5), (64, 80, 0.5)]);
    }

    #[test]
    fn note_duration_comes_from_the_config() {
        let mut player = player(PlayerConfig {
            note_duration: 0.2,
            ..PlayerConfig::default()
        });
        player.play(0.0).expect("Play");
        player.update(0.0);

        assert_eq!(player.audio().notes, vec![(60, 100, 0.2)]);
    }

    #[test]
    fn lyrics_are_pushed_when_the_line_changes() {
        let mut player = player(PlayerConfig::default());
        player.play(0.0).expect("Play");

        player.update(0.0);
        player.update(0.1);
        player.update(0.2);
        player.update(0.6);

        assert_eq!(
            player.lyric_sink().lines,
            vec![
                (None, "Hel".to_string(), Some("lo".to_string())),
                (Some("Hel".to_string()), "lo".to_string(), None),
            ]
        );
    }

    #[test]
    fn seek_refreshes_lyrics_immediately() {
        let mut player = player(PlayerConfig::default());

        player.seek(0.7, 0.0);
        assert_eq!(current_lines(player.lyric_sink()), vec!["lo"]);

        player.stop();
        assert_eq!(current_lines(player.lyric_sink()), vec!["lo", "Hel"]);
        assert_eq!(player.state().status, PlaybackStatus::Stopped);
    }

    #[test]
    fn playing_to_the_end_stops() {
        let mut player = player(PlayerConfig::default());
        player.play(0.0).expect("Play");

        assert_eq!(player.update(3.0), 2);
        assert_eq!(player.state().status, PlaybackStatus::Stopped);
    }

    #[test]
    fn pause_holds_notes_back() {
        let mut player = player(PlayerConfig::default());
        player.play(0.0).expect("Play");
        player.update(0.1);
        player.pause().expect("Pause");

        assert_eq!(player.update(5.0), 0);

        player.play(5.0).expect("Resume");
        assert_eq!(player.update(5.4), 1);
    }

    #[test]
    fn config_options_reach_the_scheduler() {
        let song = midi(
            480,
            vec![vec![tempo(0, 500_000), note_on(480, 60, 100)]],
        );
        let config = PlayerConfig {
            tempo_override: Some(1_000_000),
            time_warp: 2.0,
            ..PlayerConfig::default()
        };

        let player = Player::from_midi(
            &song,
            config,
            RecordingAudio::default(),
            RecordingLyrics::default(),
        )
        .expect("Valid config");

        assert!((player.clock().timeline().duration() - 2.0).abs() < 1e-9);
        assert_eq!(player.config(), &config);
        assert!(player.lyrics().is_empty());
    }

    #[test]
    fn backwards_time_warp_is_refused() {
        let song = midi(480, vec![vec![note_on(0, 60, 100), note_on(480, 62, 100)]]);
        let config = PlayerConfig {
            time_warp: -1.0,
            ..PlayerConfig::default()
        };

        let player = Player::from_midi(
            &song,
            config,
            RecordingAudio::default(),
            RecordingLyrics::default(),
        );

        assert_eq!(player.err(), Some(ScheduleError::TimeWarp(-1.0)));
    }
}
