//! Lyric cues pulled from a timeline's text meta events

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Timeline;
use crate::chunk::track::{
    meta::{LYRIC, MARKER, TEXT},
    Event, MetaEvent,
};

/// A line or syllable of lyrics and when it should show
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LyricCue {
    /// Seconds since the start of the song
    time_seconds: f64,
    /// Trimmed text
    text: String,
    /// Track the text came from
    track: usize,
}

impl LyricCue {
    /// Creates a cue
    pub fn new(time_seconds: f64, text: impl Into<String>, track: usize) -> Self {
        Self {
            time_seconds,
            text: text.into(),
            track,
        }
    }

    /// Seconds since the start of the song
    pub fn time_seconds(&self) -> f64 {
        self.time_seconds
    }

    /// Trimmed text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Track the text came from
    pub fn track(&self) -> usize {
        self.track
    }
}

/// Trims `text` and returns it if it is something a singer should see. Empty text, a lone
/// backslash and `@` prefixed karaoke file headers (`@KMIDI`, `@T` titles) are dropped.
pub fn displayable(text: &str) -> Option<&str> {
    let text = text.trim();

    if text.is_empty() || text == "\\" || text.starts_with('@') {
        None
    } else {
        Some(text)
    }
}

/// Collects text, lyric and marker events in time order. Cues at the same time keep their
/// timeline order.
pub fn extract_lyrics(timeline: &Timeline) -> Vec<LyricCue> {
    let mut cues: Vec<LyricCue> = timeline
        .events()
        .iter()
        .filter_map(|timed| match timed.event() {
            Event::MetaEvent(MetaEvent::Text { subtype, text })
                if matches!(*subtype, TEXT | LYRIC | MARKER) =>
            {
                displayable(text)
                    .map(|text| LyricCue::new(timed.time_seconds(), text, timed.track()))
            }
            _ => None,
        })
        .collect();

    cues.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
    cues
}

/// The cues around a point in time, as a karaoke display shows them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LyricWindow<'a> {
    /// Index of `current` in the cue list
    pub index: usize,
    /// The cue before the current one
    pub previous: Option<&'a LyricCue>,
    /// The cue being sung, or the first one before singing starts
    pub current: &'a LyricCue,
    /// The cue after the current one
    pub next: Option<&'a LyricCue>,
}

/// Index of the last cue at or before `time_seconds`. Before the first cue this is still 0 so
/// the opening line is visible ahead of time. `None` only when there are no cues.
pub fn current_index(cues: &[LyricCue], time_seconds: f64) -> Option<usize> {
    if cues.is_empty() {
        return None;
    }

    let started = cues.partition_point(|cue| cue.time_seconds <= time_seconds);
    Some(started.saturating_sub(1))
}

/// Previous, current and next cue at `time_seconds`
pub fn window_at(cues: &[LyricCue], time_seconds: f64) -> Option<LyricWindow<'_>> {
    let index = current_index(cues, time_seconds)?;

    Some(LyricWindow {
        index,
        previous: index.checked_sub(1).and_then(|i| cues.get(i)),
        current: &cues[index],
        next: cues.get(index + 1),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{current_index, displayable, extract_lyrics, window_at, LyricCue};
    use crate::{
        chunk::track::{Event, MTrkEvent, MetaEvent},
        timeline::{
            schedule,
            tests::{lyric, midi, note_on},
        },
    };

    fn text_event(delta: u32, subtype: u8, text: &str) -> MTrkEvent {
        MTrkEvent::new(
            delta,
            Event::MetaEvent(MetaEvent::Text {
                subtype,
                text: text.to_string(),
            }),
        )
    }

    #[test]
    fn filtering_drops_headers_and_blanks() {
        assert_eq!(displayable("@KMIDI KARAOKE FILE"), None);
        assert_eq!(displayable("\\"), None);
        assert_eq!(displayable("  "), None);
        assert_eq!(displayable(" \\ "), None);
        assert_eq!(displayable("Hello"), Some("Hello"));
        assert_eq!(displayable(" world "), Some("world"));
    }

    #[test]
    fn lyrics_come_out_in_time_order() {
        let song = midi(
            480,
            vec![
                vec![
                    lyric(0, "@KMIDI"),
                    lyric(0, "\\"),
                    lyric(480, "  "),
                    lyric(0, "Hello"),
                ],
                vec![lyric(240, " world "), note_on(720, 60, 100)],
            ],
        );

        let cues = extract_lyrics(&schedule(&song, None));

        assert_eq!(
            cues,
            vec![LyricCue::new(0.25, "world", 1), LyricCue::new(0.5, "Hello", 0)]
        );
    }

    #[test]
    fn only_text_lyric_and_marker_subtypes_count() {
        let song = midi(
            480,
            vec![vec![
                text_event(0, 0x01, "text"),
                text_event(0, 0x02, "copyright"),
                text_event(0, 0x03, "track name"),
                text_event(0, 0x05, "lyric"),
                text_event(0, 0x06, "marker"),
            ]],
        );

        let texts: Vec<_> = extract_lyrics(&schedule(&song, None))
            .into_iter()
            .map(|cue| cue.text)
            .collect();

        assert_eq!(texts, vec!["text", "lyric", "marker"]);
    }

    #[test]
    fn equal_times_keep_discovery_order() {
        let song = midi(
            480,
            vec![
                vec![lyric(480, "b"), lyric(0, "c")],
                vec![lyric(480, "a")],
            ],
        );

        let texts: Vec<_> = extract_lyrics(&schedule(&song, None))
            .into_iter()
            .map(|cue| cue.text)
            .collect();

        assert_eq!(texts, vec!["b", "c", "a"]);
    }

    #[test]
    fn window_tracks_the_current_cue() {
        let cues = vec![
            LyricCue::new(1.0, "one", 0),
            LyricCue::new(2.0, "two", 0),
            LyricCue::new(3.0, "three", 0),
        ];

        assert_eq!(current_index(&cues, 0.0), Some(0));
        assert_eq!(current_index(&cues, 2.0), Some(1));
        assert_eq!(current_index(&cues, 9.0), Some(2));
        assert_eq!(current_index(&[], 1.0), None);

        let window = window_at(&cues, 2.5).expect("Cues exist");
        assert_eq!(window.previous.map(LyricCue::text), Some("one"));
        assert_eq!(window.current.text(), "two");
        assert_eq!(window.next.map(LyricCue::text), Some("three"));

        let window = window_at(&cues, 0.5).expect("Cues exist");
        assert_eq!(window.previous, None);
        assert_eq!(window.current.text(), "one");
    }
}
