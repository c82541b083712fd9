// Lyric merger - Reassembles karaoke lyric fragments into display lines
//
// Karaoke files split each sung line into many short Text or Lyric meta events.
// The merger synthesizes one Lyric event per line, stamped slightly before the
// first fragment so a display can show the line ahead of time, and records on
// every fragment how much of the line is sung once playback reaches it.

use super::event::{Event, EventKind, MetaEvent, TextEvent, TextKind};
use super::sequence::insert_by_tick;

/// Line grows past this many characters before a pause forces a new line
const LONG_LINE_CHARS: usize = 127;

/// Fragments shorter than this (trimmed) are syllables rather than whole lines
const SHORT_FRAGMENT_CHARS: usize = 4;

/// Line-break convention of a track, fixed by the first fragment that starts a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Nothing seen yet
    Undetermined,
    /// Text events, new line on a leading `\`, `/` breaks inside a line
    TextEscape,
    /// Lyric events, new line on a leading newline
    LyricNewline,
    /// Lyric events without markers, lines start at syllables or whole words
    ShortFragment,
}

/// Where the builder should put the fragment after merging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Push onto the track only
    Track,
    /// Push onto the track and into the sequence-wide lyric index
    TrackAndLyrics,
    /// Drop the fragment
    Discard,
}

/// Indices of the line being appended to, in the track and in the lyric index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenLine {
    track_index: usize,
    lyrics_index: usize,
}

/// Per-track merge state, discarded once the track is decoded
#[derive(Debug, Clone)]
pub struct LyricMergeState {
    dialect: Dialect,
    last_fragment_tick: u64,
    open_line: Option<OpenLine>,
    ticks_per_quarter: u16,
}

impl LyricMergeState {
    pub fn new(ticks_per_quarter: u16) -> Self {
        Self {
            dialect: Dialect::Undetermined,
            last_fragment_tick: 0,
            open_line: None,
            ticks_per_quarter,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn max_lead_ticks(&self) -> u64 {
        u64::from(self.ticks_per_quarter) * 2
    }

    /// Merge a Text or Lyric event decoded at `event.tick`.
    ///
    /// `track` holds the events decoded so far in this track, `lyrics` the
    /// sequence-wide lyric index. Other event kinds are left untouched.
    pub fn merge(
        &mut self,
        event: &mut Event,
        track: &mut Vec<Event>,
        lyrics: &mut Vec<Event>,
    ) -> Placement {
        let tick = event.tick;
        let Some(fragment) = event.text_mut() else {
            return Placement::Track;
        };

        match fragment.kind {
            TextKind::Text => self.merge_text(fragment, tick, track, lyrics),
            TextKind::Lyric => self.merge_lyric(fragment, tick, track, lyrics),
            _ => Placement::Track,
        }
    }

    fn merge_text(
        &mut self,
        fragment: &mut TextEvent,
        tick: u64,
        track: &mut Vec<Event>,
        lyrics: &mut Vec<Event>,
    ) -> Placement {
        match self.dialect {
            Dialect::LyricNewline => Placement::Discard,
            Dialect::Undetermined | Dialect::TextEscape if fragment.text.starts_with('\\') => {
                fragment.text.remove(0);
                self.dialect = Dialect::TextEscape;
                self.start_line(fragment, tick, track, lyrics);
                Placement::Track
            }
            Dialect::TextEscape if self.open_line.is_some() => {
                if fragment.text.starts_with('/') {
                    fragment.text.replace_range(..1, "\n");
                }
                self.append(fragment, tick, track, lyrics);
                Placement::Track
            }
            _ => Placement::Track,
        }
    }

    fn merge_lyric(
        &mut self,
        fragment: &mut TextEvent,
        tick: u64,
        track: &mut Vec<Event>,
        lyrics: &mut Vec<Event>,
    ) -> Placement {
        match self.dialect {
            Dialect::TextEscape => Placement::Discard,
            Dialect::Undetermined => {
                if fragment.text.starts_with('\n') {
                    fragment.text.remove(0);
                    self.dialect = Dialect::LyricNewline;
                    self.start_line(fragment, tick, track, lyrics);
                    Placement::Track
                } else if is_short_fragment(&fragment.text) {
                    self.dialect = Dialect::ShortFragment;
                    self.start_line(fragment, tick, track, lyrics);
                    Placement::Track
                } else {
                    Placement::TrackAndLyrics
                }
            }
            Dialect::LyricNewline => {
                if fragment.text.starts_with('\n') {
                    fragment.text.remove(0);
                    self.start_line(fragment, tick, track, lyrics);
                } else if self.line_overflows(tick, track) || self.open_line.is_none() {
                    self.start_line(fragment, tick, track, lyrics);
                } else {
                    self.append(fragment, tick, track, lyrics);
                }
                Placement::Track
            }
            Dialect::ShortFragment => {
                let trimmed = fragment.text.trim().chars().count();
                if fragment.text.starts_with('\n') {
                    fragment.text.remove(0);
                    self.start_line(fragment, tick, track, lyrics);
                } else if trimmed >= SHORT_FRAGMENT_CHARS || self.open_line.is_none() {
                    self.start_line(fragment, tick, track, lyrics);
                } else {
                    self.append(fragment, tick, track, lyrics);
                }
                Placement::Track
            }
        }
    }

    /// Long line and a pause of more than two quarters since the last fragment
    fn line_overflows(&self, tick: u64, track: &[Event]) -> bool {
        let Some(line) = self.open_line else {
            return false;
        };
        let long = track[line.track_index]
            .text()
            .is_some_and(|text| text.text.chars().count() > LONG_LINE_CHARS);
        long && tick.saturating_sub(self.last_fragment_tick) > self.max_lead_ticks()
    }

    /// Synthesize a new line event from `fragment` and make it the open line
    fn start_line(
        &mut self,
        fragment: &mut TextEvent,
        tick: u64,
        track: &mut Vec<Event>,
        lyrics: &mut Vec<Event>,
    ) {
        let previous_tick = track
            .iter()
            .rev()
            .find(|e| e.text().is_some_and(|text| text.kind == fragment.kind))
            .map_or(0, |e| e.tick);
        let lead = self.max_lead_ticks().min(tick.saturating_sub(previous_tick));

        let line = Event::new(
            tick - lead,
            EventKind::Meta(MetaEvent::Text(TextEvent::new(
                TextKind::Lyric,
                fragment.text.clone(),
            ))),
        );
        let lyrics_index = insert_by_tick(lyrics, line.clone());
        let track_index = insert_by_tick(track, line);

        fragment.reveal_position = Some(fragment.text.len());
        self.last_fragment_tick = tick;
        self.open_line = Some(OpenLine {
            track_index,
            lyrics_index,
        });
    }

    /// Append `fragment` to the open line in both the track and the lyric index
    fn append(
        &mut self,
        fragment: &mut TextEvent,
        tick: u64,
        track: &mut [Event],
        lyrics: &mut [Event],
    ) {
        let Some(line) = self.open_line else {
            return;
        };
        let mut length = 0;
        for event in [&mut track[line.track_index], &mut lyrics[line.lyrics_index]] {
            if let Some(text) = event.text_mut() {
                text.text.push_str(&fragment.text);
                length = text.text.len();
            }
        }
        fragment.reveal_position = Some(length);
        self.last_fragment_tick = tick;
    }
}

fn is_short_fragment(text: &str) -> bool {
    let length = text.trim().chars().count();
    0 < length && length < SHORT_FRAGMENT_CHARS
}
