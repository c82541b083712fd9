// Display updates - Sequencer state changes for rendering collaborators

use crate::sequencer::timeline::{KeySignature, Tempo, TimeSignature};
use crate::sequencer::transport::TransportState;
use std::fmt;

/// Category of a display update, used by consumers to filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCategory {
    Transport,
    Position,
    Text,
    Musical,
}

/// One change of displayed state
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayUpdate {
    /// A new sequence replaced the previous one
    SequenceLoaded {
        title: Option<String>,
        tick_length: u64,
    },
    Transport(TransportState),
    /// Integer tick position, bound to a slider over `[0, tick_length]`
    Position { tick: u64, tick_length: u64 },
    /// Current lyric line; the first `reveal` bytes have been sung
    Lyric { text: String, reveal: usize },
    Marker(String),
    Text(String),
    Tempo(Tempo),
    TimeSignature(TimeSignature),
    KeySignature(KeySignature),
    /// Beat within the bar, 0 on the downbeat
    Beat(u32),
}

impl DisplayUpdate {
    pub fn category(&self) -> UpdateCategory {
        match self {
            DisplayUpdate::SequenceLoaded { .. } | DisplayUpdate::Transport(_) => {
                UpdateCategory::Transport
            }
            DisplayUpdate::Position { .. } => UpdateCategory::Position,
            DisplayUpdate::Lyric { .. } | DisplayUpdate::Marker(_) | DisplayUpdate::Text(_) => {
                UpdateCategory::Text
            }
            DisplayUpdate::Tempo(_)
            | DisplayUpdate::TimeSignature(_)
            | DisplayUpdate::KeySignature(_)
            | DisplayUpdate::Beat(_) => UpdateCategory::Musical,
        }
    }
}

impl fmt::Display for DisplayUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayUpdate::SequenceLoaded { title, tick_length } => write!(
                f,
                "Loaded '{}' ({} ticks)",
                title.as_deref().unwrap_or("untitled"),
                tick_length
            ),
            DisplayUpdate::Transport(state) => write!(f, "Transport: {:?}", state),
            DisplayUpdate::Position { tick, tick_length } => {
                write!(f, "Position: {}/{}", tick, tick_length)
            }
            DisplayUpdate::Lyric { text, reveal } => {
                let split = text
                    .char_indices()
                    .map(|(i, _)| i)
                    .chain(std::iter::once(text.len()))
                    .take_while(|&i| i <= *reveal)
                    .last()
                    .unwrap_or(0);
                let (sung, rest) = text.split_at(split);
                write!(f, "Lyric: [{}]{}", sung, rest)
            }
            DisplayUpdate::Marker(text) => write!(f, "Marker: {}", text),
            DisplayUpdate::Text(text) => write!(f, "Text: {}", text),
            DisplayUpdate::Tempo(tempo) => write!(f, "Tempo: {}", tempo),
            DisplayUpdate::TimeSignature(ts) => write!(f, "Time signature: {}", ts),
            DisplayUpdate::KeySignature(key) => write!(f, "Key: {}", key),
            DisplayUpdate::Beat(beat) => write!(f, "Beat: {}", beat),
        }
    }
}
