// Standard MIDI File decoding
// Chunk iteration, event decoding, meta interpretation and lyric line reassembly

pub mod decoder;
pub mod event;
pub mod lyrics;
pub mod meta;
pub mod sequence;
pub mod vlq;

pub use event::{Event, EventKind, MetaEvent, MidiMessage, TextEvent, TextKind};
pub use sequence::{DecodeOptions, Division, Sequence, SequenceSummary, Track};

use thiserror::Error;

/// Fatal decoding errors. A failed decode leaves no partial sequence behind.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid MIDI file format: {0}")]
    InvalidFormat(String),

    #[error("Unexpected end of data while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("Data byte at tick {tick} without an established running status")]
    MissingRunningStatus { tick: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
