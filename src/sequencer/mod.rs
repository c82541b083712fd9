// Sequencer module
// Musical time context, transport clock and the playback engine

pub mod player;
pub mod timeline;
pub mod transport;

pub use player::{Cursor, RunOutcome, Sequencer, run};
pub use timeline::{KeySignature, Tempo, TimeSignature, beat_phase};
pub use transport::{IntervalClock, TransportState};
