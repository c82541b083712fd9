// smfplay - Standard MIDI File decoder and tick-accurate sequencer

pub mod config;
pub mod messaging;
pub mod midi;
pub mod sequencer;
pub mod smf;

// Re-export commonly used types for convenience
pub use config::{ConfigError, PlayerConfig};
pub use messaging::{
    Command, DisplaySink, DisplayUpdate, MidiSink, create_command_channel, create_display_channel,
    create_message_channel,
};
pub use midi::event::MidiEvent;
pub use sequencer::{KeySignature, RunOutcome, Sequencer, Tempo, TimeSignature, TransportState};
pub use smf::{DecodeError, DecodeOptions, Event, EventKind, MetaEvent, Sequence, SequenceSummary};
