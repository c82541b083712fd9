// MIDI message types

pub mod event;

pub use event::MidiEvent;
