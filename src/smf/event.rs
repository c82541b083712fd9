// Decoded SMF events
// Closed set of payloads: channel/system messages, meta events, system exclusive

use crate::sequencer::timeline::{KeySignature, Tempo, TimeSignature};

pub const META_TEXT: u8 = 0x01;
pub const META_COPYRIGHT: u8 = 0x02;
pub const META_TRACK_NAME: u8 = 0x03;
pub const META_INSTRUMENT_NAME: u8 = 0x04;
pub const META_LYRIC: u8 = 0x05;
pub const META_MARKER: u8 = 0x06;
pub const META_CUE_POINT: u8 = 0x07;
pub const META_END_OF_TRACK: u8 = 0x2F;
pub const META_TEMPO: u8 = 0x51;
pub const META_TIME_SIGNATURE: u8 = 0x58;
pub const META_KEY_SIGNATURE: u8 = 0x59;

/// One event at an absolute tick
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub tick: u64,
    pub kind: EventKind,
}

impl Event {
    pub fn new(tick: u64, kind: EventKind) -> Self {
        Self { tick, kind }
    }

    /// Meta payload, if this is a meta event
    pub fn meta(&self) -> Option<&MetaEvent> {
        match &self.kind {
            EventKind::Meta(meta) => Some(meta),
            _ => None,
        }
    }

    /// Text payload, if this is a text-family meta event
    pub fn text(&self) -> Option<&TextEvent> {
        match self.meta() {
            Some(MetaEvent::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut TextEvent> {
        match &mut self.kind {
            EventKind::Meta(MetaEvent::Text(text)) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Channel-voice or system-common message, ready for a MIDI port
    Midi(MidiMessage),
    /// Sequencer-only metadata, never sent to a port
    Meta(MetaEvent),
    /// System exclusive; `status` is 0xF0 (complete) or 0xF7 (continuation/escape)
    SysEx { status: u8, data: Vec<u8> },
}

impl EventKind {
    /// Bytes to forward to a message sink, or `None` for meta events
    pub fn message_bytes(&self) -> Option<Vec<u8>> {
        match self {
            EventKind::Midi(message) => Some(message.to_bytes()),
            EventKind::SysEx { status: 0xF0, data } => {
                let mut bytes = Vec::with_capacity(data.len() + 1);
                bytes.push(0xF0);
                bytes.extend_from_slice(data);
                Some(bytes)
            }
            EventKind::SysEx { data, .. } => Some(data.clone()),
            EventKind::Meta(_) => None,
        }
    }
}

/// A status byte and its data bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiMessage {
    pub status: u8,
    pub data: Vec<u8>,
}

impl MidiMessage {
    pub fn new(status: u8, data: &[u8]) -> Self {
        Self {
            status,
            data: data.to_vec(),
        }
    }

    /// True for 0x80..=0xEF (the only statuses running status applies to)
    pub fn is_channel_voice(&self) -> bool {
        is_channel_voice_status(self.status)
    }

    pub fn channel(&self) -> Option<u8> {
        self.is_channel_voice().then_some(self.status & 0x0F)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() + 1);
        bytes.push(self.status);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

pub fn is_channel_voice_status(status: u8) -> bool {
    (0x80..=0xEF).contains(&status)
}

/// Interpreted meta events (end-of-track is consumed by the decoder, never stored)
#[derive(Debug, Clone, PartialEq)]
pub enum MetaEvent {
    Tempo(Tempo),
    TimeSignature(TimeSignature),
    KeySignature(KeySignature),
    Text(TextEvent),
    Raw { meta_type: u8, data: Vec<u8> },
}

impl MetaEvent {
    pub fn meta_type(&self) -> u8 {
        match self {
            MetaEvent::Tempo(_) => META_TEMPO,
            MetaEvent::TimeSignature(_) => META_TIME_SIGNATURE,
            MetaEvent::KeySignature(_) => META_KEY_SIGNATURE,
            MetaEvent::Text(text) => text.kind.meta_type(),
            MetaEvent::Raw { meta_type, .. } => *meta_type,
        }
    }
}

/// Text-family meta event (types 0x01..=0x0F)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub kind: TextKind,
    pub text: String,
    /// Byte length of the merged lyric line once this fragment is revealed
    pub reveal_position: Option<usize>,
}

impl TextEvent {
    pub fn new(kind: TextKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            reveal_position: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    Text,
    Copyright,
    TrackName,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    Other(u8),
}

impl TextKind {
    pub fn from_meta_type(meta_type: u8) -> Self {
        match meta_type {
            META_TEXT => TextKind::Text,
            META_COPYRIGHT => TextKind::Copyright,
            META_TRACK_NAME => TextKind::TrackName,
            META_INSTRUMENT_NAME => TextKind::InstrumentName,
            META_LYRIC => TextKind::Lyric,
            META_MARKER => TextKind::Marker,
            META_CUE_POINT => TextKind::CuePoint,
            other => TextKind::Other(other),
        }
    }

    pub fn meta_type(&self) -> u8 {
        match self {
            TextKind::Text => META_TEXT,
            TextKind::Copyright => META_COPYRIGHT,
            TextKind::TrackName => META_TRACK_NAME,
            TextKind::InstrumentName => META_INSTRUMENT_NAME,
            TextKind::Lyric => META_LYRIC,
            TextKind::Marker => META_MARKER,
            TextKind::CuePoint => META_CUE_POINT,
            TextKind::Other(meta_type) => *meta_type,
        }
    }
}
