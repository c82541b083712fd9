//! Small Standard MIDI File writer shared by the integration tests

#![allow(dead_code)]

use smfplay::smf::vlq;

/// Builds one track chunk body from delta-timed events
#[derive(Debug, Default, Clone)]
pub struct TrackWriter {
    bytes: Vec<u8>,
}

impl TrackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(mut self, delta: u32, bytes: &[u8]) -> Self {
        self.bytes.extend(vlq::encode(delta));
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn note_on(self, delta: u32, channel: u8, note: u8, velocity: u8) -> Self {
        self.raw(delta, &[0x90 | channel, note, velocity])
    }

    pub fn note_off(self, delta: u32, channel: u8, note: u8) -> Self {
        self.raw(delta, &[0x80 | channel, note, 0])
    }

    pub fn meta(mut self, delta: u32, meta_type: u8, data: &[u8]) -> Self {
        self.bytes.extend(vlq::encode(delta));
        self.bytes.extend_from_slice(&[0xFF, meta_type]);
        self.bytes.extend(vlq::encode(data.len() as u32));
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn tempo(self, delta: u32, microseconds_per_quarter: u32) -> Self {
        let b = microseconds_per_quarter.to_be_bytes();
        self.meta(delta, 0x51, &b[1..])
    }

    pub fn time_signature(self, delta: u32, numerator: u8, denominator_exponent: u8) -> Self {
        self.meta(delta, 0x58, &[numerator, denominator_exponent, 24, 8])
    }

    pub fn key_signature(self, delta: u32, fifths: i8, minor: bool) -> Self {
        self.meta(delta, 0x59, &[fifths as u8, u8::from(minor)])
    }

    pub fn text(self, delta: u32, meta_type: u8, text: &str) -> Self {
        self.meta(delta, meta_type, text.as_bytes())
    }

    /// Body with End-Of-Track appended
    pub fn finish(self) -> Vec<u8> {
        self.meta(0, 0x2F, &[]).bytes
    }

    /// Body without End-Of-Track
    pub fn unterminated(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

pub fn smf(format: u16, ticks_per_quarter: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(&format.to_be_bytes());
    header.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    header.extend_from_slice(&ticks_per_quarter.to_be_bytes());
    let mut out = chunk(b"MThd", &header);
    for track in tracks {
        out.extend(chunk(b"MTrk", track));
    }
    out
}

/// Messages other than the all-sound-off / pitch-bend-center resets
pub fn played(messages: &[Vec<u8>]) -> Vec<Vec<u8>> {
    messages
        .iter()
        .filter(|m| {
            !smfplay::MidiEvent::from_bytes(m).is_some_and(|event| event.is_reset())
        })
        .cloned()
        .collect()
}
