// Event decoder - One delta-time/event pair at a time
// Applies running status to channel-voice messages

use super::event::{Event, EventKind, MidiMessage, is_channel_voice_status};
use super::meta::{self, MetaOutcome};
use super::vlq;
use super::{DecodeError, DecodeResult};
use encoding_rs::Encoding;

/// One decoding step
#[derive(Debug)]
pub struct DecodedEvent<'a> {
    /// Absolute tick of the event
    pub tick: u64,
    /// `None` when the event was End-Of-Track
    pub event: Option<Event>,
    /// Bytes following the event
    pub rest: &'a [u8],
    /// Running status in effect for the next event
    pub running_status: Option<u8>,
}

/// Number of data bytes following a status byte
fn data_length(status: u8) -> usize {
    match status {
        0xF2 => 2,        // Song Position (LSB, MSB)
        0xF1 | 0xF3 => 1, // Quarter Frame, Song Select
        0xF4..=0xFE => 0, // Tune Request, undefined, realtime
        _ => match status & 0xF0 {
            0xC0 | 0xD0 => 1, // Program Change, Channel Pressure
            _ => 2,           // Note Off/On, Poly Pressure, Control Change, Pitch Bend
        },
    }
}

fn take<'a>(
    bytes: &'a [u8],
    count: usize,
    context: &'static str,
) -> DecodeResult<(&'a [u8], &'a [u8])> {
    if bytes.len() < count {
        return Err(DecodeError::UnexpectedEof { context });
    }
    Ok(bytes.split_at(count))
}

/// Decode exactly one event from the front of `bytes`.
///
/// `previous_tick` is the absolute tick of the preceding event in the track and
/// `running_status` the last channel-voice status seen (if any).
pub fn decode_event<'a>(
    bytes: &'a [u8],
    previous_tick: u64,
    running_status: Option<u8>,
    fallback: &'static Encoding,
) -> DecodeResult<DecodedEvent<'a>> {
    let (delta, rest) = vlq::decode(bytes)?;
    let tick = previous_tick + u64::from(delta);

    let &first = rest
        .first()
        .ok_or(DecodeError::UnexpectedEof { context: "event status" })?;

    // Data byte first: reuse the running status, this byte is data
    let (status, rest) = if first & 0x80 == 0 {
        let status = running_status.ok_or(DecodeError::MissingRunningStatus { tick })?;
        (status, rest)
    } else {
        (first, &rest[1..])
    };

    let decoded = |event: Option<EventKind>, rest: &'a [u8], running_status: Option<u8>| {
        DecodedEvent {
            tick,
            event: event.map(|kind| Event::new(tick, kind)),
            rest,
            running_status,
        }
    };

    match status {
        0xFF => {
            let (&meta_type, rest) = rest
                .split_first()
                .ok_or(DecodeError::UnexpectedEof { context: "meta event type" })?;
            let (data, rest) = vlq::decode_length_prefixed_block(rest)?;
            match meta::interpret(meta_type, data, fallback) {
                MetaOutcome::EndOfTrack => Ok(decoded(None, rest, running_status)),
                MetaOutcome::Event(meta) => {
                    Ok(decoded(Some(EventKind::Meta(meta)), rest, running_status))
                }
            }
        }
        0xF0 | 0xF7 => {
            let (data, rest) = vlq::decode_length_prefixed_block(rest)?;
            let kind = EventKind::SysEx {
                status,
                data: data.to_vec(),
            };
            Ok(decoded(Some(kind), rest, running_status))
        }
        _ => {
            let (data, rest) = take(rest, data_length(status), "event data")?;
            let kind = EventKind::Midi(MidiMessage::new(status, data));
            let running_status = if is_channel_voice_status(status) {
                Some(status)
            } else {
                running_status
            };
            Ok(decoded(Some(kind), rest, running_status))
        }
    }
}

/// Iterator over the events of one track chunk.
///
/// Ends at End-Of-Track or when the chunk is exhausted. After an error the
/// iterator is fused so corrupted state is never read again.
#[derive(Debug)]
pub struct TrackDecoder<'a> {
    raw: &'a [u8],
    tick: u64,
    running_status: Option<u8>,
    fallback: &'static Encoding,
    finished: bool,
}

impl<'a> TrackDecoder<'a> {
    pub fn new(raw: &'a [u8], fallback: &'static Encoding) -> Self {
        Self {
            raw,
            tick: 0,
            running_status: None,
            fallback,
            finished: false,
        }
    }

    /// Absolute tick reached so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// Bytes not decoded yet
    pub fn unread(&self) -> &'a [u8] {
        self.raw
    }
}

impl Iterator for TrackDecoder<'_> {
    type Item = DecodeResult<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.raw.is_empty() {
            return None;
        }
        match decode_event(self.raw, self.tick, self.running_status, self.fallback) {
            Ok(decoded) => {
                self.raw = decoded.rest;
                self.tick = decoded.tick;
                self.running_status = decoded.running_status;
                match decoded.event {
                    Some(event) => Some(Ok(event)),
                    None => {
                        self.finished = true;
                        None
                    }
                }
            }
            Err(e) => {
                self.finished = true;
                self.raw = &[];
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smf::event::{MetaEvent, TextKind};
    use encoding_rs::SHIFT_JIS;

    fn decode_all(bytes: &[u8]) -> DecodeResult<Vec<Event>> {
        TrackDecoder::new(bytes, SHIFT_JIS).collect()
    }

    #[test]
    fn test_running_status_note_on() {
        let bytes = [0x00, 0x90, 60, 100, 0x60, 60, 0];
        let events = decode_all(&bytes).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Midi(MidiMessage::new(0x90, &[60, 100])));
        assert_eq!(events[1].kind, EventKind::Midi(MidiMessage::new(0x90, &[60, 0])));
        assert_eq!(events[0].tick, 0);
        assert_eq!(events[1].tick, 0x60);
    }

    #[test]
    fn test_running_status_single_data_byte() {
        // Program change followed by an omitted-status program change
        let bytes = [0x00, 0xC3, 5, 0x10, 7];
        let events = decode_all(&bytes).unwrap();
        assert_eq!(events[1].kind, EventKind::Midi(MidiMessage::new(0xC3, &[7])));
        assert_eq!(events[1].tick, 0x10);
    }

    #[test]
    fn test_missing_running_status() {
        let bytes = [0x00, 60, 100];
        assert!(matches!(
            decode_all(&bytes),
            Err(DecodeError::MissingRunningStatus { tick: 0 })
        ));
    }

    #[test]
    fn test_meta_and_sysex_keep_running_status() {
        let bytes = [
            0x00, 0x91, 64, 90, // Note On ch 1
            0x00, 0xFF, 0x06, 0x01, b'A', // Marker
            0x00, 0xF0, 0x03, 0x43, 0x12, 0xF7, // SysEx
            0x00, 64, 0, // Running status across meta and sysex
        ];
        let events = decode_all(&bytes).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[3].kind, EventKind::Midi(MidiMessage::new(0x91, &[64, 0])));
        assert_eq!(
            events[2].kind,
            EventKind::SysEx {
                status: 0xF0,
                data: vec![0x43, 0x12, 0xF7]
            }
        );
    }

    #[test]
    fn test_system_common_lengths() {
        let bytes = [
            0x00, 0xF2, 0x10, 0x20, // Song Position
            0x00, 0xF3, 0x02, // Song Select
            0x00, 0xF6, // Tune Request
        ];
        let events = decode_all(&bytes).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::Midi(MidiMessage::new(0xF2, &[0x10, 0x20])));
        assert_eq!(events[1].kind, EventKind::Midi(MidiMessage::new(0xF3, &[0x02])));
        assert_eq!(events[2].kind, EventKind::Midi(MidiMessage::new(0xF6, &[])));
    }

    #[test]
    fn test_system_common_does_not_set_running_status() {
        let bytes = [0x00, 0xF3, 0x02, 0x00, 60, 100];
        assert!(matches!(
            decode_all(&bytes),
            Err(DecodeError::MissingRunningStatus { .. })
        ));
    }

    #[test]
    fn test_end_of_track_stops_iteration() {
        let bytes = [
            0x00, 0xFF, 0x05, 0x02, b'l', b'a', // Lyric
            0x83, 0x60, 0xFF, 0x2F, 0x00, // End of track at +480
            0x00, 0x90, 60, 100, // Never decoded
        ];
        let mut decoder = TrackDecoder::new(&bytes, SHIFT_JIS);
        let first = decoder.next().unwrap().unwrap();
        match first.kind {
            EventKind::Meta(MetaEvent::Text(ref text)) => {
                assert_eq!(text.kind, TextKind::Lyric);
                assert_eq!(text.text, "la");
            }
            ref other => panic!("Expected lyric, got {:?}", other),
        }
        assert!(decoder.next().is_none());
        assert_eq!(decoder.tick(), 480);
        assert_eq!(decoder.unread().len(), 4);
    }

    #[test]
    fn test_truncated_event_is_fatal() {
        let bytes = [0x00, 0x90, 60];
        let mut decoder = TrackDecoder::new(&bytes, SHIFT_JIS);
        assert!(matches!(
            decoder.next(),
            Some(Err(DecodeError::UnexpectedEof { .. }))
        ));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_truncated_meta_is_fatal() {
        let bytes = [0x00, 0xFF, 0x51, 0x03, 0x07];
        assert!(decode_all(&bytes).is_err());
    }
}
