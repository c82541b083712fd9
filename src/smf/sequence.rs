// Sequence builder - Assembles decoded tracks and sequence-wide indices
// Header chunk, track chunks, tempo/signature/lyric/marker indices sorted by tick

use super::decoder::TrackDecoder;
use super::event::{Event, EventKind, MetaEvent, TextKind};
use super::lyrics::{LyricMergeState, Placement};
use super::{DecodeError, DecodeResult};
use crate::sequencer::timeline::{KeySignature, Tempo, TimeSignature};
use encoding_rs::{Encoding, SHIFT_JIS};
use serde::Serialize;
use std::path::Path;

const HEADER_CHUNK_ID: &[u8; 4] = b"MThd";
const TRACK_CHUNK_ID: &[u8; 4] = b"MTrk";
const CHUNK_PREFIX_LEN: usize = 8;

/// Options affecting how bytes are turned into a sequence
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Charset used when text detection fails
    pub fallback_encoding: &'static Encoding,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            fallback_encoding: SHIFT_JIS,
        }
    }
}

/// Time division from the header chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Division {
    TicksPerQuarter(u16),
    /// SMPTE timing, not supported for playback
    Smpte {
        frames_per_second: u8,
        ticks_per_frame: u8,
    },
}

impl Division {
    fn from_bits(bits: u16) -> Self {
        if bits & 0x8000 == 0 {
            return Division::TicksPerQuarter(bits);
        }
        let [frames, ticks_per_frame] = bits.to_be_bytes();
        Division::Smpte {
            frames_per_second: (frames as i8).unsigned_abs(),
            ticks_per_frame,
        }
    }

    /// Ticks per quarter note; SMPTE timing substitutes the ticks in half a second
    pub fn ticks_per_quarter(&self) -> u16 {
        match *self {
            Division::TicksPerQuarter(ticks) => ticks.max(1),
            Division::Smpte {
                frames_per_second,
                ticks_per_frame,
            } => (u16::from(frames_per_second) * u16::from(ticks_per_frame) / 2).max(1),
        }
    }
}

/// One track chunk's events in decode order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub events: Vec<Event>,
    /// First non-empty track name
    pub title: Option<String>,
}

impl Track {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Tick of the last event
    pub fn end_tick(&self) -> u64 {
        self.events.last().map_or(0, |e| e.tick)
    }
}

/// A decoded Standard MIDI File
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub format_type: u16,
    pub division: Division,
    pub tracks: Vec<Track>,
    pub tempos: Vec<Event>,
    pub time_signatures: Vec<Event>,
    pub key_signatures: Vec<Event>,
    pub lyrics: Vec<Event>,
    pub markers: Vec<Event>,
    /// Largest tick reached by any track
    pub tick_length: u64,
    pub title: Option<String>,
}

impl Sequence {
    /// Decode a complete SMF image with default options
    pub fn decode(bytes: &[u8]) -> DecodeResult<Self> {
        Self::decode_with(bytes, &DecodeOptions::default())
    }

    pub fn decode_with(bytes: &[u8], options: &DecodeOptions) -> DecodeResult<Self> {
        SequenceBuilder::new(*options).build(bytes)
    }

    /// Read and decode a file
    pub fn from_file<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> DecodeResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode_with(&bytes, options)
    }

    pub fn ticks_per_quarter(&self) -> u16 {
        self.division.ticks_per_quarter()
    }

    /// Last entry of `index` at or before `tick`
    pub fn last_at_or_before(index: &[Event], tick: u64) -> Option<&Event> {
        let end = index.partition_point(|e| e.tick <= tick);
        end.checked_sub(1).map(|i| &index[i])
    }

    /// Tempo in effect at `tick` (default 120 BPM)
    pub fn tempo_at(&self, tick: u64) -> Tempo {
        match Self::last_at_or_before(&self.tempos, tick).and_then(Event::meta) {
            Some(MetaEvent::Tempo(tempo)) => *tempo,
            _ => Tempo::default(),
        }
    }

    /// Time signature in effect at `tick` and the tick it started at
    pub fn time_signature_at(&self, tick: u64) -> (u64, TimeSignature) {
        match Self::last_at_or_before(&self.time_signatures, tick) {
            Some(Event {
                tick,
                kind: EventKind::Meta(MetaEvent::TimeSignature(ts)),
            }) => (*tick, *ts),
            _ => (0, TimeSignature::default()),
        }
    }

    pub fn key_signature_at(&self, tick: u64) -> KeySignature {
        match Self::last_at_or_before(&self.key_signatures, tick).and_then(Event::meta) {
            Some(MetaEvent::KeySignature(key)) => *key,
            _ => KeySignature::default(),
        }
    }

    /// Playback length in seconds, following every tempo change
    pub fn duration_seconds(&self) -> f64 {
        let tpq = self.ticks_per_quarter();
        let mut seconds = 0.0;
        let mut tick = 0u64;
        let mut tempo = Tempo::default();
        for event in &self.tempos {
            if let Some(MetaEvent::Tempo(next)) = event.meta() {
                let until = event.tick.min(self.tick_length);
                seconds += tempo.ticks_to_seconds(until.saturating_sub(tick) as f64, tpq);
                tick = tick.max(until);
                tempo = *next;
            }
        }
        seconds + tempo.ticks_to_seconds(self.tick_length.saturating_sub(tick) as f64, tpq)
    }

    /// Serializable overview of the sequence
    pub fn summary(&self) -> SequenceSummary {
        let tempos = self
            .tempos
            .iter()
            .filter_map(|e| match e.meta() {
                Some(MetaEvent::Tempo(tempo)) => Some((e.tick, tempo.display_bpm())),
                _ => None,
            })
            .collect();
        let time_signatures = self
            .time_signatures
            .iter()
            .filter_map(|e| match e.meta() {
                Some(MetaEvent::TimeSignature(ts)) => Some((e.tick, ts.to_string())),
                _ => None,
            })
            .collect();
        let key_signatures = self
            .key_signatures
            .iter()
            .filter_map(|e| match e.meta() {
                Some(MetaEvent::KeySignature(key)) => Some((e.tick, key.name())),
                _ => None,
            })
            .collect();

        SequenceSummary {
            title: self.title.clone(),
            format_type: self.format_type,
            division: self.division,
            tick_length: self.tick_length,
            duration_seconds: self.duration_seconds(),
            tracks: self
                .tracks
                .iter()
                .map(|t| TrackSummary {
                    title: t.title.clone(),
                    events: t.len(),
                })
                .collect(),
            tempos,
            time_signatures,
            key_signatures,
            lyric_lines: self.lyrics.len(),
            markers: self
                .markers
                .iter()
                .filter_map(|e| e.text().map(|t| (e.tick, t.text.clone())))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub title: Option<String>,
    pub events: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceSummary {
    pub title: Option<String>,
    pub format_type: u16,
    pub division: Division,
    pub tick_length: u64,
    pub duration_seconds: f64,
    pub tracks: Vec<TrackSummary>,
    pub tempos: Vec<(u64, u32)>,
    pub time_signatures: Vec<(u64, String)>,
    pub key_signatures: Vec<(u64, String)>,
    pub lyric_lines: usize,
    pub markers: Vec<(u64, String)>,
}

/// Insert `event` after the last entry whose tick is not later than its own.
///
/// Returns the index it landed at. Keeps `events` ordered by tick with ties in
/// insertion order.
pub fn insert_by_tick(events: &mut Vec<Event>, event: Event) -> usize {
    let index = events.partition_point(|e| e.tick <= event.tick);
    events.insert(index, event);
    index
}

fn read_u16(bytes: &[u8], at: usize) -> DecodeResult<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(DecodeError::UnexpectedEof { context: "header field" })
}

fn read_u32(bytes: &[u8], at: usize) -> DecodeResult<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(DecodeError::UnexpectedEof { context: "chunk length" })
}

/// Drives chunk iteration and assembles a [`Sequence`]
#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    options: DecodeOptions,
}

impl SequenceBuilder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn build(&self, bytes: &[u8]) -> DecodeResult<Sequence> {
        let id = bytes
            .get(..4)
            .ok_or_else(|| DecodeError::InvalidFormat("file shorter than a chunk id".into()))?;
        if id != HEADER_CHUNK_ID {
            return Err(DecodeError::InvalidFormat(format!(
                "invalid chunk '{}', expected 'MThd'",
                String::from_utf8_lossy(id)
            )));
        }
        let header_len = read_u32(bytes, 4)? as usize;
        if header_len < 6 {
            return Err(DecodeError::InvalidFormat(format!(
                "header chunk of {} bytes",
                header_len
            )));
        }
        let format_type = read_u16(bytes, 8)?;
        let track_count = read_u16(bytes, 10)?;
        let division = Division::from_bits(read_u16(bytes, 12)?);
        if let Division::Smpte {
            frames_per_second,
            ticks_per_frame,
        } = division
        {
            log::warn!(
                "SMPTE resolution not supported ({} fps, {} ticks per frame), substituting {} ticks per quarter",
                frames_per_second,
                ticks_per_frame,
                division.ticks_per_quarter()
            );
        }

        let mut sequence = Sequence {
            format_type,
            division,
            tracks: Vec::with_capacity(usize::from(track_count)),
            tempos: Vec::new(),
            time_signatures: Vec::new(),
            key_signatures: Vec::new(),
            lyrics: Vec::new(),
            markers: Vec::new(),
            tick_length: 0,
            title: None,
        };

        let mut rest = bytes
            .get(CHUNK_PREFIX_LEN + header_len..)
            .ok_or(DecodeError::UnexpectedEof { context: "header chunk" })?;

        for track_index in 0..track_count {
            if rest.is_empty() {
                log::warn!(
                    "File ends after {} of {} track chunks",
                    track_index,
                    track_count
                );
                break;
            }
            if rest.len() < CHUNK_PREFIX_LEN {
                return Err(DecodeError::UnexpectedEof { context: "track chunk header" });
            }
            if &rest[..4] != TRACK_CHUNK_ID {
                log::warn!(
                    "Invalid track chunk '{}' at track {}, decoding anyway",
                    String::from_utf8_lossy(&rest[..4]),
                    track_index
                );
            }
            let declared = read_u32(rest, 4)? as usize;
            let body = &rest[CHUNK_PREFIX_LEN..];
            let length = if declared > body.len() {
                log::warn!(
                    "Track {} declares {} bytes but only {} remain",
                    track_index,
                    declared,
                    body.len()
                );
                body.len()
            } else {
                declared
            };
            let (chunk, next) = body.split_at(length);

            let (track, end_tick) = self.build_track(chunk, &mut sequence)?;
            log::debug!(
                "Track {}: {} events, {} ticks{}",
                track_index,
                track.len(),
                end_tick,
                track
                    .title
                    .as_deref()
                    .map(|t| format!(" ({})", t))
                    .unwrap_or_default()
            );
            sequence.tick_length = sequence.tick_length.max(end_tick);
            sequence.tracks.push(track);
            rest = next;
        }

        for index in [
            &mut sequence.key_signatures,
            &mut sequence.tempos,
            &mut sequence.time_signatures,
            &mut sequence.lyrics,
            &mut sequence.markers,
        ] {
            index.sort_by_key(|e| e.tick);
        }
        sequence.title = sequence.tracks.iter().find_map(|t| t.title.clone());

        log::info!(
            "Decoded format {} sequence: {} tracks, {} ticks at {} ticks per quarter",
            sequence.format_type,
            sequence.tracks.len(),
            sequence.tick_length,
            sequence.ticks_per_quarter()
        );
        Ok(sequence)
    }

    /// Decode one track chunk, routing meta events into the sequence indices
    fn build_track(&self, chunk: &[u8], sequence: &mut Sequence) -> DecodeResult<(Track, u64)> {
        let mut decoder = TrackDecoder::new(chunk, self.options.fallback_encoding);
        let mut lyrics = LyricMergeState::new(sequence.ticks_per_quarter());
        let mut track = Track::default();

        while let Some(event) = decoder.next() {
            let mut event = event?;

            let placement = match event.meta() {
                Some(MetaEvent::Tempo(_)) => {
                    insert_by_tick(&mut sequence.tempos, event.clone());
                    Placement::Track
                }
                Some(MetaEvent::TimeSignature(_)) => {
                    insert_by_tick(&mut sequence.time_signatures, event.clone());
                    Placement::Track
                }
                Some(MetaEvent::KeySignature(_)) => {
                    insert_by_tick(&mut sequence.key_signatures, event.clone());
                    Placement::Track
                }
                Some(MetaEvent::Text(text)) => match text.kind {
                    TextKind::TrackName => {
                        if track.title.is_none() && !text.text.is_empty() {
                            track.title = Some(text.text.clone());
                        }
                        Placement::Track
                    }
                    TextKind::Marker => {
                        insert_by_tick(&mut sequence.markers, event.clone());
                        Placement::Track
                    }
                    TextKind::Text | TextKind::Lyric => {
                        lyrics.merge(&mut event, &mut track.events, &mut sequence.lyrics)
                    }
                    _ => Placement::Track,
                },
                _ => Placement::Track,
            };

            match placement {
                Placement::Track => track.events.push(event),
                Placement::TrackAndLyrics => {
                    insert_by_tick(&mut sequence.lyrics, event.clone());
                    track.events.push(event);
                }
                Placement::Discard => {}
            }
        }

        Ok((track, decoder.tick()))
    }
}
