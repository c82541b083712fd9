//! Edge case tests and robustness validation
//!
//! Malformed and unusual files must either decode best-effort or fail with a
//! typed error, never panic or produce a partial sequence.

mod common;

use common::{TrackWriter, chunk, smf};
use smfplay::smf::{DecodeError, Division};
use smfplay::{DisplayUpdate, Sequence, Sequencer};

#[test]
fn test_empty_input() {
    assert!(matches!(
        Sequence::decode(&[]),
        Err(DecodeError::InvalidFormat(_))
    ));
}

#[test]
fn test_wrong_header_id_is_fatal() {
    let mut bytes = smf(0, 480, &[TrackWriter::new().finish()]);
    bytes[..4].copy_from_slice(b"MTrk");
    assert!(matches!(
        Sequence::decode(&bytes),
        Err(DecodeError::InvalidFormat(_))
    ));
}

#[test]
fn test_short_header_chunk() {
    let bytes = chunk(b"MThd", &[0, 0, 0, 1]);
    assert!(matches!(
        Sequence::decode(&bytes),
        Err(DecodeError::InvalidFormat(_))
    ));

    // Declared length 6 but the file stops after two bytes of it
    let mut truncated = b"MThd".to_vec();
    truncated.extend_from_slice(&6u32.to_be_bytes());
    truncated.extend_from_slice(&[0, 1]);
    assert!(matches!(
        Sequence::decode(&truncated),
        Err(DecodeError::UnexpectedEof { .. })
    ));
}

#[test]
fn test_longer_header_is_skipped() {
    let mut header = Vec::new();
    header.extend_from_slice(&0u16.to_be_bytes());
    header.extend_from_slice(&1u16.to_be_bytes());
    header.extend_from_slice(&96u16.to_be_bytes());
    header.extend_from_slice(&[0xAA, 0xBB]); // Unknown extension
    let mut bytes = chunk(b"MThd", &header);
    bytes.extend(chunk(
        b"MTrk",
        &TrackWriter::new().note_on(96, 0, 60, 1).finish(),
    ));

    let sequence = Sequence::decode(&bytes).unwrap();
    assert_eq!(sequence.division, Division::TicksPerQuarter(96));
    assert_eq!(sequence.tick_length, 96);
}

#[test]
fn test_running_status_without_status_is_fatal() {
    let track = TrackWriter::new().raw(0, &[60, 100]).finish();
    assert!(matches!(
        Sequence::decode(&smf(0, 480, &[track])),
        Err(DecodeError::MissingRunningStatus { tick: 0 })
    ));
}

#[test]
fn test_running_status_across_tracks_is_reset() {
    let first = TrackWriter::new().note_on(0, 0, 60, 100).finish();
    // Second track starts with a data byte: running status does not carry over
    let second = TrackWriter::new().raw(0, &[62, 100]).finish();
    assert!(matches!(
        Sequence::decode(&smf(1, 480, &[first, second])),
        Err(DecodeError::MissingRunningStatus { .. })
    ));
}

#[test]
fn test_declared_track_length_past_end_of_file() {
    let body = TrackWriter::new()
        .note_on(0, 0, 60, 100)
        .note_off(480, 0, 60)
        .finish();
    let mut bytes = smf(0, 480, &[body.clone()]);
    // Claim twice the actual length
    let declared = (body.len() as u32 * 2).to_be_bytes();
    bytes[18..22].copy_from_slice(&declared);

    let sequence = Sequence::decode(&bytes).unwrap();
    assert_eq!(sequence.tracks[0].len(), 2);
}

#[test]
fn test_event_straddling_chunk_end_is_fatal() {
    // Note On whose second data byte lies outside the chunk
    let mut bytes = smf(0, 480, &[vec![0x00, 0x90, 60]]);
    bytes.push(100);
    assert!(matches!(
        Sequence::decode(&bytes),
        Err(DecodeError::UnexpectedEof { .. })
    ));
}

#[test]
fn test_oversized_meta_length_is_fatal() {
    let track = TrackWriter::new().raw(0, &[0xFF, 0x01, 0x7F, b'a']).unterminated();
    assert!(Sequence::decode(&smf(0, 480, &[track])).is_err());
}

#[test]
fn test_vlq_longer_than_four_bytes() {
    // Five continuation bytes: the fifth is read as a status byte
    let track = vec![0x81, 0x80, 0x80, 0x80, 0x00, 0x90, 60, 100];
    assert!(Sequence::decode(&smf(0, 480, &[track])).is_err());
}

#[test]
fn test_zero_track_file() {
    let sequence = Sequence::decode(&smf(0, 480, &[])).unwrap();
    assert!(sequence.tracks.is_empty());
    assert_eq!(sequence.tick_length, 0);

    let mut sequencer = Sequencer::new(Vec::<Vec<u8>>::new(), Vec::<DisplayUpdate>::new());
    sequencer.load(sequence);
    sequencer.play();
    // Past the end on the first interval
    assert!(!sequencer.on_interval());
    assert!(sequencer.has_ended());
}

#[test]
fn test_zero_ticks_per_quarter() {
    let track = TrackWriter::new().note_on(10, 0, 60, 1).finish();
    let sequence = Sequence::decode(&smf(0, 0, &[track])).unwrap();
    assert_eq!(sequence.ticks_per_quarter(), 1);

    let mut sequencer = Sequencer::new(Vec::<Vec<u8>>::new(), Vec::<DisplayUpdate>::new());
    sequencer.load(sequence);
    sequencer.play();
    for _ in 0..10 {
        sequencer.on_interval();
    }
    assert!(sequencer.tick_position().is_finite());
}

#[test]
fn test_zero_tempo_does_not_stall() {
    let track = TrackWriter::new()
        .tempo(0, 0)
        .note_on(480, 0, 60, 1)
        .finish();
    let sequence = Sequence::decode(&smf(0, 480, &[track])).unwrap();
    let mut sequencer = Sequencer::new(Vec::<Vec<u8>>::new(), Vec::<DisplayUpdate>::new());
    sequencer.load(sequence);
    assert!(sequencer.ticks_per_interval().is_finite());
    assert!(sequencer.ticks_per_interval() > 0.0);
}

#[test]
fn test_meta_with_empty_payloads() {
    let track = TrackWriter::new()
        .meta(0, 0x51, &[])
        .meta(0, 0x58, &[])
        .meta(0, 0x59, &[])
        .meta(0, 0x05, &[])
        .finish();
    let sequence = Sequence::decode(&smf(0, 480, &[track])).unwrap();
    assert_eq!(sequence.tempos.len(), 1);
    assert_eq!(sequence.time_signatures.len(), 1);
    assert_eq!(sequence.key_signatures.len(), 1);
    assert_eq!(sequence.tempo_at(0).microseconds_per_quarter(), 0);
    assert_eq!(sequence.time_signature_at(0).1.numerator, 0);
}

#[test]
fn test_out_of_range_key_signature_is_clamped() {
    let track = TrackWriter::new().key_signature(0, -20, false).finish();
    let sequence = Sequence::decode(&smf(0, 480, &[track])).unwrap();
    assert_eq!(sequence.key_signature_at(0).fifths, -7);
    assert_eq!(sequence.key_signature_at(0).name(), "C\u{266D}");
}

#[test]
fn test_trailing_garbage_after_tracks() {
    let mut bytes = smf(0, 480, &[TrackWriter::new().note_on(0, 0, 60, 1).finish()]);
    bytes.extend_from_slice(b"garbage that is not a chunk");
    let sequence = Sequence::decode(&bytes).unwrap();
    assert_eq!(sequence.tracks.len(), 1);
}

#[test]
fn test_unknown_chunk_in_track_position() {
    // Track count 2, but the first chunk is an unknown id; decoded best-effort
    let mut bytes = smf(1, 480, &[]);
    bytes[10..12].copy_from_slice(&2u16.to_be_bytes());
    bytes.extend(chunk(b"XFIH", &TrackWriter::new().finish()));
    bytes.extend(chunk(
        b"MTrk",
        &TrackWriter::new().note_on(0, 0, 60, 1).finish(),
    ));
    let sequence = Sequence::decode(&bytes).unwrap();
    assert_eq!(sequence.tracks.len(), 2);
    assert_eq!(sequence.tracks[1].len(), 1);
}

#[test]
fn test_undecodable_text_falls_back() {
    // Invalid UTF-8 and an unlikely byte mix: decoded with the fallback, never fails
    let track = TrackWriter::new()
        .meta(0, 0x01, &[0xFF, 0xFE, 0x80, 0x81, 0x00, 0x82])
        .finish();
    let sequence = Sequence::decode(&smf(0, 480, &[track])).unwrap();
    let text = sequence.tracks[0].events[0].text().unwrap();
    assert!(!text.text.contains('\0'));
}
