// Meta event interpretation
// Tempo, time/key signatures and the text family with charset detection

use super::event::{
    META_END_OF_TRACK, META_KEY_SIGNATURE, META_TEMPO, META_TIME_SIGNATURE, MetaEvent, TextEvent,
    TextKind,
};
use crate::sequencer::timeline::{KeySignature, Tempo, TimeSignature};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// Result of interpreting one meta event
#[derive(Debug, Clone, PartialEq)]
pub enum MetaOutcome {
    /// 0x2F: no further events in this track
    EndOfTrack,
    Event(MetaEvent),
}

/// Interpret the payload of a meta event of type `meta_type`
pub fn interpret(meta_type: u8, data: &[u8], fallback: &'static Encoding) -> MetaOutcome {
    let byte = |i: usize| data.get(i).copied().unwrap_or(0);

    let meta = match meta_type {
        META_END_OF_TRACK => return MetaOutcome::EndOfTrack,
        META_TEMPO => {
            let microseconds = data
                .iter()
                .take(3)
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
            MetaEvent::Tempo(Tempo::new(microseconds))
        }
        META_TIME_SIGNATURE => MetaEvent::TimeSignature(TimeSignature::from_meta(
            byte(0),
            byte(1),
            byte(2),
            byte(3),
        )),
        META_KEY_SIGNATURE => {
            MetaEvent::KeySignature(KeySignature::new(byte(0) as i8, byte(1) == 1))
        }
        0x01..=0x0F => MetaEvent::Text(TextEvent::new(
            TextKind::from_meta_type(meta_type),
            decode_text(data, fallback),
        )),
        _ => MetaEvent::Raw {
            meta_type,
            data: data.to_vec(),
        },
    };
    MetaOutcome::Event(meta)
}

/// Decode text bytes, stripping NULs.
///
/// Strict UTF-8 first, then `fallback` when it decodes without errors. Only
/// bytes neither accepts go through charset detection.
pub fn decode_text(bytes: &[u8], fallback: &'static Encoding) -> String {
    let strict = |encoding: &'static Encoding| {
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
    };

    let text = match strict(UTF_8).or_else(|| strict(fallback)) {
        Some(text) => text,
        None => {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            let detected = detector.guess(None, true);
            let (text, had_errors) = detected.decode_without_bom_handling(bytes);
            if had_errors {
                log::warn!(
                    "Text is neither UTF-8 nor {}, detected {} with replacements: {:?} from {:02X?}",
                    fallback.name(),
                    detected.name(),
                    text,
                    bytes
                );
            }
            text.into_owned()
        }
    };

    text.replace('\0', "")
}
