// Timeline - Musical time context of a sequence
// Tempo, time signature, key signature and beat phase in MIDI ticks

use serde::Serialize;
use std::fmt;

/// Time signature as carried by meta event 0x58
/// Example: 6/8 time = TimeSignature { numerator: 6, denominator: 8, .. }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSignature {
    pub numerator: u8,   // Beats per bar
    pub denominator: u32, // Note value of one beat (4 = quarter note, 8 = eighth note)
    pub clocks_per_click: u8,
    pub thirty_seconds_per_quarter: u8,
}

impl TimeSignature {
    /// Creates a time signature with the usual metronome defaults (24 clocks, 8 32nds)
    pub fn new(numerator: u8, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
            clocks_per_click: 24,
            thirty_seconds_per_quarter: 8,
        }
    }

    /// Build from the raw meta payload, where the denominator is a power-of-two exponent
    pub fn from_meta(
        numerator: u8,
        denominator_exponent: u8,
        clocks: u8,
        thirty_seconds: u8,
    ) -> Self {
        Self {
            numerator,
            denominator: 1u32 << denominator_exponent.min(31),
            clocks_per_click: clocks,
            thirty_seconds_per_quarter: thirty_seconds,
        }
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self::new(4, 4)
    }

    /// Length of one beat in ticks
    pub fn ticks_per_beat(&self, ticks_per_quarter: u16) -> f64 {
        f64::from(ticks_per_quarter) * 4.0 / f64::from(self.denominator.max(1))
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo as microseconds per quarter note (meta event 0x51)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tempo {
    microseconds_per_quarter: u32,
}

impl Tempo {
    /// 120 BPM
    pub const DEFAULT_MICROSECONDS_PER_QUARTER: u32 = 500_000;

    pub fn new(microseconds_per_quarter: u32) -> Self {
        Self {
            microseconds_per_quarter,
        }
    }

    pub fn microseconds_per_quarter(&self) -> u32 {
        self.microseconds_per_quarter
    }

    /// Exact BPM value
    pub fn bpm(&self) -> f64 {
        60_000_000.0 / f64::from(self.microseconds_per_quarter.max(1))
    }

    /// BPM rounded down, as shown on the display
    pub fn display_bpm(&self) -> u32 {
        60_000_000 / self.microseconds_per_quarter.max(1)
    }

    /// Ticks elapsed during one timer interval at this tempo
    pub fn ticks_per_interval(&self, interval_ms: u64, ticks_per_quarter: u16) -> f64 {
        interval_ms as f64 * 1000.0 * f64::from(ticks_per_quarter)
            / f64::from(self.microseconds_per_quarter.max(1))
    }

    /// Wall-clock duration of `ticks` at this tempo
    pub fn ticks_to_seconds(&self, ticks: f64, ticks_per_quarter: u16) -> f64 {
        ticks / f64::from(ticks_per_quarter.max(1)) * f64::from(self.microseconds_per_quarter)
            / 1_000_000.0
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MICROSECONDS_PER_QUARTER)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.display_bpm())
    }
}

const FLAT: &str = "\u{266D}";
const SHARP: &str = "\u{266F}";
const DOUBLE_SHARP: &str = "\u{1D12A}";
const DOUBLE_FLAT: &str = "\u{1D12B}";

/// Key signature (meta event 0x59): sharps positive, flats negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct KeySignature {
    pub fifths: i8,
    pub minor: bool,
}

impl KeySignature {
    pub fn new(fifths: i8, minor: bool) -> Self {
        Self {
            fifths: fifths.clamp(-7, 7),
            minor,
        }
    }

    /// Tonic name, e.g. "C", "E♭", "F♯m"
    pub fn name(&self) -> String {
        let fifths = i32::from(self.fifths);
        if self.minor {
            format!("{}m", major_pitch_name(fifths + 3))
        } else {
            major_pitch_name(fifths)
        }
    }
}

/// Name of the major key `fifths` steps around the circle of fifths from C
fn major_pitch_name(fifths: i32) -> String {
    let letter = (b'A' + (4 * (fifths + 18)).rem_euclid(7) as u8) as char;
    let accidental = match (fifths + 15).div_euclid(7) {
        i32::MIN..=0 => DOUBLE_FLAT,
        1 => FLAT,
        2 => "",
        3 => SHARP,
        _ => DOUBLE_SHARP,
    };
    format!("{letter}{accidental}")
}

impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Position within the bar, counted in beats from the last time-signature change
pub fn beat_phase(
    tick: f64,
    time_signature_tick: u64,
    time_signature: &TimeSignature,
    ticks_per_quarter: u16,
) -> u32 {
    let ticks_per_beat = time_signature.ticks_per_beat(ticks_per_quarter);
    if ticks_per_beat <= 0.0 {
        return 0;
    }
    let elapsed = (tick - time_signature_tick as f64).max(0.0);
    let beats = (elapsed / ticks_per_beat).floor() as u64;
    (beats % u64::from(time_signature.numerator.max(1))) as u32
}
