// MIDI types events
// Channel-voice view of the raw messages the sequencer sends

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    PolyPressure {
        channel: u8,
        note: u8,
        pressure: u8,
    },
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// 14-bit value, 8192 is center
    PitchBend { channel: u8, value: u16 },
}

pub const CONTROLLER_ALL_SOUND_OFF: u8 = 0x78;
pub const PITCH_BEND_CENTER: u16 = 8192;

impl MidiEvent {
    /// Parse un RAW MIDI message
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0F;
        let byte = |i: usize| data.get(i).copied();

        match status & 0xF0 {
            0x90 => {
                let (note, velocity) = (byte(0)?, byte(1)?);
                // Velocity 0 = Note Off
                if velocity == 0 {
                    Some(MidiEvent::NoteOff {
                        channel,
                        note,
                        velocity,
                    })
                } else {
                    Some(MidiEvent::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                }
            }
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                note: byte(0)?,
                velocity: byte(1)?,
            }),
            0xA0 => Some(MidiEvent::PolyPressure {
                channel,
                note: byte(0)?,
                pressure: byte(1)?,
            }),
            0xB0 => Some(MidiEvent::ControlChange {
                channel,
                controller: byte(0)?,
                value: byte(1)?,
            }),
            0xC0 => Some(MidiEvent::ProgramChange {
                channel,
                program: byte(0)?,
            }),
            0xD0 => Some(MidiEvent::ChannelPressure {
                channel,
                pressure: byte(0)?,
            }),
            0xE0 => {
                let lsb = u16::from(byte(0)?);
                let msb = u16::from(byte(1)?);
                Some(MidiEvent::PitchBend {
                    channel,
                    value: (msb << 7) | lsb,
                })
            }
            _ => None,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::PolyPressure { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::ProgramChange { channel, .. }
            | MidiEvent::ChannelPressure { channel, .. }
            | MidiEvent::PitchBend { channel, .. } => channel,
        }
    }

    /// Raw bytes, the inverse of [`MidiEvent::from_bytes`]
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | channel, note, velocity],
            MidiEvent::NoteOff {
                channel,
                note,
                velocity,
            } => vec![0x80 | channel, note, velocity],
            MidiEvent::PolyPressure {
                channel,
                note,
                pressure,
            } => vec![0xA0 | channel, note, pressure],
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => vec![0xB0 | channel, controller, value],
            MidiEvent::ProgramChange { channel, program } => vec![0xC0 | channel, program],
            MidiEvent::ChannelPressure { channel, pressure } => vec![0xD0 | channel, pressure],
            MidiEvent::PitchBend { channel, value } => {
                vec![0xE0 | channel, (value & 0x7F) as u8, (value >> 7) as u8]
            }
        }
    }

    /// Messages sent on pause to release sounding notes
    pub fn is_reset(&self) -> bool {
        matches!(
            self,
            MidiEvent::ControlChange {
                controller: CONTROLLER_ALL_SOUND_OFF,
                ..
            } | MidiEvent::PitchBend {
                value: PITCH_BEND_CENTER,
                ..
            }
        )
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel = self.channel() + 1;
        match *self {
            MidiEvent::NoteOn { note, velocity, .. } => {
                write!(f, "ch{:>2} note on  {:>3} vel {:>3}", channel, note, velocity)
            }
            MidiEvent::NoteOff { note, .. } => write!(f, "ch{:>2} note off {:>3}", channel, note),
            MidiEvent::PolyPressure { note, pressure, .. } => {
                write!(f, "ch{:>2} poly pressure {:>3} {:>3}", channel, note, pressure)
            }
            MidiEvent::ControlChange {
                controller, value, ..
            } => write!(f, "ch{:>2} cc {:>3} = {:>3}", channel, controller, value),
            MidiEvent::ProgramChange { program, .. } => {
                write!(f, "ch{:>2} program {:>3}", channel, program)
            }
            MidiEvent::ChannelPressure { pressure, .. } => {
                write!(f, "ch{:>2} pressure {:>3}", channel, pressure)
            }
            MidiEvent::PitchBend { value, .. } => write!(
                f,
                "ch{:>2} pitch bend {:+}",
                channel,
                i32::from(value) - i32::from(PITCH_BEND_CENTER)
            ),
        }
    }
}
