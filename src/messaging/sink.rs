// Sinks - Where the sequencer delivers what it plays

use crate::messaging::notification::DisplayUpdate;

/// Receives raw MIDI messages in playback order
pub trait MidiSink {
    fn send(&mut self, message: &[u8]);
}

/// Receives display state changes
pub trait DisplaySink {
    fn notify(&mut self, update: DisplayUpdate);
}

impl<F: FnMut(&[u8])> MidiSink for F {
    fn send(&mut self, message: &[u8]) {
        self(message)
    }
}

impl<F: FnMut(DisplayUpdate)> DisplaySink for F {
    fn notify(&mut self, update: DisplayUpdate) {
        self(update)
    }
}

/// Records every message
impl MidiSink for Vec<Vec<u8>> {
    fn send(&mut self, message: &[u8]) {
        self.push(message.to_vec());
    }
}

/// Records every update
impl DisplaySink for Vec<DisplayUpdate> {
    fn notify(&mut self, update: DisplayUpdate) {
        self.push(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink() {
        let mut count = 0;
        {
            let mut sink = |message: &[u8]| count += message.len();
            sink.send(&[0x90, 60, 100]);
            sink.send(&[0xC0, 1]);
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn test_recording_sinks() {
        let mut messages: Vec<Vec<u8>> = Vec::new();
        messages.send(&[0x80, 60, 0]);
        assert_eq!(messages, vec![vec![0x80, 60, 0]]);

        let mut updates: Vec<DisplayUpdate> = Vec::new();
        updates.notify(DisplayUpdate::Beat(2));
        assert_eq!(updates, vec![DisplayUpdate::Beat(2)]);
    }

    #[test]
    fn test_trait_object_sink() {
        let mut recorded: Vec<Vec<u8>> = Vec::new();
        {
            let sink: &mut dyn MidiSink = &mut recorded;
            sink.send(&[0xF8]);
        }
        assert_eq!(recorded, vec![vec![0xF8]]);
    }
}
