// Communication channels lock-free
// Producers implement the sink traits so the sequencer can feed another thread

use crate::messaging::command::Command;
use crate::messaging::notification::DisplayUpdate;
use crate::messaging::sink::{DisplaySink, MidiSink};
use ringbuf::{HeapRb, traits::Split};

pub type CommandProducer = ringbuf::HeapProd<Command>;
pub type CommandConsumer = ringbuf::HeapCons<Command>;

pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<Command>::new(capacity);
    rb.split()
}

pub type MessageProducer = ringbuf::HeapProd<Vec<u8>>;
pub type MessageConsumer = ringbuf::HeapCons<Vec<u8>>;

pub fn create_message_channel(capacity: usize) -> (MessageProducer, MessageConsumer) {
    let rb = HeapRb::<Vec<u8>>::new(capacity);
    rb.split()
}

pub type DisplayProducer = ringbuf::HeapProd<DisplayUpdate>;
pub type DisplayConsumer = ringbuf::HeapCons<DisplayUpdate>;

pub fn create_display_channel(capacity: usize) -> (DisplayProducer, DisplayConsumer) {
    let rb = HeapRb::<DisplayUpdate>::new(capacity);
    rb.split()
}

impl MidiSink for MessageProducer {
    fn send(&mut self, message: &[u8]) {
        // try_push is not blocking
        if ringbuf::traits::Producer::try_push(self, message.to_vec()).is_err() {
            log::warn!("MIDI message queue full, dropped {:02X?}", message);
        }
    }
}

impl DisplaySink for DisplayProducer {
    fn notify(&mut self, update: DisplayUpdate) {
        if let Err(update) = ringbuf::traits::Producer::try_push(self, update) {
            log::warn!("Display queue full, dropped {:?}", update);
        }
    }
}

/// Drain everything currently queued
pub fn drain<T>(consumer: &mut ringbuf::HeapCons<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Some(item) = ringbuf::traits::Consumer::try_pop(consumer) {
        items.push(item);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::{Consumer, Producer};

    #[test]
    fn test_command_channel() {
        let (mut tx, mut rx) = create_command_channel(4);
        tx.try_push(Command::Play).unwrap();
        tx.try_push(Command::Seek(480)).unwrap();
        assert_eq!(rx.try_pop(), Some(Command::Play));
        assert_eq!(rx.try_pop(), Some(Command::Seek(480)));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_message_producer_is_a_sink() {
        let (mut tx, mut rx) = create_message_channel(2);
        tx.send(&[0x90, 60, 100]);
        tx.send(&[0x80, 60, 0]);
        // Full: dropped with a warning, never blocks
        tx.send(&[0xB0, 0x78, 0]);
        assert_eq!(drain(&mut rx), vec![vec![0x90, 60, 100], vec![0x80, 60, 0]]);
    }

    #[test]
    fn test_display_producer_is_a_sink() {
        let (mut tx, mut rx) = create_display_channel(1);
        tx.notify(DisplayUpdate::Beat(1));
        tx.notify(DisplayUpdate::Beat(2));
        assert_eq!(drain(&mut rx), vec![DisplayUpdate::Beat(1)]);
    }
}
