// Messaging - Sinks, display updates, commands and lock-free channels

pub mod channels;
pub mod command;
pub mod notification;
pub mod sink;

pub use channels::{
    CommandConsumer, CommandProducer, DisplayConsumer, DisplayProducer, MessageConsumer,
    MessageProducer, create_command_channel, create_display_channel, create_message_channel,
};
pub use command::Command;
pub use notification::{DisplayUpdate, UpdateCategory};
pub use sink::{DisplaySink, MidiSink};
