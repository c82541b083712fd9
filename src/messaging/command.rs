// Commands - Control surface as messages, consumed by the playback loop

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    TogglePlay,
    /// Jump to an absolute tick
    Seek(u64),
    /// Seek to tick 0
    Rewind,
    Quit,
}
