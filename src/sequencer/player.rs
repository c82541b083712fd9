// Sequencer Player - Replays a decoded sequence on a fixed-period clock
// Channel/system messages go to the MIDI sink, meta events update display state

use crate::config::PlayerConfig;
use crate::messaging::channels::CommandConsumer;
use crate::messaging::command::Command;
use crate::messaging::notification::DisplayUpdate;
use crate::messaging::sink::{DisplaySink, MidiSink};
use crate::sequencer::timeline::{KeySignature, Tempo, TimeSignature, beat_phase};
use crate::sequencer::transport::{IntervalClock, TransportState};
use crate::smf::{Event, MetaEvent, Sequence, TextKind};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_INTERVAL_MS: u64 = 10;
pub const MIDI_CHANNELS: u8 = 16;

/// Controller 120
const ALL_SOUND_OFF: u8 = 0x78;

/// Playback position within one track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub track_index: usize,
    pub event_index: usize,
}

/// Index for a track so that events in `[target - window, target]` are reached
/// without replaying the whole track.
///
/// Returns 0 for an empty track.
pub fn seek_index(events: &[Event], target: u64, window: u64) -> usize {
    let floor = target.saturating_sub(window);
    let mut low = 0usize;
    let mut high = events.len();
    let mut mid = 0usize;
    while low < high {
        mid = low + (high - low) / 2;
        let tick = events[mid].tick;
        if tick > target {
            high = mid;
        } else if tick < floor {
            low = mid + 1;
        } else {
            break;
        }
    }
    mid
}

/// Timer-driven sequencer
///
/// All state changes happen inside `load`, `play`, `pause`, `seek` and
/// `on_interval`; seeking always pauses first so cursors are never moved while
/// the clock is running.
pub struct Sequencer<M: MidiSink, D: DisplaySink> {
    sequence: Option<Arc<Sequence>>,
    cursors: Vec<Cursor>,
    state: TransportState,
    clock: IntervalClock,
    interval_ms: u64,
    channel_count: u8,

    tick_position: f64,
    tempo: Tempo,
    ticks_per_interval: f64,
    time_signature: TimeSignature,
    time_signature_tick: u64,
    key_signature: KeySignature,
    beat: u32,
    lyric_line: Option<String>,
    ended: bool,

    midi: M,
    display: D,
}

impl<M: MidiSink, D: DisplaySink> Sequencer<M, D> {
    pub fn new(midi: M, display: D) -> Self {
        Self::with_settings(DEFAULT_INTERVAL_MS, MIDI_CHANNELS, midi, display)
    }

    pub fn with_settings(interval_ms: u64, channel_count: u8, midi: M, display: D) -> Self {
        let interval_ms = interval_ms.max(1);
        Self {
            sequence: None,
            cursors: Vec::new(),
            state: TransportState::Stopped,
            clock: IntervalClock::from_millis(interval_ms),
            interval_ms,
            channel_count: channel_count.min(MIDI_CHANNELS),
            tick_position: 0.0,
            tempo: Tempo::default(),
            ticks_per_interval: 0.0,
            time_signature: TimeSignature::default(),
            time_signature_tick: 0,
            key_signature: KeySignature::default(),
            beat: 0,
            lyric_line: None,
            ended: false,
            midi,
            display,
        }
    }

    pub fn from_config(config: &PlayerConfig, midi: M, display: D) -> Self {
        Self::with_settings(config.interval_ms, config.channel_count, midi, display)
    }

    /// Replace the sequence and all playback state, then seek to tick 0
    pub fn load(&mut self, sequence: impl Into<Arc<Sequence>>) {
        self.pause();
        let sequence = sequence.into();
        log::info!(
            "Loading '{}': {} tracks, {} ticks",
            sequence.title.as_deref().unwrap_or("untitled"),
            sequence.tracks.len(),
            sequence.tick_length
        );

        self.cursors = (0..sequence.tracks.len())
            .map(|track_index| Cursor {
                track_index,
                event_index: 0,
            })
            .collect();
        self.tick_position = 0.0;
        self.ended = false;
        self.display.notify(DisplayUpdate::SequenceLoaded {
            title: sequence.title.clone(),
            tick_length: sequence.tick_length,
        });
        self.display.notify(DisplayUpdate::Text(String::new()));
        self.sequence = Some(sequence);

        self.beat = 0;
        self.display.notify(DisplayUpdate::Beat(0));
        self.seek(0);
    }

    /// Start the clock now
    pub fn play(&mut self) {
        self.play_at(Instant::now());
    }

    /// Start the clock with the first interval one period after `now`.
    /// No-op while playing or without a sequence.
    pub fn play_at(&mut self, now: Instant) {
        if self.state.is_playing() || self.sequence.is_none() {
            return;
        }
        self.clock.start(now);
        self.ended = false;
        self.set_state(TransportState::Playing);
    }

    /// Stop the clock and silence every channel
    pub fn pause(&mut self) {
        self.clock.stop();
        for channel in 0..self.channel_count {
            self.midi.send(&[0xB0 + channel, ALL_SOUND_OFF, 0]);
            self.midi.send(&[0xE0 + channel, 0, 0x40]);
        }
        self.set_state(TransportState::Stopped);
    }

    pub fn toggle_play(&mut self) {
        if self.state.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move to `target` ticks, restoring the tempo, signatures, lyric and
    /// marker in effect there
    pub fn seek(&mut self, target: u64) {
        self.pause();
        self.tick_position = target as f64;
        let Some(sequence) = self.sequence.clone() else {
            return;
        };

        match Sequence::last_at_or_before(&sequence.time_signatures, target) {
            Some(event) => self.do_meta_event(event),
            None => self.set_time_signature(0, TimeSignature::default()),
        }
        match Sequence::last_at_or_before(&sequence.key_signatures, target) {
            Some(event) => self.do_meta_event(event),
            None => self.set_key_signature(KeySignature::default()),
        }
        match Sequence::last_at_or_before(&sequence.tempos, target) {
            Some(event) => self.do_meta_event(event),
            None => self.set_tempo(Tempo::default()),
        }

        self.lyric_line = None;
        match Sequence::last_at_or_before(&sequence.lyrics, target) {
            Some(event) => self.do_meta_event(event),
            None => self.display.notify(DisplayUpdate::Lyric {
                text: String::new(),
                reveal: 0,
            }),
        }
        match Sequence::last_at_or_before(&sequence.markers, target) {
            Some(event) => self.do_meta_event(event),
            None => self.display.notify(DisplayUpdate::Marker(String::new())),
        }

        let window = u64::from(sequence.ticks_per_quarter());
        for cursor in &mut self.cursors {
            let events = &sequence.tracks[cursor.track_index].events;
            cursor.event_index = if target == 0 {
                0
            } else if target >= sequence.tick_length {
                events.len().saturating_sub(1)
            } else {
                seek_index(events, target, window)
            };
        }

        self.update_beat();
        self.notify_position();
        log::debug!("Seek to tick {}", target);
    }

    /// One timer interval: advance, dispatch due events, rewind at the end.
    ///
    /// Returns false when playback is (or just became) stopped.
    pub fn on_interval(&mut self) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        let Some(sequence) = self.sequence.clone() else {
            return false;
        };

        self.tick_position += self.ticks_per_interval;
        for index in 0..self.cursors.len() {
            let events = &sequence.tracks[self.cursors[index].track_index].events;
            while let Some(event) = events.get(self.cursors[index].event_index) {
                if event.tick as f64 > self.tick_position {
                    break;
                }
                self.dispatch(event);
                self.cursors[index].event_index += 1;
            }
        }
        self.update_beat();
        self.notify_position();

        if self.tick_position > sequence.tick_length as f64 {
            log::debug!("End of sequence at tick {}", sequence.tick_length);
            self.pause();
            self.seek(0);
            self.ended = true;
            return false;
        }
        true
    }

    /// Run every interval that has come due by `now`
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut count = 0;
        while self.state.is_playing() && self.clock.due(now) {
            self.on_interval();
            count += 1;
        }
        count
    }

    /// Apply a control command; false on `Quit`
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::TogglePlay => self.toggle_play(),
            Command::Seek(tick) => self.seek(tick),
            Command::Rewind => self.seek(0),
            Command::Quit => {
                self.pause();
                return false;
            }
        }
        true
    }

    fn dispatch(&mut self, event: &Event) {
        if event.meta().is_some() {
            self.do_meta_event(event);
        } else if let Some(bytes) = event.kind.message_bytes() {
            self.midi.send(&bytes);
        }
    }

    fn do_meta_event(&mut self, event: &Event) {
        let Some(meta) = event.meta() else {
            return;
        };
        match meta {
            MetaEvent::Tempo(tempo) => self.set_tempo(*tempo),
            MetaEvent::TimeSignature(ts) => self.set_time_signature(event.tick, *ts),
            MetaEvent::KeySignature(key) => self.set_key_signature(*key),
            MetaEvent::Text(text) => match text.kind {
                TextKind::Lyric => match (text.reveal_position, self.shown_line()) {
                    (Some(reveal), Some(line)) => {
                        let text = line.to_string();
                        self.display.notify(DisplayUpdate::Lyric { text, reveal });
                    }
                    _ => {
                        self.lyric_line = Some(text.text.clone());
                        self.display.notify(DisplayUpdate::Lyric {
                            text: text.text.clone(),
                            reveal: 0,
                        });
                    }
                },
                TextKind::Marker => {
                    self.display.notify(DisplayUpdate::Marker(text.text.clone()));
                }
                _ => match (text.reveal_position, self.shown_line()) {
                    (Some(reveal), Some(line)) if text.kind == TextKind::Text => {
                        let text = line.to_string();
                        self.display.notify(DisplayUpdate::Lyric { text, reveal });
                    }
                    _ => {
                        let title = self.sequence.as_ref().and_then(|s| s.title.as_deref());
                        if title != Some(text.text.as_str()) {
                            self.display.notify(DisplayUpdate::Text(text.text.clone()));
                        }
                    }
                },
            },
            MetaEvent::Raw { .. } => {}
        }
    }

    fn shown_line(&self) -> Option<&str> {
        self.lyric_line.as_deref().filter(|line| !line.is_empty())
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state != state {
            log::debug!("Transport {:?} -> {:?}", self.state, state);
            self.state = state;
            self.display.notify(DisplayUpdate::Transport(state));
        }
    }

    fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
        self.ticks_per_interval =
            tempo.ticks_per_interval(self.interval_ms, self.ticks_per_quarter());
        self.display.notify(DisplayUpdate::Tempo(tempo));
    }

    fn set_time_signature(&mut self, tick: u64, time_signature: TimeSignature) {
        self.time_signature = time_signature;
        self.time_signature_tick = tick;
        self.display.notify(DisplayUpdate::TimeSignature(time_signature));
    }

    fn set_key_signature(&mut self, key_signature: KeySignature) {
        self.key_signature = key_signature;
        self.display.notify(DisplayUpdate::KeySignature(key_signature));
    }

    fn update_beat(&mut self) {
        let beat = beat_phase(
            self.tick_position,
            self.time_signature_tick,
            &self.time_signature,
            self.ticks_per_quarter(),
        );
        if beat != self.beat {
            self.beat = beat;
            self.display.notify(DisplayUpdate::Beat(beat));
        }
    }

    fn notify_position(&mut self) {
        let tick_length = self.tick_length();
        self.display.notify(DisplayUpdate::Position {
            tick: self.current_tick(),
            tick_length,
        });
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_deref()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// True once playback ran past the end (cleared by `play` and `load`)
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn ticks_per_quarter(&self) -> u16 {
        self.sequence
            .as_ref()
            .map_or(480, |sequence| sequence.ticks_per_quarter())
    }

    /// Fractional tick position
    pub fn tick_position(&self) -> f64 {
        self.tick_position
    }

    pub fn current_tick(&self) -> u64 {
        self.tick_position.max(0.0) as u64
    }

    pub fn tick_length(&self) -> u64 {
        self.sequence.as_ref().map_or(0, |s| s.tick_length)
    }

    pub fn ticks_per_interval(&self) -> f64 {
        self.ticks_per_interval
    }

    pub fn interval(&self) -> Duration {
        self.clock.period()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.clock.next_deadline()
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    /// Tick at which the current time signature took effect
    pub fn time_signature_tick(&self) -> u64 {
        self.time_signature_tick
    }

    pub fn key_signature(&self) -> KeySignature {
        self.key_signature
    }

    pub fn beat(&self) -> u32 {
        self.beat
    }

    pub fn lyric_line(&self) -> Option<&str> {
        self.lyric_line.as_deref()
    }

    pub fn cursors(&self) -> &[Cursor] {
        &self.cursors
    }

    pub fn midi_sink(&self) -> &M {
        &self.midi
    }

    pub fn midi_sink_mut(&mut self) -> &mut M {
        &mut self.midi
    }

    pub fn display_sink(&self) -> &D {
        &self.display
    }

    pub fn display_sink_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn into_sinks(self) -> (M, D) {
        (self.midi, self.display)
    }
}

/// Why [`run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Quit,
    Finished,
}

/// Sleep while stopped before looking at the command queue again
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Blocking playback loop: apply queued commands, wait for the next
/// deadline, run due intervals. Returns on `Quit` or at the end of the
/// sequence.
pub fn run<M: MidiSink, D: DisplaySink>(
    sequencer: &mut Sequencer<M, D>,
    commands: &mut CommandConsumer,
) -> RunOutcome {
    loop {
        while let Some(command) = ringbuf::traits::Consumer::try_pop(commands) {
            if !sequencer.apply(command) {
                return RunOutcome::Quit;
            }
        }
        if sequencer.has_ended() {
            return RunOutcome::Finished;
        }

        let now = Instant::now();
        match sequencer.next_deadline() {
            Some(deadline) if deadline > now => std::thread::sleep(deadline - now),
            Some(_) => {}
            None => std::thread::sleep(IDLE_POLL),
        }
        sequencer.poll(Instant::now());
    }
}
