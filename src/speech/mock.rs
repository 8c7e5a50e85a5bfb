/*!
 * Mock speech engine for testing.
 *
 * The engine never makes a sound; it records every command and emits
 * lifecycle events deterministically:
 * - `MockSpeechEngine::new()` - events are produced by calling `step()`
 * - `MockSpeechEngine::timed(d)` - queued utterances play on their own,
 *   each lasting `d` of tokio time (use with a paused test clock)
 * - `fail_on(index)` - the utterance at that sentence index fails
 */

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;

use crate::speech::{SpeechEngine, SpeechEvent, SpeechEventSender, Utterance};
use crate::voices::Voice;

/// Command received by the mock engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Speak(Utterance),
    Pause,
    Resume,
    Cancel,
}

#[derive(Debug, Default)]
struct MockState {
    voices: Vec<Voice>,
    queue: VecDeque<Utterance>,
    speaking: Option<Utterance>,
    paused: bool,
    commands: Vec<EngineCommand>,
    fail_indices: HashSet<usize>,
    driving: bool,
    cancel_epoch: u64,
}

/// Scripted speech engine
#[derive(Debug, Clone)]
pub struct MockSpeechEngine {
    events: SpeechEventSender,
    state: Arc<Mutex<MockState>>,
    utterance_duration: Option<Duration>,
}

impl MockSpeechEngine {
    /// Engine driven manually through `step()`
    pub fn new(events: SpeechEventSender) -> Self {
        Self {
            events,
            state: Arc::new(Mutex::new(MockState::default())),
            utterance_duration: None,
        }
    }

    /// Engine that plays its queue on a tokio task, `duration` per utterance
    pub fn timed(events: SpeechEventSender, duration: Duration) -> Self {
        Self {
            utterance_duration: Some(duration),
            ..Self::new(events)
        }
    }

    /// Start with a known voice set
    pub fn with_voices(self, voices: Vec<Voice>) -> Self {
        self.state.lock().voices = voices;
        self
    }

    /// Make the utterance with this sentence index fail instead of playing
    pub fn fail_on(self, index: usize) -> Self {
        self.state.lock().fail_indices.insert(index);
        self
    }

    /// Replace the voice set and signal the change
    pub fn set_voices(&self, voices: Vec<Voice>) {
        self.state.lock().voices = voices;
        let _ = self.events.send(SpeechEvent::VoicesChanged);
    }

    /// Inject an arbitrary event, e.g. a trailing event after cancel
    pub fn emit(&self, event: SpeechEvent) {
        let _ = self.events.send(event);
    }

    pub fn commands(&self) -> Vec<EngineCommand> {
        self.state.lock().commands.clone()
    }

    /// Utterances waiting behind the current one
    pub fn queued(&self) -> Vec<Utterance> {
        self.state.lock().queue.iter().cloned().collect()
    }

    pub fn speaking(&self) -> Option<Utterance> {
        self.state.lock().speaking.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Advance by one event: end the current utterance or start the next one
    ///
    /// Returns the emitted event, or None when paused or idle.
    pub fn step(&self) -> Option<SpeechEvent> {
        let event = {
            let mut state = self.state.lock();
            Self::next_event(&mut state)?
        };
        let _ = self.events.send(event.clone());
        Some(event)
    }

    /// Step until the queue is drained, returning every emitted event
    pub fn run_to_end(&self) -> Vec<SpeechEvent> {
        std::iter::from_fn(|| self.step()).collect()
    }

    fn next_event(state: &mut MockState) -> Option<SpeechEvent> {
        if state.paused {
            return None;
        }
        if let Some(current) = state.speaking.take() {
            return Some(SpeechEvent::Ended(current.id));
        }
        let next = state.queue.pop_front()?;
        if state.fail_indices.contains(&next.id.index) {
            return Some(SpeechEvent::Failed {
                id: next.id,
                message: format!("synthesis failed for sentence {}", next.id.index + 1),
            });
        }
        let id = next.id;
        state.speaking = Some(next);
        Some(SpeechEvent::Started(id))
    }

    fn spawn_driver(&self, duration: Duration) {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();

        tokio::spawn(async move {
            loop {
                let (event, epoch) = {
                    let mut guard = state.lock();
                    match Self::next_event(&mut guard) {
                        Some(event) => (event, guard.cancel_epoch),
                        None => {
                            guard.driving = false;
                            break;
                        }
                    }
                };
                let started = matches!(event, SpeechEvent::Started(_));
                let _ = events.send(event);
                if !started {
                    continue;
                }

                tokio::time::sleep(duration).await;

                let ended = {
                    let mut guard = state.lock();
                    if guard.cancel_epoch != epoch {
                        None
                    } else {
                        guard.speaking.take().map(|u| SpeechEvent::Ended(u.id))
                    }
                };
                if let Some(event) = ended {
                    let _ = events.send(event);
                }
            }
        });
    }
}

impl SpeechEngine for MockSpeechEngine {
    fn voices(&self) -> Vec<Voice> {
        self.state.lock().voices.clone()
    }

    fn speak(&self, utterance: Utterance) {
        let start_driver = {
            let mut state = self.state.lock();
            state.commands.push(EngineCommand::Speak(utterance.clone()));
            state.queue.push_back(utterance);
            match self.utterance_duration {
                Some(_) if !state.driving => {
                    state.driving = true;
                    true
                }
                _ => false,
            }
        };

        if let (true, Some(duration)) = (start_driver, self.utterance_duration) {
            self.spawn_driver(duration);
        }
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        state.commands.push(EngineCommand::Pause);
        state.paused = true;
    }

    fn resume(&self) {
        let restart_driver = {
            let mut state = self.state.lock();
            state.commands.push(EngineCommand::Resume);
            state.paused = false;
            let pending = !state.queue.is_empty() || state.speaking.is_some();
            let restart = self.utterance_duration.is_some() && pending && !state.driving;
            if restart {
                state.driving = true;
            }
            restart
        };

        if let (true, Some(duration)) = (restart_driver, self.utterance_duration) {
            self.spawn_driver(duration);
        }
    }

    fn cancel(&self) {
        let mut state = self.state.lock();
        state.commands.push(EngineCommand::Cancel);
        state.queue.clear();
        state.speaking = None;
        state.paused = false;
        state.cancel_epoch += 1;
    }
}
