/*!
 * Speech synthesis capability.
 *
 * The studio never talks to a synthesizer directly; it goes through the
 * `SpeechEngine` trait so the sequencer and the exporter can run against
 * a command-line engine or a deterministic mock:
 * - `espeak`: drives the `espeak-ng` command
 * - `mock`: scripted engine for tests
 * - `sequencer`: play/pause/resume/stop state machine over an engine
 *
 * Engines report progress asynchronously through a `SpeechEvent` channel.
 * Every utterance carries the `SessionId` of the invocation that queued it,
 * so a consumer can drop trailing events from a cancelled session.
 */

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use crate::voices::Voice;

pub mod espeak;
pub mod mock;
pub mod sequencer;

pub use sequencer::{PlaybackState, PlaybackUpdate, Sequencer};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Generation number of one play or export invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a fresh, never reused session id
    pub fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Identity of one queued utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceId {
    /// Invocation that queued the utterance
    pub session: SessionId,
    /// Sentence position inside that invocation
    pub index: usize,
}

/// Request to speak one sentence with one voice
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub voice: Voice,
    pub lang: String,
}

impl Utterance {
    pub fn new(id: UtteranceId, text: impl Into<String>, voice: &Voice) -> Self {
        Self {
            id,
            text: text.into(),
            voice: voice.clone(),
            lang: voice.lang.clone(),
        }
    }
}

/// Lifecycle notifications emitted by an engine
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    /// The engine started speaking an utterance
    Started(UtteranceId),
    /// The engine finished speaking an utterance
    Ended(UtteranceId),
    /// The engine could not speak an utterance
    Failed { id: UtteranceId, message: String },
    /// The set of available voices changed
    VoicesChanged,
}

impl SpeechEvent {
    pub fn utterance_id(&self) -> Option<UtteranceId> {
        match self {
            Self::Started(id) | Self::Ended(id) => Some(*id),
            Self::Failed { id, .. } => Some(*id),
            Self::VoicesChanged => None,
        }
    }
}

pub type SpeechEventSender = mpsc::UnboundedSender<SpeechEvent>;
pub type SpeechEventReceiver = mpsc::UnboundedReceiver<SpeechEvent>;

/// Create the channel an engine reports through
pub fn speech_channel() -> (SpeechEventSender, SpeechEventReceiver) {
    mpsc::unbounded_channel()
}

/// Platform speech synthesizer
///
/// Utterances are spoken one at a time in the order they were queued; the
/// caller does not wait between them. `cancel` drops everything queued and
/// interrupts the current utterance, but events already in flight may still
/// arrive afterwards.
pub trait SpeechEngine: Send + Sync + Debug {
    /// Currently known voices; may be empty until `VoicesChanged` is emitted
    fn voices(&self) -> Vec<Voice>;

    /// Queue an utterance behind the ones already queued
    fn speak(&self, utterance: Utterance);

    fn pause(&self);

    fn resume(&self);

    /// Drop the queue and stop the current utterance
    fn cancel(&self);
}
