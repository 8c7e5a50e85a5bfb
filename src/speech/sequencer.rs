use std::sync::Arc;
use log::{debug, trace, warn};

use crate::sentences::{split_sentences, Sentence};
use crate::speech::{SessionId, SpeechEngine, SpeechEvent, Utterance, UtteranceId};
use crate::voices::Voice;

// @module: Sentence-by-sentence playback over a speech engine

/// Playback state exposed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Change produced by a speech event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackUpdate {
    /// A sentence became the current one
    SentenceStarted { index: usize, text: String },
    /// The last sentence ended; the sequencer is idle again
    Finished,
}

// @struct: Utterances queued by one play invocation
#[derive(Debug)]
struct PlaybackSession {
    id: SessionId,
    sentences: Vec<Sentence>,
}

/// Drives an engine through the sentences of one script at a time
#[derive(Debug)]
pub struct Sequencer {
    engine: Arc<dyn SpeechEngine>,
    state: PlaybackState,
    session: Option<PlaybackSession>,
    current: Option<usize>,
}

impl Sequencer {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            state: PlaybackState::Idle,
            session: None,
            current: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether utterances of a session are queued or speaking
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Position of the sentence being spoken
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Trimmed text of the sentence being spoken
    pub fn current_sentence(&self) -> Option<&str> {
        let session = self.session.as_ref()?;
        session.sentences.get(self.current?).map(Sentence::text)
    }

    /// Speak `text` with `voice`, replacing whatever was playing
    ///
    /// Returns false without touching the engine when the text is empty or
    /// no voice is given.
    pub fn play(&mut self, text: &str, voice: Option<&Voice>) -> bool {
        let Some(voice) = voice else {
            debug!("Ignoring play request without a voice");
            return false;
        };
        if text.is_empty() {
            debug!("Ignoring play request with an empty script");
            return false;
        }

        self.cancel();

        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return false;
        }

        let id = SessionId::next();
        debug!(
            "Queueing {} sentence(s) for session {} with voice {}",
            sentences.len(),
            id.value(),
            voice.name
        );
        for sentence in &sentences {
            let utterance_id = UtteranceId { session: id, index: sentence.index };
            self.engine.speak(Utterance::new(utterance_id, sentence.text(), voice));
        }

        self.session = Some(PlaybackSession { id, sentences });
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.engine.pause();
        self.state = PlaybackState::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != PlaybackState::Paused {
            return false;
        }
        self.engine.resume();
        self.state = PlaybackState::Playing;
        true
    }

    /// Stop everything and return to idle, whatever the current state
    pub fn cancel(&mut self) {
        self.engine.cancel();
        self.reset();
    }

    fn reset(&mut self) {
        self.state = PlaybackState::Idle;
        self.session = None;
        self.current = None;
    }

    /// Apply an engine event; events of other sessions are discarded
    pub fn handle_event(&mut self, event: &SpeechEvent) -> Option<PlaybackUpdate> {
        let id = event.utterance_id()?;
        let session = self.session.as_ref()?;
        if id.session != session.id {
            trace!("Discarding event of stale session {}", id.session.value());
            return None;
        }
        let is_last = id.index + 1 == session.sentences.len();

        match event {
            SpeechEvent::Started(_) => {
                let text = session.sentences.get(id.index)?.text().to_string();
                self.state = PlaybackState::Playing;
                self.current = Some(id.index);
                Some(PlaybackUpdate::SentenceStarted { index: id.index, text })
            }
            SpeechEvent::Ended(_) | SpeechEvent::Failed { .. } => {
                if let SpeechEvent::Failed { message, .. } = event {
                    warn!("Sentence {} could not be spoken: {}", id.index + 1, message);
                }
                if is_last {
                    self.reset();
                    Some(PlaybackUpdate::Finished)
                } else {
                    None
                }
            }
            SpeechEvent::VoicesChanged => None,
        }
    }
}
