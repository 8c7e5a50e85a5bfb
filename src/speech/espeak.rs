use std::collections::VecDeque;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use log::{debug, error, warn};
use parking_lot::Mutex;
use tokio::process::Command;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::app_config::SpeechConfig;
use crate::errors::SpeechError;
use crate::speech::{SpeechEngine, SpeechEvent, SpeechEventSender, Utterance};
use crate::voices::Voice;

// @module: Speech engine backed by the espeak-ng command

#[derive(Debug, Default)]
struct EngineState {
    voices: Vec<Voice>,
    queue: VecDeque<Utterance>,
    paused: bool,
    running: bool,
    cancel_epoch: u64,
}

enum NextStep {
    Wait,
    Speak(Utterance, u64),
    Done,
}

/// Serial utterance queue spoken through `espeak-ng`
///
/// Each utterance runs one child process. Pausing takes effect between
/// sentences: the sentence being spoken finishes, the rest of the queue waits.
#[derive(Debug, Clone)]
pub struct CommandSpeechEngine {
    program: String,
    rate_wpm: u32,
    events: SpeechEventSender,
    state: Arc<Mutex<EngineState>>,
    wake: Arc<Notify>,
    interrupt: Arc<Notify>,
}

impl CommandSpeechEngine {
    pub fn new(program: impl Into<String>, rate_wpm: u32, events: SpeechEventSender) -> Self {
        Self {
            program: program.into(),
            rate_wpm,
            events,
            state: Arc::new(Mutex::new(EngineState::default())),
            wake: Arc::new(Notify::new()),
            interrupt: Arc::new(Notify::new()),
        }
    }

    pub fn from_config(config: &SpeechConfig, events: SpeechEventSender) -> Self {
        Self::new(config.program.clone(), config.rate_wpm, events)
    }

    /// Enumerate voices in the background and emit `VoicesChanged` when done
    pub fn load_voices(&self) {
        let engine = self.clone();

        tokio::spawn(async move {
            match engine.list_voices().await {
                Ok(voices) => {
                    debug!("{} reported {} voice(s)", engine.program, voices.len());
                    engine.state.lock().voices = voices;
                    let _ = engine.events.send(SpeechEvent::VoicesChanged);
                }
                Err(e) => error!("Voice list unavailable: {}", e),
            }
        });
    }

    /// Run `espeak-ng --voices` and parse its table
    pub async fn list_voices(&self) -> Result<Vec<Voice>, SpeechError> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            warn!("{} --voices exited with {}", self.program, output.status);
            return Err(SpeechError::Engine(format!(
                "{} --voices exited with {}",
                self.program, output.status
            )));
        }

        Ok(Self::parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Parse the table printed by `espeak-ng --voices`
    ///
    /// Columns: priority, language, age/gender, voice name, file, other
    /// languages. The file column is what `-v` accepts, so it becomes the id;
    /// underscores in voice names stand for spaces.
    pub fn parse_voice_list(listing: &str) -> Vec<Voice> {
        listing
            .lines()
            .filter(|line| !line.trim_start().starts_with("Pty"))
            .filter_map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() < 5 {
                    return None;
                }
                let lang = fields[1];
                let gender = match fields[2].rsplit('/').next() {
                    Some("M") => Some("male"),
                    Some("F") => Some("female"),
                    _ => None,
                };
                let base_name = fields[3].replace('_', " ");
                let name = match gender {
                    Some(gender) => format!("{} ({})", base_name, gender),
                    None => base_name,
                };
                Some(Voice::new(fields[4], name, lang, true))
            })
            .collect()
    }

    fn ensure_worker(&self) {
        {
            let mut state = self.state.lock();
            if state.running {
                return;
            }
            state.running = true;
        }

        let engine = self.clone();
        tokio::spawn(async move { engine.run_queue().await });
    }

    async fn run_queue(self) {
        loop {
            let next = {
                let mut state = self.state.lock();
                if state.paused {
                    NextStep::Wait
                } else if let Some(utterance) = state.queue.pop_front() {
                    NextStep::Speak(utterance, state.cancel_epoch)
                } else {
                    state.running = false;
                    NextStep::Done
                }
            };

            match next {
                NextStep::Wait => self.wake.notified().await,
                NextStep::Done => break,
                NextStep::Speak(utterance, epoch) => {
                    // Registered before the epoch check, so no cancel slips between them
                    let interrupted = self.interrupt.notified();
                    tokio::pin!(interrupted);
                    interrupted.as_mut().enable();
                    if self.state.lock().cancel_epoch != epoch {
                        continue;
                    }

                    let _ = self.events.send(SpeechEvent::Started(utterance.id));
                    let result = self.speak_now(&utterance, interrupted).await;

                    // Cancelled utterances report nothing
                    if self.state.lock().cancel_epoch != epoch {
                        continue;
                    }
                    let event = match result {
                        Ok(()) => SpeechEvent::Ended(utterance.id),
                        Err(message) => SpeechEvent::Failed { id: utterance.id, message },
                    };
                    let _ = self.events.send(event);
                }
            }
        }
    }

    async fn speak_now(
        &self,
        utterance: &Utterance,
        interrupted: Pin<&mut Notified<'_>>,
    ) -> Result<(), String> {
        let child = Command::new(&self.program)
            .arg("-v")
            .arg(&utterance.voice.id)
            .arg("-s")
            .arg(self.rate_wpm.to_string())
            .arg(&utterance.text)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to start {}: {}", self.program, e))?;

        tokio::select! {
            output = child.wait_with_output() => {
                let output = output.map_err(|e| format!("{} failed: {}", self.program, e))?;
                if output.status.success() {
                    Ok(())
                } else {
                    Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
                }
            }
            _ = interrupted => Err("interrupted".to_string()),
        }
    }
}

impl SpeechEngine for CommandSpeechEngine {
    fn voices(&self) -> Vec<Voice> {
        self.state.lock().voices.clone()
    }

    fn speak(&self, utterance: Utterance) {
        self.state.lock().queue.push_back(utterance);
        self.ensure_worker();
    }

    fn pause(&self) {
        self.state.lock().paused = true;
    }

    fn resume(&self) {
        self.state.lock().paused = false;
        self.wake.notify_one();
    }

    fn cancel(&self) {
        {
            let mut state = self.state.lock();
            state.queue.clear();
            state.paused = false;
            state.cancel_epoch += 1;
        }
        self.interrupt.notify_waiters();
        self.wake.notify_one();
    }
}
