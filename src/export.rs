/*!
 * Narration export: record the synthesized speech and time its subtitles.
 *
 * The exporter captures the system audio output while the engine speaks the
 * script, and stamps each sentence with its start and end offsets measured
 * from the moment recording began. Once every sentence has finished, the
 * recorder is stopped after a short grace delay and the collected audio plus
 * an SRT track are returned together.
 *
 * The capture stream is held by a `StreamGuard`, so its tracks are released
 * however the export ends.
 */

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use bytes::{Bytes, BytesMut};
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::capture::{CaptureDevice, CaptureStream, Recorder, RecorderEvent, TrackInfo};
use crate::errors::ExportError;
use crate::file_utils::FileManager;
use crate::sentences::{split_sentences, Sentence};
use crate::speech::{SessionId, SpeechEngine, SpeechEvent, SpeechEventReceiver, Utterance, UtteranceId};
use crate::subtitle_processor::{SubtitleEntry, SubtitleTrack};
use crate::voices::Voice;

/// Counts distinct sentences that finished speaking
#[derive(Debug, Clone)]
pub struct CompletionLatch {
    total: usize,
    done: HashSet<usize>,
}

impl CompletionLatch {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: HashSet::with_capacity(total),
        }
    }

    /// Record a finished sentence; returns false for repeats and out of range positions
    pub fn mark(&mut self, index: usize) -> bool {
        index < self.total && self.done.insert(index)
    }

    pub fn is_complete(&self) -> bool {
        self.done.len() == self.total
    }

    pub fn completed(&self) -> usize {
        self.done.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// Holds a capture stream and stops its tracks when dropped
#[derive(Debug)]
pub struct StreamGuard {
    stream: Box<dyn CaptureStream>,
}

impl StreamGuard {
    pub fn new(stream: Box<dyn CaptureStream>) -> Self {
        Self { stream }
    }

    pub fn audio_tracks(&self) -> Vec<TrackInfo> {
        self.stream.audio_tracks()
    }

    pub fn stream_mut(&mut self) -> &mut dyn CaptureStream {
        self.stream.as_mut()
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.stream.stop_tracks();
    }
}

/// Audio and subtitles produced by one export
#[derive(Debug, Clone)]
pub struct NarrationArtifacts {
    /// Concatenated recorder output
    pub audio: Bytes,
    /// Container format reported by the recorder
    pub mime_type: String,
    /// One entry per sentence, ordered by start offset
    pub subtitles: SubtitleTrack,
}

/// Paths of saved artifacts
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArtifacts {
    pub audio_path: PathBuf,
    pub subtitle_path: PathBuf,
}

impl NarrationArtifacts {
    /// Write the audio and SRT files into `dir`
    pub fn save<P: AsRef<Path>>(
        &self,
        dir: P,
        audio_name: &str,
        subtitle_name: &str,
    ) -> Result<SavedArtifacts, ExportError> {
        let dir = dir.as_ref();
        FileManager::ensure_dir(dir).map_err(|e| ExportError::Save(e.to_string()))?;

        let audio_path = dir.join(audio_name);
        let subtitle_path = dir.join(subtitle_name);

        FileManager::write_bytes(&audio_path, &self.audio)
            .map_err(|e| ExportError::Save(e.to_string()))?;
        self.subtitles
            .write_to_srt(&subtitle_path)
            .map_err(|e| ExportError::Save(e.to_string()))?;

        info!(
            "Saved {} bytes of {} audio to {:?} and {} subtitle(s) to {:?}",
            self.audio.len(),
            self.mime_type,
            audio_path,
            self.subtitles.len(),
            subtitle_path
        );

        Ok(SavedArtifacts { audio_path, subtitle_path })
    }
}

// @struct: Offsets collected for one sentence
#[derive(Debug, Clone, Copy, Default)]
struct SentenceTiming {
    start_ms: Option<u64>,
    end_ms: Option<u64>,
}

/// Records a script read aloud and builds its subtitle track
#[derive(Debug, Clone)]
pub struct NarrationExporter {
    engine: Arc<dyn SpeechEngine>,
    capture: Arc<dyn CaptureDevice>,
    grace: Duration,
}

impl NarrationExporter {
    pub fn new(engine: Arc<dyn SpeechEngine>, capture: Arc<dyn CaptureDevice>, grace: Duration) -> Self {
        Self { engine, capture, grace }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Speak `script` with `voice` while recording the output
    ///
    /// `events` must be the receiver of the engine's event channel; events of
    /// other sessions are skipped. Nothing is returned unless every sentence
    /// was spoken and the recorder stopped cleanly.
    pub async fn export(
        &self,
        script: &str,
        voice: Option<&Voice>,
        events: &mut SpeechEventReceiver,
        progress: Option<&ProgressBar>,
    ) -> Result<NarrationArtifacts, ExportError> {
        let voice = voice.ok_or_else(|| ExportError::Validation("no voice selected".to_string()))?;
        if script.trim().is_empty() {
            return Err(ExportError::Validation("the script is empty".to_string()));
        }
        let sentences = split_sentences(script);
        if sentences.is_empty() {
            return Err(ExportError::Validation("the script has no sentences".to_string()));
        }

        let stream = self.capture.request_audio_capture().await?;
        let mut guard = StreamGuard::new(stream);
        if guard.audio_tracks().is_empty() {
            warn!("Capture stream granted without an audio track");
            return Err(ExportError::NoAudioTrack);
        }

        let (recorder_tx, mut recorder_rx) = mpsc::unbounded_channel();
        let mut recorder = self.capture.open_recorder(guard.stream_mut(), recorder_tx)?;

        let result = self
            .record(&sentences, voice, recorder.as_mut(), &mut recorder_rx, events, progress)
            .await;

        if let Err(e) = &result {
            error!("Export aborted: {}", e);
            self.engine.cancel();
            recorder.stop();
        }
        drop(guard);

        result
    }

    async fn record(
        &self,
        sentences: &[Sentence],
        voice: &Voice,
        recorder: &mut dyn Recorder,
        recorder_rx: &mut mpsc::UnboundedReceiver<RecorderEvent>,
        events: &mut SpeechEventReceiver,
        progress: Option<&ProgressBar>,
    ) -> Result<NarrationArtifacts, ExportError> {
        recorder.start()?;
        let epoch = Instant::now();
        let elapsed_ms = || epoch.elapsed().as_millis() as u64;

        let session = SessionId::next();
        info!(
            "Recording {} sentence(s) with voice {} (session {})",
            sentences.len(),
            voice.name,
            session.value()
        );
        for sentence in sentences {
            let id = UtteranceId { session, index: sentence.index };
            self.engine.speak(Utterance::new(id, sentence.text(), voice));
        }

        if let Some(pb) = progress {
            pb.set_length(sentences.len() as u64);
            pb.set_position(0);
        }

        let mut timings = vec![SentenceTiming::default(); sentences.len()];
        let mut latch = CompletionLatch::new(sentences.len());
        let mut chunks = BytesMut::new();
        let mut stop_at: Option<Instant> = None;
        let mut stop_requested = false;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        return Err(ExportError::Synthesis("the speech engine went away".to_string()));
                    };
                    let Some(id) = event.utterance_id() else {
                        continue;
                    };
                    if id.session != session || id.index >= timings.len() {
                        continue;
                    }

                    match event {
                        SpeechEvent::Started(_) => {
                            timings[id.index].start_ms = Some(elapsed_ms());
                            debug!("Sentence {} started", id.index + 1);
                        }
                        SpeechEvent::Ended(_) => {
                            timings[id.index].end_ms = Some(elapsed_ms());
                            if latch.mark(id.index) {
                                if let Some(pb) = progress {
                                    pb.inc(1);
                                }
                                if latch.is_complete() {
                                    debug!("All sentences spoken, stopping in {:?}", self.grace);
                                    stop_at = Some(Instant::now() + self.grace);
                                }
                            }
                        }
                        SpeechEvent::Failed { message, .. } => {
                            return Err(ExportError::Synthesis(format!(
                                "sentence {}: {}",
                                id.index + 1,
                                message
                            )));
                        }
                        SpeechEvent::VoicesChanged => {}
                    }
                }
                _ = sleep_until(stop_at.unwrap_or_else(Instant::now)), if stop_at.is_some() && !stop_requested => {
                    stop_requested = true;
                    recorder.stop();
                }
                chunk = recorder_rx.recv() => {
                    match chunk {
                        Some(RecorderEvent::Data(data)) => chunks.extend_from_slice(&data),
                        Some(RecorderEvent::Stopped) => break,
                        Some(RecorderEvent::Failed(message)) => return Err(ExportError::Recorder(message)),
                        None => return Err(ExportError::Recorder("the recorder went away".to_string())),
                    }
                }
            }
        }

        if !latch.is_complete() {
            return Err(ExportError::Incomplete {
                completed: latch.completed(),
                total: latch.total(),
            });
        }

        let subtitles = build_subtitles(sentences, &timings);
        if let Some(pb) = progress {
            pb.finish_with_message("recorded");
        }

        Ok(NarrationArtifacts {
            audio: chunks.freeze(),
            mime_type: recorder.mime_type().to_string(),
            subtitles,
        })
    }
}

fn build_subtitles(sentences: &[Sentence], timings: &[SentenceTiming]) -> SubtitleTrack {
    let mut track = SubtitleTrack::new();
    for (sentence, timing) in sentences.iter().zip(timings) {
        let end = timing.end_ms.unwrap_or_default();
        // An engine may skip the start notification
        let start = timing.start_ms.unwrap_or(end).min(end);
        track.push(SubtitleEntry::new(
            sentence.index + 1,
            start,
            end,
            sentence.text().to_string(),
        ));
    }
    track.sort_by_start();
    track
}
