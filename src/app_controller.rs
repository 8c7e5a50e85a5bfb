use log::{debug, error, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use indicatif::ProgressBar;

use crate::app_config::Config;
use crate::capture::CaptureDevice;
use crate::errors::{ExportError, GenerationError, SpeechError};
use crate::export::{NarrationArtifacts, NarrationExporter, SavedArtifacts};
use crate::script_generator::ScriptGenerator;
use crate::speech::{PlaybackState, PlaybackUpdate, Sequencer, SpeechEngine, SpeechEvent, SpeechEventReceiver};
use crate::voices::{Voice, VoiceDirectory};

// @module: Studio controller tying voices, playback, export and generation together

/// Narration studio: one script, one voice, one engine
///
/// The studio owns the receiving end of the engine's event channel. Events
/// are applied through `handle_event`, or awaited with `next_update`.
#[derive(Debug)]
pub struct Studio {
    // @field: App configuration
    config: Config,

    // @field: Shared synthesizer
    engine: Arc<dyn SpeechEngine>,

    // @field: Engine notifications
    events: SpeechEventReceiver,

    // @field: Known voices and the selection
    directory: VoiceDirectory,

    // @field: Playback state machine
    sequencer: Sequencer,

    // @field: Recorder of narrations
    exporter: NarrationExporter,

    // @field: Script writer, created on first use when not injected
    generator: Option<ScriptGenerator>,

    // @field: Whether the configured voice was looked up already
    preferred_applied: bool,
}

impl Studio {
    /// Create a studio over an engine, its event receiver and a capture device
    pub fn new(
        config: Config,
        engine: Arc<dyn SpeechEngine>,
        events: SpeechEventReceiver,
        capture: Arc<dyn CaptureDevice>,
    ) -> Self {
        let grace = Duration::from_millis(config.export.grace_delay_ms);
        let mut studio = Self {
            directory: VoiceDirectory::new(config.speech.voice_preferences.clone()),
            sequencer: Sequencer::new(Arc::clone(&engine)),
            exporter: NarrationExporter::new(Arc::clone(&engine), capture, grace),
            engine,
            events,
            generator: None,
            preferred_applied: false,
            config,
        };
        studio.refresh_voices();
        studio
    }

    /// Use `generator` instead of the configured provider
    pub fn with_generator(mut self, generator: ScriptGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn voices(&self) -> &[Voice] {
        self.directory.voices()
    }

    pub fn selected_voice(&self) -> Option<&Voice> {
        self.directory.selected()
    }

    /// Select a voice by id or name
    pub fn select_voice(&mut self, query: &str) -> Result<&Voice, SpeechError> {
        self.preferred_applied = true;
        let voice = self.directory.select(query)?;
        info!("Voice selected: {} ({})", voice.name, voice.lang);
        Ok(voice)
    }

    /// Re-read the engine's voices; the configured voice wins once it shows up
    pub fn refresh_voices(&mut self) -> Option<&Voice> {
        self.directory.refresh(self.engine.as_ref());

        if !self.preferred_applied && !self.directory.voices().is_empty() {
            self.preferred_applied = true;
            if let Some(preferred) = self.config.speech.preferred_voice.clone() {
                if let Err(e) = self.directory.select(&preferred) {
                    warn!("Configured voice unavailable, keeping the default: {}", e);
                }
            }
        }

        self.directory.selected()
    }

    /// Process events until voices are known or `timeout` passes
    pub async fn wait_for_voices(&mut self, timeout: Duration) -> bool {
        if !self.directory.voices().is_empty() {
            return true;
        }

        let waited = tokio::time::timeout(timeout, async {
            while let Some(event) = self.events.recv().await {
                self.handle_event(&event);
                if !self.directory.voices().is_empty() {
                    return true;
                }
            }
            false
        })
        .await;

        match waited {
            Ok(found) => found,
            Err(_) => {
                warn!("No voices reported after {:?}", timeout);
                false
            }
        }
    }

    /// Apply one engine event
    pub fn handle_event(&mut self, event: &SpeechEvent) -> Option<PlaybackUpdate> {
        if *event == SpeechEvent::VoicesChanged {
            self.refresh_voices();
            return None;
        }

        let update = self.sequencer.handle_event(event)?;
        match &update {
            PlaybackUpdate::SentenceStarted { index, text } => {
                debug!("Speaking sentence {}: {}", index + 1, text);
            }
            PlaybackUpdate::Finished => info!("Playback finished"),
        }
        Some(update)
    }

    /// Wait for the next playback change; None once the engine is gone
    pub async fn next_update(&mut self) -> Option<PlaybackUpdate> {
        loop {
            let event = self.events.recv().await?;
            if let Some(update) = self.handle_event(&event) {
                return Some(update);
            }
        }
    }

    /// Resume when paused, otherwise start reading `script` from the top
    pub fn play(&mut self, script: &str) -> bool {
        if self.sequencer.state() == PlaybackState::Paused {
            return self.resume();
        }

        let started = self.sequencer.play(script, self.directory.selected());
        if started {
            info!("Playback started");
        } else {
            warn!("Nothing to play: a script and a voice are required");
        }
        started
    }

    pub fn pause(&mut self) -> bool {
        let paused = self.sequencer.pause();
        if paused {
            info!("Playback paused");
        }
        paused
    }

    pub fn resume(&mut self) -> bool {
        let resumed = self.sequencer.resume();
        if resumed {
            info!("Playback resumed");
        }
        resumed
    }

    /// Stop playback from any state
    pub fn stop(&mut self) {
        self.sequencer.cancel();
        info!("Playback stopped");
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.sequencer.state()
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_active()
    }

    pub fn current_sentence(&self) -> Option<&str> {
        self.sequencer.current_sentence()
    }

    /// Write a script about `topic` with the configured provider
    pub async fn generate_script(&mut self, topic: &str) -> Result<String, GenerationError> {
        if topic.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        let generation = &self.config.generation;
        let generator = self
            .generator
            .get_or_insert_with(|| ScriptGenerator::from_config(generation));

        match generator.generate(topic).await {
            Ok(script) => {
                info!("Script generated");
                Ok(script)
            }
            Err(e) => {
                error!("Script generation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Record `script` with the selected voice
    ///
    /// Playback is cancelled first; the studio is idle again afterwards,
    /// whatever the outcome.
    pub async fn export(
        &mut self,
        script: &str,
        progress: Option<&ProgressBar>,
    ) -> Result<NarrationArtifacts, ExportError> {
        self.sequencer.cancel();

        let voice = self.directory.selected().cloned();
        let result = self
            .exporter
            .export(script, voice.as_ref(), &mut self.events, progress)
            .await;

        // VoicesChanged may have been skipped while recording
        self.refresh_voices();

        match &result {
            Ok(artifacts) => info!(
                "Export finished: {} subtitle(s), {} bytes of audio",
                artifacts.subtitles.len(),
                artifacts.audio.len()
            ),
            Err(e) => warn!("{}", e.user_message()),
        }
        result
    }

    /// Export and save both artifacts, into `dir` or the configured directory
    pub async fn export_to_dir(
        &mut self,
        script: &str,
        dir: Option<&Path>,
        progress: Option<&ProgressBar>,
    ) -> Result<SavedArtifacts, ExportError> {
        let artifacts = self.export(script, progress).await?;

        let export = &self.config.export;
        let dir = dir.unwrap_or(export.output_dir.as_path());
        artifacts.save(dir, &export.audio_filename, &export.subtitle_filename)
    }
}
