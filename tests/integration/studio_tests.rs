/*!
 * Integration tests for the studio lifecycle
 */

use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;

use narrata::app_config::GenerationConfig;
use narrata::capture::mock::MockCaptureDevice;
use narrata::errors::{ExportError, GenerationError};
use narrata::providers::mock::MockProvider;
use narrata::speech::mock::{EngineCommand, MockSpeechEngine};
use narrata::speech::{speech_channel, SpeechEngine};
use narrata::voices::Voice;
use narrata::{PlaybackState, PlaybackUpdate, ScriptGenerator, Studio};
use crate::common;

/// Test voices reported after start-up are picked up
#[tokio::test]
async fn test_wait_for_voices_withLateVoices_shouldSelectDefault() {
    let (engine, events) = common::manual_engine(Vec::new());
    let capture = MockCaptureDevice::granted();
    let mut studio = common::studio_with(&engine, events, &capture);
    assert!(studio.selected_voice().is_none());

    engine.set_voices(common::sample_voices());
    assert!(studio.wait_for_voices(Duration::from_secs(1)).await);

    assert_eq!(studio.voices().len(), 4);
    assert_eq!(studio.selected_voice().unwrap().id, "es-mx-narrator");
}

/// Test waiting gives up when no voice ever shows up
#[tokio::test(start_paused = true)]
async fn test_wait_for_voices_withSilentEngine_shouldTimeOut() {
    let (engine, events) = common::manual_engine(Vec::new());
    let capture = MockCaptureDevice::granted();
    let mut studio = common::studio_with(&engine, events, &capture);

    assert!(!studio.wait_for_voices(Duration::from_secs(3)).await);
    assert!(studio.selected_voice().is_none());
}

/// Test the configured voice overrides the default pick
#[test]
fn test_new_withPreferredVoice_shouldSelectIt() {
    let (tx, events) = speech_channel();
    let engine = MockSpeechEngine::new(tx).with_voices(common::sample_voices());
    let mut config = common::test_config();
    config.speech.preferred_voice = Some("jorge male".to_string());

    let engine: Arc<dyn SpeechEngine> = Arc::new(engine);
    let studio = Studio::new(config, engine, events, Arc::new(MockCaptureDevice::granted()));

    assert_eq!(studio.selected_voice().unwrap().id, "es-es-jorge");
}

/// Test play, pause and the resume-on-play behavior
#[tokio::test]
async fn test_play_whilePaused_shouldResumeInsteadOfRestarting() {
    let (engine, events) = common::manual_engine(common::sample_voices());
    let capture = MockCaptureDevice::granted();
    let mut studio = common::studio_with(&engine, events, &capture);

    assert!(studio.play(common::SAMPLE_SCRIPT));
    engine.step();
    assert_eq!(
        studio.next_update().await,
        Some(PlaybackUpdate::SentenceStarted { index: 0, text: "Hello world.".to_string() })
    );
    assert_eq!(studio.current_sentence(), Some("Hello world."));

    assert!(studio.pause());
    assert_eq!(studio.playback_state(), PlaybackState::Paused);

    let speaks_before = engine.commands().iter().filter(|c| matches!(c, EngineCommand::Speak(_))).count();
    assert!(studio.play(common::SAMPLE_SCRIPT));
    let speaks_after = engine.commands().iter().filter(|c| matches!(c, EngineCommand::Speak(_))).count();

    assert_eq!(speaks_before, speaks_after);
    assert_eq!(studio.playback_state(), PlaybackState::Playing);
    assert_eq!(engine.commands().last(), Some(&EngineCommand::Resume));

    studio.stop();
    assert_eq!(studio.playback_state(), PlaybackState::Idle);
    assert!(!studio.is_playing());
}

/// Test playing without any voice does nothing
#[test]
fn test_play_withoutVoices_shouldNotStart() {
    let (engine, events) = common::manual_engine(Vec::new());
    let capture = MockCaptureDevice::granted();
    let mut studio = common::studio_with(&engine, events, &capture);

    assert!(!studio.play(common::SAMPLE_SCRIPT));
    assert!(engine.commands().is_empty());
}

/// Test export cancels playback and ignores its trailing events
#[tokio::test(start_paused = true)]
async fn test_export_whilePlaying_shouldCancelPlaybackFirst() -> Result<()> {
    common::init_test_logger();
    let (engine, events) = common::timed_engine(common::sample_voices());
    let capture = MockCaptureDevice::granted();
    let mut studio = common::studio_with(&engine, events, &capture);

    assert!(studio.play("Playback sentence. Another one."));

    let artifacts = studio.export(common::SAMPLE_SCRIPT, None).await?;

    // play: cancel + two speaks, then the export's cancel
    let commands = engine.commands();
    assert_eq!(commands[3], EngineCommand::Cancel);
    assert_eq!(studio.playback_state(), PlaybackState::Idle);

    let times: Vec<(u64, u64)> = artifacts
        .subtitles
        .entries
        .iter()
        .map(|e| (e.start_time_ms, e.end_time_ms))
        .collect();
    assert_eq!(times, vec![(0, 1000), (1000, 2000)]);
    assert_eq!(capture.live_streams(), 0);
    Ok(())
}

/// Test a voice list change while recording is picked up afterwards
#[tokio::test(start_paused = true)]
async fn test_export_withVoicesChangedWhileRecording_shouldRefreshVoices() -> Result<()> {
    let (engine, events) = common::timed_engine(common::sample_voices());
    let capture = MockCaptureDevice::granted();
    let mut studio = common::studio_with(&engine, events, &capture);
    assert_eq!(studio.voices().len(), 4);

    let mut voices = common::sample_voices();
    voices.push(Voice::new("de-de-1", "German", "de-DE", true));
    let (result, _) = tokio::join!(studio.export(common::SAMPLE_SCRIPT, None), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        engine.set_voices(voices);
    });

    let artifacts = result?;
    assert_eq!(artifacts.subtitles.len(), 2);
    assert_eq!(studio.voices().len(), 5);
    assert_eq!(studio.selected_voice().unwrap().id, "es-mx-narrator");
    Ok(())
}

/// Test export without a selected voice
#[tokio::test]
async fn test_export_withoutVoice_shouldFailValidation() {
    let (engine, events) = common::manual_engine(Vec::new());
    let capture = MockCaptureDevice::granted();
    let mut studio = common::studio_with(&engine, events, &capture);

    let err = studio.export(common::SAMPLE_SCRIPT, None).await.unwrap_err();

    assert!(matches!(err, ExportError::Validation(_)));
    assert_eq!(capture.requests(), 0);
}

/// Test a denied capture leaves the studio idle and usable
#[tokio::test]
async fn test_export_withDeniedCapture_shouldStayIdle() {
    let (engine, events) = common::manual_engine(common::sample_voices());
    let capture = MockCaptureDevice::denied();
    let mut studio = common::studio_with(&engine, events, &capture);

    let err = studio.export(common::SAMPLE_SCRIPT, None).await.unwrap_err();

    assert!(matches!(err, ExportError::PermissionDenied(_)));
    assert_eq!(studio.playback_state(), PlaybackState::Idle);
    assert!(studio.play(common::SAMPLE_SCRIPT));
}

/// Test exporting straight to a directory
#[tokio::test(start_paused = true)]
async fn test_export_to_dir_withTempDir_shouldWriteBothFiles() -> Result<()> {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir()?;
    let (engine, events) = common::timed_engine(common::sample_voices());
    let capture = MockCaptureDevice::granted();
    let mut studio = common::studio_with(&engine, events, &capture);

    let saved = studio
        .export_to_dir(common::SAMPLE_SCRIPT, Some(temp_dir.path()), None)
        .await?;

    assert_eq!(saved.audio_path, temp_dir.path().join("narration.webm"));
    assert_eq!(std::fs::read(&saved.audio_path)?, b"headtail");
    let srt = std::fs::read_to_string(&saved.subtitle_path)?;
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,000\nHello world.\n\n2\n"));
    Ok(())
}

/// Test script generation through an injected provider
#[tokio::test]
async fn test_generate_script_withMockProvider_shouldReturnScript() -> Result<()> {
    let (engine, events) = common::manual_engine(common::sample_voices());
    let capture = MockCaptureDevice::granted();
    let provider = MockProvider::working();
    let generator = ScriptGenerator::with_provider(Arc::new(provider.clone()), &GenerationConfig::default());
    let mut studio = common::studio_with(&engine, events, &capture).with_generator(generator);

    let script = studio.generate_script("the sea").await?;
    assert!(script.contains("the sea"));

    let err = studio.generate_script("  ").await.unwrap_err();
    assert!(matches!(err, GenerationError::EmptyPrompt));
    assert_eq!(provider.request_count(), 1);
    Ok(())
}

/// Test a failing provider surfaces a readable error
#[tokio::test]
async fn test_generate_script_withFailingProvider_shouldReportProvider() {
    let (engine, events) = common::manual_engine(common::sample_voices());
    let capture = MockCaptureDevice::granted();
    let generator = ScriptGenerator::with_provider(Arc::new(MockProvider::failing()), &GenerationConfig::default());
    let mut studio = common::studio_with(&engine, events, &capture).with_generator(generator);

    let err = studio.generate_script("the sea").await.unwrap_err();
    assert!(err.to_string().contains("Mock API error"));
}
