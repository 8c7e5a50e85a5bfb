/*!
 * Common test utilities for the narrata test suite
 */

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use tempfile::TempDir;

use narrata::app_config::Config;
use narrata::capture::mock::MockCaptureDevice;
use narrata::speech::mock::MockSpeechEngine;
use narrata::speech::{speech_channel, SpeechEngine, SpeechEventReceiver};
use narrata::{Studio, Voice};

pub const SAMPLE_SCRIPT: &str = "Hello world. This is a test!";

/// Routes library logs through the test harness; safe to call repeatedly
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A voice set resembling what a desktop synthesizer reports
pub fn sample_voices() -> Vec<Voice> {
    vec![
        Voice::new("en-us-1", "English (America)", "en-US", true),
        Voice::new("es-es-jorge", "Jorge male", "es-ES", true),
        Voice::new("es-mx-narrator", "Narrator male", "es-MX", false),
        Voice::new("fr-fr-1", "French", "fr-FR", true),
    ]
}

/// A single voice for tests that only need one
pub fn test_voice() -> Voice {
    Voice::new("test-voice", "Test Voice", "en-US", true)
}

/// Default config with the grace delay used by the tests
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.export.grace_delay_ms = 500;
    config
}

/// Manually stepped mock engine with its event receiver
pub fn manual_engine(voices: Vec<Voice>) -> (MockSpeechEngine, SpeechEventReceiver) {
    let (tx, rx) = speech_channel();
    (MockSpeechEngine::new(tx).with_voices(voices), rx)
}

/// Self-driving mock engine, one second per sentence
pub fn timed_engine(voices: Vec<Voice>) -> (MockSpeechEngine, SpeechEventReceiver) {
    let (tx, rx) = speech_channel();
    (
        MockSpeechEngine::timed(tx, Duration::from_secs(1)).with_voices(voices),
        rx,
    )
}

/// Studio over a mock engine and a mock capture device
pub fn studio_with(
    engine: &MockSpeechEngine,
    events: SpeechEventReceiver,
    capture: &MockCaptureDevice,
) -> Studio {
    let engine: Arc<dyn SpeechEngine> = Arc::new(engine.clone());
    Studio::new(test_config(), engine, events, Arc::new(capture.clone()))
}
