/*!
 * Tests for the command line speech and capture backends
 */

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use once_cell::sync::Lazy;

use narrata::app_config::CaptureConfig;
use narrata::capture::ffmpeg::FfmpegCaptureDevice;
use narrata::capture::mock::MockCaptureDevice;
use narrata::capture::{CaptureDevice, CaptureStream, Recorder, RecorderEvent, TrackKind};
use narrata::errors::SpeechError;
use narrata::speech::espeak::CommandSpeechEngine;
use narrata::speech::{
    speech_channel, SessionId, SpeechEngine, SpeechEvent, SpeechEventReceiver, Utterance, UtteranceId,
};
use narrata::voices::{pick_default, Voice, VoicePreferences};

const VOICE_LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 5  es              --/M      Spanish_(Spain)    roa/es
 5  es-419          --/F      Spanish_(Latin_America) roa/es-419      (es-mx 6)
";

#[test]
fn test_parse_voice_list_withEspeakTable_shouldSkipHeader() {
    let voices = CommandSpeechEngine::parse_voice_list(VOICE_LISTING);

    assert_eq!(voices.len(), 4);
    assert_eq!(voices[0].id, "gmw/af");
    assert_eq!(voices[0].lang, "af");
    assert_eq!(voices[1].name, "English (America) (male)");
    assert_eq!(voices[3].id, "roa/es-419");
    assert_eq!(voices[3].name, "Spanish (Latin America) (female)");
    assert!(voices.iter().all(|v| v.local_service));
}

#[test]
fn test_parse_voice_list_withFileColumn_shouldUseItAsId() {
    let voices = CommandSpeechEngine::parse_voice_list(VOICE_LISTING);

    // `-v` takes the voice file, not the display name
    let ids: Vec<&str> = voices.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["gmw/af", "gmw/en-US", "roa/es", "roa/es-419"]);
    assert_eq!(voices[2].name, "Spanish (Spain) (male)");
    assert_eq!(voices[2].lang, "es");
}

#[test]
fn test_parse_voice_list_withBlankOrShortLines_shouldIgnoreThem() {
    let voices = CommandSpeechEngine::parse_voice_list("\n  \n 5 xx\n 5  es  --/M  Spanish\n");
    assert!(voices.is_empty());
}

#[test]
fn test_pick_default_withEspeakVoices_shouldPreferSpanishMale() {
    let voices = CommandSpeechEngine::parse_voice_list(VOICE_LISTING);
    let picked = pick_default(&voices, &VoicePreferences::default()).unwrap();

    // Every "(male)" or "(female)" voice in es/en is in the pool; the first wins
    assert_eq!(picked.id, "gmw/en-US");
}

#[test]
fn test_record_args_withDefaultConfig_shouldWriteWebmToStdout() {
    let args = FfmpegCaptureDevice::record_args(&CaptureConfig::default());

    assert_eq!(
        args,
        vec![
            "-hide_banner", "-loglevel", "error",
            "-f", "pulse", "-i", "@DEFAULT_MONITOR@",
            "-vn", "-c:a", "libopus", "-f", "webm", "pipe:1",
        ]
    );
}

#[tokio::test]
async fn test_mock_capture_withGrantedStream_shouldRecordHeadAndTail() {
    let device = MockCaptureDevice::granted();
    let mut stream = device.request_audio_capture().await.unwrap();
    assert_eq!(stream.audio_tracks().len(), 1);
    assert_eq!(stream.tracks()[0].kind, TrackKind::Audio);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut recorder = device.open_recorder(stream.as_mut(), tx).unwrap();
    recorder.start().unwrap();
    recorder.stop();
    recorder.stop();

    assert_eq!(rx.recv().await, Some(RecorderEvent::Data(bytes::Bytes::from_static(b"head"))));
    assert_eq!(rx.recv().await, Some(RecorderEvent::Data(bytes::Bytes::from_static(b"tail"))));
    assert_eq!(rx.recv().await, Some(RecorderEvent::Stopped));
    assert!(rx.try_recv().is_err());

    stream.stop_tracks();
    stream.stop_tracks();
    assert_eq!(device.streams_released(), 1);
    assert_eq!(device.recorders_stopped(), 1);
}

// Stand-in for espeak-ng: the spoken text picks the behavior
const STUB_ENGINE: &str = r#"#!/bin/sh
if [ "$1" = "--voices" ]; then
  printf 'Pty Language       Age/Gender VoiceName          File\n'
  printf ' 5  es              --/M      Spanish_(Spain)    roa/es\n'
  exit 0
fi
case "$5" in
  *slow*) sleep 2 ;;
  *broken*) echo "cannot synthesize" >&2; exit 1 ;;
  *) sleep 0.2 ;;
esac
"#;

// Written once, before any test spawns it
static STUB_PATH: Lazy<PathBuf> = Lazy::new(|| {
    let path = Path::new(env!("CARGO_TARGET_TMPDIR")).join("narrata-espeak-stub.sh");
    std::fs::write(&path, STUB_ENGINE).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
});

fn stub_engine() -> (CommandSpeechEngine, SpeechEventReceiver) {
    let (tx, rx) = speech_channel();
    (CommandSpeechEngine::new(STUB_PATH.to_string_lossy(), 160, tx), rx)
}

fn utterance(session: SessionId, index: usize, text: &str) -> Utterance {
    Utterance::new(UtteranceId { session, index }, text, &Voice::new("roa/es", "Spanish", "es", true))
}

async fn next_event(events: &mut SpeechEventReceiver, within: Duration) -> Option<SpeechEvent> {
    tokio::time::timeout(within, events.recv()).await.ok().flatten()
}

#[tokio::test]
async fn test_command_engine_withTwoUtterances_shouldSpeakSerially() {
    let (engine, mut events) = stub_engine();
    let session = SessionId::next();
    let first = utterance(session, 0, "Uno.");
    let second = utterance(session, 1, "Dos.");

    engine.speak(first.clone());
    engine.speak(second.clone());

    let wait = Duration::from_secs(5);
    assert_eq!(next_event(&mut events, wait).await, Some(SpeechEvent::Started(first.id)));
    assert_eq!(next_event(&mut events, wait).await, Some(SpeechEvent::Ended(first.id)));
    assert_eq!(next_event(&mut events, wait).await, Some(SpeechEvent::Started(second.id)));
    assert_eq!(next_event(&mut events, wait).await, Some(SpeechEvent::Ended(second.id)));
}

#[tokio::test]
async fn test_command_engine_withCancelWhileSpeaking_shouldStartNextSessionAtOnce() {
    let (engine, mut events) = stub_engine();

    // The interrupt used to be lost when cancel landed right after Started
    for _ in 0..10 {
        let old = utterance(SessionId::next(), 0, "A slow sentence.");
        let new = utterance(SessionId::next(), 0, "Quick.");

        engine.speak(old.clone());
        assert_eq!(
            next_event(&mut events, Duration::from_secs(5)).await,
            Some(SpeechEvent::Started(old.id))
        );
        engine.cancel();
        engine.speak(new.clone());

        assert_eq!(
            next_event(&mut events, Duration::from_secs(1)).await,
            Some(SpeechEvent::Started(new.id))
        );
        assert_eq!(
            next_event(&mut events, Duration::from_secs(5)).await,
            Some(SpeechEvent::Ended(new.id))
        );
        assert!(events.try_recv().is_err());
    }
}

#[tokio::test]
async fn test_command_engine_withPause_shouldHoldNextSentenceUntilResume() {
    let (engine, mut events) = stub_engine();
    let session = SessionId::next();
    let first = utterance(session, 0, "Uno.");
    let second = utterance(session, 1, "Dos.");

    engine.speak(first.clone());
    engine.speak(second.clone());
    assert_eq!(
        next_event(&mut events, Duration::from_secs(5)).await,
        Some(SpeechEvent::Started(first.id))
    );
    engine.pause();

    // The current sentence finishes, the next one waits
    assert_eq!(
        next_event(&mut events, Duration::from_secs(5)).await,
        Some(SpeechEvent::Ended(first.id))
    );
    assert_eq!(next_event(&mut events, Duration::from_millis(600)).await, None);

    engine.resume();
    assert_eq!(
        next_event(&mut events, Duration::from_secs(5)).await,
        Some(SpeechEvent::Started(second.id))
    );
    assert_eq!(
        next_event(&mut events, Duration::from_secs(5)).await,
        Some(SpeechEvent::Ended(second.id))
    );
}

#[tokio::test]
async fn test_command_engine_withFailingProgram_shouldReportStderr() {
    let (engine, mut events) = stub_engine();
    let broken = utterance(SessionId::next(), 0, "A broken sentence.");

    engine.speak(broken.clone());

    let wait = Duration::from_secs(5);
    assert_eq!(next_event(&mut events, wait).await, Some(SpeechEvent::Started(broken.id)));
    assert_eq!(
        next_event(&mut events, wait).await,
        Some(SpeechEvent::Failed { id: broken.id, message: "cannot synthesize".to_string() })
    );
}

#[tokio::test]
async fn test_list_voices_withStubProgram_shouldParseTable() {
    let (engine, _events) = stub_engine();

    let voices = engine.list_voices().await.unwrap();

    assert_eq!(voices, vec![Voice::new("roa/es", "Spanish (Spain) (male)", "es", true)]);
}

#[tokio::test]
async fn test_list_voices_withMissingProgram_shouldReturnEngineError() {
    let (tx, _events) = speech_channel();
    let engine = CommandSpeechEngine::new("/definitely/not/espeak-ng", 160, tx);

    let err = engine.list_voices().await.unwrap_err();

    assert!(matches!(err, SpeechError::Engine(ref m) if m.contains("Failed to run")));
}

#[tokio::test]
async fn test_load_voices_withStubProgram_shouldAnnounceChange() {
    let (engine, mut events) = stub_engine();

    engine.load_voices();

    assert_eq!(
        next_event(&mut events, Duration::from_secs(5)).await,
        Some(SpeechEvent::VoicesChanged)
    );
    assert_eq!(engine.voices().len(), 1);
}
