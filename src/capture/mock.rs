/*!
 * Mock capture device for testing.
 *
 * Behaviors:
 * - `MockCaptureDevice::granted()` - one audio track, recorder emits one chunk
 *   on start and one on stop
 * - `MockCaptureDevice::denied()` - the user refuses the capture prompt
 * - `MockCaptureDevice::without_audio()` - granted stream with no audio track
 * - `MockCaptureDevice::failing_recorder()` - recorder fails right after start
 * - `MockCaptureDevice::stopping_early()` - recorder stops on its own right
 *   after start, as when the user ends the share
 *
 * Counters shared between clones let tests check that streams were released.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use async_trait::async_trait;
use bytes::Bytes;

use crate::capture::{
    CaptureDevice, CaptureStream, Recorder, RecorderEvent, RecorderEventSender, TrackInfo,
    TrackKind,
};
use crate::errors::CaptureError;

/// Behavior mode for the mock device
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockCaptureBehavior {
    Granted,
    Denied,
    NoAudioTrack,
    FailingRecorder,
    EarlyStop,
}

#[derive(Debug, Default)]
struct Counters {
    requested: AtomicUsize,
    granted: AtomicUsize,
    released: AtomicUsize,
    recorders_started: AtomicUsize,
    recorders_stopped: AtomicUsize,
}

/// Scripted capture device
#[derive(Debug, Clone)]
pub struct MockCaptureDevice {
    behavior: MockCaptureBehavior,
    counters: Arc<Counters>,
}

impl MockCaptureDevice {
    pub fn new(behavior: MockCaptureBehavior) -> Self {
        Self {
            behavior,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn granted() -> Self {
        Self::new(MockCaptureBehavior::Granted)
    }

    pub fn denied() -> Self {
        Self::new(MockCaptureBehavior::Denied)
    }

    pub fn without_audio() -> Self {
        Self::new(MockCaptureBehavior::NoAudioTrack)
    }

    pub fn failing_recorder() -> Self {
        Self::new(MockCaptureBehavior::FailingRecorder)
    }

    pub fn stopping_early() -> Self {
        Self::new(MockCaptureBehavior::EarlyStop)
    }

    /// Number of capture prompts shown
    pub fn requests(&self) -> usize {
        self.counters.requested.load(Ordering::SeqCst)
    }

    /// Number of streams handed out
    pub fn streams_granted(&self) -> usize {
        self.counters.granted.load(Ordering::SeqCst)
    }

    /// Number of streams whose tracks were stopped
    pub fn streams_released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Streams granted but not yet released
    pub fn live_streams(&self) -> usize {
        self.streams_granted() - self.streams_released()
    }

    pub fn recorders_started(&self) -> usize {
        self.counters.recorders_started.load(Ordering::SeqCst)
    }

    pub fn recorders_stopped(&self) -> usize {
        self.counters.recorders_stopped.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct MockStream {
    tracks: Vec<TrackInfo>,
    stopped: bool,
    counters: Arc<Counters>,
}

impl CaptureStream for MockStream {
    fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks.clone()
    }

    fn stop_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug)]
struct MockRecorder {
    events: RecorderEventSender,
    fail_on_start: bool,
    stop_on_start: bool,
    recording: bool,
    counters: Arc<Counters>,
}

impl Recorder for MockRecorder {
    fn start(&mut self) -> Result<(), CaptureError> {
        self.counters.recorders_started.fetch_add(1, Ordering::SeqCst);
        self.recording = true;
        if self.fail_on_start {
            let _ = self.events.send(RecorderEvent::Failed("encoder crashed".to_string()));
        } else {
            let _ = self.events.send(RecorderEvent::Data(Bytes::from_static(b"head")));
        }
        if self.stop_on_start {
            self.recording = false;
            let _ = self.events.send(RecorderEvent::Stopped);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if !self.recording {
            return;
        }
        self.recording = false;
        self.counters.recorders_stopped.fetch_add(1, Ordering::SeqCst);
        let _ = self.events.send(RecorderEvent::Data(Bytes::from_static(b"tail")));
        let _ = self.events.send(RecorderEvent::Stopped);
    }

    fn mime_type(&self) -> &str {
        "audio/webm"
    }
}

#[async_trait]
impl CaptureDevice for MockCaptureDevice {
    async fn request_audio_capture(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        self.counters.requested.fetch_add(1, Ordering::SeqCst);

        let tracks = match self.behavior {
            MockCaptureBehavior::Denied => {
                return Err(CaptureError::PermissionDenied("user dismissed the prompt".to_string()));
            }
            MockCaptureBehavior::NoAudioTrack => vec![TrackInfo {
                id: "video-0".to_string(),
                kind: TrackKind::Video,
                label: "screen".to_string(),
            }],
            MockCaptureBehavior::Granted
            | MockCaptureBehavior::FailingRecorder
            | MockCaptureBehavior::EarlyStop => {
                vec![TrackInfo::audio("audio-0", "system output")]
            }
        };

        self.counters.granted.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStream {
            tracks,
            stopped: false,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn open_recorder(
        &self,
        _stream: &mut dyn CaptureStream,
        events: RecorderEventSender,
    ) -> Result<Box<dyn Recorder>, CaptureError> {
        Ok(Box::new(MockRecorder {
            events,
            fail_on_start: self.behavior == MockCaptureBehavior::FailingRecorder,
            stop_on_start: self.behavior == MockCaptureBehavior::EarlyStop,
            recording: false,
            counters: Arc::clone(&self.counters),
        }))
    }
}
