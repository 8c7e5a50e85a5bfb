/*!
 * Audio capture capability.
 *
 * An export records whatever the synthesizer plays. The exporter asks a
 * `CaptureDevice` for a stream of the system audio output (the user may
 * refuse), then opens a `Recorder` on that stream:
 * - `ffmpeg`: records the default monitor source with the ffmpeg command
 * - `mock`: scripted device for tests
 */

use std::fmt::Debug;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::errors::CaptureError;

pub mod ffmpeg;
pub mod mock;

/// Media kind of a captured track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Descriptor of one track in a capture stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
}

impl TrackInfo {
    pub fn audio(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TrackKind::Audio,
            label: label.into(),
        }
    }
}

/// Live stream granted by a capture device
///
/// Holding a stream keeps the platform recording indicator on; owners must
/// call `stop_tracks` on every exit path. Stopping twice is harmless.
pub trait CaptureStream: Send + Debug {
    fn tracks(&self) -> Vec<TrackInfo>;

    fn audio_tracks(&self) -> Vec<TrackInfo> {
        self.tracks()
            .into_iter()
            .filter(|t| t.kind == TrackKind::Audio)
            .collect()
    }

    fn stop_tracks(&mut self);
}

/// Notifications emitted by a recorder
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// A chunk of encoded audio
    Data(Bytes),
    /// The recorder stopped; no more data follows
    Stopped,
    /// The recorder failed; no more data follows
    Failed(String),
}

pub type RecorderEventSender = mpsc::UnboundedSender<RecorderEvent>;
pub type RecorderEventReceiver = mpsc::UnboundedReceiver<RecorderEvent>;

/// Encoder bound to one capture stream
pub trait Recorder: Send + Debug {
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Request a stop; `RecorderEvent::Stopped` follows once data is flushed
    fn stop(&mut self);

    /// Container format of the produced audio, e.g. `audio/webm`
    fn mime_type(&self) -> &str;
}

/// Source of system/tab audio output
#[async_trait]
pub trait CaptureDevice: Send + Sync + Debug {
    /// Ask for an audio-only capture of the system output
    async fn request_audio_capture(&self) -> Result<Box<dyn CaptureStream>, CaptureError>;

    /// Open a recorder on a granted stream, reporting through `events`
    fn open_recorder(
        &self,
        stream: &mut dyn CaptureStream,
        events: RecorderEventSender,
    ) -> Result<Box<dyn Recorder>, CaptureError>;
}
