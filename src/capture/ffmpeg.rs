use std::io::Write as _;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error, warn};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};

use crate::app_config::CaptureConfig;
use crate::capture::{
    CaptureDevice, CaptureStream, Recorder, RecorderEvent, RecorderEventSender, TrackInfo,
};
use crate::errors::CaptureError;

// @module: System audio capture through the ffmpeg command

// @const: Size of the chunks forwarded to the exporter
const CHUNK_SIZE: usize = 16 * 1024;

type ChildSlot = Arc<Mutex<Option<Child>>>;

/// Captures the system output (a PulseAudio monitor source by default)
///
/// The stream and the recorder opened from it share one process slot, so
/// releasing the stream also ends a recording that is still running.
#[derive(Debug, Clone)]
pub struct FfmpegCaptureDevice {
    config: CaptureConfig,
    live: ChildSlot,
}

impl FfmpegCaptureDevice {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            live: Arc::new(Mutex::new(None)),
        }
    }

    /// Arguments for the recording process, writing the container to stdout
    pub fn record_args(config: &CaptureConfig) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            config.input_format.clone(),
            "-i".to_string(),
            config.input_device.clone(),
            "-vn".to_string(),
            "-c:a".to_string(),
            config.audio_codec.clone(),
            "-f".to_string(),
            config.output_format.clone(),
            "pipe:1".to_string(),
        ]
    }

    // @prompts: Consent on the terminal, the CLI counterpart of a share dialog
    async fn ask_consent(&self) -> Result<(), CaptureError> {
        {
            let mut stderr = std::io::stderr();
            let _ = write!(
                stderr,
                "Allow narrata to record the audio output of '{}'? [y/N] ",
                self.config.input_device
            );
            let _ = stderr.flush();
        }

        let mut answer = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut answer)
            .await
            .map_err(|e| CaptureError::Unavailable(format!("Cannot read the answer: {}", e)))?;

        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(()),
            _ => Err(CaptureError::PermissionDenied("recording was not allowed".to_string())),
        }
    }

    // @checks: Whether the input device yields audio at all
    async fn has_audio_input(&self) -> Result<bool, CaptureError> {
        let output = Command::new(&self.config.program)
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                self.config.input_format.as_str(),
                "-i",
                self.config.input_device.as_str(),
                "-t",
                "0.1",
                "-f",
                "null",
                "-",
            ])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                CaptureError::Unavailable(format!("Failed to run {}: {}", self.config.program, e))
            })?;

        if !output.status.success() {
            warn!(
                "No audio on {}: {}",
                self.config.input_device,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.status.success())
    }
}

#[derive(Debug)]
struct FfmpegStream {
    tracks: Vec<TrackInfo>,
    child: ChildSlot,
    stopped: bool,
}

impl CaptureStream for FfmpegStream {
    fn tracks(&self) -> Vec<TrackInfo> {
        if self.stopped {
            Vec::new()
        } else {
            self.tracks.clone()
        }
    }

    fn stop_tracks(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Some(child) = self.child.lock().as_mut() {
            let _ = child.start_kill();
        }
        debug!("Capture stream released");
    }
}

#[derive(Debug)]
struct FfmpegRecorder {
    program: String,
    args: Vec<String>,
    mime_type: String,
    events: RecorderEventSender,
    child: ChildSlot,
    stdin: Option<ChildStdin>,
    stopping: Arc<AtomicBool>,
}

impl FfmpegRecorder {
    async fn forward_output(
        mut stdout: tokio::process::ChildStdout,
        child: ChildSlot,
        stopping: Arc<AtomicBool>,
        events: RecorderEventSender,
    ) {
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            match stdout.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => {
                    let _ = events.send(RecorderEvent::Data(Bytes::copy_from_slice(&buffer[..n])));
                }
                Err(e) => {
                    let _ = events.send(RecorderEvent::Failed(format!("Failed to read audio: {}", e)));
                    return;
                }
            }
        }

        let finished = child.lock().take();
        let status = match finished {
            Some(mut child) => child.wait().await.ok(),
            None => None,
        };

        let clean = status.is_some_and(|s| s.success()) || stopping.load(Ordering::SeqCst);
        if clean {
            let _ = events.send(RecorderEvent::Stopped);
        } else {
            error!("Recorder exited unexpectedly: {:?}", status);
            let _ = events.send(RecorderEvent::Failed("the recording process exited".to_string()));
        }
    }
}

impl Recorder for FfmpegRecorder {
    fn start(&mut self) -> Result<(), CaptureError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CaptureError::Recorder(format!("Failed to start {}: {}", self.program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Recorder("recorder output is not readable".to_string()))?;
        self.stdin = child.stdin.take();
        *self.child.lock() = Some(child);

        tokio::spawn(Self::forward_output(
            stdout,
            Arc::clone(&self.child),
            Arc::clone(&self.stopping),
            self.events.clone(),
        ));
        Ok(())
    }

    fn stop(&mut self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }

        // ffmpeg finalizes the container when it reads `q`
        match self.stdin.take() {
            Some(mut stdin) => {
                tokio::spawn(async move {
                    let _ = stdin.write_all(b"q").await;
                    let _ = stdin.flush().await;
                });
            }
            None => {
                if let Some(child) = self.child.lock().as_mut() {
                    let _ = child.start_kill();
                }
            }
        }
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

#[async_trait]
impl CaptureDevice for FfmpegCaptureDevice {
    async fn request_audio_capture(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        if self.config.confirm {
            self.ask_consent().await?;
        }

        let tracks = if self.has_audio_input().await? {
            vec![TrackInfo::audio(self.config.input_device.clone(), self.config.input_format.clone())]
        } else {
            Vec::new()
        };

        Ok(Box::new(FfmpegStream {
            tracks,
            child: Arc::clone(&self.live),
            stopped: false,
        }))
    }

    fn open_recorder(
        &self,
        stream: &mut dyn CaptureStream,
        events: RecorderEventSender,
    ) -> Result<Box<dyn Recorder>, CaptureError> {
        if stream.audio_tracks().is_empty() {
            return Err(CaptureError::Recorder("stream has no audio to record".to_string()));
        }

        Ok(Box::new(FfmpegRecorder {
            program: self.config.program.clone(),
            args: Self::record_args(&self.config),
            mime_type: self.config.mime_type.clone(),
            events,
            child: Arc::clone(&self.live),
            stdin: None,
            stopping: Arc::new(AtomicBool::new(false)),
        }))
    }
}
