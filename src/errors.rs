/*!
 * Error types for the narrata application.
 *
 * This module contains custom error types for the different parts of the studio
 * (script generation, speech playback, audio capture and export),
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting or quota
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and body to the matching variant
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// Errors that can occur while generating a script
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The topic prompt was empty
    #[error("Please enter an idea for the script")]
    EmptyPrompt,

    /// The provider call failed
    #[error("{provider} API error: {source}")]
    Provider {
        /// Display name of the provider
        provider: String,
        /// Underlying provider failure
        #[source]
        source: ProviderError,
    },

    /// The provider answered with no text
    #[error("{provider} returned an empty script")]
    EmptyResponse {
        /// Display name of the provider
        provider: String,
    },
}

/// Errors raised by the speech side of the studio
#[derive(Error, Debug)]
pub enum SpeechError {
    /// No voice matches the requested identifier or name
    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    /// The synthesizer has not reported any voice
    #[error("No synthesizer voices are available")]
    NoVoices,

    /// The synthesizer backend failed
    #[error("Speech engine error: {0}")]
    Engine(String),
}

/// Errors raised by capture devices and recorders
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The user refused to share audio output
    #[error("Capture permission denied: {0}")]
    PermissionDenied(String),

    /// The capture backend is missing or unusable
    #[error("Capture device unavailable: {0}")]
    Unavailable(String),

    /// The recorder could not be opened or started
    #[error("Recorder error: {0}")]
    Recorder(String),
}

/// Errors that abort a narration export
#[derive(Error, Debug)]
pub enum ExportError {
    /// Missing script or voice; nothing was started
    #[error("Invalid export request: {0}")]
    Validation(String),

    /// The user denied audio capture
    #[error("Recording permission denied: {0}")]
    PermissionDenied(String),

    /// The granted stream carries no audio
    #[error("The capture stream has no audio track")]
    NoAudioTrack,

    /// Capture infrastructure failure
    #[error("Capture failed: {0}")]
    Capture(String),

    /// The recorder failed mid-export
    #[error("Recording failed: {0}")]
    Recorder(String),

    /// The synthesizer failed on one of the sentences
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// Recording ended before every sentence was spoken
    #[error("Recording stopped after {completed} of {total} sentences")]
    Incomplete {
        /// Sentences that finished
        completed: usize,
        /// Sentences in the script
        total: usize,
    },

    /// Writing the artifacts failed
    #[error("Failed to save artifacts: {0}")]
    Save(String),
}

impl ExportError {
    /// Readable message for the person running the export
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) => {
                "A script and a selected voice are required to export.".to_string()
            }
            Self::PermissionDenied(_) => {
                "Recording permission denied. The audio cannot be exported.".to_string()
            }
            Self::NoAudioTrack => "Could not capture the audio output.".to_string(),
            other => format!("An error occurred during export: {}", other),
        }
    }
}

impl From<CaptureError> for ExportError {
    fn from(error: CaptureError) -> Self {
        match error {
            CaptureError::PermissionDenied(message) => Self::PermissionDenied(message),
            CaptureError::Unavailable(message) => Self::Capture(message),
            CaptureError::Recorder(message) => Self::Recorder(message),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from script generation
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Error from the speech side
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    /// Error from an export
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Readable message for the interface; never a raw debug dump
    pub fn user_message(&self) -> String {
        match self {
            Self::Generation(e) => e.to_string(),
            Self::Export(e) => e.user_message(),
            Self::Unknown(_) => "An unknown error occurred.".to_string(),
            other => other.to_string(),
        }
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
