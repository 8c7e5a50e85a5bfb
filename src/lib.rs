/*!
 * # narrata - narration studio
 *
 * A Rust library for turning an idea into a narrated voice-over with
 * matching subtitles.
 *
 * ## Features
 *
 * - Write long-form narration scripts using various AI providers:
 *   - Gemini API (default)
 *   - Ollama (local LLM)
 *   - Anthropic API
 * - Pick a synthesizer voice with language and name preferences
 * - Read a script aloud sentence by sentence with pause, resume and stop
 * - Record the narration and produce timed SRT subtitles
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `voices`: Voice directory and default voice selection
 * - `sentences`: Sentence segmentation of scripts
 * - `speech`: Speech engine capability and playback sequencing:
 *   - `speech::sequencer`: Play/pause/resume/stop state machine
 *   - `speech::espeak`: espeak-ng backed engine
 *   - `speech::mock`: Scripted engine for tests
 * - `capture`: System audio capture capability:
 *   - `capture::ffmpeg`: ffmpeg backed recorder
 *   - `capture::mock`: Scripted device for tests
 * - `export`: Narration recording and subtitle timing
 * - `subtitle_processor`: Subtitle entries and SRT output
 * - `providers`: Client implementations for various LLM providers
 * - `script_generator`: Script writing on top of a provider
 * - `app_controller`: The studio tying everything together
 * - `file_utils`: File system operations
 * - `language_utils`: Language tag utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod capture;
pub mod errors;
pub mod export;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod script_generator;
pub mod sentences;
pub mod speech;
pub mod subtitle_processor;
pub mod voices;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Studio;
pub use export::{CompletionLatch, NarrationArtifacts, NarrationExporter};
pub use script_generator::ScriptGenerator;
pub use sentences::{split_sentences, Sentence};
pub use speech::{PlaybackState, PlaybackUpdate, Sequencer, SpeechEngine, SpeechEvent};
pub use subtitle_processor::{SubtitleEntry, SubtitleTrack};
pub use voices::{Voice, VoiceDirectory, VoicePreferences};
pub use language_utils::get_language_name;
pub use errors::{AppError, CaptureError, ExportError, GenerationError, ProviderError, SpeechError};
