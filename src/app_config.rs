use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use url::Url;

use crate::voices::VoicePreferences;

/// Studio settings, stored as JSON next to the binary by default.
/// Every section falls back to its defaults when missing from the file.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Script generation config
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Speech synthesis config
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Narration export config
    #[serde(default)]
    pub export: ExportConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Generation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    // @provider: Google Gemini
    #[default]
    Gemini,
    // @provider: Ollama
    Ollama,
    // @provider: Anthropic
    Anthropic,
}

impl GenerationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Gemini => "Gemini",
            Self::Ollama => "Ollama",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Gemini => "gemini".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }

    // @returns: Provider specific API key variable
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Ollama => None,
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
        }
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for GenerationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Per-provider connection settings, keyed by `type`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Request timeout; none waits as long as the service takes
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: GenerationProvider) -> Self {
        let (model, endpoint) = match provider_type {
            GenerationProvider::Gemini => (default_gemini_model(), default_gemini_endpoint()),
            GenerationProvider::Ollama => (default_ollama_model(), default_ollama_endpoint()),
            GenerationProvider::Anthropic => {
                (default_anthropic_model(), default_anthropic_endpoint())
            }
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            timeout_secs: None,
        }
    }
}

/// Script generation configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: GenerationProvider,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common generation settings
    #[serde(default)]
    pub common: GenerationCommonConfig,
}

/// Settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationCommonConfig {
    /// System instruction sent with every topic
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Sampling temperature; narration reads better a little warm
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens; a full script needs about 3000
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GenerationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    /// Synthesizer command
    #[serde(default = "default_speech_program")]
    pub program: String,

    /// Speaking rate in words per minute
    #[serde(default = "default_rate_wpm")]
    pub rate_wpm: u32,

    /// Voice id or name chosen by the user; overrides the default pick
    #[serde(default)]
    pub preferred_voice: Option<String>,

    /// How long to wait for the synthesizer to report voices
    #[serde(default = "default_voice_wait_ms")]
    pub voice_wait_ms: u64,

    /// Rules for the default voice
    #[serde(default)]
    pub voice_preferences: VoicePreferences,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: default_speech_program(),
            rate_wpm: default_rate_wpm(),
            preferred_voice: None,
            voice_wait_ms: default_voice_wait_ms(),
            voice_preferences: VoicePreferences::default(),
        }
    }
}

/// Narration export configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExportConfig {
    /// Directory receiving the artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Audio artifact file name
    #[serde(default = "default_audio_filename")]
    pub audio_filename: String,

    /// Subtitle artifact file name
    #[serde(default = "default_subtitle_filename")]
    pub subtitle_filename: String,

    /// Delay between the last sentence ending and the recorder stopping
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,

    /// Capture backend settings
    #[serde(default)]
    pub capture: CaptureConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            audio_filename: default_audio_filename(),
            subtitle_filename: default_subtitle_filename(),
            grace_delay_ms: default_grace_delay_ms(),
            capture: CaptureConfig::default(),
        }
    }
}

/// ffmpeg capture settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Capture command
    #[serde(default = "default_capture_program")]
    pub program: String,

    /// ffmpeg input format, e.g. pulse
    #[serde(default = "default_input_format")]
    pub input_format: String,

    /// Input device; the monitor of the default sink records system output
    #[serde(default = "default_input_device")]
    pub input_device: String,

    /// Output container
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// MIME type of the produced audio
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    /// Ask before recording
    #[serde(default = "default_true")]
    pub confirm: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: default_capture_program(),
            input_format: default_input_format(),
            input_device: default_input_device(),
            output_format: default_output_format(),
            audio_codec: default_audio_codec(),
            mime_type: default_mime_type(),
            confirm: true,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_temperature() -> f32 {
    0.8
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_true() -> bool {
    true
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional scriptwriter for documentary and long-form video narration. \
Your task is to write a complete, engaging and well structured voice-over script. \
The script should last roughly 12 to 15 minutes when read at a moderate pace, which is about 1800-2250 words. \
Make sure the language is clear, evocative and suited to a deep male narrator voice. \
Structure the output as a single block of text with well defined paragraphs to ease reading and delivery. \
Do not use markdown, only plain text."
        .to_string()
}

fn default_speech_program() -> String {
    "espeak-ng".to_string()
}

fn default_rate_wpm() -> u32 {
    160
}

fn default_voice_wait_ms() -> u64 {
    3000
}

fn default_output_dir() -> PathBuf {
    dirs::audio_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_audio_filename() -> String {
    "narration.webm".to_string()
}

fn default_subtitle_filename() -> String {
    "narration.srt".to_string()
}

fn default_grace_delay_ms() -> u64 {
    500 // lets the recorder flush trailing audio
}

fn default_capture_program() -> String {
    "ffmpeg".to_string()
}

fn default_input_format() -> String {
    "pulse".to_string()
}

fn default_input_device() -> String {
    "@DEFAULT_MONITOR@".to_string()
}

fn default_output_format() -> String {
    "webm".to_string()
}

fn default_audio_codec() -> String {
    "libopus".to_string()
}

fn default_mime_type() -> String {
    "audio/webm".to_string()
}

impl Config {
    /// Load the config file, creating it with defaults when missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok((config, false));
        }

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;

        Ok((config, true))
    }

    /// Reject settings that would break playback or export
    pub fn validate(&self) -> Result<()> {
        if self.speech.program.trim().is_empty() {
            return Err(anyhow!("Speech program must not be empty"));
        }
        if self.speech.rate_wpm == 0 {
            return Err(anyhow!("Speaking rate must be positive"));
        }
        for lang in &self.speech.voice_preferences.languages {
            crate::language_utils::validate_language_tag(lang)?;
        }

        if self.export.audio_filename.trim().is_empty()
            || self.export.subtitle_filename.trim().is_empty()
        {
            return Err(anyhow!("Export file names must not be empty"));
        }
        if self.export.audio_filename == self.export.subtitle_filename {
            return Err(anyhow!("Audio and subtitle files must have different names"));
        }
        if self.export.grace_delay_ms > 10_000 {
            return Err(anyhow!(
                "Grace delay of {} ms is too long (max 10000)",
                self.export.grace_delay_ms
            ));
        }

        Ok(())
    }

    /// Validate the settings needed to call the generation service
    pub fn validate_generation(&self) -> Result<()> {
        let endpoint = self.generation.get_endpoint();
        Url::parse(&endpoint)
            .with_context(|| format!("Invalid endpoint for {}: {}", self.generation.provider.display_name(), endpoint))?;

        if self.generation.provider != GenerationProvider::Ollama
            && self.generation.get_api_key().is_empty()
        {
            return Err(anyhow!(
                "API key is required for the {} provider",
                self.generation.provider.display_name()
            ));
        }

        Ok(())
    }
}

impl GenerationConfig {
    /// Settings entry for the selected provider, if one is listed
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &GenerationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Configured model, or the provider's default
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            GenerationProvider::Gemini => default_gemini_model(),
            GenerationProvider::Ollama => default_ollama_model(),
            GenerationProvider::Anthropic => default_anthropic_model(),
        }
    }

    /// Get the API key for the active provider, falling back to the environment
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        let Some(var) = self.provider.api_key_env() else {
            return String::new();
        };
        std::env::var(var)
            .or_else(|_| std::env::var("API_KEY"))
            .unwrap_or_default()
    }

    /// Configured endpoint, or the provider's public one
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            GenerationProvider::Gemini => default_gemini_endpoint(),
            GenerationProvider::Ollama => default_ollama_endpoint(),
            GenerationProvider::Anthropic => default_anthropic_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> Option<u64> {
        self.get_active_provider_config()
            .and_then(|p| p.timeout_secs)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(GenerationProvider::Gemini),
                ProviderConfig::new(GenerationProvider::Ollama),
                ProviderConfig::new(GenerationProvider::Anthropic),
            ],
            common: GenerationCommonConfig::default(),
        }
    }
}
