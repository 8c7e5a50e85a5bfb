// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use narrata::app_config::{self, Config, GenerationProvider};
use narrata::capture::ffmpeg::FfmpegCaptureDevice;
use narrata::file_utils::FileManager;
use narrata::language_utils;
use narrata::speech::espeak::CommandSpeechEngine;
use narrata::speech::{speech_channel, PlaybackUpdate, SpeechEngine};
use narrata::{AppError, Studio};

/// CLI Wrapper for GenerationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    Gemini,
    Ollama,
    Anthropic,
}

impl From<CliProvider> for GenerationProvider {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::Gemini => GenerationProvider::Gemini,
            CliProvider::Ollama => GenerationProvider::Ollama,
            CliProvider::Anthropic => GenerationProvider::Anthropic,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a narration script about a topic
    Generate {
        /// Idea or topic of the script
        #[arg(value_name = "TOPIC")]
        topic: String,

        /// File to write the script to (default: printed to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Provider to use
        #[arg(short, long, value_enum)]
        provider: Option<CliProvider>,

        /// Model name to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List the synthesizer voices and the default pick
    Voices,

    /// Read a script aloud (type p, r or s then Enter to pause, resume or stop)
    Play {
        /// Script file
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Voice id or name
        #[arg(short, long)]
        voice: Option<String>,
    },

    /// Record a script as audio plus SRT subtitles
    Export {
        /// Script file
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Voice id or name
        #[arg(short, long)]
        voice: Option<String>,

        /// Output directory (default: from config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Generate shell completions for narrata
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// narrata - narration studio
///
/// Writes voice-over scripts with an AI provider, reads them aloud with the
/// system synthesizer and records them with matching subtitles.
#[derive(Parser, Debug)]
#[command(name = "narrata")]
#[command(version = "0.1.0")]
#[command(about = "Narration studio: scripts, voices, audio and subtitles")]
#[command(long_about = "narrata writes narration scripts with AI providers, reads them aloud with espeak-ng and records them with ffmpeg.

EXAMPLES:
    narrata generate \"The history of lighthouses\" -o lighthouses.txt
    narrata voices
    narrata play lighthouses.txt --voice roa/es
    narrata export lighthouses.txt -o ./out
    narrata completions bash > narrata.bash

CONFIGURATION:
    Configuration is stored in narrata.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    gemini    - Google Gemini API (default, requires GEMINI_API_KEY or api_key)
    ollama    - Local Ollama server (default: llama3.2:3b)
    anthropic - Anthropic API (requires ANTHROPIC_API_KEY or api_key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "narrata.json", global = true)]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize with the most verbose level; the config narrows it below
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "narrata", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;

    let outcome = match cli.command {
        Commands::Generate { topic, output, provider, model } => {
            run_generate(config, topic, output, provider, model).await
        }
        Commands::Voices => run_voices(config).await,
        Commands::Play { script, voice } => run_play(config, script, voice).await,
        Commands::Export { script, voice, output_dir } => {
            run_export(config, script, voice, output_dir).await
        }
        Commands::Completions { .. } => Ok(()),
    };

    if let Err(e) = &outcome {
        error!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

// @loads: Configuration with command line overrides applied
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let (mut config, created) = Config::load_or_create(&cli.config)?;
    if created {
        warn!("Config file not found at '{}', created a default one.", cli.config);
    }

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    log::set_max_level(level_filter(&config.log_level));

    config.validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

// @builds: Studio on espeak-ng and ffmpeg, waiting for the voice list
async fn open_studio(config: Config) -> Studio {
    let (events_tx, events_rx) = speech_channel();
    let engine = CommandSpeechEngine::from_config(&config.speech, events_tx);
    engine.load_voices();
    let engine: Arc<dyn SpeechEngine> = Arc::new(engine);
    let capture = Arc::new(FfmpegCaptureDevice::new(config.export.capture.clone()));
    let wait = Duration::from_millis(config.speech.voice_wait_ms);

    let mut studio = Studio::new(config, engine, events_rx, capture);
    studio.wait_for_voices(wait).await;
    studio
}

fn select_voice(studio: &mut Studio, voice: Option<String>) -> Result<(), AppError> {
    if let Some(query) = voice {
        studio.select_voice(&query)?;
    }
    match studio.selected_voice() {
        Some(voice) => {
            info!("Using voice {} - {}", voice.name, language_utils::get_language_name(&voice.lang).unwrap_or_else(|_| voice.lang.clone()));
            Ok(())
        }
        None => Err(narrata::SpeechError::NoVoices.into()),
    }
}

fn read_script(path: &PathBuf) -> Result<String, AppError> {
    let script = FileManager::read_to_string(path).map_err(|e| AppError::File(e.to_string()))?;
    if script.trim().is_empty() {
        return Err(AppError::File(format!("Script file is empty: {:?}", path)));
    }
    Ok(script)
}

async fn run_generate(
    mut config: Config,
    topic: String,
    output: Option<PathBuf>,
    provider: Option<CliProvider>,
    model: Option<String>,
) -> Result<(), AppError> {
    if let Some(provider) = provider {
        config.generation.provider = provider.into();
    }
    if let Some(model) = model {
        let provider_str = config.generation.provider.to_lowercase_string();
        if let Some(provider_config) = config.generation.available_providers.iter_mut()
            .find(|p| p.provider_type == provider_str) {
            provider_config.model = model;
        }
    }
    config.validate_generation()
        .map_err(|e| AppError::Config(format!("{:#}", e)))?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Writing with {}...", config.generation.provider.display_name()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let generator = narrata::ScriptGenerator::from_config(&config.generation);
    if let Err(e) = generator.test_connection().await {
        spinner.finish_and_clear();
        return Err(e.into());
    }
    let script = generator.generate(&topic).await;
    spinner.finish_and_clear();
    let script = script?;

    match output {
        Some(path) => {
            let path = if FileManager::dir_exists(&path) {
                FileManager::script_output_path(&path, &topic)
            } else {
                path
            };
            FileManager::write_to_file(&path, &script).map_err(|e| AppError::File(e.to_string()))?;
            info!("Script saved to {:?}", path);
        }
        None => println!("{}", script),
    }
    Ok(())
}

async fn run_voices(config: Config) -> Result<(), AppError> {
    let studio = open_studio(config).await;
    if studio.voices().is_empty() {
        return Err(narrata::SpeechError::NoVoices.into());
    }

    let selected = studio.selected_voice().map(|v| v.id.clone());
    for voice in studio.voices() {
        let marker = if selected.as_deref() == Some(voice.id.as_str()) { "*" } else { " " };
        println!(
            "{} {:<24} {:<32} {}",
            marker,
            voice.id,
            voice.name,
            language_utils::get_language_name(&voice.lang).unwrap_or_else(|_| voice.lang.clone())
        );
    }
    Ok(())
}

async fn run_play(config: Config, script: PathBuf, voice: Option<String>) -> Result<(), AppError> {
    let script = read_script(&script)?;
    let mut studio = open_studio(config).await;
    select_voice(&mut studio, voice)?;

    if !studio.play(&script) {
        return Err(AppError::Unknown("playback could not start".to_string()));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            update = studio.next_update() => match update {
                Some(PlaybackUpdate::SentenceStarted { index, text }) => println!("[{}] {}", index + 1, text),
                Some(PlaybackUpdate::Finished) | None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(command)) => match command.trim() {
                    "p" => { studio.pause(); }
                    "r" => { studio.resume(); }
                    "s" => {
                        studio.stop();
                        break;
                    }
                    other => warn!("Unknown command '{}' (p = pause, r = resume, s = stop)", other),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("Controls disabled: {}", e);
                    stdin_open = false;
                }
            },
        }
    }
    Ok(())
}

async fn run_export(
    config: Config,
    script: PathBuf,
    voice: Option<String>,
    output_dir: Option<PathBuf>,
) -> Result<(), AppError> {
    let script = read_script(&script)?;
    let mut studio = open_studio(config).await;
    select_voice(&mut studio, voice)?;

    let progress_bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sentences ({percent}%) {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));

    let saved = studio
        .export_to_dir(&script, output_dir.as_deref(), Some(&progress_bar))
        .await;
    if saved.is_err() {
        progress_bar.abandon();
    }
    let saved = saved?;

    info!("Audio: {:?}", saved.audio_path);
    info!("Subtitles: {:?}", saved.subtitle_path);
    Ok(())
}
