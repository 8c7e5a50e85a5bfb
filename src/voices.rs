use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::SpeechError;
use crate::language_utils::same_language;
use crate::speech::SpeechEngine;

// @module: Synthesizer voice directory and default voice selection

// @struct: Platform voice descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    // @field: Unique identifier (URI or engine voice name)
    pub id: String,

    // @field: Display name
    pub name: String,

    // @field: Language tag, e.g. es-ES
    pub lang: String,

    // @field: Whether the voice is rendered locally by the platform
    #[serde(default)]
    pub local_service: bool,
}

impl Voice {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        lang: impl Into<String>,
        local_service: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lang: lang.into(),
            local_service,
        }
    }
}

/// Ordering rules used to pick the default voice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoicePreferences {
    /// Language prefixes eligible for the preferred pool
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Keyword the name must contain to enter the preferred pool
    #[serde(default = "default_name_keyword")]
    pub name_keyword: String,

    /// Names tried in order inside the preferred pool
    #[serde(default = "default_preferred_names")]
    pub preferred_names: Vec<String>,

    /// Locale prefixes used when the preferred pool is empty
    #[serde(default = "default_fallback_locales")]
    pub fallback_locales: Vec<String>,
}

impl Default for VoicePreferences {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            name_keyword: default_name_keyword(),
            preferred_names: default_preferred_names(),
            fallback_locales: default_fallback_locales(),
        }
    }
}

fn default_languages() -> Vec<String> {
    vec!["es".to_string(), "en".to_string()]
}

fn default_name_keyword() -> String {
    "male".to_string()
}

fn default_preferred_names() -> Vec<String> {
    vec!["narrator".to_string(), "jorge".to_string()]
}

fn default_fallback_locales() -> Vec<String> {
    vec!["es-ES".to_string(), "es-MX".to_string()]
}

/// Pick the default voice from `voices`
///
/// Voices in a preferred language whose name contains the keyword form the
/// preferred pool; inside it the preferred names are tried in order, then the
/// first member wins. With an empty pool the first voice of a fallback locale
/// is used, else the first voice overall.
pub fn pick_default<'a>(voices: &'a [Voice], prefs: &VoicePreferences) -> Option<&'a Voice> {
    let keyword = prefs.name_keyword.to_lowercase();
    let preferred: Vec<&Voice> = voices
        .iter()
        .filter(|v| prefs.languages.iter().any(|l| v.lang.starts_with(l.as_str())))
        .filter(|v| v.name.to_lowercase().contains(&keyword))
        .collect();

    let best = prefs
        .preferred_names
        .iter()
        .find_map(|name| {
            let name = name.to_lowercase();
            preferred
                .iter()
                .find(|v| v.name.to_lowercase().contains(&name))
                .copied()
        })
        .or_else(|| preferred.first().copied());

    best.or_else(|| {
        voices
            .iter()
            .find(|v| prefs.fallback_locales.iter().any(|l| v.lang.starts_with(l.as_str())))
    })
    .or_else(|| voices.first())
}

/// Known voices plus the current selection
#[derive(Debug, Default)]
pub struct VoiceDirectory {
    voices: Vec<Voice>,
    selected: Option<Voice>,
    prefs: VoicePreferences,
}

impl VoiceDirectory {
    pub fn new(prefs: VoicePreferences) -> Self {
        Self {
            voices: Vec::new(),
            selected: None,
            prefs,
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn selected(&self) -> Option<&Voice> {
        self.selected.as_ref()
    }

    /// Re-query the engine; call again whenever it signals that voices changed
    pub fn refresh(&mut self, engine: &dyn SpeechEngine) -> Option<&Voice> {
        self.update(engine.voices())
    }

    /// Replace the known voice set and pick a default if none is selected yet
    pub fn update(&mut self, voices: Vec<Voice>) -> Option<&Voice> {
        debug!("Voice directory refreshed with {} voice(s)", voices.len());
        self.voices = voices;

        if self.selected.is_none() {
            if let Some(voice) = pick_default(&self.voices, &self.prefs) {
                info!("Default voice: {} ({})", voice.name, voice.lang);
                self.selected = Some(voice.clone());
            }
        }

        self.selected.as_ref()
    }

    /// Explicit user choice by id or case-insensitive name
    ///
    /// A language tag such as `es-MX` or `fr` also works: an exact tag match
    /// wins, otherwise the first voice of the same language is taken.
    pub fn select(&mut self, query: &str) -> Result<&Voice, SpeechError> {
        if self.voices.is_empty() {
            return Err(SpeechError::NoVoices);
        }

        let wanted = query.trim().to_lowercase();
        let wanted_tag = wanted.replace('_', "-");
        let voice = self
            .voices
            .iter()
            .find(|v| v.id == query || v.name.to_lowercase() == wanted)
            .or_else(|| {
                self.voices
                    .iter()
                    .find(|v| v.lang.to_lowercase().replace('_', "-") == wanted_tag)
            })
            .or_else(|| self.voices.iter().find(|v| same_language(&v.lang, &wanted_tag)))
            .cloned()
            .ok_or_else(|| SpeechError::VoiceNotFound(query.to_string()))?;

        Ok(self.selected.insert(voice))
    }
}
