use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for synthesizer voice tags
///
/// Voices report BCP-47 style tags such as `es-ES`, `en_US` or `es-419`.
/// These helpers split the tag, validate the primary subtag against
/// ISO 639 and resolve display names for voice listings.
/// Split a tag into its lowercase primary language subtag
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Region subtag of a tag (uppercased), if present
pub fn region_subtag(tag: &str) -> Option<String> {
    tag.trim()
        .split(['-', '_'])
        .nth(1)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_uppercase())
}

/// Resolve the ISO language behind a tag's primary subtag
fn language_for(tag: &str) -> Option<Language> {
    let primary = primary_subtag(tag);
    match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    }
}

/// Validate that a tag starts with a known ISO 639-1 or 639-3 code
pub fn validate_language_tag(tag: &str) -> Result<()> {
    language_for(tag)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language tag: {}", tag))
}

/// Check if two tags name the same language, ignoring region
pub fn same_language(tag1: &str, tag2: &str) -> bool {
    match (language_for(tag1), language_for(tag2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Human readable name for a tag, e.g. `es-MX` -> `Spanish (MX)`
pub fn get_language_name(tag: &str) -> Result<String> {
    let lang = language_for(tag)
        .ok_or_else(|| anyhow!("Failed to get language from tag: {}", tag))?;

    Ok(match region_subtag(tag) {
        Some(region) => format!("{} ({})", lang.to_name(), region),
        None => lang.to_name().to_string(),
    })
}
