/*!
 * Language code utilities for the submission boundary.
 *
 * Submitted language codes are BCP 47-like: a primary ISO 639 subtag
 * optionally followed by region or script subtags ("en", "fr-CA",
 * "zh-Hant"). Validation only inspects the primary subtag; the full code
 * is passed through to the provider untouched.
 */

use anyhow::{anyhow, Result};
use isolang::Language;

/// Primary ISO 639 subtag of a BCP 47-like code
fn primary_subtag(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

/// Resolve a language code to an isolang entry
fn lookup(code: &str) -> Option<Language> {
    let primary = primary_subtag(code).to_lowercase();
    Language::from_639_1(&primary).or_else(|| Language::from_639_3(&primary))
}

/// Validate a submitted language code; returns an error naming the code
/// when its primary subtag is not a known ISO 639 language
pub fn validate_language_code(code: &str) -> Result<()> {
    if code.trim().is_empty() {
        return Err(anyhow!("Language code cannot be empty"));
    }
    lookup(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Unknown language code: {}", code))
}

/// English name of the language behind a code, for display
pub fn get_language_name(code: &str) -> Result<String> {
    lookup(code)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Unknown language code: {}", code))
}
