/*!
 * Prompt construction for translation requests.
 *
 * Builds the instruction sent to the LLM for one source text: language
 * pair (BCP 47 codes), optional glossary constraints, and a strict
 * no-explanations instruction so the response is the translation alone.
 */

use super::glossary::Glossary;

/// Builder for per-text translation prompts
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    source_language: String,
    target_language: String,
    glossary: Option<Glossary>,
}

impl TranslationPromptBuilder {
    /// Create a builder for a language pair
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            glossary: None,
        }
    }

    /// Constrain translations with a glossary
    pub fn with_glossary(mut self, glossary: Glossary) -> Self {
        if !glossary.is_empty() {
            self.glossary = Some(glossary);
        }
        self
    }

    /// Build the prompt for one source text
    pub fn build(&self, text: &str) -> String {
        let mut prompt = format!(
            "Translate the following text from {src} to {tgt}. \
             Both {src} and {tgt} are specified using BCP 47 language codes \
             (e.g., en, fr-FR, fr-CA, pt-BR, zh-Hant, zh-Hans). ",
            src = self.source_language,
            tgt = self.target_language
        );

        if let Some(glossary) = &self.glossary {
            prompt.push_str(
                "Use the following glossary; whenever a source term appears, \
                 translate it exactly as given:\n",
            );
            for term in &glossary.terms {
                prompt.push_str(&format!("- \"{}\" -> \"{}\"\n", term.source, term.target));
            }
        }

        prompt.push_str(&format!(
            "Do not provide any explanation or extra text, just the translation. \
             The text to translate is: \"{}\"",
            text
        ));
        prompt
    }
}
