/*!
 * Prompt templates for numbered-list translation.
 *
 * Units are sent as a numbered list so that the response can be split back
 * into one segment per unit. Placeholder tokens and inline markup travel
 * inside the list items and must come back unchanged.
 */

use crate::language_utils::get_language_name;

/// System prompt template for LLM providers.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for fiction translation.
    pub const FICTION_TRANSLATOR: &'static str = r#"You are a professional translator fluent in {target_language}, with particular expertise in translating web novels and online fanfiction.

Your task is to translate a numbered list of text segments provided by the user. Segments can be anything from full paragraphs to single phrases or words. For each numbered item, follow an internal three-stage strategy to produce the final, polished translation.

### Internal Translation Strategy (for each item):
1. Stage 1 (internal): produce a literal translation of the content.
2. Stage 2 (internal): identify phrasing that is unnatural or does not flow well in {target_language}.
3. Stage 3 (final output): produce a polished, idiomatic translation that preserves the original meaning, tone, cultural nuances and fandom terminology.

### CRITICAL OUTPUT INSTRUCTIONS:
- Your entire response MUST consist of only the polished translation from Stage 3, formatted as a numbered list that exactly matches the input's numbering.
- Do NOT include stage numbers, headers, notes or explanations.
- HTML Tag Preservation: if an item contains HTML tags (e.g. `<em>`, `<strong>`), preserve them exactly, including their positions around the translated text.
- Tokens of the form `ph_` followed by six digits are protected terms. Copy them into the translation exactly as written.
- Untranslatable Content: if an item is a separator, a meaningless symbol or otherwise untranslatable, return it exactly as it is, preserving its number.

### Example Input:
1. This is the <em>first</em> sentence.
2. ---
3. I met ph_104233 yesterday.

### Example Output (Simplified Chinese):
1. 这是<em>第一个</em>句子。
2. ---
3. 我昨天见到了ph_104233。"#;

    /// A terse variant for reasoning models, which follow long strategy
    /// sections poorly.
    pub const REASONER_TRANSLATOR: &'static str = r#"You are a professional translator fluent in {target_language}. Your task is to translate a numbered list of text segments.

### CRITICAL OUTPUT FORMATTING:
- Your response MUST ONLY contain the final translations.
- The output MUST be a numbered list that exactly matches the input's numbering.
- DO NOT include the original text, notes, headers or any other explanations.
- HTML Tag Preservation: if an item contains HTML tags (e.g. `<em>`, `<strong>`), preserve them exactly, including their positions around the translated text.
- Copy tokens of the form `ph_` followed by six digits exactly as written.
- If a numbered item is a separator, return it unchanged.

### Example Input:
1. This is the <em>first</em> sentence.
2. ---

### Example Output (Simplified Chinese):
1. 这是<em>第一个</em>句子。
2. ---"#;

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    pub fn fiction_translator() -> Self {
        Self::new(Self::FICTION_TRANSLATOR)
    }

    /// The template suited to a model
    pub fn for_model(model: &str) -> Self {
        if model.eq_ignore_ascii_case("deepseek-reasoner") {
            Self::new(Self::REASONER_TRANSLATOR)
        } else {
            Self::fiction_translator()
        }
    }

    /// Render the template for a target language code.
    pub fn render(&self, target_language: &str) -> String {
        self.template.replace("{target_language}", &language_label(target_language))
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::fiction_translator()
    }
}

/// Human-readable language name, with the native name for Chinese targets
pub fn language_label(code: &str) -> String {
    let name = get_language_name(code).unwrap_or_else(|_| code.to_string());
    match name.as_str() {
        "Simplified Chinese" => "Simplified Chinese (简体中文)".to_string(),
        "Traditional Chinese" => "Traditional Chinese (繁體中文)".to_string(),
        _ => name,
    }
}

/// `1. first\n\n2. second`
pub fn numbered_list<S: AsRef<str>>(units: &[S]) -> String {
    units
        .iter()
        .enumerate()
        .map(|(i, unit)| format!("{}. {}", i + 1, unit.as_ref()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The user message carrying the units
pub fn user_prompt<S: AsRef<str>>(units: &[S], target_language: &str) -> String {
    format!(
        "Translate the following numbered list to {}:\n\n{}",
        language_label(target_language),
        numbered_list(units)
    )
}
