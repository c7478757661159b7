use anyhow::{Result, anyhow};
use isolang::Language;

/// Language code helpers.
///
/// Translation services speak BCP-47-ish tags (`zh-CN`, `zh-Hans`, `en`),
/// while prompts want English language names. Codes are validated through
/// their primary subtag against ISO 639-1/639-3.

/// Script region a piece of text is dominated by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Han,
    Kana,
    Hangul,
    Cyrillic,
    Latin,
    Unknown,
}

/// Split a tag into its primary language subtag and the remainder
fn primary_subtag(code: &str) -> (String, Option<String>) {
    let trimmed = code.trim();
    match trimmed.split_once(['-', '_']) {
        Some((primary, rest)) => (primary.to_lowercase(), Some(rest.to_string())),
        None => (trimmed.to_lowercase(), None),
    }
}

fn lookup(primary: &str) -> Option<Language> {
    match primary.len() {
        2 => Language::from_639_1(primary),
        3 => Language::from_639_3(primary),
        _ => None,
    }
}

/// Validate a language tag, accepting `auto` as the detect-me marker
pub fn validate_language_code(code: &str) -> Result<()> {
    if code.trim().eq_ignore_ascii_case("auto") {
        return Ok(());
    }
    let (primary, _) = primary_subtag(code);
    lookup(&primary)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Check if two language tags name the same language, ignoring region/script
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    let (a, _) = primary_subtag(code1);
    let (b, _) = primary_subtag(code2);
    match (lookup(&a), lookup(&b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// English name used in prompts, e.g. `zh-CN` -> "Simplified Chinese"
pub fn get_language_name(code: &str) -> Result<String> {
    let (primary, rest) = primary_subtag(code);
    let lang = lookup(&primary).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;

    if lang == Language::Zho {
        let variant = rest.unwrap_or_default().to_lowercase();
        return Ok(match variant.as_str() {
            "tw" | "hk" | "mo" | "hant" => "Traditional Chinese".to_string(),
            _ => "Simplified Chinese".to_string(),
        });
    }

    Ok(lang.to_name().to_string())
}

/// Classify a character's script
pub fn char_script(c: char) -> Script {
    match c as u32 {
        0x3040..=0x30FF | 0x31F0..=0x31FF => Script::Kana,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2A6DF => Script::Han,
        0xAC00..=0xD7AF | 0x1100..=0x11FF => Script::Hangul,
        0x0400..=0x04FF => Script::Cyrillic,
        _ if c.is_ascii_alphabetic() => Script::Latin,
        0x00C0..=0x024F => Script::Latin,
        _ => Script::Unknown,
    }
}

/// Whether a character belongs to the CJK ideograph/kana/hangul blocks
pub fn is_cjk(c: char) -> bool {
    matches!(char_script(c), Script::Han | Script::Kana | Script::Hangul)
}

/// Resolve the source language for a batch.
///
/// An explicit code is returned unchanged; `auto` is resolved by counting
/// script characters across the texts. Kana anywhere wins over Han so that
/// Japanese is not mistaken for Chinese.
pub fn resolve_source_language<S: AsRef<str>>(configured: &str, texts: &[S]) -> String {
    if !configured.trim().eq_ignore_ascii_case("auto") {
        return configured.trim().to_string();
    }

    let (mut han, mut kana, mut hangul, mut cyrillic, mut latin) = (0usize, 0usize, 0usize, 0usize, 0usize);
    for text in texts {
        for c in text.as_ref().chars() {
            match char_script(c) {
                Script::Han => han += 1,
                Script::Kana => kana += 1,
                Script::Hangul => hangul += 1,
                Script::Cyrillic => cyrillic += 1,
                Script::Latin => latin += 1,
                Script::Unknown => {}
            }
        }
    }

    if kana > 0 && kana + han >= latin {
        "ja".to_string()
    } else if hangul > 0 && hangul >= latin && hangul >= han {
        "ko".to_string()
    } else if han > 0 && han >= latin {
        "zh-CN".to_string()
    } else if cyrillic > latin {
        "ru".to_string()
    } else {
        "en".to_string()
    }
}
