//! Surface-form expansion for glossary terms.

use std::collections::BTreeSet;

/// How casing is treated when expanding forms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormFlags {
    /// Only emit forms in the author's casing
    pub preserve_case: bool,
    /// Emit lower-cased forms only (for case-insensitive matching)
    pub force_lower_case: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CasePattern {
    Lower,
    Upper,
    Title,
    Mixed,
}

fn case_pattern(word: &str) -> CasePattern {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() || letters.iter().all(|c| c.is_lowercase()) {
        CasePattern::Lower
    } else if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        CasePattern::Upper
    } else if letters[0].is_uppercase() && letters[1..].iter().all(|c| c.is_lowercase()) {
        CasePattern::Title
    } else {
        CasePattern::Mixed
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

/// English plural of the last word, keeping the word's case pattern.
/// `None` when the term does not end in an ASCII letter.
fn pluralize(term: &str) -> Option<String> {
    let last = term.chars().last()?;
    if !last.is_ascii_alphabetic() {
        return None;
    }
    let last_word = term.rsplit(char::is_whitespace).next().unwrap_or(term);
    let upper = case_pattern(last_word) == CasePattern::Upper;
    let lower = term.to_ascii_lowercase();

    let (stem, suffix) = if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        (term.to_string(), "es")
    } else if lower.ends_with('y') && lower.chars().rev().nth(1).is_some_and(|c| c.is_ascii_alphabetic() && !is_vowel(c)) {
        (term[..term.len() - 1].to_string(), "ies")
    } else {
        (term.to_string(), "s")
    };

    let suffix = if upper { suffix.to_uppercase() } else { suffix.to_string() };
    Some(format!("{}{}", stem, suffix))
}

/// Plausible surface forms of a term: itself, its plural, and (unless
/// casing is pinned) its lower, upper and title-case variants.
pub fn word_forms(term: &str, flags: FormFlags) -> BTreeSet<String> {
    let mut forms = BTreeSet::new();
    let base = term.trim();
    if base.is_empty() {
        forms.insert(term.to_string());
        return forms;
    }
    let base = if flags.force_lower_case {
        base.to_lowercase()
    } else {
        base.to_string()
    };

    let mut seeds = vec![base.clone()];
    if let Some(plural) = pluralize(&base) {
        seeds.push(plural);
    }

    for seed in seeds {
        if !flags.preserve_case && !flags.force_lower_case {
            forms.insert(seed.to_lowercase());
            forms.insert(seed.to_uppercase());
            forms.insert(seed.split(' ').map(title_case).collect::<Vec<_>>().join(" "));
        }
        forms.insert(seed);
    }
    forms
}
