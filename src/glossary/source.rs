/*!
 * Glossary sources and the glossary text format.
 *
 * A glossary file starts with a metadata header of `key: value` lines
 * (at least `version`), followed by any of the sections `TERMS`,
 * `GENERAL TERMS`, `FORBIDDEN TERMS` and `REGEX`:
 *
 * ```text
 * version: 1.2
 * name: BanG Dream! names
 *
 * TERMS
 * Tsukinomori Girls' Academy: 月之森女子学园
 * Jane Doe = 简·多伊
 *
 * GENERAL TERMS
 * dragon: 龙
 *
 * FORBIDDEN TERMS
 * Mutsumi
 *
 * REGEX
 * (?i)\bch\.?\s*(\d+): 第$1章
 * ```
 *
 * `key = value` lines declare multi-part terms whose parts may appear in any
 * order in the text.
 */

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::GlossaryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum GlossaryScope {
    Local,
    Remote,
}

/// A raw pattern/replacement pair applied verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexTerm {
    pub pattern: String,
    pub replacement: String,
}

/// A named collection of glossary entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossarySource {
    pub id: String,
    pub scope: GlossaryScope,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Case-sensitive terms
    #[serde(default)]
    pub sensitive_terms: BTreeMap<String, String>,
    /// Case-insensitive ("general") terms
    #[serde(default)]
    pub insensitive_terms: BTreeMap<String, String>,
    #[serde(default)]
    pub forbidden_terms: Vec<String>,
    #[serde(default)]
    pub regex_terms: Vec<RegexTerm>,
    /// Keys written with `=` whose parts may appear in any order
    #[serde(default)]
    pub unordered_keys: BTreeSet<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Import time in epoch seconds for remote sources, 0 for local ones;
    /// newer sources win ties
    #[serde(default)]
    pub recency_weight: i64,
    #[serde(default)]
    pub origin_url: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl GlossarySource {
    pub fn new(id: &str, scope: GlossaryScope, name: &str) -> Self {
        Self {
            id: id.to_string(),
            scope,
            name: name.to_string(),
            version: None,
            sensitive_terms: BTreeMap::new(),
            insensitive_terms: BTreeMap::new(),
            forbidden_terms: Vec::new(),
            regex_terms: Vec::new(),
            unordered_keys: BTreeSet::new(),
            enabled: true,
            recency_weight: 0,
            origin_url: None,
        }
    }

    pub fn with_term(mut self, term: &str, translation: &str) -> Self {
        self.sensitive_terms.insert(term.to_string(), translation.to_string());
        self
    }

    pub fn with_general_term(mut self, term: &str, translation: &str) -> Self {
        self.insensitive_terms.insert(term.to_string(), translation.to_string());
        self
    }

    pub fn with_forbidden(mut self, term: &str) -> Self {
        self.forbidden_terms.push(term.to_string());
        self
    }

    pub fn with_regex(mut self, pattern: &str, replacement: &str) -> Self {
        self.regex_terms.push(RegexTerm {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        });
        self
    }

    pub fn with_recency(mut self, weight: i64) -> Self {
        self.recency_weight = weight;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sensitive_terms.is_empty()
            && self.insensitive_terms.is_empty()
            && self.forbidden_terms.is_empty()
            && self.regex_terms.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.sensitive_terms.len() + self.insensitive_terms.len() + self.forbidden_terms.len() + self.regex_terms.len()
    }

    /// Parse the glossary text format
    pub fn parse(id: &str, scope: GlossaryScope, text: &str) -> Result<Self, GlossaryError> {
        let mut source = GlossarySource::new(id, scope, id);
        let mut section: Option<Section> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim().trim_start_matches('\u{feff}');
            if let Some(next) = Section::from_header(line) {
                section = Some(next);
                continue;
            }
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            match section {
                None => {
                    let (key, value) = split_pair(line).ok_or_else(|| GlossaryError::MalformedLine {
                        line: line_no,
                        content: line.to_string(),
                    })?;
                    match key.to_lowercase().as_str() {
                        "version" => source.version = Some(value.to_string()),
                        "name" | "title" => source.name = value.to_string(),
                        other => debug!("Ignoring glossary header field '{}'", other),
                    }
                }
                Some(Section::Forbidden) => {
                    let term = split_pair(line).map(|(k, _)| k).unwrap_or(line);
                    source.forbidden_terms.push(term.to_string());
                }
                Some(Section::Regex) => {
                    let (pattern, replacement) = line
                        .rsplit_once([':', '：'])
                        .map(|(p, r)| (p.trim(), r.trim()))
                        .filter(|(p, _)| !p.is_empty())
                        .ok_or_else(|| GlossaryError::MalformedLine {
                            line: line_no,
                            content: line.to_string(),
                        })?;
                    source.regex_terms.push(RegexTerm {
                        pattern: pattern.to_string(),
                        replacement: replacement.to_string(),
                    });
                }
                Some(kind @ (Section::Terms | Section::General)) => {
                    let (key, value, unordered) = split_term(line).ok_or_else(|| GlossaryError::MalformedLine {
                        line: line_no,
                        content: line.to_string(),
                    })?;
                    if unordered {
                        source.unordered_keys.insert(key.to_string());
                    }
                    let map = if kind == Section::Terms {
                        &mut source.sensitive_terms
                    } else {
                        &mut source.insensitive_terms
                    };
                    map.insert(key.to_string(), value.to_string());
                }
            }
        }

        if source.version.as_deref().is_none_or(str::is_empty) {
            return Err(GlossaryError::MissingVersion);
        }
        if source.is_empty() {
            return Err(GlossaryError::NoContent);
        }
        Ok(source)
    }

    /// Parse the compact inline format `term:译名, other：译名`
    pub fn from_inline(id: &str, text: &str) -> Self {
        let mut source = GlossarySource::new(id, GlossaryScope::Local, id);
        for entry in text.split([',', '，', '\n']) {
            if let Some((key, value)) = entry.split_once([':', '：']) {
                let (key, value) = (key.trim(), value.trim());
                if !key.is_empty() && !value.is_empty() {
                    source.sensitive_terms.insert(key.to_string(), value.to_string());
                }
            }
        }
        source
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Terms,
    General,
    Forbidden,
    Regex,
}

impl Section {
    /// Accepts `TERMS`, `TERMS:`, `[TERMS]` and `## TERMS`
    fn from_header(line: &str) -> Option<Self> {
        let name = line
            .trim_start_matches('#')
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim_end_matches([':', '：'])
            .trim();
        match name.to_uppercase().as_str() {
            "TERMS" => Some(Section::Terms),
            "GENERAL TERMS" => Some(Section::General),
            "FORBIDDEN TERMS" => Some(Section::Forbidden),
            "REGEX" => Some(Section::Regex),
            _ => None,
        }
    }
}

fn split_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once([':', '：'])?;
    let (key, value) = (key.trim(), value.trim());
    (!key.is_empty()).then_some((key, value))
}

/// Split at whichever of `:` / `=` comes first; `=` marks an unordered term
fn split_term(line: &str) -> Option<(&str, &str, bool)> {
    let position = line.char_indices().find(|(_, c)| matches!(c, ':' | '：' | '=' | '＝'))?;
    let (index, separator) = position;
    let key = line[..index].trim();
    let value = line[index + separator.len_utf8()..].trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value, matches!(separator, '=' | '＝')))
}
