/*!
 * Compiled glossary rules.
 *
 * `CompiledRule` is the serializable, deterministic output of the compiler.
 * `RuleSet` is its runtime form with the regular expressions built once.
 */

use log::warn;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};

use super::source::GlossaryScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Multi-part term located by walking the flattened rich text
    Structural,
    /// Located with a regular expression over the flattened text
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Replaced by its translation
    Term,
    /// Kept untranslated
    Forbidden,
    /// User-authored pattern with a `$n`-style replacement
    Regex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledRule {
    pub match_strategy: MatchStrategy,
    pub kind: RuleKind,
    pub scope: GlossaryScope,
    /// The glossary key the rule was built from
    pub source_term: String,
    /// One set of surface forms per part
    pub parts: Vec<Vec<String>>,
    pub case_insensitive: bool,
    pub unordered_parts_allowed: bool,
    pub replacement: String,
    pub priority: i64,
    pub compiled_pattern: Option<String>,
}

impl CompiledRule {
    /// Total characters of the shortest form of each part
    pub fn min_len(&self) -> usize {
        self.parts
            .iter()
            .map(|forms| forms.iter().map(|f| f.chars().count()).min().unwrap_or(0))
            .sum()
    }
}

/// A regex-strategy rule ready to run
#[derive(Debug, Clone)]
pub struct RegexRule {
    /// Index into `RuleSet::rules`
    pub rule: usize,
    pub regex: Regex,
}

/// Rules plus their compiled expressions, in priority order
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub rules: Vec<CompiledRule>,
    /// Indices of structural rules in priority order
    pub structural: Vec<usize>,
    pub regex_rules: Vec<RegexRule>,
    /// Prefilter over every regex rule, in the same order as `regex_rules`
    pub regex_set: Option<RegexSet>,
}

impl RuleSet {
    pub fn new(rules: Vec<CompiledRule>) -> Self {
        let mut structural = Vec::new();
        let mut regex_rules = Vec::new();

        for (index, rule) in rules.iter().enumerate() {
            match rule.match_strategy {
                MatchStrategy::Structural => structural.push(index),
                MatchStrategy::Regex => {
                    let Some(pattern) = &rule.compiled_pattern else {
                        continue;
                    };
                    match Regex::new(pattern) {
                        Ok(regex) => regex_rules.push(RegexRule { rule: index, regex }),
                        Err(e) => warn!("Skipping rule '{}': {}", rule.source_term, e),
                    }
                }
            }
        }

        let regex_set = if regex_rules.is_empty() {
            None
        } else {
            RegexSet::new(regex_rules.iter().map(|r| r.regex.as_str())).ok()
        };

        Self {
            rules,
            structural,
            regex_rules,
            regex_set,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn get(&self, index: usize) -> Option<&CompiledRule> {
        self.rules.get(index)
    }
}
