/*!
 * Placeholder tokens.
 *
 * A token is `ph_` followed by exactly six digits. Tokens are drawn at
 * random and redrawn on collision with an issued token or with text that
 * already looks like a token in the source. Within one pass the same
 * replacement for the same formatted fragment reuses its token.
 */

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use crate::document::CapturedFragment;
use crate::glossary::RuleKind;

pub const TOKEN_PREFIX: &str = "ph_";

/// Exact token shape
pub static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"ph_[0-9]{6}").expect("Invalid token regex"));

const TOKEN_SPACE: u32 = 1_000_000;
const RANDOM_ATTEMPTS: usize = 64;

pub fn format_token(number: u32) -> String {
    format!("{}{:06}", TOKEN_PREFIX, number % TOKEN_SPACE)
}

/// What a token stands for
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub token: String,
    /// Text substituted when restoring
    pub final_value: String,
    pub rule_kind: RuleKind,
    /// Glossary key or pattern of the rule that produced the token
    pub rule_term: String,
    pub fragment: CapturedFragment,
}

impl Placeholder {
    /// Restored HTML for this token
    pub fn render(&self) -> String {
        self.fragment.render(&self.final_value)
    }
}

/// Tokens issued during one translation pass
#[derive(Debug, Clone, Default)]
pub struct PlaceholderMap {
    entries: HashMap<String, Placeholder>,
    /// Issue order
    order: Vec<String>,
    /// (final value, fragment signature) -> token
    reuse: HashMap<(String, String), String>,
    /// Token-shaped strings already present in source text
    reserved: HashSet<String>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude token-shaped text that occurs naturally in `text`
    pub fn reserve_existing(&mut self, text: &str) {
        for m in TOKEN_REGEX.find_iter(text) {
            self.reserved.insert(m.as_str().to_string());
        }
    }

    fn is_taken(&self, token: &str) -> bool {
        self.entries.contains_key(token) || self.reserved.contains(token)
    }

    fn fresh_token(&self) -> Option<String> {
        let mut rng = rand::rng();
        for _ in 0..RANDOM_ATTEMPTS {
            let token = format_token(rng.random_range(0..TOKEN_SPACE));
            if !self.is_taken(&token) {
                return Some(token);
            }
        }
        // Dense map: walk from a random point to the next free number
        let origin = rng.random_range(0..TOKEN_SPACE);
        (0..TOKEN_SPACE)
            .map(|offset| format_token(origin.wrapping_add(offset)))
            .find(|token| !self.is_taken(token))
    }

    /// Token for a replacement, reusing one issued for the same value and fragment
    pub fn issue(
        &mut self,
        final_value: &str,
        rule_kind: RuleKind,
        rule_term: &str,
        fragment: CapturedFragment,
    ) -> Option<String> {
        let key = (final_value.to_string(), fragment.signature());
        if let Some(token) = self.reuse.get(&key) {
            return Some(token.clone());
        }
        let token = self.fresh_token()?;
        self.entries.insert(
            token.clone(),
            Placeholder {
                token: token.clone(),
                final_value: final_value.to_string(),
                rule_kind,
                rule_term: rule_term.to_string(),
                fragment,
            },
        );
        self.order.push(token.clone());
        self.reuse.insert(key, token.clone());
        Some(token)
    }

    pub fn get(&self, token: &str) -> Option<&Placeholder> {
        self.entries.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Token-shaped text that was already in the source
    pub fn is_reserved(&self, token: &str) -> bool {
        self.reserved.contains(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tokens in issue order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// How often each issued token occurs across `texts`
    pub fn count_occurrences<S: AsRef<str>>(&self, texts: &[S]) -> HashMap<String, usize> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for m in TOKEN_REGEX.find_iter(text.as_ref()) {
                if self.contains(m.as_str()) {
                    *counts.entry(m.as_str().to_string()).or_insert(0) += 1;
                }
            }
        }
        counts
    }
}
