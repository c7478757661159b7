/*!
 * Glossary rule compilation.
 *
 * Sources are merged into one priority-ordered rule list: local sources
 * before remote ones (newest import first), forbidden terms above sensitive
 * terms above general terms, and longer terms above shorter ones within a
 * band. The result is cached in the key-value store under a SHA-256 hash of
 * the serialized glossary state, one entry per state.
 */

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::forms::{FormFlags, word_forms};
use super::rules::{CompiledRule, MatchStrategy, RuleKind, RuleSet};
use super::source::{GlossaryScope, GlossarySource};
use crate::errors::GlossaryError;
use crate::store::{self, KeyValueStore};

/// Prefix of the store keys holding compiled rule lists
pub const RULE_CACHE_KEY: &str = "glossary_rule_cache";

fn cache_key(state_hash: &str) -> String {
    format!("{}:{}", RULE_CACHE_KEY, state_hash)
}

const LOCAL_FORBIDDEN: i64 = 600_000;
const LOCAL_SENSITIVE: i64 = 500_000;
const LOCAL_GENERAL: i64 = 400_000;
const LOCAL_REGEX: i64 = 350_000;
const REMOTE_FORBIDDEN: i64 = 300_000;
const REMOTE_SENSITIVE: i64 = 200_000;
const REMOTE_GENERAL: i64 = 100_000;
const REMOTE_REGEX: i64 = 50_000;

/// Characters that split a term into parts
const PART_SEPARATORS: &[char] = &['·', '・', '•'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryClass {
    Forbidden,
    Sensitive,
    General,
    Regex,
}

fn base_priority(scope: GlossaryScope, class: EntryClass) -> i64 {
    match (scope, class) {
        (GlossaryScope::Local, EntryClass::Forbidden) => LOCAL_FORBIDDEN,
        (GlossaryScope::Local, EntryClass::Sensitive) => LOCAL_SENSITIVE,
        (GlossaryScope::Local, EntryClass::General) => LOCAL_GENERAL,
        (GlossaryScope::Local, EntryClass::Regex) => LOCAL_REGEX,
        (GlossaryScope::Remote, EntryClass::Forbidden) => REMOTE_FORBIDDEN,
        (GlossaryScope::Remote, EntryClass::Sensitive) => REMOTE_SENSITIVE,
        (GlossaryScope::Remote, EntryClass::General) => REMOTE_GENERAL,
        (GlossaryScope::Remote, EntryClass::Regex) => REMOTE_REGEX,
    }
}

/// Length and recency tiebreak, always below the gap between two bands
fn tiebreak(term: &str, recency_rank: usize) -> i64 {
    let length = term.chars().count().min(999) as i64;
    let recency = 9 - recency_rank.min(9) as i64;
    length * 10 + recency
}

/// Compiled rules together with the state hash they were built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledGlossary {
    pub state_hash: String,
    pub rules: Vec<CompiledRule>,
}

impl CompiledGlossary {
    pub fn rule_set(&self) -> RuleSet {
        RuleSet::new(self.rules.clone())
    }
}

/// Hex SHA-256 of the serialized glossary state, enabled flags included.
/// Recency enters as a rank, so re-importing the same sources in the same
/// order reproduces the hash.
pub fn state_hash(sources: &[GlossarySource]) -> Result<String, GlossaryError> {
    let ranked: Vec<GlossarySource> = sources
        .iter()
        .zip(recency_ranks(sources))
        .map(|(source, rank)| GlossarySource {
            recency_weight: rank,
            ..source.clone()
        })
        .collect();
    let serialized = serde_json::to_vec(&ranked).map_err(|e| GlossaryError::Cache(e.to_string()))?;
    let digest = Sha256::digest(&serialized);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Rule compiler with a store-backed cache
#[derive(Debug)]
pub struct RuleCompiler {
    store: Arc<dyn KeyValueStore>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl RuleCompiler {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Compile, reusing the cached rules when the glossary state is unchanged
    pub fn compile(&self, sources: &[GlossarySource]) -> Result<CompiledGlossary, GlossaryError> {
        let hash = state_hash(sources)?;

        let key = cache_key(&hash);
        let cached: Option<CompiledGlossary> =
            store::get_json(self.store.as_ref(), &key).map_err(|e| GlossaryError::Cache(e.to_string()))?;
        if let Some(cached) = cached.filter(|c| c.state_hash == hash) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Rule cache hit ({} rules, state {})", cached.rules.len(), &hash[..12]);
            return Ok(cached);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let compiled = CompiledGlossary {
            state_hash: hash,
            rules: compile_rules(sources),
        };
        debug!(
            "Rule cache miss, compiled {} rules (state {})",
            compiled.rules.len(),
            &compiled.state_hash[..12]
        );
        store::set_json(self.store.as_ref(), &key, &compiled)
            .map_err(|e| GlossaryError::Cache(e.to_string()))?;
        Ok(compiled)
    }

    /// Drop the cached rules of a glossary state; called on every mutation
    /// with the state being left
    pub fn invalidate(&self, state_hash: &str) -> Result<(), GlossaryError> {
        debug!("Invalidating rule cache for state {}", &state_hash[..state_hash.len().min(12)]);
        self.store
            .delete(&cache_key(state_hash))
            .map_err(|e| GlossaryError::Cache(e.to_string()))
    }

    /// (hits, misses)
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

/// Enabled sources in compile order: local as given, then remote newest first
fn ordered_sources(sources: &[GlossarySource]) -> Vec<(&GlossarySource, usize)> {
    let mut local: Vec<&GlossarySource> = sources
        .iter()
        .filter(|s| s.enabled && s.scope == GlossaryScope::Local)
        .collect();
    let mut remote: Vec<&GlossarySource> = sources
        .iter()
        .filter(|s| s.enabled && s.scope == GlossaryScope::Remote)
        .collect();
    local.sort_by_key(|s| std::cmp::Reverse(s.recency_weight));
    remote.sort_by(|a, b| b.recency_weight.cmp(&a.recency_weight).then_with(|| a.id.cmp(&b.id)));

    local
        .into_iter()
        .map(|s| (s, 0))
        .chain(remote.into_iter().enumerate().map(|(rank, s)| (s, rank)))
        .collect()
}

/// Position of each source in compile order, ignoring the enabled flag
fn recency_ranks(sources: &[GlossarySource]) -> Vec<i64> {
    let mut order: Vec<usize> = (0..sources.len()).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = (&sources[a], &sources[b]);
        let remote = x.scope == GlossaryScope::Remote;
        remote
            .cmp(&(y.scope == GlossaryScope::Remote))
            .then(y.recency_weight.cmp(&x.recency_weight))
            .then_with(|| if remote { x.id.cmp(&y.id) } else { std::cmp::Ordering::Equal })
    });
    let mut ranks = vec![0; sources.len()];
    for (rank, index) in order.into_iter().enumerate() {
        ranks[index] = rank as i64;
    }
    ranks
}

fn split_parts(term: &str) -> Vec<&str> {
    term.split(|c: char| c.is_whitespace() || PART_SEPARATORS.contains(&c))
        .filter(|p| !p.is_empty())
        .collect()
}

fn alternation(forms: &[String]) -> String {
    let mut sorted: Vec<&String> = forms.iter().collect();
    sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
    sorted
        .iter()
        .map(|f| regex::escape(f))
        .collect::<Vec<_>>()
        .join("|")
}

fn term_rule(
    source: &GlossarySource,
    key: &str,
    replacement: &str,
    kind: RuleKind,
    class: EntryClass,
    recency_rank: usize,
) -> CompiledRule {
    let case_insensitive = class == EntryClass::General;
    let flags = FormFlags {
        preserve_case: !case_insensitive,
        force_lower_case: case_insensitive,
    };
    let parts = split_parts(key);
    let priority = base_priority(source.scope, class) + tiebreak(key, recency_rank);

    if parts.len() > 1 {
        let last = parts.len() - 1;
        let part_forms = parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                if i == last {
                    word_forms(part, flags).into_iter().collect()
                } else if case_insensitive {
                    vec![part.to_lowercase()]
                } else {
                    vec![part.to_string()]
                }
            })
            .collect();
        return CompiledRule {
            match_strategy: MatchStrategy::Structural,
            kind,
            scope: source.scope,
            source_term: key.to_string(),
            parts: part_forms,
            case_insensitive,
            unordered_parts_allowed: source.unordered_keys.contains(key),
            replacement: replacement.to_string(),
            priority,
            compiled_pattern: None,
        };
    }

    let forms: Vec<String> = word_forms(key, flags).into_iter().collect();
    let flag = if case_insensitive { "(?i)" } else { "" };
    let pattern = format!("{}(?:{})", flag, alternation(&forms));
    CompiledRule {
        match_strategy: MatchStrategy::Regex,
        kind,
        scope: source.scope,
        source_term: key.to_string(),
        parts: vec![forms],
        case_insensitive,
        unordered_parts_allowed: false,
        replacement: replacement.to_string(),
        priority,
        compiled_pattern: Some(pattern),
    }
}

/// Build the priority-sorted rule list for the enabled sources
pub fn compile_rules(sources: &[GlossarySource]) -> Vec<CompiledRule> {
    let mut rules = Vec::new();
    let mut claimed: HashSet<String> = HashSet::new();

    for (source, rank) in ordered_sources(sources) {
        for term in &source.forbidden_terms {
            let term = term.trim();
            if term.is_empty() || !claimed.insert(term.to_lowercase()) {
                continue;
            }
            rules.push(term_rule(source, term, term, RuleKind::Forbidden, EntryClass::Forbidden, rank));
        }
        for (term, translation) in &source.sensitive_terms {
            if !claimed.insert(term.to_lowercase()) {
                debug!("Skipping duplicate term '{}' from '{}'", term, source.name);
                continue;
            }
            rules.push(term_rule(source, term, translation, RuleKind::Term, EntryClass::Sensitive, rank));
        }
        for (term, translation) in &source.insensitive_terms {
            if !claimed.insert(term.to_lowercase()) {
                debug!("Skipping duplicate term '{}' from '{}'", term, source.name);
                continue;
            }
            rules.push(term_rule(source, term, translation, RuleKind::Term, EntryClass::General, rank));
        }
        for entry in &source.regex_terms {
            if let Err(e) = Regex::new(&entry.pattern) {
                warn!(
                    "{}",
                    GlossaryError::InvalidRegex {
                        pattern: entry.pattern.clone(),
                        message: e.to_string(),
                    }
                );
                continue;
            }
            if !claimed.insert(format!("regex:{}", entry.pattern)) {
                continue;
            }
            rules.push(CompiledRule {
                match_strategy: MatchStrategy::Regex,
                kind: RuleKind::Regex,
                scope: source.scope,
                source_term: entry.pattern.clone(),
                parts: Vec::new(),
                case_insensitive: false,
                unordered_parts_allowed: false,
                replacement: entry.replacement.clone(),
                priority: base_priority(source.scope, EntryClass::Regex) + tiebreak(&entry.pattern, rank),
                compiled_pattern: Some(entry.pattern.clone()),
            });
        }
    }

    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    rules
}
