/*!
 * Term protection.
 *
 * Works on a copy of a unit's inline content: every rule's matches are
 * collected (structural rules through the structure-aware matchers, all
 * regex rules through one `RegexSet` prefilter), overlaps are resolved by
 * rule priority, and the winners are swapped for placeholder tokens. The
 * loop repeats on the updated content until no rule matches.
 */

use std::sync::Arc;

use log::{debug, warn};

use super::placeholder::PlaceholderMap;
use crate::document::{FlatView, InlineContent, InlineTags, TranslationUnit, parse_fragment};
use crate::glossary::{RuleKind, RuleSet};
use crate::matching::{MatchSpan, StructuralMatcher, has_boundaries};

/// Upper bound on protection rounds for one unit
const MAX_ROUNDS: usize = 256;

/// A unit's protected form
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedUnit {
    pub html: String,
    /// Tokens in document order, repeats included
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone)]
struct Candidate {
    span: MatchSpan,
    rule: usize,
    priority: i64,
    /// Expanded replacement for user regex rules
    expanded: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TermProtector {
    rules: Arc<RuleSet>,
    inline_tags: InlineTags,
}

impl TermProtector {
    pub fn new(rules: Arc<RuleSet>, inline_tags: InlineTags) -> Self {
        Self { rules, inline_tags }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Protect a unit; the unit itself is left untouched
    pub fn protect(&self, unit: &TranslationUnit, map: &mut PlaceholderMap) -> ProtectedUnit {
        map.reserve_existing(&unit.text());
        self.protect_content(InlineContent::from_nodes(&unit.nodes, &self.inline_tags), map)
    }

    pub fn protect_html(&self, html: &str, map: &mut PlaceholderMap) -> ProtectedUnit {
        let nodes = parse_fragment(html);
        map.reserve_existing(html);
        self.protect_content(InlineContent::from_nodes(&nodes, &self.inline_tags), map)
    }

    fn protect_content(&self, mut content: InlineContent, map: &mut PlaceholderMap) -> ProtectedUnit {
        if !self.rules.is_empty() {
            for _ in 0..MAX_ROUNDS {
                let view = content.flat_view();
                let accepted = select(self.candidates(&view));
                if accepted.is_empty() {
                    break;
                }
                if !self.apply(&mut content, &view, accepted, map) {
                    break;
                }
            }
        }

        ProtectedUnit {
            html: content.to_html().trim().to_string(),
            tokens: content.tokens().into_iter().map(str::to_string).collect(),
        }
    }

    fn candidates(&self, view: &FlatView) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for &index in &self.rules.structural {
            let rule = &self.rules.rules[index];
            for span in StructuralMatcher::new(rule).find_all(view) {
                candidates.push(Candidate {
                    span,
                    rule: index,
                    priority: rule.priority,
                    expanded: None,
                });
            }
        }

        let Some(set) = &self.rules.regex_set else {
            return candidates;
        };
        for set_index in set.matches(&view.text).iter() {
            let regex_rule = &self.rules.regex_rules[set_index];
            let rule = &self.rules.rules[regex_rule.rule];
            for caps in regex_rule.regex.captures_iter(&view.text) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let span = MatchSpan {
                    start: view.char_index(whole.start()),
                    end: view.char_index(whole.end()),
                };
                if span.is_empty() || view.spans_object(span.start, span.end) {
                    continue;
                }
                let expanded = if rule.kind == RuleKind::Regex {
                    let mut out = String::new();
                    caps.expand(&rule.replacement, &mut out);
                    Some(out)
                } else {
                    if !has_boundaries(&view.chars, span.start, span.end) {
                        continue;
                    }
                    None
                };
                candidates.push(Candidate {
                    span,
                    rule: regex_rule.rule,
                    priority: rule.priority,
                    expanded,
                });
            }
        }
        candidates
    }

    /// Replace accepted matches right to left; false if nothing changed
    fn apply(&self, content: &mut InlineContent, view: &FlatView, mut accepted: Vec<Candidate>, map: &mut PlaceholderMap) -> bool {
        accepted.sort_by(|a, b| b.span.start.cmp(&a.span.start));
        let mut changed = false;

        for candidate in accepted {
            let rule = &self.rules.rules[candidate.rule];
            let Some(fragment) = content.capture(view, candidate.span.start, candidate.span.end) else {
                continue;
            };
            let final_value = match rule.kind {
                RuleKind::Term => rule.replacement.clone(),
                RuleKind::Forbidden => fragment.text(),
                RuleKind::Regex => candidate.expanded.clone().unwrap_or_default(),
            };
            let Some(token) = map.issue(&final_value, rule.kind, &rule.source_term, fragment) else {
                warn!("Placeholder space exhausted, leaving '{}' unprotected", rule.source_term);
                continue;
            };
            if content
                .replace_range(view, candidate.span.start, candidate.span.end, &token)
                .is_some()
            {
                debug!("Protected '{}' as {}", rule.source_term, token);
                changed = true;
            }
        }
        changed
    }
}

/// Non-overlapping candidates, higher priority first, then leftmost, then longest
fn select(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.span.start.cmp(&b.span.start))
            .then_with(|| b.span.len().cmp(&a.span.len()))
    });
    let mut accepted: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if accepted.iter().all(|a| !a.span.overlaps(&candidate.span)) {
            accepted.push(candidate);
        }
    }
    accepted
}
