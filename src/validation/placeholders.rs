/*!
 * Placeholder fidelity checks for provider responses.
 *
 * Providers mangle tokens in predictable ways (`PH_123456`, `ph 123456`,
 * `ph\_123456`, full-width digits, brackets around the token). Near misses
 * that resolve to an issued token are repaired first; the remaining counts
 * are compared with what was sent.
 */

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::thresholds::ValidationThresholds;
use crate::errors::TranslationError;
use crate::protect::{PlaceholderMap, TOKEN_REGEX, format_token};

/// Tolerant token spelling: optional case/width changes, escaped or
/// missing underscore, spaces inside the digits
static NEAR_MISS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[pｐ]\s?[hｈ]\s?\\?[_＿\-－ ]?\s?([0-9０-９](?:\s?[0-9０-９]){5})")
        .expect("Invalid near-miss placeholder regex")
});

/// A canonical token wrapped in brackets the provider added
static BRACKETED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\[{【〔「（(]\s*(ph_[0-9]{6})\s*[\]}】〕」）)]").expect("Invalid bracketed placeholder regex")
});

/// Loss observed for one token
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLoss {
    pub token: String,
    pub expected: usize,
    pub actual: usize,
}

/// Outcome of checking one response
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderReport {
    /// Response text after repairs
    pub text: String,
    pub repaired: usize,
    pub losses: Vec<TokenLoss>,
    pub unknown: Vec<String>,
    /// The first loss that exceeded the thresholds, if any
    pub violation: Option<TokenLoss>,
}

impl PlaceholderReport {
    pub fn passed(&self) -> bool {
        self.violation.is_none() && self.unknown.is_empty()
    }

    /// Convert into the error the pipeline retries on
    pub fn into_result(self) -> Result<String, TranslationError> {
        if let Some(loss) = self.violation {
            return Err(TranslationError::PlaceholderLoss {
                token: loss.token,
                expected: loss.expected,
                actual: loss.actual,
            });
        }
        if let Some(token) = self.unknown.into_iter().next() {
            return Err(TranslationError::UnknownPlaceholder(token));
        }
        Ok(self.text)
    }
}

fn normalize_digits(raw: &str) -> Option<u32> {
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            other => other,
        })
        .collect();
    digits.parse().ok()
}

/// Rewrite near-miss spellings of issued tokens into canonical form
pub fn repair_placeholders(text: &str, map: &PlaceholderMap) -> (String, usize) {
    let mut repaired = 0;

    let unbracketed = BRACKETED_REGEX.replace_all(text, |caps: &Captures<'_>| {
        let token = &caps[1];
        if map.contains(token) {
            repaired += 1;
            token.to_string()
        } else {
            caps[0].to_string()
        }
    });

    let fixed = NEAR_MISS_REGEX.replace_all(&unbracketed, |caps: &Captures<'_>| {
        let original = &caps[0];
        match normalize_digits(&caps[1]).map(format_token) {
            Some(token) if map.contains(&token) => {
                if original != token {
                    repaired += 1;
                }
                token
            }
            _ => original.to_string(),
        }
    });

    (fixed.into_owned(), repaired)
}

/// Validates placeholder fidelity against per-family thresholds
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    thresholds: ValidationThresholds,
}

impl ResponseValidator {
    pub fn new(thresholds: ValidationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ValidationThresholds {
        &self.thresholds
    }

    /// Repair, count and judge one response.
    ///
    /// `expected` holds the number of times each token was sent.
    pub fn check(&self, raw: &str, map: &PlaceholderMap, expected: &HashMap<String, usize>) -> PlaceholderReport {
        let (text, repaired) = repair_placeholders(raw, map);
        if repaired > 0 {
            debug!("Repaired {} placeholder spellings", repaired);
        }

        let mut actual: HashMap<&str, usize> = HashMap::new();
        let mut unknown = Vec::new();
        for m in TOKEN_REGEX.find_iter(&text) {
            let token = m.as_str();
            if map.contains(token) {
                *actual.entry(token).or_insert(0) += 1;
            } else if !map.is_reserved(token) && !unknown.iter().any(|u| u == token) {
                unknown.push(token.to_string());
            }
        }

        let mut losses = Vec::new();
        let mut violation = None;
        let mut tokens: Vec<(&String, &usize)> = expected.iter().collect();
        tokens.sort();
        for (token, &expected_count) in tokens {
            let found = actual.get(token.as_str()).copied().unwrap_or(0);
            if found >= expected_count {
                continue;
            }
            let loss = TokenLoss {
                token: token.clone(),
                expected: expected_count,
                actual: found,
            };
            if violation.is_none() && self.thresholds.requires_retry(expected_count, found) {
                violation = Some(loss.clone());
            }
            losses.push(loss);
        }

        PlaceholderReport {
            text,
            repaired,
            losses,
            unknown,
            violation,
        }
    }

    pub fn validate(&self, raw: &str, map: &PlaceholderMap, expected: &HashMap<String, usize>) -> Result<String, TranslationError> {
        self.check(raw, map, expected).into_result()
    }
}
