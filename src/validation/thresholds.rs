/*!
 * Placeholder-loss tolerances.
 *
 * Each provider family has default tolerances. A user override is a string
 * of exactly three numbers, `absolute, ratio, trigger`, separated by one
 * kind of delimiter (`,` `;` `/` `|` or whitespace), e.g. `4, 0.5, 3`.
 * Anything ambiguous is rejected as a whole.
 */

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::ThresholdError;
use crate::providers::ProviderFamily;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationThresholds {
    /// Lost occurrences of one token that force a retry
    pub absolute_loss: usize,
    /// Lost share of one token's occurrences that forces a retry...
    pub proportional_loss: f64,
    /// ...once the token was expected at least this many times
    pub proportional_trigger_count: usize,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            absolute_loss: 2,
            proportional_loss: 0.5,
            proportional_trigger_count: 4,
        }
    }
}

impl fmt::Display for ValidationThresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            self.absolute_loss, self.proportional_loss, self.proportional_trigger_count
        )
    }
}

impl ValidationThresholds {
    /// Defaults per provider family
    pub fn for_family(family: ProviderFamily) -> Self {
        match family {
            // Classic MT engines copy opaque tokens reliably; any loss is suspicious
            ProviderFamily::MicrosoftTranslator | ProviderFamily::GoogleTranslate => Self {
                absolute_loss: 1,
                proportional_loss: 0.34,
                proportional_trigger_count: 3,
            },
            ProviderFamily::Gemini => Self {
                absolute_loss: 3,
                proportional_loss: 0.6,
                proportional_trigger_count: 5,
            },
            ProviderFamily::OpenAiCompatible | ProviderFamily::Anthropic => Self::default(),
        }
    }

    /// Family defaults, replaced by a valid override
    pub fn resolve(family: ProviderFamily, override_text: Option<&str>) -> Self {
        let defaults = Self::for_family(family);
        match override_text.map(str::trim).filter(|s| !s.is_empty()) {
            None => defaults,
            Some(text) => match text.parse::<Self>() {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Ignoring threshold override '{}': {}; using {}", text, e, defaults);
                    defaults
                }
            },
        }
    }

    /// Whether the observed loss of one token requires a retry
    pub fn requires_retry(&self, expected: usize, actual: usize) -> bool {
        let loss = expected.saturating_sub(actual);
        let catastrophic = expected > 2 && actual == 0;
        let absolute = loss >= self.absolute_loss;
        let proportional = expected >= self.proportional_trigger_count
            && expected > 0
            && loss as f64 / expected as f64 >= self.proportional_loss;
        catastrophic || absolute || proportional
    }
}

const DELIMITERS: &[char] = &[',', ';', '/', '|'];

impl FromStr for ValidationThresholds {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('，', ",").replace('；', ";");
        if normalized.is_empty() {
            return Err(ThresholdError::Empty);
        }

        let used: Vec<char> = DELIMITERS.iter().copied().filter(|d| normalized.contains(*d)).collect();
        let fields: Vec<&str> = match used.as_slice() {
            [] => normalized.split_whitespace().collect(),
            [delimiter] => normalized.split(*delimiter).map(str::trim).collect(),
            _ => return Err(ThresholdError::MixedDelimiters(s.to_string())),
        };
        if fields.len() != 3 {
            return Err(ThresholdError::FieldCount(fields.len()));
        }
        if fields.iter().any(|f| f.is_empty() || f.contains(char::is_whitespace)) {
            return Err(ThresholdError::MixedDelimiters(s.to_string()));
        }

        let positive_int = |field: &str| -> Result<usize, ThresholdError> {
            field
                .parse::<usize>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| ThresholdError::InvalidValue(field.to_string()))
        };
        let absolute_loss = positive_int(fields[0])?;
        let proportional_loss = fields[1]
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0 && *v <= 1.0)
            .ok_or_else(|| ThresholdError::InvalidValue(fields[1].to_string()))?;
        let proportional_trigger_count = positive_int(fields[2])?;

        Ok(Self {
            absolute_loss,
            proportional_loss,
            proportional_trigger_count,
        })
    }
}
