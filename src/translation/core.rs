/*!
 * Core translation pipeline.
 *
 * One pass over a batch: protect the units into a fresh placeholder map,
 * send them as a numbered list, validate the response against the
 * placeholder counts that went out, then split and restore it per unit.
 * Retriable failures are repeated with exponential backoff plus jitter. A
 * batch that keeps coming back with the wrong number of segments is
 * re-submitted one unit at a time.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::cancel::GenerationToken;
use crate::document::TranslationUnit;
use crate::errors::TranslationError;
use crate::language_utils::resolve_source_language;
use crate::protect::{PlaceholderMap, TermProtector};
use crate::providers::Translator;
use crate::restore::Restorer;
use crate::validation::{ResponseValidator, ValidationThresholds};

/// Result for one unit, keyed by unit id
pub type UnitResult = (usize, Result<String, TranslationError>);

/// Retry and language settings for the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Source language code, or `auto`
    pub source_language: String,
    pub target_language: String,
    /// Attempts per batch, the first one included
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub jitter_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            source_language: "auto".to_string(),
            target_language: "zh-CN".to_string(),
            max_attempts: 3,
            backoff_base_ms: 1500,
            jitter_ms: 1000,
        }
    }
}

/// A batch with its protected HTML and the placeholder map of this pass
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    units: Vec<TranslationUnit>,
    protected: Vec<String>,
    map: PlaceholderMap,
    expected: HashMap<String, usize>,
}

impl PreparedBatch {
    pub fn unit_ids(&self) -> Vec<usize> {
        self.units.iter().map(|u| u.id).collect()
    }

    /// Protected HTML per unit, in batch order
    pub fn protected_html(&self) -> &[String] {
        &self.protected
    }

    pub fn placeholders(&self) -> &PlaceholderMap {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Translation pipeline shared by the eager and lazy schedulers
#[derive(Debug)]
pub struct TranslationPipeline {
    translator: Arc<dyn Translator>,
    protector: TermProtector,
    validator: ResponseValidator,
    restorer: Restorer,
    settings: PipelineSettings,
}

impl TranslationPipeline {
    pub fn new(
        translator: Arc<dyn Translator>,
        protector: TermProtector,
        thresholds: ValidationThresholds,
        restorer: Restorer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            translator,
            protector,
            validator: ResponseValidator::new(thresholds),
            restorer,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    pub fn thresholds(&self) -> &ValidationThresholds {
        self.validator.thresholds()
    }

    /// Protect `units` into one fresh placeholder map; the units are not modified
    pub fn prepare(&self, units: &[TranslationUnit]) -> PreparedBatch {
        let mut map = PlaceholderMap::new();
        let protected: Vec<String> = units
            .iter()
            .map(|unit| self.protector.protect(unit, &mut map).html)
            .collect();
        let expected = map.count_occurrences(&protected);
        debug!(
            "Prepared batch of {} units with {} placeholders",
            units.len(),
            map.len()
        );
        PreparedBatch {
            units: units.to_vec(),
            protected,
            map,
            expected,
        }
    }

    /// Prepare and run in one step
    pub async fn translate_units(&self, units: &[TranslationUnit], token: &GenerationToken) -> Vec<UnitResult> {
        self.run(self.prepare(units), token).await
    }

    /// Translate a prepared batch; every unit gets its own result
    pub async fn run(&self, batch: PreparedBatch, token: &GenerationToken) -> Vec<UnitResult> {
        let ids = batch.unit_ids();
        match self.translate_with_retry(&batch, token).await {
            Ok(htmls) => ids.into_iter().zip(htmls.into_iter().map(Ok)).collect(),
            Err(error) if batch.len() > 1 && matches!(error.root(), TranslationError::SegmentMismatch { .. }) => {
                warn!(
                    "Batch of {} units kept failing ({}), retrying units individually",
                    batch.len(),
                    error
                );
                self.run_individually(&batch.units, token).await
            }
            Err(error) => ids.into_iter().map(|id| (id, Err(error.clone()))).collect(),
        }
    }

    async fn run_individually(&self, units: &[TranslationUnit], token: &GenerationToken) -> Vec<UnitResult> {
        let mut results = Vec::with_capacity(units.len());
        for unit in units {
            if token.check().is_err() {
                results.push((unit.id, Err(TranslationError::Cancelled)));
                continue;
            }
            let single = self.prepare(std::slice::from_ref(unit));
            let outcome = self.translate_with_retry(&single, token).await.and_then(|htmls| {
                htmls
                    .into_iter()
                    .next()
                    .ok_or(TranslationError::SegmentMismatch { expected: 1, actual: 0 })
            });
            results.push((unit.id, outcome));
        }
        results
    }

    async fn translate_with_retry(&self, batch: &PreparedBatch, token: &GenerationToken) -> Result<Vec<String>, TranslationError> {
        token.check()?;
        let texts: Vec<String> = batch.units.iter().map(TranslationUnit::text).collect();
        let source = resolve_source_language(&self.settings.source_language, &texts);
        let max_attempts = self.settings.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.attempt(batch, &source, token).await {
                Ok(htmls) => return Ok(htmls),
                Err(error) => error,
            };

            if !error.is_retriable() {
                return Err(error);
            }
            if attempt >= max_attempts {
                return Err(TranslationError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.retry_delay(attempt);
            warn!(
                "Attempt {}/{} failed ({}), retrying in {} ms",
                attempt,
                max_attempts,
                error,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            token.check()?;
        }
    }

    async fn attempt(&self, batch: &PreparedBatch, source: &str, token: &GenerationToken) -> Result<Vec<String>, TranslationError> {
        let raw = self
            .translator
            .translate(&batch.protected, source, &self.settings.target_language)
            .await?;
        token.check()?;

        if raw.trim().is_empty() {
            return Err(TranslationError::EmptyResponse);
        }
        let validated = self.validator.validate(&raw, &batch.map, &batch.expected)?;
        self.restorer.finish_batch(&validated, batch.len(), &batch.map)
    }

    /// `2^(attempt-1) * base` plus up to `jitter` random milliseconds
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.settings.backoff_base_ms.saturating_mul(1 << exponent);
        let jitter = if self.settings.jitter_ms > 0 {
            rand::rng().random_range(0..self.settings.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}
