/*!
 * Eager batch translation.
 *
 * A fixed list of units is cut into batches bounded by characters and unit
 * count; separator units end the current batch and are never sent. Batches
 * run concurrently up to a limit, and every unit's state and outcome are
 * updated as its batch completes, unless the run's generation has moved on.
 */

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use super::cancel::GenerationToken;
use super::core::TranslationPipeline;
use crate::document::{TranslationUnit, UnitOutcome, UnitState};
use crate::errors::TranslationError;

/// Size bounds for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLimits {
    pub max_chars: usize,
    pub max_units: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_chars: 1200,
            max_units: 5,
        }
    }
}

impl BatchLimits {
    /// Defaults, raised for models that handle long inputs well
    pub fn for_model(model: &str) -> Self {
        match model {
            "gemini-2.5-pro" | "deepseek-reasoner" => Self {
                max_chars: 3000,
                max_units: 10,
            },
            _ => Self::default(),
        }
    }

    /// Whether a unit of `next_chars` may join a batch holding `units` units
    /// and `chars` characters. An empty batch accepts anything.
    pub fn accepts(&self, units: usize, chars: usize, next_chars: usize) -> bool {
        units == 0 || (units < self.max_units.max(1) && chars + next_chars <= self.max_chars)
    }

    /// Whether a batch this size should be sent without waiting for more
    pub fn is_full(&self, units: usize, chars: usize) -> bool {
        units >= self.max_units.max(1) || chars >= self.max_chars
    }
}

/// Unit ids of one planned batch, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub unit_ids: Vec<usize>,
    pub chars: usize,
}

impl Batch {
    fn push(&mut self, unit: &TranslationUnit) {
        self.unit_ids.push(unit.id);
        self.chars += unit.char_len();
    }

    pub fn len(&self) -> usize {
        self.unit_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_ids.is_empty()
    }
}

/// Partition the units that still need translating
pub fn plan_batches(units: &[TranslationUnit], limits: &BatchLimits) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current = Batch {
        unit_ids: Vec::new(),
        chars: 0,
    };

    for unit in units {
        if unit.separator {
            if !current.is_empty() {
                batches.push(std::mem::replace(&mut current, Batch { unit_ids: Vec::new(), chars: 0 }));
            }
            continue;
        }
        if unit.state.is_final() {
            continue;
        }
        if !limits.accepts(current.len(), current.chars, unit.char_len()) {
            batches.push(std::mem::replace(&mut current, Batch { unit_ids: Vec::new(), chars: 0 }));
        }
        current.push(unit);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// What an eager run produced
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: HashMap<usize, UnitOutcome>,
    pub batches: usize,
    pub failed: usize,
    /// Units handed back as pending because the run was cancelled
    pub cancelled: usize,
}

/// Batch translator for a whole document
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    pipeline: Arc<TranslationPipeline>,
    limits: BatchLimits,
    max_concurrent_requests: usize,
}

impl BatchTranslator {
    pub fn new(pipeline: Arc<TranslationPipeline>, limits: BatchLimits, max_concurrent_requests: usize) -> Self {
        Self {
            pipeline,
            limits,
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }

    pub fn limits(&self) -> &BatchLimits {
        &self.limits
    }

    /// Translate every pending unit; `progress_callback` gets (completed, total) batches
    pub async fn translate_units(
        &self,
        units: &mut [TranslationUnit],
        token: &GenerationToken,
        progress_callback: impl Fn(usize, usize),
    ) -> BatchReport {
        let batches = plan_batches(units, &self.limits);
        let index: HashMap<usize, usize> = units.iter().enumerate().map(|(i, u)| (u.id, i)).collect();

        let mut prepared = Vec::with_capacity(batches.len());
        for batch in &batches {
            let members: Vec<TranslationUnit> = batch
                .unit_ids
                .iter()
                .filter_map(|id| index.get(id).map(|&i| units[i].clone()))
                .collect();
            let ready = self.pipeline.prepare(&members);
            for (id, html) in batch.unit_ids.iter().zip(ready.protected_html()) {
                if let Some(&i) = index.get(id) {
                    let unit = &mut units[i];
                    unit.protected_html = Some(html.clone());
                    unit.advance(UnitState::Protected);
                    unit.advance(UnitState::Queued);
                }
            }
            debug!("Queued batch of {} units ({} chars)", batch.len(), batch.chars);
            prepared.push(ready);
        }

        for id in batches.iter().flat_map(|b| b.unit_ids.iter()) {
            if let Some(&i) = index.get(id) {
                units[i].advance(UnitState::InFlight);
            }
        }

        let total = prepared.len();
        let mut report = BatchReport {
            batches: total,
            ..BatchReport::default()
        };
        let pipeline = Arc::clone(&self.pipeline);
        let mut results = stream::iter(prepared)
            .map(|batch| {
                let pipeline = Arc::clone(&pipeline);
                let token = token.clone();
                async move { pipeline.run(batch, &token).await }
            })
            .buffered(self.max_concurrent_requests);

        let mut completed = 0;
        while let Some(batch_results) = results.next().await {
            completed += 1;
            progress_callback(completed, total);

            // Results buffered behind a slower batch may outlive a pause
            let stale = !token.is_current();
            if stale {
                debug!("Discarding {} results from a stale generation", batch_results.len());
            }

            for (id, result) in batch_results {
                let Some(&i) = index.get(&id) else {
                    continue;
                };
                let unit = &mut units[i];
                let result = if stale { Err(TranslationError::Cancelled) } else { result };
                match result {
                    Ok(html) => {
                        unit.advance(UnitState::Translated);
                        report.outcomes.insert(id, UnitOutcome::Translated(html));
                    }
                    Err(TranslationError::Cancelled) => {
                        unit.advance(UnitState::Pending);
                        report.cancelled += 1;
                    }
                    Err(e) => {
                        error!("Unit {} failed: {}", id, e);
                        unit.advance(UnitState::Error);
                        report.outcomes.insert(id, UnitOutcome::Failed(e.user_message()));
                        report.failed += 1;
                    }
                }
            }
        }
        report
    }
}
