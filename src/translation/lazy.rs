/*!
 * Visibility-driven scheduling.
 *
 * Units are translated only once they come near the viewport. Viewport
 * updates arrive as events on a channel; units within the visibility margin
 * join a pending queue, and a debounced flush turns the queue into one
 * batch. A flush happens as soon as the queue fills a batch, after the
 * debounce delay once arrivals stop, or at the latest `max_wait` after the
 * first unit was queued. Units inside the viewport itself go first.
 *
 * One batch is in flight at a time. Pausing advances the run generation:
 * the in-flight batch is abandoned, its units and the queue go back to
 * pending, and its completion is discarded when it eventually arrives.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use super::batch::BatchLimits;
use super::cancel::RunGeneration;
use super::core::{TranslationPipeline, UnitResult};
use crate::document::{TranslationUnit, UnitOutcome, UnitState};
use crate::errors::TranslationError;

/// Timing and size settings for lazy scheduling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LazySettings {
    pub debounce_ms: u64,
    pub max_wait_ms: u64,
    /// Pause after a completed batch before the next flush
    pub requeue_delay_ms: u64,
    /// Distance around the viewport that still counts as visible
    pub visibility_margin: usize,
    pub limits: BatchLimits,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            max_wait_ms: 1500,
            requeue_delay_ms: 250,
            visibility_margin: 500,
            limits: BatchLimits::default(),
        }
    }
}

/// Input to a running scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// The visible range moved; positions are in layout units
    Viewport { top: usize, bottom: usize },
    Pause,
    Resume,
    Shutdown,
}

/// Handle for driving a spawned scheduler
#[derive(Debug)]
pub struct LazyHandle {
    events: mpsc::UnboundedSender<SchedulerEvent>,
    /// Outcomes as units finish
    pub outcomes: mpsc::UnboundedReceiver<(usize, UnitOutcome)>,
}

impl LazyHandle {
    fn send(&self, event: SchedulerEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn viewport(&self, top: usize, bottom: usize) -> bool {
        self.send(SchedulerEvent::Viewport { top, bottom })
    }

    pub fn pause(&self) -> bool {
        self.send(SchedulerEvent::Pause)
    }

    pub fn resume(&self) -> bool {
        self.send(SchedulerEvent::Resume)
    }

    pub fn shutdown(&self) -> bool {
        self.send(SchedulerEvent::Shutdown)
    }
}

/// Final state of a scheduler after shutdown
#[derive(Debug, Clone)]
pub struct LazyReport {
    pub units: Vec<TranslationUnit>,
    pub outcomes: HashMap<usize, UnitOutcome>,
    /// Unit ids of every dispatched batch, in dispatch order
    pub batches: Vec<Vec<usize>>,
}

#[derive(Debug)]
struct Completion {
    generation: u64,
    results: Vec<UnitResult>,
}

/// Where a unit sits in the layout
#[derive(Debug, Clone, Copy)]
struct Extent {
    top: usize,
    bottom: usize,
}

impl Extent {
    fn intersects(&self, top: usize, bottom: usize) -> bool {
        self.top <= bottom && self.bottom >= top
    }
}

#[derive(Debug)]
pub struct LazyScheduler {
    pipeline: Arc<TranslationPipeline>,
    settings: LazySettings,
    units: Vec<TranslationUnit>,
    extents: Vec<Extent>,
    generation: RunGeneration,
    viewport: Option<(usize, usize)>,
    /// Indices into `units`, in arrival order
    queue: Vec<usize>,
    first_queued: Option<Instant>,
    last_arrival: Option<Instant>,
    hold_until: Option<Instant>,
    in_flight: Vec<usize>,
    paused: bool,
    outcomes: HashMap<usize, UnitOutcome>,
    batches: Vec<Vec<usize>>,
    outcome_tx: mpsc::UnboundedSender<(usize, UnitOutcome)>,
}

impl LazyScheduler {
    /// Spawn a scheduler over `units`. Each unit is laid out below the
    /// previous one with a height equal to its character length.
    pub fn spawn(
        pipeline: Arc<TranslationPipeline>,
        units: Vec<TranslationUnit>,
        settings: LazySettings,
    ) -> (LazyHandle, JoinHandle<LazyReport>) {
        let mut offset = 0;
        let extents = units
            .iter()
            .map(|unit| {
                let extent = Extent {
                    top: offset,
                    bottom: offset + unit.char_len(),
                };
                offset = extent.bottom + 1;
                extent
            })
            .collect();
        Self::spawn_with_layout(pipeline, units, extents, settings)
    }

    fn spawn_with_layout(
        pipeline: Arc<TranslationPipeline>,
        units: Vec<TranslationUnit>,
        extents: Vec<Extent>,
        settings: LazySettings,
    ) -> (LazyHandle, JoinHandle<LazyReport>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            pipeline,
            settings,
            units,
            extents,
            generation: RunGeneration::new(),
            viewport: None,
            queue: Vec::new(),
            first_queued: None,
            last_arrival: None,
            hold_until: None,
            in_flight: Vec::new(),
            paused: false,
            outcomes: HashMap::new(),
            batches: Vec::new(),
            outcome_tx,
        };
        let task = tokio::spawn(scheduler.run(event_rx));
        (
            LazyHandle {
                events: event_tx,
                outcomes: outcome_rx,
            },
            task,
        )
    }

    async fn run(mut self, mut events: mpsc::UnboundedReceiver<SchedulerEvent>) -> LazyReport {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

        loop {
            let flush_at = self.flush_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(SchedulerEvent::Viewport { top, bottom }) => {
                        self.viewport = Some((top, bottom));
                        self.enqueue_visible();
                    }
                    Some(SchedulerEvent::Pause) => self.pause(),
                    Some(SchedulerEvent::Resume) => {
                        self.paused = false;
                        self.enqueue_visible();
                    }
                    Some(SchedulerEvent::Shutdown) | None => break,
                },
                Some(completion) = done_rx.recv() => self.complete(completion),
                _ = sleep_until(flush_at.unwrap_or_else(Instant::now)), if flush_at.is_some() => {
                    self.flush(&done_tx);
                }
            }
        }

        self.generation.advance();
        self.release_in_flight();
        info!(
            "Lazy scheduler stopped: {} of {} units finished",
            self.outcomes.len(),
            self.units.iter().filter(|u| !u.separator).count()
        );
        LazyReport {
            units: self.units,
            outcomes: self.outcomes,
            batches: self.batches,
        }
    }

    fn is_visible(&self, index: usize, margin: usize) -> bool {
        match self.viewport {
            Some((top, bottom)) => self.extents[index].intersects(top.saturating_sub(margin), bottom + margin),
            None => false,
        }
    }

    fn enqueue_visible(&mut self) {
        if self.paused {
            return;
        }
        let now = Instant::now();
        let mut arrived = 0;
        for index in 0..self.units.len() {
            let unit = &self.units[index];
            if unit.separator || unit.state != UnitState::Pending {
                continue;
            }
            if !self.is_visible(index, self.settings.visibility_margin) {
                continue;
            }
            if self.units[index].advance(UnitState::Queued) {
                self.queue.push(index);
                arrived += 1;
            }
        }
        if arrived > 0 {
            debug!("{} units entered the queue ({} waiting)", arrived, self.queue.len());
            self.first_queued.get_or_insert(now);
            self.last_arrival = Some(now);
        }
    }

    fn queued_chars(&self) -> usize {
        self.queue.iter().map(|&i| self.units[i].char_len()).sum()
    }

    fn flush_deadline(&self) -> Option<Instant> {
        if self.paused || !self.in_flight.is_empty() || self.queue.is_empty() {
            return None;
        }
        let now = Instant::now();
        let hold = self.hold_until.unwrap_or(now);
        if self.settings.limits.is_full(self.queue.len(), self.queued_chars()) {
            return Some(hold.max(now));
        }
        let debounced = self.last_arrival.unwrap_or(now) + Duration::from_millis(self.settings.debounce_ms);
        let capped = self.first_queued.unwrap_or(now) + Duration::from_millis(self.settings.max_wait_ms);
        Some(debounced.min(capped).max(hold))
    }

    /// Take the next batch from the queue: units inside the viewport first,
    /// then the rest in document order
    fn take_batch(&mut self) -> Vec<usize> {
        let mut ordered = std::mem::take(&mut self.queue);
        ordered.sort_by_key(|&i| (!self.is_visible(i, 0), i));

        let limits = self.settings.limits;
        let mut taken = Vec::new();
        let mut chars = 0;
        let mut closed = false;
        for index in ordered {
            let len = self.units[index].char_len();
            if !closed && limits.accepts(taken.len(), chars, len) {
                chars += len;
                taken.push(index);
            } else {
                closed = true;
                self.queue.push(index);
            }
        }
        self.queue.sort_unstable();
        taken.sort_unstable();
        taken
    }

    fn flush(&mut self, done_tx: &mpsc::UnboundedSender<Completion>) {
        let taken = self.take_batch();
        if taken.is_empty() {
            return;
        }
        if self.queue.is_empty() {
            self.first_queued = None;
            self.last_arrival = None;
        } else {
            self.first_queued = Some(Instant::now());
        }
        self.hold_until = None;

        let members: Vec<TranslationUnit> = taken.iter().map(|&i| self.units[i].clone()).collect();
        let batch = self.pipeline.prepare(&members);
        for (&index, html) in taken.iter().zip(batch.protected_html()) {
            let unit = &mut self.units[index];
            unit.protected_html = Some(html.clone());
            unit.advance(UnitState::InFlight);
        }
        let ids = batch.unit_ids();
        debug!("Dispatching lazy batch {:?}", ids);
        self.batches.push(ids);
        self.in_flight = taken;

        let pipeline = Arc::clone(&self.pipeline);
        let token = self.generation.token();
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let results = pipeline.run(batch, &token).await;
            let _ = done_tx.send(Completion {
                generation: token.id(),
                results,
            });
        });
    }

    fn complete(&mut self, completion: Completion) {
        if completion.generation != self.generation.current() {
            debug!("Discarding results from stale generation {}", completion.generation);
            return;
        }
        self.in_flight.clear();
        self.hold_until = Some(Instant::now() + Duration::from_millis(self.settings.requeue_delay_ms));

        for (id, result) in completion.results {
            let Some(index) = self.units.iter().position(|u| u.id == id) else {
                continue;
            };
            let unit = &mut self.units[index];
            let outcome = match result {
                Ok(html) => {
                    unit.advance(UnitState::Translated);
                    UnitOutcome::Translated(html)
                }
                Err(TranslationError::Cancelled) => {
                    unit.advance(UnitState::Pending);
                    continue;
                }
                Err(e) => {
                    warn!("Unit {} failed: {}", id, e);
                    unit.advance(UnitState::Error);
                    UnitOutcome::Failed(e.user_message())
                }
            };
            self.outcomes.insert(id, outcome.clone());
            let _ = self.outcome_tx.send((id, outcome));
        }
        // Anything now visible that arrived while the batch was out
        self.enqueue_visible();
    }

    fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        let generation = self.generation.advance();
        debug!("Paused; now at generation {}", generation);
        self.release_in_flight();
        for index in std::mem::take(&mut self.queue) {
            self.units[index].advance(UnitState::Pending);
        }
        self.first_queued = None;
        self.last_arrival = None;
        self.hold_until = None;
    }

    fn release_in_flight(&mut self) {
        for index in std::mem::take(&mut self.in_flight) {
            self.units[index].advance(UnitState::Pending);
        }
    }
}
