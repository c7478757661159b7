/*!
 * Tests for batch planning and eager batch translation
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fictrans::document::{TranslationUnit, UnitOutcome, UnitState};
use fictrans::errors::ErrorKind;
use fictrans::providers::MockProvider;
use fictrans::translation::{BatchLimits, BatchTranslator, RunGeneration, plan_batches};
use fictrans::validation::ValidationThresholds;

use crate::common;

fn sentences(count: usize) -> Vec<TranslationUnit> {
    (0..count)
        .map(|i| TranslationUnit::from_html(i, &format!("Sentence number {}.", i)))
        .collect()
}

fn translator(mock: &MockProvider, limits: BatchLimits) -> BatchTranslator {
    let pipeline = common::build_pipeline(
        Arc::new(mock.clone()),
        &[],
        ValidationThresholds::default(),
        common::fast_settings("fr"),
    );
    BatchTranslator::new(Arc::new(pipeline), limits, 2)
}

#[test]
fn test_planBatches_charLimit_shouldNeverBeExceeded() {
    let units = sentences(20);
    let limits = BatchLimits {
        max_chars: 60,
        max_units: 50,
    };
    for batch in plan_batches(&units, &limits) {
        assert!(batch.chars <= 60);
        assert!(!batch.is_empty());
    }
}

#[test]
fn test_planBatches_finishedUnits_shouldBeSkipped() {
    let mut units = sentences(4);
    units[1].advance(UnitState::Queued);
    units[1].advance(UnitState::InFlight);
    units[1].advance(UnitState::Translated);

    let batches = plan_batches(&units, &BatchLimits::default());
    let ids: Vec<usize> = batches.iter().flat_map(|b| b.unit_ids.clone()).collect();
    assert_eq!(ids, vec![0, 2, 3]);
}

#[tokio::test]
async fn test_translateUnits_twelveUnits_shouldSendAtMostFivePerRequest() {
    common::init_logging();
    let mock = MockProvider::echo();
    let limits = BatchLimits {
        max_chars: 10_000,
        max_units: 5,
    };
    let mut units = sentences(12);
    let progress = AtomicUsize::new(0);

    let report = translator(&mock, limits)
        .translate_units(&mut units, &RunGeneration::new().token(), |done, _| {
            progress.store(done, Ordering::SeqCst);
        })
        .await;

    assert_eq!(report.batches, 3);
    assert_eq!(progress.load(Ordering::SeqCst), 3);
    assert!(mock.requests().iter().all(|r| r.units.len() <= 5));
    assert_eq!(report.outcomes.len(), 12);
    assert_eq!(report.failed, 0);
    assert!(units.iter().all(|u| u.state == UnitState::Translated));
    assert_eq!(
        report.outcomes.get(&7),
        Some(&UnitOutcome::Translated("Sentence number 7.".to_string()))
    );
}

#[tokio::test]
async fn test_translateUnits_providerFailure_shouldMarkUnitsAsError() {
    let mock = MockProvider::failing(ErrorKind::AuthInvalid);
    let mut units = sentences(3);

    let report = translator(&mock, BatchLimits::default())
        .translate_units(&mut units, &RunGeneration::new().token(), |_, _| {})
        .await;

    assert_eq!(report.failed, 3);
    assert!(units.iter().all(|u| u.state == UnitState::Error));
    // Not retriable: one request only
    assert_eq!(mock.request_count(), 1);
    assert!(matches!(report.outcomes.get(&0), Some(UnitOutcome::Failed(_))));
}

#[tokio::test]
async fn test_translateUnits_cancelledRun_shouldReturnUnitsToPending() {
    let mock = MockProvider::echo();
    let generation = RunGeneration::new();
    let token = generation.token();
    generation.advance();
    let mut units = sentences(3);

    let report = translator(&mock, BatchLimits::default())
        .translate_units(&mut units, &token, |_, _| {})
        .await;

    assert_eq!(report.cancelled, 3);
    assert!(report.outcomes.is_empty());
    assert_eq!(mock.request_count(), 0);
    assert!(units.iter().all(|u| u.state == UnitState::Pending));
}
