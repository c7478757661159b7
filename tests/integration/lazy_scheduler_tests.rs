/*!
 * Tests for visibility-driven lazy scheduling
 */

use std::sync::Arc;
use std::time::Duration;

use fictrans::document::{TranslationUnit, UnitOutcome, UnitState};
use fictrans::providers::MockProvider;
use fictrans::translation::{BatchLimits, LazyHandle, LazyScheduler, LazySettings, TranslationPipeline};
use fictrans::validation::ValidationThresholds;

use crate::common;

/// Units 0-9 are 18 characters long, so unit `i` spans `19*i ..= 19*i + 18`
fn sentences(count: usize) -> Vec<TranslationUnit> {
    (0..count)
        .map(|i| TranslationUnit::from_html(i, &format!("Sentence number {}.", i)))
        .collect()
}

fn settings() -> LazySettings {
    LazySettings {
        debounce_ms: 20,
        max_wait_ms: 200,
        requeue_delay_ms: 5,
        visibility_margin: 0,
        limits: BatchLimits {
            max_chars: 10_000,
            max_units: 5,
        },
    }
}

fn pipeline(mock: &MockProvider) -> Arc<TranslationPipeline> {
    Arc::new(common::build_pipeline(
        Arc::new(mock.clone()),
        &[],
        ValidationThresholds::default(),
        common::fast_settings("fr"),
    ))
}

async fn receive(handle: &mut LazyHandle, count: usize) -> Vec<(usize, UnitOutcome)> {
    let mut received = Vec::new();
    while received.len() < count {
        let next = tokio::time::timeout(Duration::from_secs(5), handle.outcomes.recv())
            .await
            .expect("timed out waiting for an outcome")
            .expect("scheduler stopped early");
        received.push(next);
    }
    received.sort_by_key(|(id, _)| *id);
    received
}

#[tokio::test]
async fn test_lazyScheduler_viewport_shouldTranslateOnlyVisibleUnits() {
    common::init_logging();
    let mock = MockProvider::echo();
    let (mut handle, task) = LazyScheduler::spawn(pipeline(&mock), sentences(8), settings());

    assert!(handle.viewport(0, 30));
    let outcomes = receive(&mut handle, 2).await;
    assert!(handle.shutdown());
    let report = task.await.unwrap();

    assert_eq!(outcomes[0], (0, UnitOutcome::Translated("Sentence number 0.".to_string())));
    assert_eq!(outcomes[1].0, 1);
    assert_eq!(report.batches, vec![vec![0, 1]]);
    assert_eq!(report.units[1].state, UnitState::Translated);
    assert!(report.units[2..].iter().all(|u| u.state == UnitState::Pending));
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn test_lazyScheduler_scrolling_shouldTranslateNewlyVisibleUnits() {
    let mock = MockProvider::echo();
    let (mut handle, task) = LazyScheduler::spawn(pipeline(&mock), sentences(8), settings());

    handle.viewport(0, 30);
    receive(&mut handle, 2).await;
    handle.viewport(38, 60);
    let later = receive(&mut handle, 2).await;
    handle.shutdown();
    let report = task.await.unwrap();

    assert_eq!(later.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(report.batches, vec![vec![0, 1], vec![2, 3]]);
    assert_eq!(report.outcomes.len(), 4);
}

#[tokio::test]
async fn test_lazyScheduler_fullQueue_shouldSplitIntoBatches() {
    let mock = MockProvider::echo();
    let (mut handle, task) = LazyScheduler::spawn(pipeline(&mock), sentences(8), settings());

    // Units 0-6 are visible; five fill a batch
    handle.viewport(0, 120);
    receive(&mut handle, 7).await;
    handle.shutdown();
    let report = task.await.unwrap();

    assert_eq!(report.batches, vec![vec![0, 1, 2, 3, 4], vec![5, 6]]);
    assert!(mock.requests().iter().all(|r| r.units.len() <= 5));
}

#[tokio::test]
async fn test_lazyScheduler_pause_shouldDiscardInFlightBatch() {
    common::init_logging();
    let mock = MockProvider::slow(300);
    let (mut handle, task) = LazyScheduler::spawn(pipeline(&mock), sentences(4), settings());

    handle.viewport(0, 30);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(handle.pause());

    // The abandoned batch finishes in the meantime and must not surface
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(handle.outcomes.try_recv().is_err());

    handle.resume();
    let outcomes = receive(&mut handle, 2).await;
    handle.shutdown();
    let report = task.await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(report.batches, vec![vec![0, 1], vec![0, 1]]);
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn test_lazyScheduler_shutdownWithBatchInFlight_shouldReleaseUnits() {
    let mock = MockProvider::slow(500);
    let (handle, task) = LazyScheduler::spawn(pipeline(&mock), sentences(4), settings());

    handle.viewport(0, 30);
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown();
    let report = task.await.unwrap();

    assert!(report.outcomes.is_empty());
    assert_eq!(report.batches.len(), 1);
    assert!(report.units.iter().all(|u| u.state == UnitState::Pending));
}

#[tokio::test]
async fn test_lazyScheduler_pausedScheduler_shouldIgnoreViewport() {
    let mock = MockProvider::echo();
    let (handle, task) = LazyScheduler::spawn(pipeline(&mock), sentences(4), settings());

    handle.pause();
    handle.viewport(0, 100);
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown();
    let report = task.await.unwrap();

    assert!(report.batches.is_empty());
    assert_eq!(mock.request_count(), 0);
}
