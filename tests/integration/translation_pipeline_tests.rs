/*!
 * End-to-end tests of the translation pipeline: protection, provider call,
 * validation, retry, segment fallback and restoration
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fictrans::document::{TranslationUnit, UnitState};
use fictrans::errors::{ErrorKind, ProviderError, TranslationError};
use fictrans::glossary::{GlossaryScope, GlossarySource};
use fictrans::protect::TOKEN_REGEX;
use fictrans::providers::{MockProvider, MockRequest, ProviderFamily, Translator};
use fictrans::translation::{BatchLimits, BatchTranslator, GenerationToken, RunGeneration, numbered_list};
use fictrans::validation::ValidationThresholds;

use crate::common;

fn local() -> GlossarySource {
    GlossarySource::new("local", GlossaryScope::Local, "Mine")
}

fn first_token(request: &MockRequest) -> String {
    request
        .units
        .iter()
        .find_map(|u| TOKEN_REGEX.find(u).map(|m| m.as_str().to_string()))
        .unwrap_or_default()
}

#[tokio::test]
async fn test_pipeline_multiPartTerm_shouldRestoreGlossaryTranslation() {
    common::init_logging();
    let mock = MockProvider::with_responder(|request, _| Ok(format!("1. 我在{}学习。", first_token(request))));
    let pipeline = common::build_pipeline(
        Arc::new(mock.clone()),
        &[local().with_term("Tsukinomori Girls' Academy", "月之森女子学园")],
        ValidationThresholds::default(),
        common::fast_settings("zh-CN"),
    );
    let units = vec![TranslationUnit::from_html(0, "I study at Tsukinomori Girls' Academy.")];

    let results = pipeline.translate_units(&units, &GenerationToken::detached()).await;

    assert_eq!(results, vec![(0, Ok("我在月之森女子学园学习。".to_string()))]);
    let sent = &mock.requests()[0].units[0];
    assert!(!sent.contains("Tsukinomori"));
    assert!(sent.starts_with("I study at ph_"));
}

#[tokio::test]
async fn test_pipeline_placeholderLossAtThreshold_shouldRetryUntilComplete() {
    // First answer keeps one of five occurrences, the second keeps all
    let mock = MockProvider::with_responder(|request, call| {
        let token = first_token(request);
        if call == 0 {
            let mut seen = false;
            let units: Vec<String> = request
                .units
                .iter()
                .map(|u| {
                    TOKEN_REGEX
                        .replace_all(u, |_: &regex::Captures| {
                            if seen {
                                "she".to_string()
                            } else {
                                seen = true;
                                token.clone()
                            }
                        })
                        .to_string()
                })
                .collect();
            Ok(numbered_list(&units))
        } else {
            Ok(numbered_list(&request.units))
        }
    });
    let thresholds = ValidationThresholds {
        absolute_loss: 4,
        proportional_loss: 1.0,
        proportional_trigger_count: 100,
    };
    let pipeline = common::build_pipeline(
        Arc::new(mock.clone()),
        &[local().with_term("Saki", "祥子")],
        thresholds,
        common::fast_settings("fr"),
    );
    let units = vec![
        TranslationUnit::from_html(0, "Saki woke early. Saki stretched."),
        TranslationUnit::from_html(1, "Saki ate. Saki left. Saki ran."),
    ];

    let results = pipeline.translate_units(&units, &GenerationToken::detached()).await;

    assert_eq!(mock.request_count(), 2);
    assert_eq!(results[0], (0, Ok("祥子 woke early. 祥子 stretched.".to_string())));
    assert_eq!(results[1], (1, Ok("祥子 ate. 祥子 left. 祥子 ran.".to_string())));
}

#[tokio::test]
async fn test_pipeline_lossBelowThreshold_shouldBeAccepted() {
    // Drops one of five occurrences; absolute threshold is 4
    let mock = MockProvider::with_responder(|request, _| {
        let units: Vec<String> = request
            .units
            .iter()
            .enumerate()
            .map(|(i, u)| if i == 0 { TOKEN_REGEX.replace(u, "she").to_string() } else { u.clone() })
            .collect();
        Ok(numbered_list(&units))
    });
    let thresholds = ValidationThresholds {
        absolute_loss: 4,
        proportional_loss: 1.0,
        proportional_trigger_count: 100,
    };
    let pipeline = common::build_pipeline(
        Arc::new(mock.clone()),
        &[local().with_term("Saki", "祥子")],
        thresholds,
        common::fast_settings("fr"),
    );
    let units = vec![
        TranslationUnit::from_html(0, "Saki woke early. Saki stretched."),
        TranslationUnit::from_html(1, "Saki ate. Saki left. Saki ran."),
    ];

    let results = pipeline.translate_units(&units, &GenerationToken::detached()).await;

    assert_eq!(mock.request_count(), 1);
    assert_eq!(results[0], (0, Ok("she woke early. 祥子 stretched.".to_string())));
}

#[tokio::test]
async fn test_pipeline_segmentMismatch_shouldFallBackToSingleUnits() {
    common::init_logging();
    // Multi-unit requests always come back one segment short
    let mock = MockProvider::with_responder(|request, _| {
        if request.units.len() > 1 {
            Ok(numbered_list(&request.units[..request.units.len() - 1]))
        } else {
            Ok(numbered_list(&request.units))
        }
    });
    let pipeline = common::build_pipeline(
        Arc::new(mock.clone()),
        &[],
        ValidationThresholds::default(),
        common::fast_settings("fr"),
    );
    let units = vec![
        TranslationUnit::from_html(0, "One."),
        TranslationUnit::from_html(1, "Two."),
        TranslationUnit::from_html(2, "Three."),
    ];

    let results = pipeline.translate_units(&units, &GenerationToken::detached()).await;

    assert_eq!(
        results,
        vec![
            (0, Ok("One.".to_string())),
            (1, Ok("Two.".to_string())),
            (2, Ok("Three.".to_string())),
        ]
    );
    let requests = mock.requests();
    let singles: Vec<&MockRequest> = requests.iter().filter(|r| r.units.len() == 1).collect();
    assert_eq!(singles.len(), 3);
    assert_eq!(requests.len(), 3 + 3);
}

#[tokio::test]
async fn test_pipeline_singleUnitFailureAfterFallback_shouldOnlyFailThatUnit() {
    let mock = MockProvider::with_responder(|request, _| {
        if request.units.len() > 1 {
            Ok("1. only one segment".to_string())
        } else if request.units[0].contains("Bad") {
            Err(ProviderError::ContentPolicyBlocked("Refused".to_string()))
        } else {
            Ok(numbered_list(&request.units))
        }
    });
    let pipeline = common::build_pipeline(
        Arc::new(mock),
        &[],
        ValidationThresholds::default(),
        common::fast_settings("fr"),
    );
    let units = vec![
        TranslationUnit::from_html(0, "Good."),
        TranslationUnit::from_html(1, "Bad."),
    ];

    let results = pipeline.translate_units(&units, &GenerationToken::detached()).await;

    assert_eq!(results[0], (0, Ok("Good.".to_string())));
    let error = results[1].1.as_ref().unwrap_err();
    assert_eq!(error.user_message(), "Refused");
}

#[tokio::test]
async fn test_pipeline_nonRetriableError_shouldNotRetry() {
    let mock = MockProvider::failing(ErrorKind::PermissionDenied);
    let pipeline = common::build_pipeline(
        Arc::new(mock.clone()),
        &[],
        ValidationThresholds::default(),
        common::fast_settings("fr"),
    );
    let units = vec![TranslationUnit::from_html(0, "Hello.")];

    let results = pipeline.translate_units(&units, &GenerationToken::detached()).await;

    assert_eq!(mock.request_count(), 1);
    let error = results[0].1.as_ref().unwrap_err();
    assert!(matches!(error, TranslationError::Provider(e) if e.kind() == ErrorKind::PermissionDenied));
}

#[tokio::test]
async fn test_pipeline_retriableError_shouldStopAtMaxAttempts() {
    let mock = MockProvider::failing(ErrorKind::ServerOverloaded);
    let pipeline = common::build_pipeline(
        Arc::new(mock.clone()),
        &[],
        ValidationThresholds::default(),
        common::fast_settings("fr"),
    );
    let units = vec![TranslationUnit::from_html(0, "Hello.")];

    let results = pipeline.translate_units(&units, &GenerationToken::detached()).await;

    assert_eq!(mock.request_count(), 3);
    assert!(matches!(
        results[0].1,
        Err(TranslationError::RetriesExhausted { attempts: 3, .. })
    ));
}

#[tokio::test]
async fn test_pipeline_emptyResponse_shouldBeRetried() {
    let mock = MockProvider::with_responder(|request, call| {
        if call == 0 {
            Ok("   ".to_string())
        } else {
            Ok(numbered_list(&request.units))
        }
    });
    let pipeline = common::build_pipeline(
        Arc::new(mock.clone()),
        &[],
        ValidationThresholds::default(),
        common::fast_settings("fr"),
    );
    let units = vec![TranslationUnit::from_html(0, "Hello.")];

    let results = pipeline.translate_units(&units, &GenerationToken::detached()).await;

    assert_eq!(mock.request_count(), 2);
    assert_eq!(results[0], (0, Ok("Hello.".to_string())));
}

#[tokio::test]
async fn test_pipeline_generationAdvancedDuringCall_shouldDiscardResult() {
    let mock = MockProvider::slow(50);
    let pipeline = Arc::new(common::build_pipeline(
        Arc::new(mock.clone()),
        &[],
        ValidationThresholds::default(),
        common::fast_settings("fr"),
    ));
    let generation = RunGeneration::new();
    let token = generation.token();
    let units = vec![TranslationUnit::from_html(0, "Hello.")];

    let task = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.translate_units(&units, &token).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    generation.advance();
    let results = task.await.unwrap();

    assert_eq!(mock.request_count(), 1);
    assert_eq!(results, vec![(0, Err(TranslationError::Cancelled))]);
}

#[tokio::test]
async fn test_pipeline_formattedTerm_shouldKeepMarkup() {
    let mock = MockProvider::echo();
    let pipeline = common::build_pipeline(
        Arc::new(mock),
        &[local().with_term("Jane Doe", "Jeanne Dupont")],
        ValidationThresholds::default(),
        common::fast_settings("fr"),
    );
    let units = vec![TranslationUnit::from_html(0, "<em>Jane</em> Doe smiled.")];

    let results = pipeline.translate_units(&units, &GenerationToken::detached()).await;

    let html = results[0].1.as_ref().unwrap();
    assert!(html.contains("<em>Jeanne</em>"), "unexpected: {}", html);
    assert!(html.contains("Dupont"));
    assert!(!html.contains("Jane"));
}

/// Echoes its input, slowly for units mentioning "Slow"
#[derive(Debug)]
struct UnevenTranslator;

#[async_trait]
impl Translator for UnevenTranslator {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::OpenAiCompatible
    }

    fn model(&self) -> &str {
        "uneven"
    }

    async fn translate(&self, units: &[String], _from: &str, _to: &str) -> Result<String, ProviderError> {
        let delay = if units.iter().any(|u| u.contains("Slow")) { 400 } else { 10 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(numbered_list(units))
    }
}

#[tokio::test]
async fn test_translateUnits_generationAdvancedWhileBatchBuffered_shouldDiscardFinishedBatch() {
    common::init_logging();
    let pipeline = common::build_pipeline(
        Arc::new(UnevenTranslator),
        &[],
        ValidationThresholds::default(),
        common::fast_settings("fr"),
    );
    let limits = BatchLimits {
        max_chars: 1200,
        max_units: 1,
    };
    let translator = BatchTranslator::new(Arc::new(pipeline), limits, 2);
    let generation = RunGeneration::new();
    let token = generation.token();
    let mut units = vec![
        TranslationUnit::from_html(0, "Slow one."),
        TranslationUnit::from_html(1, "Fast two."),
    ];

    // The fast batch finishes before the pause but waits behind the slow one
    let pause = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        generation.advance();
    };
    let (report, _) = tokio::join!(translator.translate_units(&mut units, &token, |_, _| {}), pause);

    assert!(report.outcomes.is_empty());
    assert_eq!(report.cancelled, 2);
    assert!(units.iter().all(|u| u.state == UnitState::Pending));
}
