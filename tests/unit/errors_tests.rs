/*!
 * Tests for error types and conversions
 */

use fictrans::errors::{AppError, ErrorKind, GlossaryError, ProviderError, TranslationError};

#[test]
fn test_errorKind_retriable_shouldCoverTransientFailures() {
    for kind in [
        ErrorKind::RateLimited,
        ErrorKind::ServerOverloaded,
        ErrorKind::NetworkError,
        ErrorKind::Timeout,
        ErrorKind::InvalidResponseShape,
    ] {
        assert!(kind.is_retriable(), "{:?} should be retriable", kind);
    }
    for kind in [
        ErrorKind::AuthInvalid,
        ErrorKind::PermissionDenied,
        ErrorKind::ContentPolicyBlocked,
        ErrorKind::BillingExhausted,
        ErrorKind::ModelNotFound,
    ] {
        assert!(!kind.is_retriable(), "{:?} should not be retriable", kind);
    }
}

#[test]
fn test_providerError_fromKind_shouldKeepKind() {
    let error = ProviderError::from_kind(ErrorKind::Timeout, "took too long");
    assert_eq!(error.kind(), ErrorKind::Timeout);
    assert!(error.to_string().contains("took too long"));
}

#[test]
fn test_translationError_validationFailures_shouldBeRetriable() {
    assert!(TranslationError::EmptyResponse.is_retriable());
    assert!(TranslationError::SegmentMismatch { expected: 3, actual: 2 }.is_retriable());
    assert!(
        TranslationError::PlaceholderLoss {
            token: "ph_123456".to_string(),
            expected: 5,
            actual: 1
        }
        .is_retriable()
    );
    assert!(!TranslationError::Cancelled.is_retriable());
    assert!(!TranslationError::from(ProviderError::AuthInvalid("bad".to_string())).is_retriable());
}

#[test]
fn test_translationError_root_shouldLookThroughRetries() {
    let error = TranslationError::RetriesExhausted {
        attempts: 3,
        last: Box::new(TranslationError::SegmentMismatch { expected: 2, actual: 1 }),
    };
    assert_eq!(error.root(), &TranslationError::SegmentMismatch { expected: 2, actual: 1 });
    assert!(!error.is_retriable());
}

#[test]
fn test_userMessage_contentBlocked_shouldBeVerbatim() {
    let blocked = TranslationError::RetriesExhausted {
        attempts: 1,
        last: Box::new(TranslationError::Provider(ProviderError::ContentPolicyBlocked(
            "The request was refused by the provider.".to_string(),
        ))),
    };
    assert_eq!(blocked.user_message(), "The request was refused by the provider.");

    let other = TranslationError::EmptyResponse;
    assert_eq!(other.user_message(), other.to_string());
}

#[test]
fn test_appError_conversions_shouldWrapSources() {
    let app: AppError = GlossaryError::MissingVersion.into();
    assert!(matches!(app, AppError::Glossary(GlossaryError::MissingVersion)));

    let app: AppError = TranslationError::Cancelled.into();
    assert!(app.to_string().contains("cancelled"));
}
