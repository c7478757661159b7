/*!
 * Tests for provider clients: wire formats, error classification and key rotation
 */

use std::sync::Arc;

use serde_json::json;

use fictrans::errors::{ErrorKind, ProviderError};
use fictrans::providers::transport::HttpResponse;
use fictrans::providers::{
    CredentialRotator, Provider, ProviderClient, ProviderFamily, ProviderSpec, TranslationJob, Translator, classify_status,
    create_provider, parse_keys,
};
use fictrans::store::MemoryStore;

use crate::common;
use crate::common::fake_transport::ScriptedTransport;

fn chat_response(content: &str) -> HttpResponse {
    HttpResponse::new(
        200,
        json!({"choices": [{"message": {"content": content}, "finish_reason": "stop"}]}).to_string(),
    )
}

fn client(id: &str, keys: &[&str], transport: Arc<ScriptedTransport>) -> ProviderClient {
    let spec = ProviderSpec::preset(id).expect("preset should exist");
    let keys = keys.iter().map(|k| k.to_string()).collect();
    ProviderClient::new(
        create_provider(spec),
        transport,
        CredentialRotator::new(id, keys, Arc::new(MemoryStore::new())),
    )
}

fn units() -> Vec<String> {
    vec!["Hello there.".to_string()]
}

#[tokio::test]
async fn test_providerClient_rejectedKey_shouldRotateWithinCall() {
    common::init_logging();
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(HttpResponse::new(401, r#"{"error": {"message": "Incorrect API key provided"}}"#)),
        Ok(chat_response("1. Bonjour.")),
    ]));
    let client = client("openai", &["key-one", "key-two"], Arc::clone(&transport));

    let text = client.translate(&units(), "en", "fr").await.unwrap();

    assert_eq!(text, "1. Bonjour.");
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].header_value("Authorization"), Some("Bearer key-one"));
    assert_eq!(requests[1].header_value("Authorization"), Some("Bearer key-two"));
}

#[tokio::test]
async fn test_providerClient_keysRotateAcrossCalls() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(chat_response("1. Un.")),
        Ok(chat_response("1. Deux.")),
        Ok(chat_response("1. Trois.")),
    ]));
    let client = client("deepseek", &["a", "b"], Arc::clone(&transport));

    for _ in 0..3 {
        client.translate(&units(), "en", "fr").await.unwrap();
    }

    let used: Vec<Option<String>> = transport
        .requests()
        .iter()
        .map(|r| r.header_value("Authorization").map(str::to_string))
        .collect();
    assert_eq!(
        used,
        vec![Some("Bearer a".to_string()), Some("Bearer b".to_string()), Some("Bearer a".to_string())]
    );
}

#[tokio::test]
async fn test_providerClient_singleKeyRejected_shouldReturnAuthInvalid() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(HttpResponse::new(401, "unauthorized"))]));
    let client = client("openai", &["only"], Arc::clone(&transport));

    let error = client.translate(&units(), "en", "fr").await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::AuthInvalid);
    assert!(!error.is_retriable());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_providerClient_noKeyForKeyedProvider_shouldFailWithoutRequest() {
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let client = client("anthropic", &[], Arc::clone(&transport));

    let error = client.translate(&units(), "en", "fr").await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::AuthInvalid);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_providerClient_googleTranslateWithoutKey_shouldSendRequest() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(HttpResponse::new(
        200,
        json!([["Bonjour."]]).to_string(),
    ))]));
    let client = client("google_translate", &[], Arc::clone(&transport));

    let text = client.translate(&units(), "en", "fr").await.unwrap();

    assert_eq!(text, "1. Bonjour.");
    assert_eq!(transport.requests()[0].header_value("X-Goog-API-Key"), None);
}

#[test]
fn test_classifyStatus_shouldMapStatusAndBody() {
    let kind = |status: u16, body: &str| classify_status(&HttpResponse::new(status, body)).kind();

    assert_eq!(kind(429, r#"{"error": {"message": "slow down"}}"#), ErrorKind::RateLimited);
    assert_eq!(
        kind(429, r#"{"error": {"code": "insufficient_quota", "message": "quota"}}"#),
        ErrorKind::BillingExhausted
    );
    assert_eq!(kind(401, ""), ErrorKind::AuthInvalid);
    assert_eq!(kind(403, "forbidden"), ErrorKind::PermissionDenied);
    assert_eq!(kind(404, "missing"), ErrorKind::ModelNotFound);
    assert_eq!(kind(503, "busy"), ErrorKind::ServerOverloaded);
    assert_eq!(kind(400, r#"{"error": {"message": "API_KEY_INVALID"}}"#), ErrorKind::AuthInvalid);
}

#[test]
fn test_classifyStatus_shouldKeepVendorMessage() {
    let error = classify_status(&HttpResponse::new(429, r#"{"error": {"message": "Rate limit reached"}}"#));
    assert!(matches!(error, ProviderError::RateLimited(ref m) if m.contains("Rate limit reached")));
}

#[test]
fn test_geminiRequest_shouldCarryKeyInQuery() {
    let provider = create_provider(ProviderSpec::preset("gemini").unwrap());
    let job = TranslationJob::new(&units(), "en", "ja");

    let request = provider.build_request(&job, Some("secret-key")).unwrap();

    assert!(request.url.contains("gemini-2.5-flash:generateContent"));
    assert!(request.url.contains("key=secret-key"));
    assert_eq!(request.header_value("Authorization"), None);
}

#[test]
fn test_anthropicRequest_shouldUseApiKeyHeader() {
    let provider = create_provider(ProviderSpec::preset("anthropic").unwrap());
    assert_eq!(provider.family(), ProviderFamily::Anthropic);
    let job = TranslationJob::new(&units(), "en", "de");

    let request = provider.build_request(&job, Some("sk-ant")).unwrap();

    assert_eq!(request.header_value("x-api-key"), Some("sk-ant"));
}

#[test]
fn test_parseKeys_shouldSplitOnCommonSeparators() {
    assert_eq!(parse_keys("a, b;c\n\nd，e"), vec!["a", "b", "c", "d", "e"]);
    assert!(parse_keys("  ").is_empty());
}
