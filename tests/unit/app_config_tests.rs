/*!
 * Tests for application configuration functionality
 */

use fictrans::app_config::{Config, LogLevel, ProviderConfig};
use fictrans::document::DisplayMode;
use fictrans::providers::ProviderFamily;

use crate::common;

/// Test default configuration values
#[test]
fn test_defaultConfig_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "auto");
    assert_eq!(config.target_language, "zh-CN");
    assert_eq!(config.translation.provider, "deepseek");
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.display, DisplayMode::Bilingual);

    let common = &config.translation.common;
    assert_eq!(common.retry_count, 3);
    assert_eq!(common.retry_backoff_ms, 1500);
    assert_eq!(config.scheduling.debounce_ms, 300);
    assert_eq!(config.scheduling.max_wait_ms, 1500);

    let deepseek = config
        .translation
        .get_provider_config("deepseek")
        .expect("DeepSeek provider config should exist");
    assert_eq!(deepseek.model, "deepseek-chat");
    assert_eq!(deepseek.visibility_margin, 500);
    assert!(config.translation.get_provider_config("google_translate").is_some());
}

/// Test configuration validation
#[test]
fn test_configValidation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();

    // Default provider needs a key
    assert!(config.validate().is_err());
    config.translation.active_provider_mut().api_keys = vec!["sk-test".to_string()];
    assert!(config.validate().is_ok());

    config.source_language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "en".to_string();

    config.target_language = "auto".to_string();
    assert!(config.validate().is_err());
    config.target_language = "ja".to_string();
    assert!(config.validate().is_ok());

    // Keyless machine translation
    config.translation.provider = "google_translate".to_string();
    assert!(config.validate().is_ok());

    config.translation.provider = "nowhere".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_configValidation_customProviderWithoutEndpoint_shouldFail() {
    let mut config = Config::default();
    let mut custom = ProviderConfig::new("my-llm");
    custom.api_keys = vec!["key".to_string()];
    custom.model = "local-model".to_string();
    config.translation.available_providers.push(custom);
    config.translation.provider = "my-llm".to_string();

    assert!(config.validate().is_err());
    config.translation.active_provider_mut().endpoint = "http://localhost:8080/v1/chat/completions".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_fromFile_minimalJson_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{"target_language": "ja", "translation": {"provider": "gemini"}}"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.target_language, "ja");
    assert_eq!(config.source_language, "auto");
    assert_eq!(config.translation.provider, "gemini");
    assert!(!config.translation.available_providers.is_empty());
    assert_eq!(config.translation.get_model(), "gemini-2.5-flash");
}

#[test]
fn test_saveToFile_shouldRoundTrip() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    let mut config = Config::default();
    config.glossary.inline = "Saki:祥子".to_string();
    config.validation.threshold_override = Some("3, 0.5, 4".to_string());

    config.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.glossary.inline, "Saki:祥子");
    assert_eq!(loaded.validation.threshold_override.as_deref(), Some("3, 0.5, 4"));
}

#[test]
fn test_batchLimits_providerOverrides_shouldWin() {
    let mut provider = ProviderConfig::new("gemini");
    assert_eq!(provider.batch_limits("gemini-2.5-pro").max_units, 10);

    provider.chunk_size = 800;
    provider.unit_limit = 2;
    let limits = provider.batch_limits("gemini-2.5-pro");
    assert_eq!(limits.max_chars, 800);
    assert_eq!(limits.max_units, 2);
}

#[test]
fn test_providerConfig_toSpec_shouldFillFromPreset() {
    let mut provider = ProviderConfig::new("anthropic");
    provider.model = String::new();
    provider.family = None;

    let spec = provider.to_spec(0.3);

    assert_eq!(spec.family, ProviderFamily::Anthropic);
    assert!(!spec.model.is_empty());
    assert!(!spec.custom);
    assert_eq!(spec.temperature, 0.3);
}

#[test]
fn test_pipelineSettings_shouldFollowRetryConfig() {
    let mut config = Config::default();
    config.translation.common.retry_count = 0;
    config.translation.common.retry_jitter_ms = 0;

    let settings = config.pipeline_settings();

    assert_eq!(settings.max_attempts, 1);
    assert_eq!(settings.jitter_ms, 0);
    assert_eq!(settings.target_language, "zh-CN");
}

#[test]
fn test_logLevel_fromStr_shouldAcceptAliases() {
    assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
    assert!("loud".parse::<LogLevel>().is_err());
}
