use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::document::{DEFAULT_INLINE_TAGS, DisplayMode};
use crate::providers::{ProviderFamily, ProviderSpec};
use crate::translation::{BatchLimits, LazySettings, PipelineSettings};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO), or `auto`
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub glossary: GlossaryConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub scheduling: SchedulingConfig,

    /// How translations are placed in the output
    #[serde(default)]
    pub display: DisplayMode,
}

/// One configured provider
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
    // @field: Provider identifier, also the key for rotation state
    pub id: String,

    // @field: Display name
    #[serde(default = "String::new")]
    pub name: String,

    // @field: Wire format; derived from the id when absent
    #[serde(default)]
    pub family: Option<ProviderFamily>,

    // @field: Full endpoint URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Keys used in rotation
    #[serde(default)]
    pub api_keys: Vec<String>,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: User-defined endpoint
    #[serde(default)]
    pub custom: bool,

    // @field: Max characters per batch; 0 uses the model default
    #[serde(default)]
    pub chunk_size: usize,

    // @field: Max units per batch; 0 uses the model default
    #[serde(default)]
    pub unit_limit: usize,

    // @field: Distance around the viewport treated as visible
    #[serde(default = "default_visibility_margin")]
    pub visibility_margin: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param id: Preset provider id
    // @returns: Provider config with the preset's endpoint and model
    pub fn new(id: &str) -> Self {
        let spec = ProviderSpec::preset(id).unwrap_or_else(|| ProviderSpec::custom(id, "", ""));
        Self {
            id: spec.id,
            name: spec.name,
            family: Some(spec.family),
            endpoint: spec.endpoint,
            api_keys: Vec::new(),
            model: spec.model,
            custom: spec.custom,
            chunk_size: 0,
            unit_limit: 0,
            visibility_margin: default_visibility_margin(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn family(&self) -> ProviderFamily {
        self.family.unwrap_or_else(|| ProviderFamily::from_provider_id(&self.id))
    }

    /// Provider spec with preset values filling empty fields
    pub fn to_spec(&self, temperature: f32) -> ProviderSpec {
        let preset = ProviderSpec::preset(&self.id);
        let pick = |value: &str, fallback: Option<&str>| {
            if value.is_empty() {
                fallback.unwrap_or_default().to_string()
            } else {
                value.to_string()
            }
        };
        ProviderSpec {
            id: self.id.clone(),
            name: pick(&self.name, preset.as_ref().map(|p| p.name.as_str())),
            family: self.family(),
            endpoint: pick(&self.endpoint, preset.as_ref().map(|p| p.endpoint.as_str())),
            model: pick(&self.model, preset.as_ref().map(|p| p.model.as_str())),
            custom: self.custom || preset.is_none(),
            temperature,
        }
    }

    /// Model defaults with per-provider overrides
    pub fn batch_limits(&self, model: &str) -> BatchLimits {
        let defaults = BatchLimits::for_model(model);
        BatchLimits {
            max_chars: if self.chunk_size > 0 { self.chunk_size } else { defaults.max_chars },
            max_units: if self.unit_limit > 0 { self.unit_limit } else { defaults.max_units },
        }
    }

    /// Keys with blanks dropped
    pub fn usable_keys(&self) -> Vec<String> {
        self.api_keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Id of the active provider
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Attempts per batch, the first one included
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base delay before the first retry, doubled on each further retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound of the random delay added to each retry
    #[serde(default = "default_retry_jitter_ms")]
    pub retry_jitter_ms: u64,

    /// Temperature parameter for text generation
    #[serde(default)]
    pub temperature: f32,

    /// Batches translated at the same time
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_jitter_ms: default_retry_jitter_ms(),
            temperature: 0.0,
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

/// Glossary sources and replacement rules
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GlossaryConfig {
    /// Local glossary files
    #[serde(default)]
    pub files: Vec<String>,

    /// Glossaries imported over HTTP
    #[serde(default)]
    pub remote_urls: Vec<String>,

    /// Inline `term:译名` entries, comma separated
    #[serde(default)]
    pub inline: String,

    /// Sources to keep enabled; empty enables all
    #[serde(default)]
    pub enabled_source_ids: Vec<String>,

    /// Replacements applied to finished translations
    #[serde(default)]
    pub post_replacements: String,

    /// Formatting tags a term may span
    #[serde(default = "default_inline_tags")]
    pub inline_tags: Vec<String>,
}

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            remote_urls: Vec::new(),
            inline: String::new(),
            enabled_source_ids: Vec::new(),
            post_replacements: String::new(),
            inline_tags: default_inline_tags(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ValidationConfig {
    /// `absolute, ratio, trigger`, replacing the provider defaults
    #[serde(default)]
    pub threshold_override: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulingConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Longest a queued unit waits for a flush
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_source_language() -> String {
    "auto".to_string()
}

fn default_target_language() -> String {
    "zh-CN".to_string()
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_concurrent_requests() -> usize {
    2
}

fn default_visibility_margin() -> usize {
    500
}

fn default_timeout_secs() -> u64 {
    crate::providers::transport::DEFAULT_TIMEOUT_SECS
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1500
}

fn default_retry_jitter_ms() -> u64 {
    1000
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_max_wait_ms() -> u64 {
    1500
}

fn default_inline_tags() -> Vec<String> {
    DEFAULT_INLINE_TAGS.iter().map(|t| t.to_string()).collect()
}

impl Config {
    /// Load a JSON config file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)?;
        if self.target_language.trim().eq_ignore_ascii_case("auto") {
            return Err(anyhow!("Target language cannot be 'auto'"));
        }
        crate::language_utils::validate_language_code(&self.target_language)?;

        let provider = self
            .translation
            .get_active_provider_config()
            .ok_or_else(|| anyhow!("Active provider '{}' is not configured", self.translation.provider))?;

        if provider.family().requires_key() && provider.usable_keys().is_empty() {
            return Err(anyhow!("An API key is required for provider '{}'", provider.id));
        }
        if provider.custom && provider.endpoint.trim().is_empty() {
            return Err(anyhow!("Custom provider '{}' has no endpoint", provider.id));
        }

        Ok(())
    }

    /// Settings for the translation pipeline
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let common = &self.translation.common;
        PipelineSettings {
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            max_attempts: common.retry_count.max(1),
            backoff_base_ms: common.retry_backoff_ms,
            jitter_ms: common.retry_jitter_ms,
        }
    }

    /// Settings for the lazy scheduler, using the active provider's limits
    pub fn lazy_settings(&self) -> LazySettings {
        let defaults = LazySettings::default();
        match self.translation.get_active_provider_config() {
            Some(provider) => LazySettings {
                debounce_ms: self.scheduling.debounce_ms,
                max_wait_ms: self.scheduling.max_wait_ms,
                visibility_margin: provider.visibility_margin,
                limits: provider.batch_limits(&self.translation.get_model()),
                ..defaults
            },
            None => LazySettings {
                debounce_ms: self.scheduling.debounce_ms,
                max_wait_ms: self.scheduling.max_wait_ms,
                ..defaults
            },
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            log_level: LogLevel::default(),
            translation: TranslationConfig::default(),
            glossary: GlossaryConfig::default(),
            validation: ValidationConfig::default(),
            scheduling: SchedulingConfig::default(),
            display: DisplayMode::default(),
        }
    }
}

impl TranslationConfig {
    pub fn optimal_concurrent_requests(&self) -> usize {
        self.common.concurrent_requests.max(1)
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    pub fn get_provider_config(&self, id: &str) -> Option<&ProviderConfig> {
        self.available_providers.iter().find(|p| p.id == id)
    }

    /// Active provider, added from its preset if it is not listed yet
    pub fn active_provider_mut(&mut self) -> &mut ProviderConfig {
        let index = match self.available_providers.iter().position(|p| p.id == self.provider) {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(&self.provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.to_spec(self.common.temperature).model)
            .or_else(|| ProviderSpec::preset(&self.provider).map(|p| p.model))
            .unwrap_or_default()
    }

    /// Spec of the active provider
    pub fn active_spec(&self) -> Option<ProviderSpec> {
        self.get_active_provider_config()
            .map(|p| p.to_spec(self.common.temperature))
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        let available_providers = [
            "deepseek",
            "openai",
            "together",
            "zhipu",
            "anthropic",
            "gemini",
            "microsoft",
            "google_translate",
        ]
        .into_iter()
        .map(ProviderConfig::new)
        .collect();

        Self {
            provider: default_provider(),
            available_providers,
            common: TranslationCommonConfig::default(),
        }
    }
}
