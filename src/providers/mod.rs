/*!
 * Provider implementations for different translation services.
 *
 * A `Provider` knows one vendor's wire format: how to build an
 * authenticated request for a batch, where the text sits in the response
 * and how the vendor reports failures. Sending is done by a
 * `ProviderClient`, which adds key rotation on top of a transport and
 * exposes the whole thing as a `Translator`.
 */

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

pub mod anthropic;
pub mod classify;
pub mod credentials;
pub mod gemini;
pub mod google_mt;
pub mod microsoft;
pub mod mock;
pub mod openai;
pub mod path;
pub mod transport;

pub use classify::classify_status;
pub use credentials::{CredentialRotator, parse_keys};
pub use mock::{MockBehavior, MockProvider, MockRequest};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Wire-format family of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    OpenAiCompatible,
    Anthropic,
    Gemini,
    MicrosoftTranslator,
    GoogleTranslate,
}

impl ProviderFamily {
    /// Chat-completion style services that take a prompt
    pub fn is_llm(self) -> bool {
        !matches!(self, ProviderFamily::MicrosoftTranslator | ProviderFamily::GoogleTranslate)
    }

    pub fn requires_key(self) -> bool {
        self != ProviderFamily::GoogleTranslate
    }

    /// Family implied by a provider id; unknown ids speak the OpenAI dialect
    pub fn from_provider_id(id: &str) -> Self {
        id.parse().unwrap_or(ProviderFamily::OpenAiCompatible)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderFamily::OpenAiCompatible => "openai_compatible",
            ProviderFamily::Anthropic => "anthropic",
            ProviderFamily::Gemini => "gemini",
            ProviderFamily::MicrosoftTranslator => "microsoft_translator",
            ProviderFamily::GoogleTranslate => "google_translate",
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "openai" | "openai_compatible" | "deepseek" | "together" | "zhipu" | "chatglm" | "custom" => {
                Ok(ProviderFamily::OpenAiCompatible)
            }
            "anthropic" | "claude" => Ok(ProviderFamily::Anthropic),
            "gemini" | "google_ai" => Ok(ProviderFamily::Gemini),
            "microsoft" | "microsoft_translator" | "azure" => Ok(ProviderFamily::MicrosoftTranslator),
            "google" | "google_translate" => Ok(ProviderFamily::GoogleTranslate),
            other => Err(format!("Unknown provider family: {}", other)),
        }
    }
}

/// Static description of a configured provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub id: String,
    pub name: String,
    pub family: ProviderFamily,
    /// Full endpoint URL; `{model}` is substituted where the vendor puts
    /// the model in the path
    pub endpoint: String,
    pub model: String,
    /// User-supplied endpoint rather than a preset
    pub custom: bool,
    pub temperature: f32,
}

impl ProviderSpec {
    pub fn new(id: &str, family: ProviderFamily, endpoint: &str, model: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            family,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            custom: false,
            temperature: 0.0,
        }
    }

    fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Built-in provider presets
    pub fn preset(id: &str) -> Option<Self> {
        use ProviderFamily::*;
        let spec = match id {
            "openai" => Self::new(id, OpenAiCompatible, "https://api.openai.com/v1/chat/completions", "gpt-4o-mini")
                .named("OpenAI"),
            "deepseek" => Self::new(id, OpenAiCompatible, "https://api.deepseek.com/chat/completions", "deepseek-chat")
                .named("DeepSeek"),
            "together" => Self::new(
                id,
                OpenAiCompatible,
                "https://api.together.xyz/v1/chat/completions",
                "meta-llama/Llama-4-Maverick-17B-128E-Instruct-FP8",
            )
            .named("Together AI"),
            "zhipu" => Self::new(
                id,
                OpenAiCompatible,
                "https://open.bigmodel.cn/api/paas/v4/chat/completions",
                "glm-4-flash-250414",
            )
            .named("Zhipu ChatGLM"),
            "anthropic" => Self::new(id, Anthropic, "https://api.anthropic.com/v1/messages", "claude-3-5-haiku-latest")
                .named("Anthropic"),
            "gemini" => Self::new(
                id,
                Gemini,
                "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent",
                "gemini-2.5-flash",
            )
            .named("Google AI"),
            "microsoft" => Self::new(
                id,
                MicrosoftTranslator,
                "https://api.cognitive.microsofttranslator.com/translate?api-version=3.0&textType=html",
                "",
            )
            .named("Microsoft Translator"),
            "google_translate" => Self::new(id, GoogleTranslate, "https://translate-pa.googleapis.com/v1/translateHtml", "")
                .named("Google Translate"),
            _ => return None,
        };
        Some(spec)
    }

    /// A user endpoint spoken to in the OpenAI dialect
    pub fn custom(id: &str, endpoint: &str, model: &str) -> Self {
        let mut spec = Self::new(id, ProviderFamily::OpenAiCompatible, endpoint, model);
        spec.custom = true;
        spec
    }

    pub fn endpoint_url(&self) -> String {
        self.endpoint.replace("{model}", &self.model)
    }
}

/// One batch to translate
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationJob {
    /// Protected HTML of each unit, in order
    pub units: Vec<String>,
    pub source_language: String,
    pub target_language: String,
}

impl TranslationJob {
    pub fn new(units: &[String], source_language: &str, target_language: &str) -> Self {
        Self {
            units: units.to_vec(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        }
    }
}

/// Vendor wire format
pub trait Provider: Send + Sync + fmt::Debug {
    fn spec(&self) -> &ProviderSpec;

    fn family(&self) -> ProviderFamily {
        self.spec().family
    }

    /// Authenticated request for a batch
    fn build_request(&self, job: &TranslationJob, credential: Option<&str>) -> Result<HttpRequest, ProviderError>;

    /// Translated text from a successful response, as a numbered list
    fn parse_response(&self, response: &HttpResponse, job: &TranslationJob) -> Result<String, ProviderError>;

    /// Classify a failed response
    fn classify_error(&self, response: &HttpResponse) -> ProviderError {
        classify_status(response)
    }
}

/// Select the implementation for a provider's family
pub fn create_provider(spec: ProviderSpec) -> Box<dyn Provider> {
    match spec.family {
        ProviderFamily::OpenAiCompatible => Box::new(openai::OpenAiCompatible::new(spec)),
        ProviderFamily::Anthropic => Box::new(anthropic::Anthropic::new(spec)),
        ProviderFamily::Gemini => Box::new(gemini::Gemini::new(spec)),
        ProviderFamily::MicrosoftTranslator => Box::new(microsoft::MicrosoftTranslator::new(spec)),
        ProviderFamily::GoogleTranslate => Box::new(google_mt::GoogleTranslate::new(spec)),
    }
}

/// Anything that can translate a batch of units
#[async_trait]
pub trait Translator: Send + Sync + fmt::Debug {
    fn family(&self) -> ProviderFamily;

    fn model(&self) -> &str;

    /// Translate the units; the result is a numbered list with one item per unit
    async fn translate(&self, units: &[String], from: &str, to: &str) -> Result<String, ProviderError>;
}

/// A provider bound to a transport and its keys
#[derive(Debug)]
pub struct ProviderClient {
    provider: Box<dyn Provider>,
    transport: Arc<dyn HttpTransport>,
    credentials: CredentialRotator,
}

impl ProviderClient {
    pub fn new(provider: Box<dyn Provider>, transport: Arc<dyn HttpTransport>, credentials: CredentialRotator) -> Self {
        Self {
            provider,
            transport,
            credentials,
        }
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    async fn attempt(&self, job: &TranslationJob, credential: Option<&str>) -> Result<String, ProviderError> {
        let request = self.provider.build_request(job, credential)?;
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(self.provider.classify_error(&response));
        }
        self.provider.parse_response(&response, job)
    }
}

#[async_trait]
impl Translator for ProviderClient {
    fn family(&self) -> ProviderFamily {
        self.provider.family()
    }

    fn model(&self) -> &str {
        &self.provider.spec().model
    }

    async fn translate(&self, units: &[String], from: &str, to: &str) -> Result<String, ProviderError> {
        let job = TranslationJob::new(units, from, to);
        if self.credentials.is_empty() {
            if self.provider.family().requires_key() {
                return Err(ProviderError::AuthInvalid(format!(
                    "No API key configured for {}",
                    self.provider.spec().name
                )));
            }
            return self.attempt(&job, None).await;
        }

        // A rejected key moves on to the next one within the same call
        let mut last_error = None;
        for _ in 0..self.credentials.len() {
            let key = self.credentials.next_key().await?;
            match self.attempt(&job, Some(&key)).await {
                Ok(text) => return Ok(text),
                Err(e) if e.kind().is_credential_failure() && self.credentials.len() > 1 => {
                    warn!("{} rejected a key ({}), rotating", self.provider.spec().name, e.kind());
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        debug!("All keys for {} failed", self.provider.spec().id);
        Err(last_error.unwrap_or_else(|| ProviderError::AuthInvalid("No usable API key".to_string())))
    }
}
