use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::openai::ChatMessage;
use super::path::extract_text;
use super::{HttpRequest, HttpResponse, Provider, ProviderSpec, TranslationJob, classify_status};
use crate::errors::ProviderError;
use crate::translation::prompts::{PromptTemplate, user_prompt};

pub const API_VERSION: &str = "2023-06-01";
pub const RESPONSE_PATH: &str = "content[0].text";

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    model: String,
    messages: Vec<ChatMessage>,
    /// System prompt, outside the message list
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

impl AnthropicRequest {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: 0.0,
            max_tokens,
            stream: false,
        }
    }

    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Error envelope: `{"type": "error", "error": {"type": ..., "message": ...}}`
#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Anthropic messages API
#[derive(Debug, Clone)]
pub struct Anthropic {
    spec: ProviderSpec,
    max_tokens: u32,
}

impl Anthropic {
    pub fn new(spec: ProviderSpec) -> Self {
        Self { spec, max_tokens: 8192 }
    }
}

impl Provider for Anthropic {
    fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    fn build_request(&self, job: &TranslationJob, credential: Option<&str>) -> Result<HttpRequest, ProviderError> {
        let body = AnthropicRequest::new(&self.spec.model, self.max_tokens)
            .system(PromptTemplate::for_model(&self.spec.model).render(&job.target_language))
            .add_message("user", user_prompt(&job.units, &job.target_language))
            .temperature(self.spec.temperature);
        let body = serde_json::to_value(body).map_err(|e| ProviderError::Unclassified {
            status_code: None,
            message: format!("Failed to encode request: {}", e),
        })?;

        let mut request = HttpRequest::post(self.spec.endpoint_url(), body).header("anthropic-version", API_VERSION);
        if let Some(key) = credential {
            request = request.header("x-api-key", key);
        }
        Ok(request)
    }

    fn parse_response(&self, response: &HttpResponse, _job: &TranslationJob) -> Result<String, ProviderError> {
        let body = response.json()?;
        if body.get("stop_reason").and_then(Value::as_str) == Some("refusal") {
            return Err(ProviderError::ContentPolicyBlocked(format!(
                "{} declined to translate this content",
                self.spec.name
            )));
        }
        extract_text(&body, RESPONSE_PATH)
    }

    fn classify_error(&self, response: &HttpResponse) -> ProviderError {
        let Ok(parsed) = serde_json::from_str::<AnthropicErrorBody>(&response.body) else {
            return classify_status(response);
        };
        let message = parsed.error.message;
        match parsed.error.error_type.as_str() {
            "overloaded_error" | "api_error" => ProviderError::ServerOverloaded(message),
            "authentication_error" => ProviderError::AuthInvalid(message),
            "permission_error" => ProviderError::PermissionDenied(message),
            "rate_limit_error" => ProviderError::RateLimited(message),
            "not_found_error" => ProviderError::ModelNotFound(message),
            "billing_error" => ProviderError::BillingExhausted(message),
            _ => classify_status(response),
        }
    }
}
