//! OpenAI-compatible chat completions (OpenAI, DeepSeek, Together, Zhipu
//! ChatGLM and custom endpoints).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::path::{extract, extract_text};
use super::{HttpRequest, HttpResponse, Provider, ProviderSpec, TranslationJob, classify_status};
use crate::errors::ProviderError;
use crate::translation::prompts::{PromptTemplate, user_prompt};

pub const RESPONSE_PATH: &str = "choices[0].message.content";

/// ChatGLM's code for refused content
const ZHIPU_BLOCKED_CODE: &str = "1301";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.into(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.into(),
                },
            ],
            temperature,
            stream: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    spec: ProviderSpec,
}

impl OpenAiCompatible {
    pub fn new(spec: ProviderSpec) -> Self {
        Self { spec }
    }
}

/// Vendor error carried in a JSON body, even with a success status
fn embedded_error(body: &Value) -> Option<ProviderError> {
    let error = body.get("error")?;
    let code = error.get("code").map(|c| match c {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    match code.as_deref() {
        Some(ZHIPU_BLOCKED_CODE) => Some(ProviderError::ContentPolicyBlocked(message)),
        Some("insufficient_quota") => Some(ProviderError::BillingExhausted(message)),
        Some("invalid_api_key") => Some(ProviderError::AuthInvalid(message)),
        Some("model_not_found") => Some(ProviderError::ModelNotFound(message)),
        _ => Some(ProviderError::Unclassified {
            status_code: None,
            message,
        }),
    }
}

impl Provider for OpenAiCompatible {
    fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    fn build_request(&self, job: &TranslationJob, credential: Option<&str>) -> Result<HttpRequest, ProviderError> {
        let system = PromptTemplate::for_model(&self.spec.model).render(&job.target_language);
        let body = ChatRequest::new(
            &self.spec.model,
            system,
            user_prompt(&job.units, &job.target_language),
            self.spec.temperature,
        );
        let body = serde_json::to_value(body).map_err(|e| ProviderError::Unclassified {
            status_code: None,
            message: format!("Failed to encode request: {}", e),
        })?;

        let mut request = HttpRequest::post(self.spec.endpoint_url(), body);
        if let Some(key) = credential {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        Ok(request)
    }

    fn parse_response(&self, response: &HttpResponse, _job: &TranslationJob) -> Result<String, ProviderError> {
        let body = response.json()?;
        if let Some(error) = embedded_error(&body) {
            return Err(error);
        }
        if let Some(reason) = extract(&body, "choices[0].finish_reason").and_then(Value::as_str) {
            if reason == "content_filter" || reason == "sensitive" {
                return Err(ProviderError::ContentPolicyBlocked(format!(
                    "{} refused the content ({})",
                    self.spec.name, reason
                )));
            }
        }
        extract_text(&body, RESPONSE_PATH)
    }

    fn classify_error(&self, response: &HttpResponse) -> ProviderError {
        match response.json().ok().as_ref().and_then(embedded_error) {
            Some(ProviderError::Unclassified { .. }) | None => classify_status(response),
            Some(specific) => specific,
        }
    }
}
