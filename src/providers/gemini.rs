//! Google Gemini `generateContent`. The key travels as a `?key=` query
//! parameter, not a header.

use serde_json::{Value, json};

use super::path::{extract, extract_text};
use super::{HttpRequest, HttpResponse, Provider, ProviderSpec, TranslationJob, classify_status};
use crate::errors::ProviderError;
use crate::translation::prompts::{PromptTemplate, user_prompt};

pub const RESPONSE_PATH: &str = "candidates[0].content.parts[0].text";

const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

#[derive(Debug, Clone)]
pub struct Gemini {
    spec: ProviderSpec,
}

impl Gemini {
    pub fn new(spec: ProviderSpec) -> Self {
        Self { spec }
    }
}

impl Provider for Gemini {
    fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    fn build_request(&self, job: &TranslationJob, credential: Option<&str>) -> Result<HttpRequest, ProviderError> {
        let system = PromptTemplate::for_model(&self.spec.model).render(&job.target_language);
        let body = json!({
            "systemInstruction": {"role": "user", "parts": [{"text": system}]},
            "contents": [{"role": "user", "parts": [{"text": user_prompt(&job.units, &job.target_language)}]}],
            "generationConfig": {"temperature": self.spec.temperature, "candidateCount": 1},
        });

        let mut url = url::Url::parse(&self.spec.endpoint_url())
            .map_err(|e| ProviderError::Unclassified {
                status_code: None,
                message: format!("Invalid endpoint '{}': {}", self.spec.endpoint, e),
            })?;
        if let Some(key) = credential {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(HttpRequest::post(url.to_string(), body))
    }

    fn parse_response(&self, response: &HttpResponse, _job: &TranslationJob) -> Result<String, ProviderError> {
        let body = response.json()?;

        if let Some(reason) = extract(&body, "promptFeedback.blockReason").and_then(Value::as_str) {
            return Err(ProviderError::ContentPolicyBlocked(format!("Prompt blocked by Gemini ({})", reason)));
        }
        if let Some(reason) = extract(&body, "candidates[0].finishReason").and_then(Value::as_str) {
            if BLOCKING_FINISH_REASONS.contains(&reason) {
                return Err(ProviderError::ContentPolicyBlocked(format!(
                    "Gemini stopped the response ({})",
                    reason
                )));
            }
        }
        extract_text(&body, RESPONSE_PATH)
    }

    fn classify_error(&self, response: &HttpResponse) -> ProviderError {
        let error = classify_status(response);
        if response.body.contains("API_KEY_INVALID") {
            return ProviderError::AuthInvalid(error.to_string());
        }
        if response.body.contains("RESOURCE_EXHAUSTED") && response.status == 429 {
            return ProviderError::RateLimited(error.to_string());
        }
        error
    }
}
