//! Google Translate HTML endpoint: request `[[html...], from, to]`,
//! response `[[translated...], ...]`.

use serde_json::{Value, json};

use super::{HttpRequest, HttpResponse, Provider, ProviderSpec, TranslationJob};
use crate::errors::ProviderError;
use crate::translation::prompts::numbered_list;

#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    spec: ProviderSpec,
}

impl GoogleTranslate {
    pub fn new(spec: ProviderSpec) -> Self {
        Self { spec }
    }
}

impl Provider for GoogleTranslate {
    fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    fn build_request(&self, job: &TranslationJob, credential: Option<&str>) -> Result<HttpRequest, ProviderError> {
        let body = json!([job.units, job.source_language, job.target_language]);
        let mut request = HttpRequest {
            headers: vec![("Content-Type".to_string(), "application/json+protobuf".to_string())],
            ..HttpRequest::post(self.spec.endpoint_url(), body)
        };
        if let Some(key) = credential {
            request = request.header("X-Goog-API-Key", key);
        }
        Ok(request)
    }

    fn parse_response(&self, response: &HttpResponse, job: &TranslationJob) -> Result<String, ProviderError> {
        let body = response.json()?;
        let texts: Vec<String> = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::InvalidResponseShape("Expected [[translations...]]".to_string()))?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ProviderError::InvalidResponseShape("Non-string translation".to_string()))?;

        if texts.len() != job.units.len() {
            return Err(ProviderError::InvalidResponseShape(format!(
                "Expected {} translations, got {}",
                job.units.len(),
                texts.len()
            )));
        }
        Ok(numbered_list(&texts))
    }
}
