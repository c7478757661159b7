//! Microsoft Translator v3. Each unit is sent as its own `{text}` object
//! and translated independently; the results are joined back into a
//! numbered list.

use serde::{Deserialize, Serialize};

use super::{HttpRequest, HttpResponse, Provider, ProviderSpec, TranslationJob};
use crate::errors::ProviderError;
use crate::translation::prompts::numbered_list;

#[derive(Debug, Serialize)]
struct TextItem<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslationItem {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    text: String,
}

/// Microsoft's codes for the Chinese scripts
pub fn microsoft_language_code(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "zh" | "zh-cn" | "zh-sg" | "zh-hans" => "zh-Hans".to_string(),
        "zh-tw" | "zh-hk" | "zh-mo" | "zh-hant" => "zh-Hant".to_string(),
        _ => code.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct MicrosoftTranslator {
    spec: ProviderSpec,
}

impl MicrosoftTranslator {
    pub fn new(spec: ProviderSpec) -> Self {
        Self { spec }
    }
}

impl Provider for MicrosoftTranslator {
    fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    fn build_request(&self, job: &TranslationJob, credential: Option<&str>) -> Result<HttpRequest, ProviderError> {
        let items: Vec<TextItem<'_>> = job.units.iter().map(|u| TextItem { text: u }).collect();
        let body = serde_json::to_value(items).map_err(|e| ProviderError::Unclassified {
            status_code: None,
            message: format!("Failed to encode request: {}", e),
        })?;

        let mut url = url::Url::parse(&self.spec.endpoint_url()).map_err(|e| ProviderError::Unclassified {
            status_code: None,
            message: format!("Invalid endpoint '{}': {}", self.spec.endpoint, e),
        })?;
        {
            let mut query = url.query_pairs_mut();
            if !job.source_language.eq_ignore_ascii_case("auto") {
                query.append_pair("from", &microsoft_language_code(&job.source_language));
            }
            query.append_pair("to", &microsoft_language_code(&job.target_language));
        }

        let mut request = HttpRequest::post(url.to_string(), body);
        if let Some(key) = credential {
            request = request.header("Ocp-Apim-Subscription-Key", key);
        }
        Ok(request)
    }

    fn parse_response(&self, response: &HttpResponse, job: &TranslationJob) -> Result<String, ProviderError> {
        let items: Vec<TranslationItem> = serde_json::from_str(&response.body)
            .map_err(|e| ProviderError::InvalidResponseShape(format!("Unexpected translation list: {}", e)))?;
        if items.len() != job.units.len() {
            return Err(ProviderError::InvalidResponseShape(format!(
                "Expected {} translations, got {}",
                job.units.len(),
                items.len()
            )));
        }

        let texts = items
            .into_iter()
            .map(|item| {
                item.translations
                    .into_iter()
                    .next()
                    .map(|t| t.text)
                    .ok_or_else(|| ProviderError::InvalidResponseShape("Empty translations array".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(numbered_list(&texts))
    }
}
