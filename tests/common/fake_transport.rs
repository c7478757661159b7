/*!
 * HTTP transport that replays scripted responses
 */

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use fictrans::errors::ProviderError;
use fictrans::providers::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Returns queued responses in order and records every request
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ProviderError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<HttpResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Network("No scripted response left".to_string())))
    }
}
