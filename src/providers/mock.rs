/*!
 * Mock translator for tests and offline runs.
 *
 * - `MockProvider::echo()` - returns every unit unchanged as a numbered list
 * - `MockProvider::failing(kind)` - always fails with the given error kind
 * - `MockProvider::with_responder(f)` - the response is computed by `f`
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ProviderFamily, Translator};
use crate::errors::{ErrorKind, ProviderError};
use crate::translation::prompts::numbered_list;

/// What the mock was asked to translate
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    pub units: Vec<String>,
    pub source_language: String,
    pub target_language: String,
}

/// Computes a response from the request and the zero-based call index
pub type Responder = fn(&MockRequest, usize) -> Result<String, ProviderError>;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Numbered list of the units, unchanged
    Echo,
    /// Fails every Nth request with a retriable error
    Intermittent { fail_every: usize },
    /// Always fails with an error of this kind
    Failing(ErrorKind),
    /// Returns an empty response
    Empty,
    /// Echoes after a delay
    Slow { delay_ms: u64 },
}

/// Mock translator with a shared request log
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    family: ProviderFamily,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
    responder: Option<Responder>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            family: ProviderFamily::OpenAiCompatible,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            responder: None,
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing(kind: ErrorKind) -> Self {
        Self::new(MockBehavior::Failing(kind))
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Compute responses with `responder` instead of the behavior
    pub fn with_responder(responder: Responder) -> Self {
        let mut mock = Self::echo();
        mock.responder = Some(responder);
        mock
    }

    /// Report a different family, which changes the validation thresholds
    pub fn with_family(mut self, family: ProviderFamily) -> Self {
        self.family = family;
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Translator for MockProvider {
    fn family(&self) -> ProviderFamily {
        self.family
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn translate(&self, units: &[String], from: &str, to: &str) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let request = MockRequest {
            units: units.to_vec(),
            source_language: from.to_string(),
            target_language: to.to_string(),
        };
        self.requests.lock().push(request.clone());

        if let Some(responder) = self.responder {
            return responder(&request, count);
        }

        match self.behavior {
            MockBehavior::Echo => Ok(numbered_list(&request.units)),
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ServerOverloaded(format!(
                        "Simulated intermittent failure (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(numbered_list(&request.units))
                }
            }
            MockBehavior::Failing(kind) => Err(ProviderError::from_kind(kind, "Simulated provider failure")),
            MockBehavior::Empty => Ok(String::new()),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(numbered_list(&request.units))
            }
        }
    }
}
