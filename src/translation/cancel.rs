//! Run generations. Pausing or restarting advances the generation; work
//! started under an older generation sees that it is stale and discards
//! its result instead of writing it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::TranslationError;

#[derive(Debug, Clone, Default)]
pub struct RunGeneration {
    current: Arc<AtomicU64>,
}

impl RunGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Invalidate every outstanding token; returns the new generation
    pub fn advance(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Token bound to the current generation
    pub fn token(&self) -> GenerationToken {
        GenerationToken {
            id: self.current(),
            shared: Arc::clone(&self.current),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationToken {
    id: u64,
    shared: Arc<AtomicU64>,
}

impl GenerationToken {
    /// A token that never goes stale
    pub fn detached() -> Self {
        RunGeneration::new().token()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.shared.load(Ordering::SeqCst) == self.id
    }

    pub fn check(&self) -> Result<(), TranslationError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(TranslationError::Cancelled)
        }
    }
}
