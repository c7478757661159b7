/*!
 * Glossary library: the set of sources the user manages.
 *
 * Every mutation drops the cached rule list of the state it leaves, so a
 * rebuilt library reaching an already compiled state still hits the cache.
 * At least one local source always exists.
 */

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info};

use super::compiler::{CompiledGlossary, RuleCompiler, state_hash};
use super::source::{GlossaryScope, GlossarySource};
use crate::errors::GlossaryError;
use crate::store::KeyValueStore;

/// Id of the local source created for a fresh library
pub const DEFAULT_LOCAL_ID: &str = "local";

const IMPORT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub struct GlossaryLibrary {
    sources: Vec<GlossarySource>,
    compiler: RuleCompiler,
}

impl GlossaryLibrary {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            sources: vec![GlossarySource::new(DEFAULT_LOCAL_ID, GlossaryScope::Local, "Local glossary")],
            compiler: RuleCompiler::new(store),
        }
    }

    pub fn sources(&self) -> &[GlossarySource] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&GlossarySource> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn compiler(&self) -> &RuleCompiler {
        &self.compiler
    }

    /// Add a source, replacing one with the same id
    pub fn add(&mut self, source: GlossarySource) -> Result<(), GlossaryError> {
        info!("Adding glossary '{}' ({} entries)", source.name, source.entry_count());
        let previous = self.state()?;
        match self.sources.iter_mut().find(|s| s.id == source.id) {
            Some(existing) => *existing = source,
            None => self.sources.push(source),
        }
        self.compiler.invalidate(&previous)
    }

    /// Apply an edit to an existing source
    pub fn edit<F>(&mut self, id: &str, edit: F) -> Result<(), GlossaryError>
    where
        F: FnOnce(&mut GlossarySource),
    {
        let previous = self.state()?;
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| GlossaryError::UnknownSource(id.to_string()))?;
        edit(source);
        self.compiler.invalidate(&previous)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), GlossaryError> {
        self.edit(id, |s| s.enabled = enabled)
    }

    /// Keep exactly the listed sources enabled
    pub fn enable_only(&mut self, ids: &[String]) -> Result<(), GlossaryError> {
        let previous = self.state()?;
        for source in &mut self.sources {
            source.enabled = ids.iter().any(|id| *id == source.id);
        }
        self.compiler.invalidate(&previous)
    }

    pub fn remove(&mut self, id: &str) -> Result<GlossarySource, GlossaryError> {
        let index = self
            .sources
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| GlossaryError::UnknownSource(id.to_string()))?;
        let locals = self.sources.iter().filter(|s| s.scope == GlossaryScope::Local).count();
        if self.sources[index].scope == GlossaryScope::Local && locals <= 1 {
            return Err(GlossaryError::LastLocalSource);
        }
        let previous = self.state()?;
        let removed = self.sources.remove(index);
        self.compiler.invalidate(&previous)?;
        Ok(removed)
    }

    /// Merge inline `term:译名` entries into the default local source
    pub fn merge_inline(&mut self, text: &str) -> Result<(), GlossaryError> {
        let inline = GlossarySource::from_inline(DEFAULT_LOCAL_ID, text);
        if inline.is_empty() {
            return Ok(());
        }
        let previous = self.state()?;
        match self.sources.iter_mut().find(|s| s.id == DEFAULT_LOCAL_ID) {
            Some(local) => local.sensitive_terms.extend(inline.sensitive_terms),
            None => self.sources.insert(0, inline),
        }
        self.compiler.invalidate(&previous)
    }

    /// Load a glossary file as a local source named after the file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read glossary: {:?}", path))?;
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let source = GlossarySource::parse(&id, GlossaryScope::Local, &text)
            .with_context(|| format!("Failed to parse glossary: {:?}", path))?;
        self.add(source)?;
        Ok(())
    }

    /// Fetch and parse a remote glossary; the import time becomes its recency
    pub async fn import_remote(&mut self, client: &reqwest::Client, url: &str) -> Result<(), GlossaryError> {
        let import_error = |message: String| GlossaryError::Import {
            url: url.to_string(),
            message,
        };
        debug!("Importing glossary from {}", url);
        let response = client
            .get(url)
            .timeout(Duration::from_secs(IMPORT_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| import_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(import_error(format!("HTTP {}", response.status())));
        }
        let text = response.text().await.map_err(|e| import_error(e.to_string()))?;

        let mut source = GlossarySource::parse(url, GlossaryScope::Remote, &text)?;
        source.recency_weight = Utc::now().timestamp();
        source.origin_url = Some(url.to_string());
        self.add(source)
    }

    pub fn compile(&self) -> Result<CompiledGlossary, GlossaryError> {
        self.compiler.compile(&self.sources)
    }

    /// Hash of the current glossary state
    pub fn state(&self) -> Result<String, GlossaryError> {
        state_hash(&self.sources)
    }
}
