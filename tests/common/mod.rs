/*!
 * Common test utilities for the fictrans test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use fictrans::document::InlineTags;
use fictrans::glossary::{GlossarySource, RuleSet, compile_rules};
use fictrans::protect::TermProtector;
use fictrans::providers::Translator;
use fictrans::restore::{PostReplacementRules, Restorer};
use fictrans::translation::{PipelineSettings, TranslationPipeline};
use fictrans::validation::ValidationThresholds;

// Scripted HTTP transport for provider tests
pub mod fake_transport;

/// Route library logs to the test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Pipeline settings with millisecond backoff and no jitter
pub fn fast_settings(target_language: &str) -> PipelineSettings {
    PipelineSettings {
        source_language: "en".to_string(),
        target_language: target_language.to_string(),
        max_attempts: 3,
        backoff_base_ms: 1,
        jitter_ms: 0,
    }
}

/// Pipeline over `sources` with the given translator and thresholds
pub fn build_pipeline(
    translator: Arc<dyn Translator>,
    sources: &[GlossarySource],
    thresholds: ValidationThresholds,
    settings: PipelineSettings,
) -> TranslationPipeline {
    let rules = Arc::new(RuleSet::new(compile_rules(sources)));
    let restorer = Restorer::new(
        &settings.target_language,
        InlineTags::default(),
        PostReplacementRules::default(),
    );
    TranslationPipeline::new(
        translator,
        TermProtector::new(rules, InlineTags::default()),
        thresholds,
        restorer,
        settings,
    )
}

/// Sample chapter in the shape of a work page
pub const SAMPLE_CHAPTER: &str = r#"<div id="chapters"><div class="userstuff">
<p>Jane Doe walked to Tsukinomori Girls' Academy.</p>
<p>She met <em>Jane</em> Doe's sister at the gate.</p>
<p>* * *</p>
<p>The day ended quietly.</p>
</div></div>"#;
