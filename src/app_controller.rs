use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::app_config::Config;
use crate::document::{Document, InlineTags, render_document};
use crate::glossary::{GlossaryLibrary, GlossaryScope, GlossarySource};
use crate::protect::TermProtector;
use crate::providers::{CredentialRotator, ProviderClient, ReqwestTransport, Translator, create_provider};
use crate::restore::{PostReplacementRules, Restorer};
use crate::store::{KeyValueStore, MemoryStore, SqliteStore};
use crate::translation::{BatchTranslator, RunGeneration, TranslationPipeline};
use crate::validation::ValidationThresholds;

// @module: Application controller for document translation

/// Result of translating one document
#[derive(Debug, Clone)]
pub struct TranslationSummary {
    pub html: String,
    pub translated: usize,
    pub failed: usize,
    /// Units that were never attempted because the run was cancelled
    pub skipped: usize,
}

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Rule cache and key rotation state
    store: Arc<dyn KeyValueStore>,
    // @field: Replaces the configured provider when set
    translator: Option<Arc<dyn Translator>>,
    generation: RunGeneration,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match SqliteStore::open_default() {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("Persistent store unavailable ({}), using memory", e);
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::with_parts(config, store, None))
    }

    /// Controller with an explicit store and, optionally, a translator
    pub fn with_parts(config: Config, store: Arc<dyn KeyValueStore>, translator: Option<Arc<dyn Translator>>) -> Self {
        Self {
            config,
            store,
            translator,
            generation: RunGeneration::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generation of the current run; advancing it cancels the run
    pub fn generation(&self) -> &RunGeneration {
        &self.generation
    }

    fn inline_tags(&self) -> InlineTags {
        InlineTags::new(&self.config.glossary.inline_tags)
    }

    /// Glossary library from local files, remote imports and inline entries
    pub async fn build_library(&self) -> Result<GlossaryLibrary> {
        let glossary = &self.config.glossary;
        let mut library = GlossaryLibrary::new(Arc::clone(&self.store));

        for file in &glossary.files {
            if let Err(e) = library.load_file(file) {
                warn!("Skipping glossary {}: {:#}", file, e);
            }
        }
        if !glossary.remote_urls.is_empty() {
            let client = reqwest::Client::new();
            for url in &glossary.remote_urls {
                if let Err(e) = library.import_remote(&client, url).await {
                    warn!("{}", e);
                }
            }
        }
        library.merge_inline(&glossary.inline)?;
        if !glossary.enabled_source_ids.is_empty() {
            library.enable_only(&glossary.enabled_source_ids)?;
        }
        Ok(library)
    }

    /// Translator for the active provider
    pub fn build_translator(&self) -> Result<Arc<dyn Translator>> {
        if let Some(translator) = &self.translator {
            return Ok(Arc::clone(translator));
        }
        let translation = &self.config.translation;
        let provider = translation
            .get_active_provider_config()
            .ok_or_else(|| anyhow!("Active provider '{}' is not configured", translation.provider))?;
        let spec = provider.to_spec(translation.common.temperature);
        info!("Provider: {} - {}", spec.name, spec.model);

        let transport = ReqwestTransport::new(Duration::from_secs(provider.timeout_secs));
        let credentials = CredentialRotator::new(&provider.id, provider.usable_keys(), Arc::clone(&self.store));
        Ok(Arc::new(ProviderClient::new(
            create_provider(spec),
            Arc::new(transport),
            credentials,
        )))
    }

    /// Pipeline wired from configuration
    pub async fn build_pipeline(&self) -> Result<Arc<TranslationPipeline>> {
        let library = self.build_library().await?;
        let compiled = library.compile()?;
        debug!("Glossary state {} with {} rules", compiled.state_hash, compiled.rules.len());

        let translator = self.build_translator()?;
        let thresholds = ValidationThresholds::resolve(
            translator.family(),
            self.config.validation.threshold_override.as_deref(),
        );
        let protector = TermProtector::new(Arc::new(compiled.rule_set()), self.inline_tags());
        let restorer = Restorer::new(
            &self.config.target_language,
            self.inline_tags(),
            PostReplacementRules::parse(&self.config.glossary.post_replacements),
        );
        Ok(Arc::new(TranslationPipeline::new(
            translator,
            protector,
            thresholds,
            restorer,
            self.config.pipeline_settings(),
        )))
    }

    /// Translate an HTML fragment; `progress_callback` gets (completed, total) batches
    pub async fn translate_html(&self, html: &str, progress_callback: impl Fn(usize, usize)) -> Result<TranslationSummary> {
        let pipeline = self.build_pipeline().await?;
        let model = pipeline.translator().model().to_string();
        let limits = match self.config.translation.get_active_provider_config() {
            Some(provider) if self.translator.is_none() => provider.batch_limits(&model),
            _ => crate::translation::BatchLimits::for_model(&model),
        };

        let mut document = Document::parse(html);
        let batch_translator = BatchTranslator::new(
            Arc::clone(&pipeline),
            limits,
            self.config.translation.optimal_concurrent_requests(),
        );
        let token = self.generation.token();
        let report = batch_translator
            .translate_units(&mut document.units, &token, progress_callback)
            .await;

        let html = render_document(&document.nodes, &document.units, &report.outcomes, self.config.display);
        Ok(TranslationSummary {
            html,
            translated: report.outcomes.len() - report.failed,
            failed: report.failed,
            skipped: report.cancelled,
        })
    }

    /// Translate an HTML file and write the result next to it or to `output`
    pub async fn run(&self, input_file: PathBuf, output: Option<PathBuf>, force_overwrite: bool) -> Result<PathBuf> {
        let start_time = Instant::now();
        if !input_file.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        let output_path =
            output.unwrap_or_else(|| Self::output_filename(&input_file, &self.config.target_language));
        if output_path.exists() && !force_overwrite {
            return Err(anyhow!(
                "Output file already exists: {:?} (use -f to force overwrite)",
                output_path
            ));
        }

        let html = std::fs::read_to_string(&input_file)
            .with_context(|| format!("Failed to read input file: {:?}", input_file))?;

        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let summary = self
            .translate_html(&html, move |completed, total| {
                pb.set_length(total as u64);
                pb.set_position(completed as u64);
            })
            .await?;
        progress_bar.finish_and_clear();

        std::fs::write(&output_path, &summary.html)
            .with_context(|| format!("Failed to write output file: {:?}", output_path))?;

        if summary.failed > 0 {
            warn!(
                "{} units failed; their errors are shown inline in the output",
                summary.failed
            );
        }
        info!(
            "Translated {} units in {}: {}",
            summary.translated,
            Self::format_duration(start_time.elapsed()),
            output_path.display()
        );
        Ok(output_path)
    }

    /// `chapter.html` -> `chapter.zh-CN.html`
    pub fn output_filename(input_file: &Path, target_language: &str) -> PathBuf {
        let stem = input_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        input_file.with_file_name(format!("{}.{}.html", stem, target_language))
    }

    /// One line per compiled rule of a glossary file
    pub fn describe_glossary(&self, path: &Path) -> Result<Vec<String>> {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read glossary: {:?}", path))?;
        let source = GlossarySource::parse("inspect", GlossaryScope::Local, &text)?;
        let rules = crate::glossary::compile_rules(std::slice::from_ref(&source));
        Ok(rules
            .iter()
            .map(|rule| {
                format!(
                    "[{:>6}] {:?}/{:?} {} -> {}",
                    rule.priority, rule.kind, rule.match_strategy, rule.source_term, rule.replacement
                )
            })
            .collect())
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
