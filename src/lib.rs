/*!
 * # fictrans - glossary-aware translation of fan-fiction chapters
 *
 * A Rust library and CLI that translates work pages (AO3-style HTML) with
 * LLM and machine-translation providers while keeping names and terms from
 * user glossaries intact.
 *
 * ## Features
 *
 * - Glossaries with terms, general terms, forbidden terms and regex rules,
 *   compiled into a priority-ordered rule list cached by state hash
 * - Term matching that spans inline formatting (`<em>Jane</em> Doe`)
 * - Placeholder protection, validation of the response against the
 *   placeholders that went out, and restoration with the original markup
 * - OpenAI-compatible, Anthropic, Gemini, Microsoft Translator and Google
 *   Translate providers, with key rotation and a classified error taxonomy
 * - Eager batch translation and a visibility-driven lazy scheduler
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `document`: HTML tree, translation units and rendering
 * - `glossary`: Sources, word forms and the rule compiler
 * - `matching`: Structure-aware multi-part term matchers
 * - `protect`: Placeholder map and the term protector
 * - `providers`: Provider wire formats, transport and key rotation
 * - `validation`: Placeholder-loss thresholds and response checks
 * - `restore`: Segment splitting, placeholder restoration, cleanup
 * - `translation`: Pipeline, batching, lazy scheduling, prompts
 * - `store`: Key-value store for caches and rotation state
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(non_snake_case)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod document;
pub mod errors;
pub mod glossary;
pub mod language_utils;
pub mod matching;
pub mod protect;
pub mod providers;
pub mod restore;
pub mod store;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use document::{Document, TranslationUnit};
pub use errors::{AppError, ErrorKind, GlossaryError, ProviderError, TranslationError};
pub use glossary::{GlossaryLibrary, GlossarySource};
pub use language_utils::{get_language_name, language_codes_match};
pub use translation::{BatchTranslator, LazyScheduler, TranslationPipeline};
