/*!
 * Translation of document units through a provider.
 *
 * - `core`: the per-batch pipeline (protect, send, validate, restore, retry)
 * - `batch`: batch planning and eager translation of a whole document
 * - `lazy`: visibility-driven scheduling with a debounced queue
 * - `cancel`: run generations used to discard stale work
 * - `prompts`: system prompt and numbered-list construction
 */

pub use self::batch::{Batch, BatchLimits, BatchReport, BatchTranslator, plan_batches};
pub use self::cancel::{GenerationToken, RunGeneration};
pub use self::core::{PipelineSettings, PreparedBatch, TranslationPipeline, UnitResult};
pub use self::lazy::{LazyHandle, LazyReport, LazyScheduler, LazySettings, SchedulerEvent};
pub use self::prompts::{PromptTemplate, language_label, numbered_list, user_prompt};

pub mod batch;
pub mod cancel;
pub mod core;
pub mod lazy;
pub mod prompts;
