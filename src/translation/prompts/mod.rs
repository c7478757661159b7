/*!
 * Prompt construction for LLM providers.
 */

pub mod templates;

pub use templates::{PromptTemplate, language_label, numbered_list, user_prompt};
