/*!
 * Turning a provider response back into per-unit HTML.
 *
 * A batch response loses any prompt echo ahead of its first item and is
 * split into one segment per unit; each segment is cleaned of translator
 * artifacts, its placeholders are restored to their
 * final values, user replacement rules are applied and spacing is
 * normalized for the target language.
 */

pub mod cleaner;
pub mod post;
pub mod restorer;
pub mod segments;

pub use cleaner::{TranslationCleaner, remove_meta_lines, remove_meta_preamble};
pub use post::{PostReplacement, PostReplacementRules};
pub use restorer::{residual_tokens, restore_placeholders};
pub use segments::split_segments;

use log::warn;

use crate::document::InlineTags;
use crate::errors::TranslationError;
use crate::protect::PlaceholderMap;

#[derive(Debug, Clone)]
pub struct Restorer {
    cleaner: TranslationCleaner,
    post_rules: PostReplacementRules,
}

impl Restorer {
    pub fn new(target_language: &str, inline_tags: InlineTags, post_rules: PostReplacementRules) -> Self {
        Self {
            cleaner: TranslationCleaner::new(target_language, inline_tags),
            post_rules,
        }
    }

    /// Final HTML for one segment
    pub fn finish_segment(&self, segment: &str, map: &PlaceholderMap) -> String {
        let cleaned = self.cleaner.clean(segment);
        let restored = restore_placeholders(&cleaned, map);
        let residual = residual_tokens(&restored, map);
        if !residual.is_empty() {
            warn!("Placeholders left after restoration: {:?}", residual);
        }
        let replaced = self.post_rules.apply(&restored);
        self.cleaner.normalize_spacing(&replaced)
    }

    /// Split a batch response and finish every segment
    pub fn finish_batch(&self, response: &str, expected: usize, map: &PlaceholderMap) -> Result<Vec<String>, TranslationError> {
        let cleaned = remove_meta_preamble(response);
        let segments = split_segments(&cleaned, expected)?;
        Ok(segments.iter().map(|segment| self.finish_segment(segment, map)).collect())
    }
}
