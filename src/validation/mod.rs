/*!
 * Response validation.
 *
 * - `placeholders`: repairs near-miss token spellings and checks that each
 *   placeholder survived translation often enough
 * - `thresholds`: per-provider-family loss tolerances and the user override
 */

pub mod placeholders;
pub mod thresholds;

pub use placeholders::{PlaceholderReport, ResponseValidator, TokenLoss, repair_placeholders};
pub use thresholds::ValidationThresholds;
