/*!
 * Placeholder substitution for glossary terms.
 */

pub mod placeholder;
pub mod protector;

pub use placeholder::{Placeholder, PlaceholderMap, TOKEN_PREFIX, TOKEN_REGEX, format_token};
pub use protector::{ProtectedUnit, TermProtector};
