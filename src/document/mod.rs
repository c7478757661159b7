/*!
 * Document handling: parsing HTML into a rich-text tree, cutting it into
 * translation units, flattening inline content for term matching, and
 * rendering translated output.
 */

pub mod model;
pub mod render;
pub mod runs;
pub mod units;

pub use model::{DEFAULT_INLINE_TAGS, Element, InlineTags, RichNode, parse_fragment, to_html};
pub use render::{DisplayMode, UnitOutcome, render_document};
pub use runs::{CapturedFragment, FlatView, InlineContent, OBJECT_CHAR};
pub use units::{TranslationUnit, UnitState, extract_units, is_separator_text};

/// A parsed document with its units
#[derive(Debug, Clone)]
pub struct Document {
    pub nodes: Vec<RichNode>,
    pub units: Vec<TranslationUnit>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let nodes = parse_fragment(html);
        let units = extract_units(&nodes);
        Self { nodes, units }
    }
}
