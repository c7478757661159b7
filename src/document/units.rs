/*!
 * Translation units.
 *
 * A unit is a paragraph-equivalent block of inline content. Units are cut
 * out of the document tree by walking block containers; paragraphs that use
 * runs of `<br>` as paragraph breaks are split into several units.
 */

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::model::{Element, RichNode, text_content, to_html};

/// Lines made only of rule-like punctuation
static SEPARATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-—*~<>#.=_\s]{3,}\s*$").expect("Invalid separator regex"));

/// Block containers that become units when they hold no other blocks
const UNIT_TAGS: &[&str] = &[
    "p", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "dd", "dt", "td", "th", "div", "pre",
];

/// Containers that are walked but never become units themselves
const CONTAINER_TAGS: &[&str] = &[
    "div", "section", "article", "blockquote", "ul", "ol", "dl", "table", "thead", "tbody", "tfoot", "tr",
    "main", "header", "footer", "aside", "details", "figure", "li",
];

/// Structural headings of a work page that are never translated
const SKIPPED_HEADINGS: &[&str] = &["summary", "notes", "work text", "chapter text"];

/// Lifecycle of a unit through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Pending,
    Protected,
    Queued,
    InFlight,
    Translated,
    Error,
}

impl UnitState {
    pub fn can_advance_to(self, next: UnitState) -> bool {
        use UnitState::*;
        matches!(
            (self, next),
            (Pending, Protected)
                | (Pending, Queued)
                | (Protected, Queued)
                | (Queued, InFlight)
                | (InFlight, Translated)
                | (InFlight, Error)
                // a cancelled run hands its units back
                | (Queued, Pending)
                | (InFlight, Pending)
                | (Protected, Pending)
        )
    }

    pub fn is_final(self) -> bool {
        matches!(self, UnitState::Translated | UnitState::Error)
    }
}

/// Where a unit sits in the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitAnchor {
    /// Child-index path of the element holding the unit's nodes
    pub container: Vec<usize>,
    /// Range of the container's children forming the unit
    pub span: Range<usize>,
    /// True when the container is a unit block (`<p>`, `<li>`, ...) rather
    /// than loose inline content inside a wrapper
    pub block: bool,
}

#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub id: usize,
    /// Tag of the enclosing block, `p` for loose inline content
    pub tag: String,
    pub nodes: Vec<RichNode>,
    pub html: String,
    /// Set by the term protector; the original `html` is never changed
    pub protected_html: Option<String>,
    pub separator: bool,
    pub state: UnitState,
    pub anchor: UnitAnchor,
}

impl TranslationUnit {
    pub fn new(id: usize, tag: &str, nodes: Vec<RichNode>, anchor: UnitAnchor) -> Self {
        let html = to_html(&nodes).trim().to_string();
        let separator = is_separator_text(&text_content(&nodes));
        Self {
            id,
            tag: tag.to_string(),
            nodes,
            html,
            protected_html: None,
            separator,
            state: UnitState::Pending,
            anchor,
        }
    }

    /// Build a free-standing unit from an HTML snippet
    pub fn from_html(id: usize, html: &str) -> Self {
        let nodes = super::model::parse_fragment(html);
        let span = 0..nodes.len();
        Self::new(
            id,
            "p",
            nodes,
            UnitAnchor {
                container: Vec::new(),
                span,
                block: false,
            },
        )
    }

    pub fn text(&self) -> String {
        text_content(&self.nodes)
    }

    /// Size used against batch character limits
    pub fn char_len(&self) -> usize {
        self.html.chars().count()
    }

    /// Move to the next state, refusing transitions the lifecycle forbids
    pub fn advance(&mut self, next: UnitState) -> bool {
        if self.state.can_advance_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    /// HTML sent to the provider
    pub fn outgoing_html(&self) -> &str {
        self.protected_html.as_deref().unwrap_or(&self.html)
    }
}

pub fn is_separator_text(text: &str) -> bool {
    SEPARATOR_REGEX.is_match(text)
}

/// Cut a parsed document into translation units in document order
pub fn extract_units(nodes: &[RichNode]) -> Vec<TranslationUnit> {
    let mut units = Vec::new();
    walk_container(nodes, &mut Vec::new(), &mut units);
    units
}

fn is_block(node: &RichNode) -> bool {
    match node {
        RichNode::Element(e) => {
            e.tag == "hr" || UNIT_TAGS.contains(&e.tag.as_str()) || CONTAINER_TAGS.contains(&e.tag.as_str())
        }
        RichNode::Text(_) => false,
    }
}

fn has_block_children(element: &Element) -> bool {
    element.children.iter().any(is_block)
}

fn walk_container(children: &[RichNode], path: &mut Vec<usize>, units: &mut Vec<TranslationUnit>) {
    let mut loose_start: Option<usize> = None;

    for (index, child) in children.iter().enumerate() {
        if !is_block(child) {
            if loose_start.is_none() {
                loose_start = Some(index);
            }
            continue;
        }
        if let Some(start) = loose_start.take() {
            push_loose(children, path, start..index, units);
        }

        let RichNode::Element(element) = child else {
            continue;
        };
        path.push(index);
        if element.tag == "hr" {
            let mut unit = TranslationUnit::new(
                units.len(),
                "hr",
                Vec::new(),
                UnitAnchor {
                    container: path.clone(),
                    span: 0..0,
                    block: true,
                },
            );
            unit.separator = true;
            units.push(unit);
        } else if has_block_children(element) || !UNIT_TAGS.contains(&element.tag.as_str()) {
            walk_container(&element.children, path, units);
        } else {
            push_block(element, path, units);
        }
        path.pop();
    }

    if let Some(start) = loose_start {
        push_loose(children, path, start..children.len(), units);
    }
}

fn push_loose(children: &[RichNode], path: &[usize], span: Range<usize>, units: &mut Vec<TranslationUnit>) {
    let nodes = children[span.clone()].to_vec();
    if !has_content(&nodes) {
        return;
    }
    let anchor = UnitAnchor {
        container: path.to_vec(),
        span,
        block: false,
    };
    units.push(TranslationUnit::new(units.len(), "p", nodes, anchor));
}

fn push_block(element: &Element, path: &[usize], units: &mut Vec<TranslationUnit>) {
    if element.tag.starts_with('h') && is_skipped_heading(&text_content(&element.children)) {
        return;
    }
    for span in split_on_breaks(&element.children) {
        let nodes = element.children[span.clone()].to_vec();
        if !has_content(&nodes) {
            continue;
        }
        let anchor = UnitAnchor {
            container: path.to_vec(),
            span,
            block: true,
        };
        units.push(TranslationUnit::new(units.len(), &element.tag, nodes, anchor));
    }
}

fn is_skipped_heading(text: &str) -> bool {
    let normalized = text.trim().trim_end_matches([':', '：']).trim().to_lowercase();
    SKIPPED_HEADINGS.contains(&normalized.as_str())
}

/// Text or an image counts as content
fn has_content(nodes: &[RichNode]) -> bool {
    fn has_image(node: &RichNode) -> bool {
        match node {
            RichNode::Element(e) => e.tag == "img" || e.children.iter().any(has_image),
            RichNode::Text(_) => false,
        }
    }
    !text_content(nodes).trim().is_empty() || nodes.iter().any(has_image)
}

/// Split children at runs of two or more `<br>` (whitespace between them allowed)
fn split_on_breaks(children: &[RichNode]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut index = 0;
    while index < children.len() {
        if !children[index].is_element("br") {
            index += 1;
            continue;
        }
        let mut end = index;
        let mut breaks = 0;
        while end < children.len() {
            match &children[end] {
                n if n.is_element("br") => breaks += 1,
                RichNode::Text(t) if t.trim().is_empty() => {}
                _ => break,
            }
            end += 1;
        }
        if breaks >= 2 {
            spans.push(start..index);
            start = end;
        }
        index = end.max(index + 1);
    }
    spans.push(start..children.len());
    spans
}
