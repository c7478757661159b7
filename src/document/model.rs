/*!
 * Rich-text tree used by the translation pipeline.
 *
 * HTML is parsed once with `scraper` and converted into a small owned tree
 * of text runs and elements. Everything downstream (unit extraction, term
 * matching, rendering) works on this tree and never on a browser or parser
 * specific API.
 */

use std::collections::HashSet;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

/// Elements that never have children or a closing tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Inline formatting elements that term matching may look through
pub const DEFAULT_INLINE_TAGS: &[&str] = &[
    "em", "strong", "b", "i", "u", "s", "strike", "del", "ins", "span", "a", "sup", "sub", "small", "mark",
    "abbr", "cite", "code", "q",
];

/// A node in the rich-text tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RichNode {
    Text(String),
    Element(Element),
}

/// An element with its attributes in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<RichNode>,
}

/// Configurable whitelist of inline formatting tags
#[derive(Debug, Clone, PartialEq)]
pub struct InlineTags {
    tags: HashSet<String>,
}

impl Default for InlineTags {
    fn default() -> Self {
        Self::new(DEFAULT_INLINE_TAGS.iter().copied())
    }
}

impl InlineTags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_ascii_lowercase())
    }
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_void(&self) -> bool {
        VOID_TAGS.contains(&self.tag.as_str())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn open_tag(&self) -> String {
        let mut out = format!("<{}", self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        out.push('>');
        out
    }

    pub fn close_tag(&self) -> String {
        if self.is_void() {
            String::new()
        } else {
            format!("</{}>", self.tag)
        }
    }

    /// Serialized HTML of the element's children
    pub fn inner_html(&self) -> String {
        to_html(&self.children)
    }

    pub fn outer_html(&self) -> String {
        let mut out = self.open_tag();
        if !self.is_void() {
            out.push_str(&self.inner_html());
            out.push_str(&self.close_tag());
        }
        out
    }
}

impl RichNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            RichNode::Element(e) => Some(e),
            RichNode::Text(_) => None,
        }
    }

    /// Concatenated text of the node and its descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    pub fn is_element(&self, tag: &str) -> bool {
        matches!(self, RichNode::Element(e) if e.tag == tag)
    }
}

fn collect_text(node: &RichNode, out: &mut String) {
    match node {
        RichNode::Text(t) => out.push_str(t),
        RichNode::Element(e) => e.children.iter().for_each(|c| collect_text(c, out)),
    }
}

/// Plain text of a node list
pub fn text_content(nodes: &[RichNode]) -> String {
    let mut out = String::new();
    nodes.iter().for_each(|n| collect_text(n, &mut out));
    out
}

/// Parse an HTML fragment into owned nodes
pub fn parse_fragment(html: &str) -> Vec<RichNode> {
    let fragment = Html::parse_fragment(html);
    convert_children(fragment.root_element())
}

fn convert_children(parent: ElementRef<'_>) -> Vec<RichNode> {
    let mut nodes = Vec::new();
    for child in parent.children() {
        match child.value() {
            scraper::node::Node::Text(text) => {
                let text = String::from(&**text);
                // Merge adjacent text nodes the parser may leave split
                if let Some(RichNode::Text(prev)) = nodes.last_mut() {
                    prev.push_str(&text);
                } else {
                    nodes.push(RichNode::Text(text));
                }
            }
            scraper::node::Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    nodes.push(RichNode::Element(convert_element(element)));
                }
            }
            _ => {}
        }
    }
    nodes
}

fn convert_element(element: ElementRef<'_>) -> Element {
    let value = element.value();
    Element {
        tag: value.name().to_ascii_lowercase(),
        attrs: value
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        children: convert_children(element),
    }
}

/// Serialize nodes back to HTML
pub fn to_html(nodes: &[RichNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            RichNode::Text(t) => out.push_str(&escape_text(t)),
            RichNode::Element(e) => out.push_str(&e.outer_html()),
        }
    }
    out
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
