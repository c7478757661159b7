//! Re-serialization of a document with translations inserted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::model::{Element, RichNode, escape_text};
use super::units::TranslationUnit;

/// Tags whose translation goes inside the element instead of after it
const NESTED_TARGETS: &[&str] = &["li", "td", "th", "dd", "dt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Original followed by its translation
    #[default]
    Bilingual,
    /// Translation in place of the original
    TranslationOnly,
}

/// Final state of one unit
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Translated(String),
    Failed(String),
}

impl UnitOutcome {
    fn to_html(&self) -> String {
        match self {
            UnitOutcome::Translated(html) => html.clone(),
            UnitOutcome::Failed(message) => format!(
                "<span class=\"fictrans-error\">Translation failed: {}</span>",
                escape_text(message)
            ),
        }
    }
}

/// Render the document with each unit's outcome placed next to its source
pub fn render_document(
    nodes: &[RichNode],
    units: &[TranslationUnit],
    outcomes: &HashMap<usize, UnitOutcome>,
    mode: DisplayMode,
) -> String {
    let renderer = Renderer { units, outcomes, mode };
    let mut out = String::new();
    renderer.render_children(nodes, &mut Vec::new(), &mut out);
    out
}

struct Renderer<'a> {
    units: &'a [TranslationUnit],
    outcomes: &'a HashMap<usize, UnitOutcome>,
    mode: DisplayMode,
}

impl Renderer<'_> {
    fn units_at(&self, path: &[usize], block: bool) -> Vec<&TranslationUnit> {
        self.units
            .iter()
            .filter(|u| u.anchor.block == block && u.anchor.container == path && self.outcomes.contains_key(&u.id))
            .collect()
    }

    fn outcome_html(&self, units: &[&TranslationUnit]) -> String {
        units
            .iter()
            .filter_map(|u| self.outcomes.get(&u.id))
            .map(UnitOutcome::to_html)
            .collect::<Vec<_>>()
            .join("<br><br>")
    }

    fn render_children(&self, nodes: &[RichNode], path: &mut Vec<usize>, out: &mut String) {
        let loose = self.units_at(path, false);
        for (index, node) in nodes.iter().enumerate() {
            if let Some(unit) = loose.iter().find(|u| u.anchor.span.contains(&index)) {
                let last = index + 1 == unit.anchor.span.end;
                match self.mode {
                    DisplayMode::TranslationOnly => {
                        if index == unit.anchor.span.start {
                            out.push_str(&self.outcome_html(&[unit]));
                        }
                    }
                    DisplayMode::Bilingual => {
                        self.render_node(node, path, index, out);
                        if last {
                            out.push_str("<div class=\"fictrans-translation\">");
                            out.push_str(&self.outcome_html(&[unit]));
                            out.push_str("</div>");
                        }
                    }
                }
                continue;
            }
            self.render_node(node, path, index, out);
        }
    }

    fn render_node(&self, node: &RichNode, path: &mut Vec<usize>, index: usize, out: &mut String) {
        match node {
            RichNode::Text(t) => out.push_str(&escape_text(t)),
            RichNode::Element(element) => {
                path.push(index);
                let block_units = self.units_at(path, true);
                if block_units.is_empty() {
                    out.push_str(&element.open_tag());
                    if !element.is_void() {
                        self.render_children(&element.children, path, out);
                        out.push_str(&element.close_tag());
                    }
                } else {
                    self.render_block(element, &block_units, path, out);
                }
                path.pop();
            }
        }
    }

    fn render_block(&self, element: &Element, units: &[&TranslationUnit], path: &mut Vec<usize>, out: &mut String) {
        let translated = self.outcome_html(units);
        match self.mode {
            DisplayMode::TranslationOnly => {
                out.push_str(&element.open_tag());
                out.push_str(&translated);
                out.push_str(&element.close_tag());
            }
            DisplayMode::Bilingual if NESTED_TARGETS.contains(&element.tag.as_str()) => {
                out.push_str(&element.open_tag());
                self.render_children(&element.children, path, out);
                out.push_str("<div class=\"fictrans-translation\">");
                out.push_str(&translated);
                out.push_str("</div>");
                out.push_str(&element.close_tag());
            }
            DisplayMode::Bilingual => {
                out.push_str(&element.outer_html());
                let mut target = Element::new(&element.tag);
                target.attrs.push(("class".to_string(), "fictrans-translation".to_string()));
                out.push_str(&target.open_tag());
                out.push_str(&translated);
                out.push_str(&target.close_tag());
            }
        }
    }
}
