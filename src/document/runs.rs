/*!
 * Flattened inline content.
 *
 * A unit's inline content is held as a sequence of runs. Each text run
 * carries the chain of inline formatting elements enclosing it, so a term
 * that crosses `<em>` or `<strong>` boundaries can be located on one flat
 * character view and replaced without losing the surrounding markup.
 */

use super::model::{Element, InlineTags, RichNode, escape_text};

/// Stand-in character for anything a term may not match through
pub const OBJECT_CHAR: char = '\u{FFFC}';

/// One enclosing inline element instance
#[derive(Debug, Clone)]
pub struct Mark {
    /// Identity of the element instance; two sibling `<em>`s differ
    pub id: usize,
    pub tag: String,
    pub open: String,
    pub close: String,
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunKind {
    Text(String),
    /// Verbatim HTML of an element that is not looked through (`<br>`, `<img>`, ...)
    Atom(String),
    /// A placeholder token inserted by the term protector
    Token(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineRun {
    pub kind: RunKind,
    pub marks: Vec<Mark>,
}

/// A piece of a protected fragment with the formatting it sat in
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentPiece {
    pub text: String,
    /// Opening tags beyond the ones shared by the whole fragment
    pub open: Vec<String>,
    /// Matching closing tags, innermost first
    pub close: Vec<String>,
}

/// The original formatted fragment a placeholder stands for
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CapturedFragment {
    pub pieces: Vec<FragmentPiece>,
}

impl CapturedFragment {
    pub fn text(&self) -> String {
        self.pieces.iter().map(|p| p.text.as_str()).collect()
    }

    /// HTML of the fragment as it appeared in the source
    pub fn original_html(&self) -> String {
        self.pieces
            .iter()
            .map(|p| wrap(&p.open, &escape_text(&p.text), &p.close))
            .collect()
    }

    /// Key distinguishing fragments with identical text but different formatting
    pub fn signature(&self) -> String {
        self.original_html()
    }

    /// Render a replacement into this fragment's structure.
    ///
    /// When the replacement has one word per word-bearing piece, or exactly as
    /// many words as the original, the words are distributed over the pieces
    /// so inline formatting survives. Otherwise the replacement is emitted as
    /// plain text in place of the whole fragment.
    pub fn render(&self, replacement: &str) -> String {
        let words: Vec<&str> = replacement.split_whitespace().collect();
        let word_pieces: Vec<usize> = self
            .pieces
            .iter()
            .map(|p| p.text.split_whitespace().count())
            .collect();
        let bearing = word_pieces.iter().filter(|&&n| n > 0).count();
        let total: usize = word_pieces.iter().sum();

        if bearing > 1 && words.len() == bearing {
            let allocation: Vec<usize> = word_pieces.iter().map(|&n| n.min(1)).collect();
            return self.distribute(&words, &allocation);
        }
        if bearing > 1 && words.len() == total {
            return self.distribute(&words, &word_pieces);
        }
        escape_text(replacement)
    }

    fn distribute(&self, words: &[&str], allocation: &[usize]) -> String {
        let mut out = String::new();
        let mut next = 0;
        for (piece, &count) in self.pieces.iter().zip(allocation) {
            if count == 0 {
                out.push_str(&wrap(&piece.open, &escape_text(&piece.text), &piece.close));
                continue;
            }
            let leading: String = piece.text.chars().take_while(|c| c.is_whitespace()).collect();
            let trailing: String = {
                let mut t: Vec<char> = piece.text.chars().rev().take_while(|c| c.is_whitespace()).collect();
                t.reverse();
                t.into_iter().collect()
            };
            let body = words[next..next + count].join(" ");
            next += count;
            out.push_str(&escape_text(&leading));
            out.push_str(&wrap(&piece.open, &escape_text(&body), &piece.close));
            out.push_str(&escape_text(&trailing));
        }
        out
    }
}

fn wrap(open: &[String], inner: &str, close: &[String]) -> String {
    let mut out = open.concat();
    out.push_str(inner);
    out.push_str(&close.concat());
    out
}

/// Character view over a run sequence
#[derive(Debug, Clone)]
pub struct FlatView {
    pub text: String,
    pub chars: Vec<char>,
    /// For each char: (run index, char offset within the run)
    positions: Vec<(usize, usize)>,
    /// Byte offset in `text` of each char, plus the total length
    byte_offsets: Vec<usize>,
}

impl FlatView {
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn position(&self, index: usize) -> Option<(usize, usize)> {
        self.positions.get(index).copied()
    }

    /// Char index of a byte offset produced by a regex match
    pub fn char_index(&self, byte: usize) -> usize {
        match self.byte_offsets.binary_search(&byte) {
            Ok(i) => i,
            Err(i) => i,
        }
    }

    /// Whether `[start, end)` contains a non-text stand-in
    pub fn spans_object(&self, start: usize, end: usize) -> bool {
        self.chars[start..end.min(self.chars.len())].contains(&OBJECT_CHAR)
    }
}

/// Inline content of one unit as runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineContent {
    pub runs: Vec<InlineRun>,
}

impl InlineContent {
    pub fn from_nodes(nodes: &[RichNode], inline_tags: &InlineTags) -> Self {
        let mut content = InlineContent::default();
        let mut stack = Vec::new();
        let mut next_id = 0;
        content.collect(nodes, inline_tags, &mut stack, &mut next_id);
        content
    }

    fn collect(&mut self, nodes: &[RichNode], inline_tags: &InlineTags, stack: &mut Vec<Mark>, next_id: &mut usize) {
        for node in nodes {
            match node {
                RichNode::Text(t) => {
                    if t.is_empty() {
                        continue;
                    }
                    self.runs.push(InlineRun {
                        kind: RunKind::Text(t.clone()),
                        marks: stack.clone(),
                    })
                }
                RichNode::Element(e) if inline_tags.contains(&e.tag) && !e.is_void() => {
                    stack.push(mark_for(e, *next_id));
                    *next_id += 1;
                    if e.children.is_empty() {
                        // Keep empty formatting elements so they survive re-serialization
                        self.runs.push(InlineRun {
                            kind: RunKind::Text(String::new()),
                            marks: stack.clone(),
                        });
                    }
                    self.collect(&e.children, inline_tags, stack, next_id);
                    stack.pop();
                }
                RichNode::Element(e) => self.runs.push(InlineRun {
                    kind: RunKind::Atom(e.outer_html()),
                    marks: stack.clone(),
                }),
            }
        }
    }

    pub fn flat_view(&self) -> FlatView {
        let mut text = String::new();
        let mut chars = Vec::new();
        let mut positions = Vec::new();
        let mut byte_offsets = Vec::new();
        for (run_index, run) in self.runs.iter().enumerate() {
            match &run.kind {
                RunKind::Text(t) => {
                    for (offset, c) in t.chars().enumerate() {
                        byte_offsets.push(text.len());
                        text.push(c);
                        chars.push(c);
                        positions.push((run_index, offset));
                    }
                }
                RunKind::Atom(_) | RunKind::Token(_) => {
                    byte_offsets.push(text.len());
                    text.push(OBJECT_CHAR);
                    chars.push(OBJECT_CHAR);
                    positions.push((run_index, 0));
                }
            }
        }
        byte_offsets.push(text.len());
        FlatView {
            text,
            chars,
            positions,
            byte_offsets,
        }
    }

    /// The formatted fragment covering the flat range `[start, end)`.
    ///
    /// `None` if the range is empty or touches anything other than text.
    pub fn capture(&self, view: &FlatView, start: usize, end: usize) -> Option<CapturedFragment> {
        if start >= end || end > view.len() || view.spans_object(start, end) {
            return None;
        }
        let (first_run, first_offset) = view.position(start)?;
        let (last_run, last_offset) = view.position(end - 1)?;

        let mut pieces: Vec<(String, &[Mark])> = Vec::new();
        for index in first_run..=last_run {
            let run = self.runs.get(index)?;
            let RunKind::Text(text) = &run.kind else {
                return None;
            };
            let chars: Vec<char> = text.chars().collect();
            let from = if index == first_run { first_offset } else { 0 };
            let to = if index == last_run { last_offset + 1 } else { chars.len() };
            if from >= to || to > chars.len() {
                continue;
            }
            pieces.push((chars[from..to].iter().collect(), run.marks.as_slice()));
        }
        if pieces.is_empty() {
            return None;
        }

        let shared = common_prefix(pieces.iter().map(|(_, marks)| *marks));
        Some(CapturedFragment {
            pieces: pieces
                .iter()
                .map(|(text, marks)| FragmentPiece {
                    text: text.clone(),
                    open: marks[shared..].iter().map(|m| m.open.clone()).collect(),
                    close: marks[shared..].iter().rev().map(|m| m.close.clone()).collect(),
                })
                .collect(),
        })
    }

    /// Replace the flat range `[start, end)` with a token run.
    ///
    /// Returns the captured fragment, or `None` (leaving the content
    /// untouched) if the range cannot be captured.
    pub fn replace_range(&mut self, view: &FlatView, start: usize, end: usize, token: &str) -> Option<CapturedFragment> {
        let fragment = self.capture(view, start, end)?;
        let (first_run, first_offset) = view.position(start)?;
        let (last_run, last_offset) = view.position(end - 1)?;
        let first_marks = &self.runs[first_run].marks;
        let shared = first_marks.len() - fragment.pieces[0].open.len();

        let mut replacement = Vec::new();
        if let RunKind::Text(text) = &self.runs[first_run].kind {
            let before: String = text.chars().take(first_offset).collect();
            if !before.is_empty() {
                replacement.push(InlineRun {
                    kind: RunKind::Text(before),
                    marks: self.runs[first_run].marks.clone(),
                });
            }
        }
        replacement.push(InlineRun {
            kind: RunKind::Token(token.to_string()),
            marks: first_marks[..shared].to_vec(),
        });
        if let RunKind::Text(text) = &self.runs[last_run].kind {
            let after: String = text.chars().skip(last_offset + 1).collect();
            if !after.is_empty() {
                replacement.push(InlineRun {
                    kind: RunKind::Text(after),
                    marks: self.runs[last_run].marks.clone(),
                });
            }
        }

        self.runs.splice(first_run..=last_run, replacement);
        Some(fragment)
    }

    /// Serialize runs back to HTML, reopening formatting only where needed
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let mut open: Vec<&Mark> = Vec::new();
        for run in &self.runs {
            let keep = open
                .iter()
                .zip(run.marks.iter())
                .take_while(|(a, b)| a.id == b.id)
                .count();
            while open.len() > keep {
                if let Some(mark) = open.pop() {
                    out.push_str(&mark.close);
                }
            }
            for mark in &run.marks[keep..] {
                out.push_str(&mark.open);
                open.push(mark);
            }
            match &run.kind {
                RunKind::Text(t) => out.push_str(&escape_text(t)),
                RunKind::Atom(html) => out.push_str(html),
                RunKind::Token(token) => out.push_str(token),
            }
        }
        while let Some(mark) = open.pop() {
            out.push_str(&mark.close);
        }
        out
    }

    /// Tokens present, in order
    pub fn tokens(&self) -> Vec<&str> {
        self.runs
            .iter()
            .filter_map(|r| match &r.kind {
                RunKind::Token(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn mark_for(element: &Element, id: usize) -> Mark {
    Mark {
        id,
        tag: element.tag.clone(),
        open: element.open_tag(),
        close: element.close_tag(),
    }
}

fn common_prefix<'a>(mut chains: impl Iterator<Item = &'a [Mark]>) -> usize {
    let Some(first) = chains.next() else {
        return 0;
    };
    let mut len = first.len();
    for chain in chains {
        len = first
            .iter()
            .zip(chain.iter())
            .take(len)
            .take_while(|(a, b)| a.id == b.id)
            .count();
    }
    len
}
