/*!
 * Structure-aware term matching.
 *
 * Matchers run over a unit's flattened character view (see
 * `document::runs::FlatView`), so a term split across `<em>`/`<strong>`
 * boundaries is found like plain text, while anything opaque (`<br>`,
 * images, already-placed tokens) shows up as a stand-in character no term
 * can match through. Positions returned are flat character indices that
 * map back to runs through the view.
 */

pub mod ordered;
pub mod unordered;

use crate::document::FlatView;
use crate::glossary::CompiledRule;
use crate::language_utils::is_cjk;

pub use ordered::find_ordered;
pub use unordered::find_unordered;

/// Half-open range of flat character positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &MatchSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Characters allowed between the parts of a multi-part term
pub fn is_part_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '‐' | '‑' | '‒' | '–' | '—' | '·' | '・' | '•')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Latin-like word characters need a boundary; CJK text has none
fn needs_boundary(c: char) -> bool {
    is_word_char(c) && !is_cjk(c)
}

/// Word-boundary check at the outer edges of `[start, end)`
pub fn has_boundaries(chars: &[char], start: usize, end: usize) -> bool {
    if start >= end || end > chars.len() {
        return false;
    }
    let left_ok = start == 0 || !needs_boundary(chars[start]) || !needs_boundary(chars[start - 1]);
    let right_ok = end == chars.len() || !needs_boundary(chars[end - 1]) || !needs_boundary(chars[end]);
    left_ok && right_ok
}

fn fold_apostrophe(c: char) -> char {
    match c {
        '’' | '‘' | 'ʼ' => '\'',
        other => other,
    }
}

pub(crate) fn chars_eq(a: char, b: char, case_insensitive: bool) -> bool {
    let (a, b) = (fold_apostrophe(a), fold_apostrophe(b));
    a == b || (case_insensitive && a.to_lowercase().eq(b.to_lowercase()))
}

/// Length of `form` if it occurs at `pos`
pub(crate) fn match_at(chars: &[char], pos: usize, form: &[char], case_insensitive: bool) -> Option<usize> {
    if form.is_empty() || pos + form.len() > chars.len() {
        return None;
    }
    form.iter()
        .zip(&chars[pos..pos + form.len()])
        .all(|(f, c)| chars_eq(*f, *c, case_insensitive))
        .then_some(form.len())
}

/// End of the separator run starting at `pos`, if it is acceptable between
/// two parts. An empty run is only allowed between CJK characters.
pub(crate) fn skip_separators(chars: &[char], pos: usize, max_gap: usize) -> Option<usize> {
    let mut end = pos;
    while end < chars.len() && is_part_separator(chars[end]) {
        end += 1;
    }
    let gap = end - pos;
    if gap > max_gap {
        return None;
    }
    if gap == 0 {
        let before = pos.checked_sub(1).map(|i| chars[i]);
        let after = chars.get(pos).copied();
        let cjk_join = before.is_some_and(is_cjk) || after.is_some_and(is_cjk);
        return cjk_join.then_some(pos);
    }
    Some(end)
}

/// Longest separator run tolerated between two parts
pub(crate) const MAX_PART_GAP: usize = 3;

/// Part forms as char vectors, longest first
pub(crate) fn part_chars(rule: &CompiledRule) -> Vec<Vec<Vec<char>>> {
    rule.parts
        .iter()
        .map(|forms| {
            let mut forms: Vec<Vec<char>> = forms.iter().map(|f| f.chars().collect()).collect();
            forms.sort_by(|a, b| b.len().cmp(&a.len()));
            forms
        })
        .collect()
}

/// Finds every non-overlapping structural occurrence of one rule
#[derive(Debug, Clone)]
pub struct StructuralMatcher<'a> {
    rule: &'a CompiledRule,
    parts: Vec<Vec<Vec<char>>>,
}

impl<'a> StructuralMatcher<'a> {
    pub fn new(rule: &'a CompiledRule) -> Self {
        Self {
            rule,
            parts: part_chars(rule),
        }
    }

    /// First match starting at or after `from`
    pub fn find_from(&self, view: &FlatView, from: usize) -> Option<MatchSpan> {
        let ci = self.rule.case_insensitive;
        let ordered = find_ordered(&view.chars, &self.parts, ci, from);
        if !self.rule.unordered_parts_allowed {
            return ordered;
        }
        let unordered = find_unordered(&view.chars, &self.parts, ci, from);
        match (ordered, unordered) {
            (Some(a), Some(b)) => Some(if b.start < a.start { b } else { a }),
            (a, b) => a.or(b),
        }
    }

    pub fn find_all(&self, view: &FlatView) -> Vec<MatchSpan> {
        let mut spans = Vec::new();
        let mut from = 0;
        while let Some(span) = self.find_from(view, from) {
            from = span.end;
            spans.push(span);
        }
        spans
    }
}
