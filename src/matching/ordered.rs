//! Multi-part terms whose parts appear in declared order.

use super::{MAX_PART_GAP, MatchSpan, has_boundaries, match_at, skip_separators};

/// First occurrence at or after `from` of the parts in order, each separated
/// by a short run of whitespace/dash-class characters.
pub fn find_ordered(chars: &[char], parts: &[Vec<Vec<char>>], case_insensitive: bool, from: usize) -> Option<MatchSpan> {
    if parts.is_empty() {
        return None;
    }
    for start in from..chars.len() {
        if let Some(end) = match_parts(chars, start, start, parts, case_insensitive) {
            return Some(MatchSpan { start, end });
        }
    }
    None
}

/// Try every form of the current part at `pos`, backtracking on failure
fn match_parts(chars: &[char], start: usize, pos: usize, parts: &[Vec<Vec<char>>], ci: bool) -> Option<usize> {
    let (forms, rest) = parts.split_first()?;
    for form in forms {
        let Some(len) = match_at(chars, pos, form, ci) else {
            continue;
        };
        let end = pos + len;
        if rest.is_empty() {
            if has_boundaries(chars, start, end) {
                return Some(end);
            }
            continue;
        }
        let Some(next) = skip_separators(chars, end, MAX_PART_GAP) else {
            continue;
        };
        if let Some(found) = match_parts(chars, start, next, rest, ci) {
            return Some(found);
        }
    }
    None
}
