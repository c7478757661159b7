//! Multi-part terms whose parts may appear in any order.
//!
//! Every position where some part begins is a candidate start. From a
//! candidate, parts are chained through separator runs in whatever order
//! fits, so all orderings are explored without enumerating permutations up
//! front. A combination is accepted only if it stays within a window that
//! grows with the term's length.

use super::{MAX_PART_GAP, MatchSpan, has_boundaries, match_at, skip_separators};

/// Slack per part on top of the term's own length
const WINDOW_SLACK_PER_PART: usize = 4;

fn window_size(parts: &[Vec<Vec<char>>]) -> usize {
    let longest: usize = parts
        .iter()
        .map(|forms| forms.iter().map(Vec::len).max().unwrap_or(0))
        .sum();
    longest + parts.len() * WINDOW_SLACK_PER_PART
}

pub fn find_unordered(chars: &[char], parts: &[Vec<Vec<char>>], case_insensitive: bool, from: usize) -> Option<MatchSpan> {
    if parts.is_empty() {
        return None;
    }
    let window = window_size(parts);
    let mut used = vec![false; parts.len()];

    for start in from..chars.len() {
        if let Some(end) = chain(chars, start, start, parts, &mut used, parts.len(), case_insensitive, window) {
            return Some(MatchSpan { start, end });
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn chain(
    chars: &[char],
    start: usize,
    pos: usize,
    parts: &[Vec<Vec<char>>],
    used: &mut [bool],
    remaining: usize,
    ci: bool,
    window: usize,
) -> Option<usize> {
    for index in 0..parts.len() {
        if used[index] {
            continue;
        }
        for form in &parts[index] {
            let Some(len) = match_at(chars, pos, form, ci) else {
                continue;
            };
            let end = pos + len;
            if end - start > window {
                continue;
            }
            if remaining == 1 {
                if has_boundaries(chars, start, end) {
                    return Some(end);
                }
                continue;
            }
            let Some(next) = skip_separators(chars, end, MAX_PART_GAP) else {
                continue;
            };
            used[index] = true;
            let found = chain(chars, start, next, parts, used, remaining - 1, ci, window);
            used[index] = false;
            if found.is_some() {
                return found;
            }
        }
    }
    None
}
