//! Splitting a numbered-list response back into per-unit segments.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::TranslationError;

/// `3.` / `3、` / `3)` at the start of a line
static NUMBER_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*([0-9]+)[ \t]*[.．。、)）][ \t]*").expect("Invalid number marker regex")
});

static LEADING_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[0-9]+\s*[.．。、)）]\s*").expect("Invalid leading number regex"));

static FIRST_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^1[ \t]*[.．。、)）][ \t]*").expect("Invalid first marker regex"));

/// Segments delimited by sequentially numbered markers (1, 2, 3, ...).
/// A marker whose number is out of sequence is treated as content.
fn numbered_segments(text: &str) -> Vec<String> {
    let mut markers: Vec<(usize, usize)> = Vec::new();
    for caps in NUMBER_MARKER_REGEX.captures_iter(text) {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if number.as_str().parse::<usize>().ok() == Some(markers.len() + 1) {
            markers.push((whole.start(), whole.end()));
        }
    }

    markers
        .iter()
        .enumerate()
        .map(|(i, &(_, content_start))| {
            let content_end = markers.get(i + 1).map(|&(start, _)| start).unwrap_or(text.len());
            text[content_start..content_end].trim().to_string()
        })
        .collect()
}

/// Non-empty lines with any numbering removed
fn line_segments(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| LEADING_NUMBER_REGEX.replace(line, "").trim().to_string())
        .collect()
}

/// Split a combined response into exactly `expected` segments
pub fn split_segments(text: &str, expected: usize) -> Result<Vec<String>, TranslationError> {
    let numbered = numbered_segments(text);
    if numbered.len() == expected {
        return Ok(numbered);
    }

    // A lone unit is the whole response, whatever numbering it contains
    if expected == 1 && !text.trim().is_empty() {
        let whole = FIRST_MARKER_REGEX.replace(text.trim(), "");
        return Ok(vec![whole.trim().to_string()]);
    }

    let lines = line_segments(text);
    if lines.len() == expected {
        return Ok(lines);
    }

    Err(TranslationError::SegmentMismatch {
        expected,
        actual: numbered.len(),
    })
}
