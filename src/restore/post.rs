/*!
 * User-defined post-translation replacements.
 *
 * Rules are written as `from:to` (literal) or `from=to` (multi-part: the
 * words of `from` may be joined by spaces, middle dots or dashes in the
 * output), separated by newlines or commas. All rules are compiled into a
 * single alternation ordered longest first, so the longest rule wins where
 * several start at the same position. Only text outside HTML tags is
 * touched.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct PostReplacement {
    pub from: String,
    pub to: String,
    pub multi_part: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PostReplacementRules {
    rules: Vec<PostReplacement>,
    combined: Option<Regex>,
}

fn edge_needs_boundary(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_ascii_alphanumeric())
}

impl PostReplacementRules {
    pub fn parse(text: &str) -> Self {
        let mut rules = Vec::new();
        for entry in text.split(['\n', ',', '，']) {
            let entry = entry.trim();
            let split = entry
                .char_indices()
                .find(|(_, c)| matches!(c, ':' | '：' | '=' | '＝'))
                .map(|(i, c)| (&entry[..i], &entry[i + c.len_utf8()..], matches!(c, '=' | '＝')));
            let Some((from, to, multi_part)) = split else {
                continue;
            };
            let from = from.trim();
            if from.is_empty() {
                continue;
            }
            rules.push(PostReplacement {
                from: from.to_string(),
                to: to.trim().to_string(),
                multi_part,
            });
        }
        Self::new(rules)
    }

    pub fn new(mut rules: Vec<PostReplacement>) -> Self {
        rules.sort_by(|a, b| b.from.chars().count().cmp(&a.from.chars().count()));
        let alternatives: Vec<String> = rules
            .iter()
            .map(|rule| {
                let body = if rule.multi_part {
                    rule.from
                        .split(|c: char| c.is_whitespace() || c == '·' || c == '・')
                        .filter(|p| !p.is_empty())
                        .map(regex::escape)
                        .collect::<Vec<_>>()
                        .join(r"[\s·・\-]*")
                } else {
                    regex::escape(&rule.from)
                };
                format!("({})", body)
            })
            .collect();

        let combined = if alternatives.is_empty() {
            None
        } else {
            match Regex::new(&alternatives.join("|")) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!("Post-translation rules disabled: {}", e);
                    None
                }
            }
        };
        Self { rules, combined }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn apply(&self, html: &str) -> String {
        let Some(regex) = &self.combined else {
            return html.to_string();
        };
        let mut out = String::with_capacity(html.len());
        let mut last = 0;
        for tag in TAG_REGEX.find_iter(html) {
            out.push_str(&self.apply_text(regex, &html[last..tag.start()]));
            out.push_str(tag.as_str());
            last = tag.end();
        }
        out.push_str(&self.apply_text(regex, &html[last..]));
        out
    }

    fn apply_text(&self, regex: &Regex, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in regex.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let Some(rule_index) = (1..caps.len()).find(|&i| caps.get(i).is_some()).map(|i| i - 1) else {
                continue;
            };
            let rule = &self.rules[rule_index];
            let matched = whole.as_str();
            let before = text[..whole.start()].chars().last();
            let after = text[whole.end()..].chars().next();
            let first = matched.chars().next();
            let final_char = matched.chars().last();
            let left_ok = !(edge_needs_boundary(first) && edge_needs_boundary(before));
            let right_ok = !(edge_needs_boundary(final_char) && edge_needs_boundary(after));
            if !left_ok || !right_ok {
                continue;
            }
            out.push_str(&text[last..whole.start()]);
            out.push_str(&rule.to);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        out
    }
}
